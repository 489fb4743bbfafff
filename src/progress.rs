//! Progress reporting
//!
//! The pipeline reports phase changes through a [`ProgressSink`]; whether and
//! how they are shown is up to the caller.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Receives human-readable status updates. Updates are fire-and-forget.
pub trait ProgressSink {
    fn update(&self, message: &str);
    fn finish(&self, message: &str);
}

/// Terminal spinner for the command-line tool.
pub struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    pub fn start(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed_precise}]") {
            bar.set_style(style);
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        SpinnerProgress { bar }
    }

    /// Stops the spinner without a success message, leaving the last update visible.
    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

impl ProgressSink for SpinnerProgress {
    fn update(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    fn finish(&self, message: &str) {
        self.bar.finish_with_message(format!("✔ {}", message));
    }
}
