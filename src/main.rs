//! Passports - Main Application Entrypoint
//!
//! Parses the page range, initializes logging and the progress spinner, and
//! runs the pipeline against the live data page host.

use clap::Parser;
use log::{error, info};
use passports::fetcher::HttpSource;
use passports::progress::{ProgressSink, SpinnerProgress};
use passports::{Config, Error, run};
use std::process::ExitCode;
use std::time::Duration;

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Concatenate Passport data pages into a single PDF
#[derive(Parser, Debug)]
#[command(name = "passports", version, about, long_about = None)]
struct Args {
    /// First data page to include
    start: u32,

    /// Last data page to include (inclusive)
    end: u32,
}

fn main() -> ExitCode {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting passports...");

    let config = Config::default();
    let spinner = SpinnerProgress::start(&format!(
        "Fetching data pages {} to {}",
        args.start, args.end
    ));

    let result = HttpSource::new(FETCH_TIMEOUT)
        .and_then(|source| run(&config, args.start, args.end, &source, Some(&spinner as &dyn ProgressSink)));

    match result {
        Ok(summary) => {
            info!(
                "Wrote {} data pages on {} sheets to {:?}",
                summary.pages, summary.sheets, summary.output
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            spinner.abandon();
            let code = match &e {
                Error::InvalidRange { .. } => 1,
                _ => 2,
            };
            let e = anyhow::Error::new(e).context("Failed to build the data page PDF");
            error!("{:#}", e);
            ExitCode::from(code)
        }
    }
}
