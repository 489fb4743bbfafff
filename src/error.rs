//! Error types for the data page pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can abort a run
#[derive(Error, Debug)]
pub enum Error {
    /// The requested page range is inverted
    #[error("Invalid page range: start {start} is greater than end {end}")]
    InvalidRange { start: u32, end: u32 },

    /// An image or font could not be fetched
    #[error("Failed to fetch {url}: {reason}")]
    Network { url: String, reason: String },

    /// The composition is malformed or does not fit its sheet
    #[error("Layout error: {0}")]
    Layout(String),

    /// Decoding, drawing or encoding failed
    #[error("Rendering failed: {0}")]
    Render(String),

    /// A raster buffer could not be embedded in the document
    #[error("PDF assembly failed: {0}")]
    Pdf(String),

    /// The output file could not be written
    #[error("Failed to write {}: {source}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn network(url: impl ToString, reason: impl ToString) -> Self {
        Error::Network {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
