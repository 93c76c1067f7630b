//! Error types for the checking pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while capturing or comparing a page
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to launch or configure the browser
    #[error("Browser launch failed: {0}")]
    Launch(String),

    /// Target unreachable, DNS failure, or navigation aborted
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Browser crashed or screenshot extraction failed after navigation
    #[error("Capture failed: {0}")]
    Capture(String),

    /// Stored baseline or fresh capture bytes are not a valid image
    #[error("Image decode failed: {0}")]
    Decode(String),

    /// Raster buffer could not be written back out as PNG
    #[error("Image encode failed: {0}")]
    Encode(String),

    /// Operation exceeded its deadline
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Capture(err.to_string())
    }
}
