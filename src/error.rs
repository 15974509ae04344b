//! Error types for the capture pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while planning, capturing, or compositing
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed viewport or document dimensions; raised before any
    /// page mutation takes place
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The capture service failed or the bounded wait expired on a tile
    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    /// A captured tile's image could not be decoded
    #[error("Decode failed: {0}")]
    DecodeFailed(String),

    /// The caller requested an abort between tiles
    #[error("Capture cancelled")]
    Cancelled,

    /// A document operation failed in the backing page
    #[error("Document error: {0}")]
    Dom(String),

    /// The delivery collaborator rejected the finished image
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Dom(err.to_string())
    }
}
