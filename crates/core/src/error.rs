//! Unified error types for url2md.
//!
//! Only unrecoverable conditions become an [`Error`]. Direct-fetch and image
//! download failures are absorbed by the pipeline and reported as counters.

/// Unified error types for the url2md pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL list).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// HTTP error response or transport failure.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Render mode is not compiled in.
    #[error("RENDER_DISABLED")]
    RenderDisabled,

    /// Browser launch or navigation failed.
    #[error("RENDER_FAILED: {0}")]
    RenderFailed(String),

    /// Content extraction or Markdown conversion failed.
    #[error("EXTRACT_FAILED: {0}")]
    ExtractFailed(String),

    /// Filesystem operation failed.
    #[error("IO_ERROR: {0}")]
    Io(#[from] std::io::Error),
}
