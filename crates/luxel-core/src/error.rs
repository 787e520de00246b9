//! Error types for encoding and round-trip decoding

use thiserror::Error;

/// Result type used throughout the workspace
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the encoder and the round-trip decoder.
///
/// Recoverable problems are always reported through `Result`; there is no
/// in-band error signaling inside the bitstream. Frame encoding aborts on
/// the first fatal error and discards partial output.
#[derive(Error, Debug)]
pub enum Error {
    /// The caller handed us a frame or options we cannot encode:
    /// zero dimensions, mismatched plane lengths, out-of-range option
    /// values, malformed overlays.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The pipeline itself failed: entropy coder overflow, the configured
    /// output-size cap was exceeded, or an internal numeric failure.
    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    /// The requested feature is not implemented by the chosen path.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Round-trip decoding failed: bad signature, truncated stream, or a
    /// header field outside its legal range.
    #[error("decode failed: {0}")]
    DecodeFailed(String),
}

impl Error {
    /// Shorthand for an `InvalidInput` with a formatted reason.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Error::InvalidInput(reason.into())
    }
}
