use thiserror::Error;

/// Result type for decoder-facing operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the decoder capability.
///
/// All of these are fatal to the extraction call that observes them:
/// partial results are discarded and the session is still closed by its
/// owner. Missing optional records or fields are never errors; they
/// resolve to documented defaults instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid model payload: {0}")]
    InvalidModel(String),

    #[error("Geometry #{0} could not be resolved")]
    GeometryUnavailable(u32),

    #[error("Record #{0} could not be resolved")]
    RecordUnavailable(u32),

    #[error("Decoder failure: {0}")]
    Decoder(String),
}
