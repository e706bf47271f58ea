use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while extracting or assembling a scene
#[derive(Error, Debug)]
pub enum Error {
    #[error("Decode error: {0}")]
    Decode(#[from] ifc_scene_core::Error),
}
