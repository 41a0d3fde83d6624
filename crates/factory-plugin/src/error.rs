use thiserror::Error;

/// Failure of one call across the C boundary.
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("extension returned null")]
    NullResult,
    #[error("string contains an interior NUL: {0}")]
    Nul(#[from] std::ffi::NulError),
    #[error("invalid JSON across the extension boundary: {0}")]
    Serialization(#[from] serde_json::Error),
}
