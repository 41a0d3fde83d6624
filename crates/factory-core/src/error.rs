//! Errors raised while locating, loading and binding the tab extension.

use std::path::PathBuf;

use thiserror::Error;

use crate::capability::HubCapability;

/// Failure of a single resolution strategy.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("module not found: {0}")]
    NotFound(String),
    #[error("failed to load {}: {message}", path.display())]
    Library { path: PathBuf, message: String },
    #[error("module `{module}` does not export `{capability}`")]
    MissingCapability {
        module: String,
        capability: HubCapability,
    },
    #[error("module `{module}` failed to initialize: {message}")]
    Init { module: String, message: String },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("hub capabilities are already bound to `{0}`")]
    AlreadyBound(String),
    #[error("hub capabilities already settled on fallback stubs")]
    SettledOnFallback,
}
