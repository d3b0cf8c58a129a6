//! Error types.
//!
//! Gradient kernels themselves never fail. Errors come only from building an
//! executor and from reading or validating configuration.

/// Invalid configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("categorical cross-entropy needs at least 2 classes, got {0}")]
    InvalidClassCount(usize),

    #[error("unknown loss: {0:?}")]
    UnknownLoss(String),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Crate-level error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
