use metro_runner::MetroError;
use thiserror::Error;
use tsc_runner::TscError;
use tsconfig::ConfigError;

/// Error types for a transform.
///
/// Compile errors and collaborator failures are shown exactly as they were
/// raised, with no prefix.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The configuration could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The compile stage failed.
    #[error(transparent)]
    Compile(#[from] TscError),

    /// The downstream transform stage failed.
    #[error(transparent)]
    Upstream(#[from] MetroError),

    /// The caller's arguments were neither positional nor an options object.
    #[error("invalid transform arguments: {0}")]
    Arguments(#[source] serde_json::Error),
}
