//! Configuration errors.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised while locating or reading a tsconfig document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No document exists where one was expected.
    #[error("unable to find tsconfig at {0}")]
    NotFound(Utf8PathBuf),

    /// The document could not be read or parsed.
    #[error("Error reading \"{path}\":\n  {message}")]
    Parse {
        /// The document that failed.
        path: Utf8PathBuf,
        /// What went wrong.
        message: String,
    },

    /// An `extends` chain leads back to a document already being loaded.
    #[error("circular extends chain through {0}")]
    CircularExtends(Utf8PathBuf),
}
