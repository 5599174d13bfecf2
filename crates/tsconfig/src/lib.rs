//! tsconfig resolution for ts-transformer.
//!
//! Produces the single flat [`CompilerOptions`] map every transform call
//! shares. The document is located through `TSCONFIG_PATH` or by walking up
//! from a start directory, parsed leniently (comments and trailing commas are
//! accepted), and merged through its `extends` chain with the nearest document
//! winning.

mod error;
mod json;
mod options;
mod resolver;

pub use error::ConfigError;
pub use options::{CompilerOptions, ConfigWarning};
pub use resolver::{ResolvedTsConfig, TsConfigResolver, TSCONFIG_FILENAME, TSCONFIG_PATH_ENV};
