//! The downstream transform stage for ts-transformer.
//!
//! Metro's upstream transformer is a collaborator behind the [`Transformer`]
//! trait. [`MetroTransformer`] binds one of the transformer APIs found in the
//! project when it starts, and [`StageTwoResult`] normalizes whatever that API
//! returns into one closed shape.

mod result;
mod transformer;

pub use result::{StageTwoResult, UpstreamInput, UpstreamResult};
pub use transformer::{MetroTransformer, Transformer, UpstreamApi};

use node_runner::NodeError;
use source_map::SourceMapError;
use thiserror::Error;

/// Error types for the downstream stage.
#[derive(Debug, Error)]
pub enum MetroError {
    /// The upstream transformer, or the worker hosting it, failed.
    #[error(transparent)]
    Node(#[from] NodeError),

    /// The worker bound an API this build does not know.
    #[error("unsupported upstream transformer api: {0}")]
    UnsupportedApi(String),

    /// A structured map from the upstream transformer could not be decoded.
    #[error("invalid source map from upstream transformer: {0}")]
    InvalidSourceMap(#[from] SourceMapError),

    /// A tuple-stream map from the upstream transformer could not be decoded.
    #[error("invalid mapping tuples from upstream transformer: {0}")]
    InvalidMappings(#[source] serde_json::Error),

    /// `map` was neither an array, an object nor a JSON string.
    #[error("unexpected `map` value from upstream transformer: {0}")]
    UnexpectedMap(&'static str),
}
