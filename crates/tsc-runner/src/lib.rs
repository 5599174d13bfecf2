//! TypeScript compilation for ts-transformer.
//!
//! The compiler itself is a collaborator behind the [`Transpiler`] trait;
//! [`NodeTranspiler`] drives the project's `typescript` package in a node
//! worker. [`compile`] is the adapter the pipeline calls: it applies the
//! first-error-wins policy and parses the emitted source map.

mod compile;
mod diagnostic;
mod transpiler;

pub use compile::{
    compile, is_typescript_file, CompileError, CompiledModule, ErrorLocation,
    TYPESCRIPT_EXTENSIONS,
};
pub use diagnostic::{
    CompilerDiagnostic, DiagnosticCategory, DiagnosticMessage, DiagnosticMessageChain,
};
pub use transpiler::{NodeTranspiler, TranspileInput, TranspileOutput, Transpiler};

use node_runner::NodeError;
use source_map::SourceMapError;
use thiserror::Error;

/// Error types for the compile stage.
#[derive(Debug, Error)]
pub enum TscError {
    /// The source has an error-category diagnostic.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// The compiler worker failed.
    #[error(transparent)]
    Node(#[from] NodeError),

    /// The compiler emitted no source map.
    #[error("compiler produced no source map for {0}")]
    MissingSourceMap(String),

    /// The compiler's source map could not be decoded.
    #[error("invalid source map from compiler: {0}")]
    InvalidSourceMap(#[from] SourceMapError),
}
