//! The Stage-1 adapter: compile, surface the first error, parse the map.

use crate::diagnostic::CompilerDiagnostic;
use crate::transpiler::{TranspileInput, Transpiler};
use crate::TscError;
use source_map::{LineIndex, SourceMapConsumer};
use std::fmt;
use thiserror::Error;
use tsconfig::CompilerOptions;

/// File extensions compiled by the pipeline. Everything else passes through.
pub const TYPESCRIPT_EXTENSIONS: &[&str] = &[".ts", ".tsx"];

/// Returns true if `file_name` is typed source the compiler should see.
pub fn is_typescript_file(file_name: &str) -> bool {
    TYPESCRIPT_EXTENSIONS
        .iter()
        .any(|ext| file_name.ends_with(ext))
}

/// Where a compile error points, 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

/// The first error-category diagnostic of a compilation.
///
/// Displays as `file (line,column): message`, or just the message when the
/// diagnostic has no position. Tooling parses this format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct CompileError {
    pub location: Option<ErrorLocation>,
    pub message: String,
}

impl CompileError {
    /// Builds the error from a diagnostic reported against `source`.
    pub fn from_diagnostic(diagnostic: &CompilerDiagnostic, source: &str) -> Self {
        let message = diagnostic.message.flatten("\n");
        let location = diagnostic.file.as_ref().and_then(|file| {
            let span = diagnostic.span(source)?;
            let index = LineIndex::new(source);
            let line_col = index.line_col(span.start)?;
            let line_start = u32::from(index.line_start(line_col.line)?) as usize;
            // Columns count UTF-16 units, like the compiler's own positions
            let column = source[line_start..u32::from(span.start) as usize]
                .encode_utf16()
                .count() as u32;
            Some(ErrorLocation {
                file: file.clone(),
                line: line_col.line + 1,
                column: column + 1,
            })
        });
        Self { location, message }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{} ({},{}): {}", loc.file, loc.line, loc.column, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// A successfully compiled module.
#[derive(Debug, Clone)]
pub struct CompiledModule {
    /// The intermediate JavaScript.
    pub output_text: String,
    /// Maps the intermediate JavaScript back to the typed source.
    pub source_map: SourceMapConsumer,
    /// Non-error diagnostics. Type errors reported as warnings land here.
    pub diagnostics: Vec<CompilerDiagnostic>,
}

/// Compiles one typed source file.
///
/// Fails with the first error-category diagnostic even when several exist.
/// Diagnostics of any other category never block output.
pub async fn compile<T: Transpiler>(
    transpiler: &T,
    source: &str,
    file_name: &str,
    options: &CompilerOptions,
) -> Result<CompiledModule, TscError> {
    let output = transpiler
        .transpile(TranspileInput {
            source,
            file_name,
            compiler_options: options,
        })
        .await?;

    if let Some(error) = output.diagnostics.iter().find(|d| d.is_error()) {
        return Err(CompileError::from_diagnostic(error, source).into());
    }

    for diagnostic in &output.diagnostics {
        tracing::debug!(
            file = file_name,
            code = diagnostic.code,
            category = ?diagnostic.category,
            "{}",
            diagnostic.message.flatten("\n")
        );
    }

    let map_text = output
        .source_map_text
        .ok_or_else(|| TscError::MissingSourceMap(file_name.to_string()))?;
    let source_map = SourceMapConsumer::from_json(&map_text)?;

    Ok(CompiledModule {
        output_text: output.output_text,
        source_map,
        diagnostics: output.diagnostics,
    })
}
