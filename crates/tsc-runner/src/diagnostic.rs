//! TypeScript diagnostics as reported by `transpileModule`.

use serde::{Deserialize, Serialize};
use source_map::Span;

/// TypeScript's diagnostic categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticCategory {
    Warning,
    Error,
    Suggestion,
    Message,
}

/// A chained diagnostic message: a headline followed by nested details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticMessageChain {
    pub message_text: String,
    #[serde(default)]
    pub next: Vec<DiagnosticMessageChain>,
}

/// Diagnostic text, either plain or chained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiagnosticMessage {
    Text(String),
    Chain(DiagnosticMessageChain),
}

impl DiagnosticMessage {
    /// Renders the message the way the compiler prints it: each nested level
    /// on its own line, indented two spaces deeper than its parent.
    pub fn flatten(&self, new_line: &str) -> String {
        match self {
            DiagnosticMessage::Text(text) => text.clone(),
            DiagnosticMessage::Chain(chain) => {
                let mut out = String::new();
                flatten_chain(chain, new_line, 0, &mut out);
                out
            }
        }
    }
}

fn flatten_chain(chain: &DiagnosticMessageChain, new_line: &str, indent: usize, out: &mut String) {
    if indent > 0 {
        out.push_str(new_line);
        for _ in 0..indent {
            out.push_str("  ");
        }
    }
    out.push_str(&chain.message_text);
    for next in &chain.next {
        flatten_chain(next, new_line, indent + 1, out);
    }
}

/// One diagnostic from the compiler.
///
/// `start` and `length` are in UTF-16 code units, as the compiler counts them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerDiagnostic {
    pub category: DiagnosticCategory,
    #[serde(default)]
    pub code: u32,
    #[serde(rename = "messageText")]
    pub message: DiagnosticMessage,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub start: Option<u32>,
    #[serde(default)]
    pub length: Option<u32>,
}

impl CompilerDiagnostic {
    /// Returns true for diagnostics that abort compilation.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.category == DiagnosticCategory::Error
    }

    /// The byte range this diagnostic covers in `text`.
    pub fn span(&self, text: &str) -> Option<Span> {
        let start = utf16_to_byte_offset(text, self.start?)?;
        let end = utf16_to_byte_offset(text, self.start?.saturating_add(self.length.unwrap_or(0)))
            .unwrap_or(text.len() as u32);
        Some(Span::new(start, end.max(start)))
    }
}

/// Converts a UTF-16 offset into a byte offset, `None` past the end of `text`.
pub(crate) fn utf16_to_byte_offset(text: &str, utf16: u32) -> Option<u32> {
    let mut units = 0u32;
    for (offset, c) in text.char_indices() {
        if units >= utf16 {
            return Some(offset as u32);
        }
        units += c.len_utf16() as u32;
    }
    (units >= utf16).then_some(text.len() as u32)
}
