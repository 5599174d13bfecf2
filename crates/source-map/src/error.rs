//! Source map errors.

use thiserror::Error;

/// An error raised while reading or decoding a source map.
#[derive(Debug, Error)]
pub enum SourceMapError {
    /// The document is not valid source map JSON.
    #[error("invalid source map JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Only version 3 source maps are understood.
    #[error("unsupported source map version: {0}")]
    UnsupportedVersion(u32),

    /// The `mappings` string contains a malformed VLQ segment.
    #[error("invalid VLQ mapping data at byte {offset}: {reason}")]
    InvalidVlq {
        /// Byte offset into the `mappings` string.
        offset: usize,
        /// What went wrong.
        reason: &'static str,
    },

    /// A segment references a source that is not listed in `sources`.
    #[error("mapping references unknown source index {0}")]
    SourceOutOfRange(i64),

    /// A segment references a name that is not listed in `names`.
    #[error("mapping references unknown name index {0}")]
    NameOutOfRange(i64),
}
