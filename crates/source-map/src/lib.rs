//! Source positions and v3 source maps for ts-transformer.
//!
//! This crate provides the mapping model shared by every stage of the
//! pipeline: byte offsets and line indexes for diagnostics, the Base64 VLQ
//! codec, the v3 JSON document, tuple-stream entries, a position consumer and
//! a generator.

mod consumer;
mod error;
mod generator;
mod line_index;
mod mapping;
mod raw;
mod span;
pub mod vlq;

pub use consumer::SourceMapConsumer;
pub use error::SourceMapError;
pub use generator::SourceMapGenerator;
pub use line_index::{LineCol, LineIndex};
pub use mapping::{Mapping, OriginalPosition, Position, RawMapping};
pub use raw::RawSourceMap;
pub use span::{ByteOffset, Span};
