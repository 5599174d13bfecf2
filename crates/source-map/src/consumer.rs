//! Position lookup over a decoded source map.

use crate::vlq::decode_mappings;
use crate::{Mapping, OriginalPosition, Position, RawSourceMap, SourceMapError};

/// A decoded segment with 1-based lines and resolved table indices.
#[derive(Debug, Clone, Copy)]
struct Segment {
    generated: Position,
    original: Option<(u32, Position)>,
    name: Option<u32>,
}

/// A queryable view over a source map.
///
/// Answers "which original position produced this generated position?" and
/// enumerates every mapping in generated order.
#[derive(Debug, Clone)]
pub struct SourceMapConsumer {
    file: Option<String>,
    sources: Vec<String>,
    sources_content: Vec<Option<String>>,
    names: Vec<String>,
    /// Sorted by generated position, then source, original position and name.
    segments: Vec<Segment>,
}

impl SourceMapConsumer {
    /// Parses a JSON-encoded source map.
    pub fn from_json(json: &str) -> Result<Self, SourceMapError> {
        Self::from_raw(RawSourceMap::from_json(json)?)
    }

    /// Decodes a parsed source map.
    pub fn from_raw(raw: RawSourceMap) -> Result<Self, SourceMapError> {
        let decoded = decode_mappings(&raw.mappings)?;

        let mut segments = Vec::with_capacity(decoded.len());
        for seg in decoded {
            let original = match seg.source {
                Some(source) => {
                    if source as usize >= raw.sources.len() {
                        return Err(SourceMapError::SourceOutOfRange(source.into()));
                    }
                    Some((
                        source,
                        Position::new(seg.original_line + 1, seg.original_column),
                    ))
                }
                None => None,
            };
            if let Some(name) = seg.name {
                if name as usize >= raw.names.len() {
                    return Err(SourceMapError::NameOutOfRange(name.into()));
                }
            }
            segments.push(Segment {
                generated: Position::new(seg.generated_line + 1, seg.generated_column),
                original,
                name: seg.name,
            });
        }
        // Ties on generated position order by source, original position and name
        segments.sort_by_key(|seg| (seg.generated, seg.original, seg.name));

        let sources: Vec<String> = match raw.source_root.as_deref() {
            Some(root) if !root.is_empty() => raw
                .sources
                .iter()
                .map(|source| format!("{}/{}", root.trim_end_matches('/'), source))
                .collect(),
            _ => raw.sources,
        };

        let mut sources_content = raw.sources_content.unwrap_or_default();
        sources_content.resize(sources.len(), None);

        Ok(Self {
            file: raw.file,
            sources,
            sources_content,
            names: raw.names,
            segments,
        })
    }

    /// Name of the generated file, if the map records one.
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// The original sources referenced by this map.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Returns the embedded content for a source, if present.
    pub fn source_content(&self, source: &str) -> Option<&str> {
        let index = self.sources.iter().position(|s| s == source)?;
        self.sources_content.get(index)?.as_deref()
    }

    /// Returns the number of decoded mappings.
    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true if the map has no mappings at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Iterates every mapping in ascending generated order.
    pub fn mappings(&self) -> impl Iterator<Item = Mapping<'_>> + '_ {
        self.segments.iter().map(move |seg| self.resolve(seg))
    }

    /// Finds the original position for a generated position.
    ///
    /// Uses the closest mapping at or before `generated` on the same line.
    /// Returns `None` when the line has no such mapping or when that mapping
    /// carries no original position.
    pub fn original_position_for(&self, generated: Position) -> Option<OriginalPosition> {
        let mut idx = self
            .segments
            .partition_point(|seg| seg.generated <= generated)
            .checked_sub(1)?;

        let found = self.segments[idx].generated;
        if found.line != generated.line {
            return None;
        }
        // First of several segments at the same position wins
        while idx > 0 && self.segments[idx - 1].generated == found {
            idx -= 1;
        }

        let mapping = self.resolve(&self.segments[idx]);
        let (source, position) = mapping.original?;
        Some(OriginalPosition {
            source: source.to_string(),
            line: position.line,
            column: position.column,
            name: mapping.name.map(str::to_string),
        })
    }

    fn resolve<'a>(&'a self, seg: &Segment) -> Mapping<'a> {
        Mapping {
            generated: seg.generated,
            original: seg
                .original
                .map(|(source, position)| (self.sources[source as usize].as_str(), position)),
            name: seg.name.map(|name| self.names[name as usize].as_str()),
        }
    }
}
