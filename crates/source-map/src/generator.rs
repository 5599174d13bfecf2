//! Source map generator for building maps entry by entry.

use crate::vlq;
use crate::{Position, RawSourceMap, SourceMapError};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct PendingMapping {
    generated: Position,
    original: Option<(u32, Position)>,
    name: Option<u32>,
}

/// Builds a v3 source map one mapping at a time.
///
/// Sources and names are interned in first-use order. Mappings may be added
/// in any order; they are sorted by generated position when serialized.
#[derive(Debug, Default)]
pub struct SourceMapGenerator {
    file: Option<String>,
    sources: Vec<String>,
    source_indices: HashMap<String, u32>,
    sources_content: Vec<Option<String>>,
    names: Vec<String>,
    name_indices: HashMap<String, u32>,
    mappings: Vec<PendingMapping>,
}

impl SourceMapGenerator {
    /// Creates an empty generator for the given output file.
    pub fn new(file: Option<String>) -> Self {
        Self {
            file,
            ..Self::default()
        }
    }

    /// Builds an identity map for `text`: every run of non-whitespace
    /// characters maps to itself in `source`.
    ///
    /// Columns count UTF-16 code units.
    pub fn identity(source: &str, text: &str) -> Self {
        let mut generator = Self::new(None);

        let mut line = 1u32;
        let mut column = 0u32;
        let mut in_token = false;
        for c in text.chars() {
            if c == '\n' {
                line += 1;
                column = 0;
                in_token = false;
                continue;
            }
            if c.is_whitespace() {
                in_token = false;
            } else if !in_token {
                let position = Position::new(line, column);
                generator.add_mapping(position, Some((source, position)), None);
                in_token = true;
            }
            column += c.len_utf16() as u32;
        }

        generator.set_source_content(source, text);
        generator
    }

    /// Returns the number of mappings added so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Returns true if no mappings have been added.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Adds a mapping. A name is only recorded alongside an original position.
    pub fn add_mapping(
        &mut self,
        generated: Position,
        original: Option<(&str, Position)>,
        name: Option<&str>,
    ) {
        let original = original.map(|(source, position)| (self.intern_source(source), position));
        let name = match (original, name) {
            (Some(_), Some(name)) => Some(self.intern_name(name)),
            _ => None,
        };
        self.mappings.push(PendingMapping {
            generated,
            original,
            name,
        });
    }

    /// Embeds the full text of `source` in the map.
    pub fn set_source_content(&mut self, source: &str, content: &str) {
        let index = self.intern_source(source) as usize;
        self.sources_content[index] = Some(content.to_string());
    }

    /// Produces the v3 document.
    pub fn to_raw(&self) -> RawSourceMap {
        let mut ordered = self.mappings.clone();
        ordered.sort_by_key(|m| m.generated);

        let sources_content = if self.sources_content.iter().any(Option::is_some) {
            Some(self.sources_content.clone())
        } else {
            None
        };

        RawSourceMap {
            version: 3,
            file: self.file.clone(),
            source_root: None,
            sources: self.sources.clone(),
            sources_content,
            names: self.names.clone(),
            mappings: encode_mappings(&ordered),
        }
    }

    /// Produces the v3 document as compact JSON.
    pub fn to_json(&self) -> Result<String, SourceMapError> {
        self.to_raw().to_json()
    }

    fn intern_source(&mut self, source: &str) -> u32 {
        if let Some(&index) = self.source_indices.get(source) {
            return index;
        }
        let index = self.sources.len() as u32;
        self.sources.push(source.to_string());
        self.sources_content.push(None);
        self.source_indices.insert(source.to_string(), index);
        index
    }

    fn intern_name(&mut self, name: &str) -> u32 {
        if let Some(&index) = self.name_indices.get(name) {
            return index;
        }
        let index = self.names.len() as u32;
        self.names.push(name.to_string());
        self.name_indices.insert(name.to_string(), index);
        index
    }
}

fn encode_mappings(mappings: &[PendingMapping]) -> String {
    let mut out = String::new();
    let mut line = 1u32;
    let mut prev_column = 0i64;
    let mut prev_source = 0i64;
    let mut prev_original_line = 0i64;
    let mut prev_original_column = 0i64;
    let mut prev_name = 0i64;
    let mut first_on_line = true;

    for mapping in mappings {
        while line < mapping.generated.line {
            out.push(';');
            line += 1;
            prev_column = 0;
            first_on_line = true;
        }
        if !first_on_line {
            out.push(',');
        }
        first_on_line = false;

        let column = i64::from(mapping.generated.column);
        vlq::encode(column - prev_column, &mut out);
        prev_column = column;

        if let Some((source, original)) = mapping.original {
            let source = i64::from(source);
            // Encoded lines are 0-based
            let original_line = i64::from(original.line.saturating_sub(1));
            let original_column = i64::from(original.column);

            vlq::encode(source - prev_source, &mut out);
            vlq::encode(original_line - prev_original_line, &mut out);
            vlq::encode(original_column - prev_original_column, &mut out);
            prev_source = source;
            prev_original_line = original_line;
            prev_original_column = original_column;

            if let Some(name) = mapping.name {
                let name = i64::from(name);
                vlq::encode(name - prev_name, &mut out);
                prev_name = name;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceMapConsumer;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_generator() {
        let generator = SourceMapGenerator::new(Some("out.js".into()));
        let raw = generator.to_raw();
        assert!(generator.is_empty());
        assert_eq!(raw.mappings, "");
        assert_eq!(raw.sources_content, None);
    }

    #[test]
    fn test_encodes_known_mappings() {
        let mut generator = SourceMapGenerator::new(None);
        generator.add_mapping(Position::new(1, 0), Some(("in.ts", Position::new(1, 0))), None);
        generator.add_mapping(Position::new(1, 4), Some(("in.ts", Position::new(1, 4))), None);
        generator.add_mapping(Position::new(3, 2), Some(("in.ts", Position::new(2, 0))), None);
        assert_eq!(generator.to_raw().mappings, "AAAA,IAAI;;EACJ");
    }

    #[test]
    fn test_sorts_out_of_order_mappings() {
        let mut generator = SourceMapGenerator::new(None);
        generator.add_mapping(Position::new(2, 0), Some(("a.ts", Position::new(2, 0))), None);
        generator.add_mapping(Position::new(1, 0), Some(("a.ts", Position::new(1, 0))), None);
        assert_eq!(generator.to_raw().mappings, "AAAA;AACA");
    }

    #[test]
    fn test_name_requires_original() {
        let mut generator = SourceMapGenerator::new(None);
        generator.add_mapping(Position::new(1, 0), None, Some("ignored"));
        generator.add_mapping(Position::new(1, 2), Some(("a.ts", Position::new(1, 0))), Some("x"));
        let raw = generator.to_raw();
        assert_eq!(raw.names, vec!["x"]);
        assert_eq!(raw.mappings, "A,EAAAA");
    }

    #[test]
    fn test_source_content_is_embedded() {
        let mut generator = SourceMapGenerator::new(None);
        generator.set_source_content("a.ts", "let a: number = 1;");
        let raw = generator.to_raw();
        assert_eq!(raw.sources, vec!["a.ts"]);
        assert_eq!(raw.source_content("a.ts"), Some("let a: number = 1;"));
    }

    #[test]
    fn test_round_trips_through_consumer() {
        let mut generator = SourceMapGenerator::new(None);
        generator.add_mapping(Position::new(2, 6), Some(("a.ts", Position::new(5, 3))), Some("foo"));
        let consumer = SourceMapConsumer::from_raw(generator.to_raw()).unwrap();
        let original = consumer.original_position_for(Position::new(2, 8)).unwrap();
        assert_eq!(original.position(), Position::new(5, 3));
        assert_eq!(original.name.as_deref(), Some("foo"));
    }

    #[test]
    fn test_identity_maps_token_starts() {
        let text = "const a = 1;\n  a;\n";
        let consumer = SourceMapConsumer::from_raw(
            SourceMapGenerator::identity("a.js", text).to_raw(),
        )
        .unwrap();
        let tokens: Vec<Position> = consumer.mappings().map(|m| m.generated).collect();
        assert_eq!(
            tokens,
            vec![
                Position::new(1, 0),
                Position::new(1, 6),
                Position::new(1, 8),
                Position::new(1, 10),
                Position::new(2, 2),
            ]
        );
        assert!(consumer
            .mappings()
            .all(|m| m.original.map(|(_, p)| p) == Some(m.generated)));
    }

    #[test]
    fn test_identity_columns_count_utf16_units() {
        // 'é' is one unit, '😀' is two
        let text = "é 😀 x\n😀y z";
        let consumer = SourceMapConsumer::from_raw(
            SourceMapGenerator::identity("a.js", text).to_raw(),
        )
        .unwrap();
        let tokens: Vec<Position> = consumer.mappings().map(|m| m.generated).collect();
        assert_eq!(
            tokens,
            vec![
                Position::new(1, 0),
                Position::new(1, 2),
                Position::new(1, 5),
                Position::new(2, 0),
                Position::new(2, 4),
            ]
        );
    }
}
