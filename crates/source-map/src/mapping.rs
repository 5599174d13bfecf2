//! Mapping entries in source-map coordinates.

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A position in source-map coordinates: 1-based line, 0-based column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    #[inline]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Where a generated position came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalPosition {
    /// The source file, as listed in the map's `sources`.
    pub source: String,
    /// 1-based line.
    pub line: u32,
    /// 0-based column.
    pub column: u32,
    /// Symbol name attached to the segment, if any.
    pub name: Option<String>,
}

impl OriginalPosition {
    #[inline]
    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

/// A single decoded mapping entry, borrowing from its consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping<'a> {
    /// Position in the generated output.
    pub generated: Position,
    /// Source and position in the original, if the segment has one.
    pub original: Option<(&'a str, Position)>,
    /// Symbol name, if the segment has one.
    pub name: Option<&'a str>,
}

/// One entry of a tuple-stream mapping.
///
/// On the wire this is a JSON array of two, four or five elements:
/// `[genLine, genCol]`, `[genLine, genCol, origLine, origCol]` or
/// `[genLine, genCol, origLine, origCol, name]`. An original line of `0` or an
/// absent one means the generated position is not traceable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMapping {
    pub generated: Position,
    pub original: Option<Position>,
    pub name: Option<String>,
}

impl RawMapping {
    /// A generated position with no original.
    pub fn generated_only(line: u32, column: u32) -> Self {
        Self {
            generated: Position::new(line, column),
            original: None,
            name: None,
        }
    }

    /// A generated position mapped to an original one.
    pub fn mapped(generated: Position, original: Position) -> Self {
        Self {
            generated,
            original: Some(original),
            name: None,
        }
    }

    /// Attaches a symbol name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The original position, unless it is absent or on line `0`.
    #[inline]
    pub fn traceable_original(&self) -> Option<Position> {
        self.original.filter(|original| original.line != 0)
    }
}

impl Serialize for RawMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = match (&self.original, &self.name) {
            (None, _) => 2,
            (Some(_), None) => 4,
            (Some(_), Some(_)) => 5,
        };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.generated.line)?;
        seq.serialize_element(&self.generated.column)?;
        if let Some(original) = &self.original {
            seq.serialize_element(&original.line)?;
            seq.serialize_element(&original.column)?;
            if let Some(name) = &self.name {
                seq.serialize_element(name)?;
            }
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for RawMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RawMappingVisitor;

        impl<'de> Visitor<'de> for RawMappingVisitor {
            type Value = RawMapping;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping tuple of 2, 4 or 5 elements")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<RawMapping, A::Error> {
                let line: u32 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let column: u32 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;

                // Original line may be null when the producer padded the tuple.
                let original_line: Option<Option<u32>> = seq.next_element()?;
                let original = match original_line {
                    None => None,
                    Some(original_line) => {
                        let original_column: Option<u32> = seq
                            .next_element()?
                            .ok_or_else(|| de::Error::invalid_length(3, &self))?;
                        match (original_line, original_column) {
                            (Some(line), Some(column)) => Some(Position::new(line, column)),
                            _ => None,
                        }
                    }
                };
                let name: Option<Option<String>> = seq.next_element()?;

                if seq.next_element::<de::IgnoredAny>()?.is_some() {
                    return Err(de::Error::invalid_length(6, &self));
                }

                Ok(RawMapping {
                    generated: Position::new(line, column),
                    original,
                    name: name.flatten(),
                })
            }
        }

        deserializer.deserialize_seq(RawMappingVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_deserialize_tuple_shapes() {
        let tuples: Vec<RawMapping> =
            serde_json::from_value(json!([[1, 0], [1, 4, 2, 6], [2, 0, 3, 1, "cheese"]])).unwrap();

        assert_eq!(tuples[0], RawMapping::generated_only(1, 0));
        assert_eq!(
            tuples[1],
            RawMapping::mapped(Position::new(1, 4), Position::new(2, 6))
        );
        assert_eq!(tuples[2].name.as_deref(), Some("cheese"));
    }

    #[test]
    fn test_null_original_line_is_untraceable() {
        let tuple: RawMapping = serde_json::from_value(json!([3, 2, null, null])).unwrap();
        assert_eq!(tuple.traceable_original(), None);
    }

    #[test]
    fn test_line_zero_is_untraceable() {
        let tuple = RawMapping::mapped(Position::new(1, 0), Position::new(0, 5));
        assert_eq!(tuple.traceable_original(), None);
    }

    #[test]
    fn test_serialize_omits_absent_fields() {
        let plain = RawMapping::mapped(Position::new(1, 2), Position::new(3, 4));
        let named = plain.clone().with_name("x");
        assert_eq!(serde_json::to_value(&plain).unwrap(), json!([1, 2, 3, 4]));
        assert_eq!(serde_json::to_value(&named).unwrap(), json!([1, 2, 3, 4, "x"]));
        assert_eq!(
            serde_json::to_value(RawMapping::generated_only(7, 1)).unwrap(),
            json!([7, 1])
        );
    }

    #[test]
    fn test_rejects_three_element_tuple() {
        assert!(serde_json::from_value::<RawMapping>(json!([1, 2, 3])).is_err());
    }
}
