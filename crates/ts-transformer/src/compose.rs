//! Composition of the compiler's map with the downstream transformer's.
//!
//! Each algorithm answers, for every downstream position, "where in the typed
//! source did this come from" by chaining two lookups. Positions that either
//! map cannot resolve are dropped; composition never fails.

use metro_runner::StageTwoResult;
use serde::Serialize;
use serde_json::{Map, Value};
use source_map::{Position, RawMapping, RawSourceMap, SourceMapConsumer, SourceMapGenerator};

/// The composed map, in the representation the downstream stage used.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FinalMapping {
    Raw(Vec<RawMapping>),
    Structured(RawSourceMap),
}

/// Composer output, ready for assembly.
#[derive(Debug, Clone)]
pub enum Composed {
    /// A separate final map alongside the downstream fields.
    Mapping {
        map: FinalMapping,
        fields: Map<String, Value>,
    },
    /// A tree whose locations now point into the typed source.
    Tree {
        ast: Value,
        fields: Map<String, Value>,
    },
}

/// Composes `stage1` with whatever the downstream stage returned.
///
/// `file_name` and `original_text` only matter for structured maps, where the
/// typed source is embedded so the result is self-contained.
pub fn compose(
    stage1: &SourceMapConsumer,
    stage2: StageTwoResult,
    file_name: &str,
    original_text: &str,
) -> Composed {
    match stage2 {
        StageTwoResult::Tuples { mappings, fields } => Composed::Mapping {
            map: FinalMapping::Raw(compose_raw(stage1, &mappings)),
            fields,
        },
        StageTwoResult::Structured { map, fields } => Composed::Mapping {
            map: FinalMapping::Structured(compose_structured(
                stage1,
                &map,
                file_name,
                original_text,
            )),
            fields,
        },
        StageTwoResult::Tree { mut ast, fields } => {
            rewrite_locations(stage1, &mut ast);
            Composed::Tree { ast, fields }
        }
    }
}

/// Composes a tuple stream. Output order follows input order.
pub fn compose_raw(stage1: &SourceMapConsumer, tuples: &[RawMapping]) -> Vec<RawMapping> {
    let mut composed = Vec::with_capacity(tuples.len());
    for tuple in tuples {
        let Some(intermediate) = tuple.traceable_original() else {
            continue;
        };
        let Some(original) = stage1.original_position_for(intermediate) else {
            continue;
        };
        composed.push(RawMapping {
            generated: tuple.generated,
            original: Some(original.position()),
            name: tuple.name.clone(),
        });
    }

    tracing::debug!(
        input = tuples.len(),
        output = composed.len(),
        dropped = tuples.len() - composed.len(),
        "composed tuple mappings"
    );
    composed
}

/// Composes a structured map into a fresh map attributed to `file_name`.
pub fn compose_structured(
    stage1: &SourceMapConsumer,
    stage2: &SourceMapConsumer,
    file_name: &str,
    original_text: &str,
) -> RawSourceMap {
    let mut generator = SourceMapGenerator::new(None);
    generator.set_source_content(file_name, original_text);

    for mapping in stage2.mappings() {
        let Some((_, intermediate)) = mapping.original else {
            continue;
        };
        if intermediate.line == 0 {
            continue;
        }
        let Some(original) = stage1.original_position_for(intermediate) else {
            continue;
        };
        generator.add_mapping(
            mapping.generated,
            Some((file_name, original.position())),
            mapping.name,
        );
    }

    tracing::debug!(
        input = stage2.len(),
        output = generator.len(),
        dropped = stage2.len() - generator.len(),
        "composed structured mappings"
    );
    generator.to_raw()
}

/// Attribute names that carry a node's location.
const LOCATION_KEYS: &[&str] = &["loc", "location"];

/// Rewrites every node location in `tree` from intermediate to original
/// coordinates, in place.
///
/// `start` and `end` are resolved independently; a position the compiler's
/// map cannot resolve keeps its downstream value. Nodes are never added or
/// removed. Returns how many positions were rewritten.
pub fn rewrite_locations(stage1: &SourceMapConsumer, tree: &mut Value) -> usize {
    let mut rewritten = 0;
    let mut unresolved = 0;
    let mut stack = vec![tree];

    while let Some(node) = stack.pop() {
        match node {
            Value::Object(fields) => {
                for key in LOCATION_KEYS {
                    let Some(Value::Object(location)) = fields.get_mut(*key) else {
                        continue;
                    };
                    for edge in ["start", "end"] {
                        let Some(Value::Object(point)) = location.get_mut(edge) else {
                            continue;
                        };
                        match rewrite_point(stage1, point) {
                            Some(true) => rewritten += 1,
                            Some(false) => unresolved += 1,
                            None => {}
                        }
                    }
                }
                stack.extend(fields.values_mut());
            }
            Value::Array(items) => stack.extend(items.iter_mut()),
            _ => {}
        }
    }

    tracing::debug!(rewritten, unresolved, "rewrote tree locations");
    rewritten
}

/// Returns `None` when `point` is not a `{line, column}` pair, otherwise
/// whether it was resolved.
fn rewrite_point(stage1: &SourceMapConsumer, point: &mut Map<String, Value>) -> Option<bool> {
    let line = u32::try_from(point.get("line")?.as_u64()?).ok()?;
    let column = u32::try_from(point.get("column")?.as_u64()?).ok()?;

    let Some(original) = stage1.original_position_for(Position::new(line, column)) else {
        return Some(false);
    };
    point.insert("line".to_string(), original.line.into());
    point.insert("column".to_string(), original.column.into());
    Some(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// Line 1 of the intermediate code maps to line 3 of the typed source;
    /// line 2 has no mapping at all.
    fn stage1() -> SourceMapConsumer {
        let mut generator = SourceMapGenerator::new(None);
        generator.add_mapping(
            Position::new(1, 0),
            Some(("a.ts", Position::new(3, 2))),
            None,
        );
        generator.add_mapping(
            Position::new(1, 6),
            Some(("a.ts", Position::new(3, 10))),
            None,
        );
        SourceMapConsumer::from_raw(generator.to_raw()).unwrap()
    }

    #[test]
    fn test_compose_raw_chains_lookups() {
        let tuples = vec![
            RawMapping::mapped(Position::new(1, 0), Position::new(1, 0)),
            RawMapping::mapped(Position::new(1, 8), Position::new(1, 7)).with_name("a"),
        ];
        assert_eq!(
            compose_raw(&stage1(), &tuples),
            vec![
                RawMapping::mapped(Position::new(1, 0), Position::new(3, 2)),
                RawMapping::mapped(Position::new(1, 8), Position::new(3, 10)).with_name("a"),
            ]
        );
    }

    #[test]
    fn test_compose_raw_drops_untraceable() {
        let tuples = vec![
            RawMapping::generated_only(1, 0),
            RawMapping::mapped(Position::new(1, 2), Position::new(0, 4)),
            RawMapping::mapped(Position::new(1, 4), Position::new(2, 0)),
            RawMapping::mapped(Position::new(2, 0), Position::new(1, 3)),
        ];
        assert_eq!(
            compose_raw(&stage1(), &tuples),
            vec![RawMapping::mapped(Position::new(2, 0), Position::new(3, 2))]
        );
    }

    #[test]
    fn test_compose_structured_attributes_file_name() {
        let mut downstream = SourceMapGenerator::new(Some("a.js".into()));
        downstream.add_mapping(Position::new(1, 0), Some(("a.js", Position::new(1, 0))), Some("a"));
        downstream.add_mapping(Position::new(1, 5), None, None);
        downstream.add_mapping(Position::new(2, 0), Some(("a.js", Position::new(2, 0))), None);
        let downstream = SourceMapConsumer::from_raw(downstream.to_raw()).unwrap();

        let raw = compose_structured(&stage1(), &downstream, "src/a.ts", "typed text");
        assert_eq!(raw.file, None);
        assert_eq!(raw.sources, vec!["src/a.ts".to_string()]);
        assert_eq!(raw.source_content("src/a.ts"), Some("typed text"));
        assert_eq!(raw.names, vec!["a".to_string()]);

        let composed = SourceMapConsumer::from_raw(raw).unwrap();
        assert_eq!(composed.len(), 1);
        let original = composed.original_position_for(Position::new(1, 0)).unwrap();
        assert_eq!(original.source, "src/a.ts");
        assert_eq!(original.position(), Position::new(3, 2));
        assert_eq!(original.name.as_deref(), Some("a"));
    }

    #[test]
    fn test_compose_structured_without_mappings_keeps_content() {
        let downstream = SourceMapConsumer::from_raw(SourceMapGenerator::new(None).to_raw()).unwrap();
        let raw = compose_structured(&stage1(), &downstream, "a.ts", "let a = 1");
        assert_eq!(raw.mappings, "");
        assert_eq!(raw.source_content("a.ts"), Some("let a = 1"));
    }

    #[test]
    fn test_rewrite_locations() {
        let mut tree = json!({
            "type": "File",
            "program": {
                "type": "Program",
                "body": [{
                    "type": "VariableDeclaration",
                    "loc": {
                        "start": { "line": 1, "column": 0 },
                        "end": { "line": 2, "column": 3 }
                    },
                    "declarations": [{
                        "type": "VariableDeclarator",
                        "location": {
                            "start": { "line": 1, "column": 7 },
                            "end": { "line": 1, "column": 9, "index": 9 }
                        }
                    }]
                }]
            }
        });

        let rewritten = rewrite_locations(&stage1(), &mut tree);
        assert_eq!(rewritten, 3);

        let declaration = &tree["program"]["body"][0];
        assert_eq!(declaration["loc"]["start"], json!({ "line": 3, "column": 2 }));
        // Unresolved positions keep their downstream value
        assert_eq!(declaration["loc"]["end"], json!({ "line": 2, "column": 3 }));
        assert_eq!(
            declaration["declarations"][0]["location"],
            json!({
                "start": { "line": 3, "column": 10 },
                "end": { "line": 3, "column": 10, "index": 9 }
            })
        );
    }

    #[test]
    fn test_rewrite_ignores_malformed_locations() {
        let mut tree = json!({
            "loc": { "start": { "line": -1, "column": 0 }, "end": null },
            "location": "somewhere"
        });
        let before = tree.clone();
        assert_eq!(rewrite_locations(&stage1(), &mut tree), 0);
        assert_eq!(tree, before);
    }
}
