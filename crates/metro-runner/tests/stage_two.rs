//! Classification of upstream results.

use metro_runner::{MetroError, StageTwoResult, UpstreamResult};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use source_map::{Position, RawMapping};

fn classify(value: Value) -> Result<StageTwoResult, MetroError> {
    StageTwoResult::from_upstream(serde_json::from_value::<UpstreamResult>(value).unwrap())
}

#[test]
fn test_array_map_is_tuples() {
    let result = classify(json!({
        "code": "var a = 1;",
        "map": [[1, 0, 1, 0], [1, 4, 1, 4, "a"], [2, 0]],
        "dependencies": ["react"]
    }))
    .unwrap();

    let StageTwoResult::Tuples { mappings, fields } = result else {
        panic!("expected tuples");
    };
    assert_eq!(
        mappings,
        vec![
            RawMapping::mapped(Position::new(1, 0), Position::new(1, 0)),
            RawMapping::mapped(Position::new(1, 4), Position::new(1, 4)).with_name("a"),
            RawMapping::generated_only(2, 0),
        ]
    );
    assert_eq!(fields.get("code"), Some(&json!("var a = 1;")));
    assert_eq!(fields.get("dependencies"), Some(&json!(["react"])));
    assert!(!fields.contains_key("map"));
}

#[test]
fn test_object_map_is_structured() {
    let result = classify(json!({
        "code": "var a = 1;",
        "map": { "version": 3, "sources": ["a.js"], "names": [], "mappings": "AAAA" }
    }))
    .unwrap();

    let StageTwoResult::Structured { map, fields } = result else {
        panic!("expected a structured map");
    };
    assert_eq!(map.len(), 1);
    assert_eq!(map.sources(), ["a.js".to_string()]);
    assert_eq!(fields.len(), 1);
}

#[test]
fn test_string_map_is_structured() {
    let result = classify(json!({
        "code": "",
        "map": "{\"version\":3,\"sources\":[],\"names\":[],\"mappings\":\"\"}"
    }))
    .unwrap();
    assert_eq!(result.kind(), "structured");
}

#[test]
fn test_ast_wins_over_map() {
    let result = classify(json!({
        "ast": { "type": "File", "loc": { "start": { "line": 1, "column": 0 } } },
        "map": [[1, 0, 1, 0]],
        "code": null
    }))
    .unwrap();

    let StageTwoResult::Tree { ast, fields } = result else {
        panic!("expected a tree");
    };
    assert_eq!(ast["type"], json!("File"));
    assert!(!fields.contains_key("map"));
    assert!(!fields.contains_key("ast"));
    assert_eq!(fields.get("code"), Some(&Value::Null));
}

#[test]
fn test_null_ast_falls_back_to_map() {
    let result = classify(json!({ "ast": null, "code": "x", "map": [] })).unwrap();
    assert_eq!(result.kind(), "tuples");
}

#[test]
fn test_missing_map_is_empty_tuples() {
    let result = classify(json!({ "code": "x" })).unwrap();
    let StageTwoResult::Tuples { mappings, .. } = result else {
        panic!("expected tuples");
    };
    assert!(mappings.is_empty());
}

#[test]
fn test_bad_tuple_is_rejected() {
    let err = classify(json!({ "code": "x", "map": [[1, 0, 1]] })).unwrap_err();
    assert!(matches!(err, MetroError::InvalidMappings(_)));
}

#[test]
fn test_unexpected_map_type() {
    let err = classify(json!({ "code": "x", "map": 7 })).unwrap_err();
    assert!(matches!(err, MetroError::UnexpectedMap("number")));
}
