//! Upstream transformer inputs and results.

use crate::MetroError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use source_map::{RawMapping, RawSourceMap, SourceMapConsumer};

/// Arguments for one upstream transform.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct UpstreamInput<'a> {
    pub src: &'a str,
    pub filename: &'a str,
    pub options: &'a Value,
}

/// The upstream transformer's result, exactly as it was returned.
///
/// Only `code`, `map` and `ast` have meaning here; every other field belongs
/// to the caller and is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpstreamResult(pub Map<String, Value>);

impl UpstreamResult {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The generated code, if the transformer returned text.
    pub fn code(&self) -> Option<&str> {
        self.0.get("code").and_then(Value::as_str)
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for UpstreamResult {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// An upstream result sorted by how it carries position information.
///
/// `fields` holds everything else the transformer returned, `code` included.
#[derive(Debug, Clone)]
pub enum StageTwoResult {
    /// `map` is an ordered sequence of mapping tuples.
    Tuples {
        mappings: Vec<RawMapping>,
        fields: Map<String, Value>,
    },
    /// `map` is an encoded v3 source map.
    Structured {
        map: SourceMapConsumer,
        fields: Map<String, Value>,
    },
    /// The transformer returned a syntax tree whose nodes carry positions.
    Tree {
        ast: Value,
        fields: Map<String, Value>,
    },
}

impl StageTwoResult {
    /// Classifies an upstream result.
    ///
    /// A non-null `ast` wins over any `map`. Otherwise an array `map` is a
    /// tuple stream, an object or JSON string is a structured map, and a
    /// missing or null `map` is an empty tuple stream.
    pub fn from_upstream(result: UpstreamResult) -> Result<Self, MetroError> {
        let mut fields = result.into_fields();
        let map = fields.remove("map");

        match fields.remove("ast") {
            Some(Value::Null) | None => {}
            Some(ast) => return Ok(StageTwoResult::Tree { ast, fields }),
        }

        match map {
            None | Some(Value::Null) => Ok(StageTwoResult::Tuples {
                mappings: Vec::new(),
                fields,
            }),
            Some(value @ Value::Array(_)) => {
                let mappings =
                    serde_json::from_value(value).map_err(MetroError::InvalidMappings)?;
                Ok(StageTwoResult::Tuples { mappings, fields })
            }
            Some(value @ Value::Object(_)) => {
                let map = SourceMapConsumer::from_raw(RawSourceMap::from_value(value)?)?;
                Ok(StageTwoResult::Structured { map, fields })
            }
            Some(Value::String(json)) => {
                let map = SourceMapConsumer::from_json(&json)?;
                Ok(StageTwoResult::Structured { map, fields })
            }
            Some(Value::Bool(_)) => Err(MetroError::UnexpectedMap("boolean")),
            Some(Value::Number(_)) => Err(MetroError::UnexpectedMap("number")),
        }
    }

    /// The fields carried through to the caller.
    pub fn fields(&self) -> &Map<String, Value> {
        match self {
            StageTwoResult::Tuples { fields, .. }
            | StageTwoResult::Structured { fields, .. }
            | StageTwoResult::Tree { fields, .. } => fields,
        }
    }

    /// A short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            StageTwoResult::Tuples { .. } => "tuples",
            StageTwoResult::Structured { .. } => "structured",
            StageTwoResult::Tree { .. } => "tree",
        }
    }
}
