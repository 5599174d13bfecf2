//! The result handed back to the caller.

use crate::compose::{Composed, FinalMapping};
use metro_runner::UpstreamResult;
use serde::Serialize;
use serde_json::{Map, Value};

/// A finished transform.
///
/// Serializes as the downstream result with `map` (or `ast`) replaced. Every
/// other downstream field is kept as it was returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<FinalMapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ast: Option<Value>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl TransformResult {
    /// Wraps a downstream result that needs no composition.
    pub fn from_upstream(result: UpstreamResult) -> Self {
        Self {
            map: None,
            ast: None,
            fields: result.into_fields(),
        }
    }

    /// The generated code, if the downstream stage produced text.
    pub fn code(&self) -> Option<&str> {
        self.fields.get("code").and_then(Value::as_str)
    }

    /// The result as a single JSON object.
    pub fn into_value(self) -> Result<Value, serde_json::Error> {
        let mut object = self.fields;
        if let Some(map) = self.map {
            object.insert("map".to_string(), serde_json::to_value(map)?);
        }
        if let Some(ast) = self.ast {
            object.insert("ast".to_string(), ast);
        }
        Ok(Value::Object(object))
    }
}

/// Merges composer output into the downstream fields.
///
/// Tree results carry no separate map.
pub fn assemble(composed: Composed) -> TransformResult {
    match composed {
        Composed::Mapping { map, fields } => TransformResult {
            map: Some(map),
            ast: None,
            fields,
        },
        Composed::Tree { ast, fields } => TransformResult {
            map: None,
            ast: Some(ast),
            fields,
        },
    }
}
