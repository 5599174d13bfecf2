//! The v3 source map JSON document.

use crate::SourceMapError;
use serde::{Deserialize, Serialize};

/// A v3 source map as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSourceMap {
    /// Always `3`.
    pub version: u32,
    /// Name of the generated file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Prefix for every entry of `sources`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    /// Original source names.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Embedded source text, parallel to `sources`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<Option<String>>>,
    /// Symbol names referenced by segments.
    #[serde(default)]
    pub names: Vec<String>,
    /// Base64 VLQ encoded segments.
    pub mappings: String,
}

impl RawSourceMap {
    /// Parses a JSON-encoded source map.
    pub fn from_json(json: &str) -> Result<Self, SourceMapError> {
        let raw: RawSourceMap = serde_json::from_str(json)?;
        raw.validated()
    }

    /// Converts an already-parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, SourceMapError> {
        let raw: RawSourceMap = serde_json::from_value(value)?;
        raw.validated()
    }

    /// Serializes to compact JSON.
    pub fn to_json(&self) -> Result<String, SourceMapError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Returns the embedded content for a source, if present.
    pub fn source_content(&self, source: &str) -> Option<&str> {
        let index = self.sources.iter().position(|s| s == source)?;
        self.sources_content
            .as_ref()?
            .get(index)?
            .as_deref()
    }

    fn validated(self) -> Result<Self, SourceMapError> {
        if self.version != 3 {
            return Err(SourceMapError::UnsupportedVersion(self.version));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_typescript_map() {
        let raw = RawSourceMap::from_json(
            r#"{"version":3,"file":"blah.js","sourceRoot":"","sources":["blah.tsx"],"names":[],"mappings":"AAAA","sourcesContent":["let a = 1"]}"#,
        )
        .unwrap();
        assert_eq!(raw.sources, vec!["blah.tsx"]);
        assert_eq!(raw.source_content("blah.tsx"), Some("let a = 1"));
        assert_eq!(raw.source_content("other.tsx"), None);
    }

    #[test]
    fn test_unknown_fields_are_tolerated() {
        let raw =
            RawSourceMap::from_json(r#"{"version":3,"sources":[],"names":[],"mappings":"","x_google_ignoreList":[0]}"#)
                .unwrap();
        assert!(raw.mappings.is_empty());
    }

    #[test]
    fn test_rejects_other_versions() {
        assert!(matches!(
            RawSourceMap::from_json(r#"{"version":2,"mappings":""}"#),
            Err(SourceMapError::UnsupportedVersion(2))
        ));
    }
}
