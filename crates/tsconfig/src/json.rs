//! Comment-tolerant JSON reading.

use crate::ConfigError;
use camino::Utf8Path;
use serde_json::{Map, Value};
use std::fs;

/// Reads a tsconfig-style document: JSON with comments and trailing commas.
pub(crate) fn read_document(path: &Utf8Path) -> Result<Map<String, Value>, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound(path.to_owned()));
    }

    let content = fs::read_to_string(path).map_err(|e| ConfigError::Parse {
        path: path.to_owned(),
        message: e.to_string(),
    })?;

    parse_document(&content).map_err(|message| ConfigError::Parse {
        path: path.to_owned(),
        message,
    })
}

/// Parses document text into its top-level object.
pub(crate) fn parse_document(content: &str) -> Result<Map<String, Value>, String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let cleaned = remove_trailing_commas(&remove_json_comments(content));

    match serde_json::from_str(&cleaned).map_err(|e| e.to_string())? {
        Value::Object(map) => Ok(map),
        other => Err(format!("expected an object, found {}", type_name(&other))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Removes single-line and multi-line comments from JSON.
fn remove_json_comments(json: &str) -> String {
    let mut result = String::with_capacity(json.len());
    let mut chars = json.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            result.push(c);
            if c == '"' {
                in_string = false;
            } else if c == '\\' {
                if let Some(next) = chars.next() {
                    result.push(next);
                }
            }
        } else if c == '"' {
            result.push(c);
            in_string = true;
        } else if c == '/' {
            match chars.peek() {
                Some('/') => {
                    chars.next();
                    while let Some(&next) = chars.peek() {
                        if next == '\n' {
                            break;
                        }
                        chars.next();
                    }
                }
                Some('*') => {
                    chars.next();
                    while let Some(next) = chars.next() {
                        if next == '*' && chars.peek() == Some(&'/') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {
                    result.push(c);
                }
            }
        } else {
            result.push(c);
        }
    }

    result
}

/// Drops commas that directly precede `}` or `]` (ignoring whitespace).
fn remove_trailing_commas(json: &str) -> String {
    let mut result = String::with_capacity(json.len());
    let mut pending_comma: Option<String> = None;
    let mut in_string = false;
    let mut escaped = false;

    for c in json.chars() {
        if in_string {
            result.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        if c.is_whitespace() {
            if let Some(buffer) = pending_comma.as_mut() {
                buffer.push(c);
                continue;
            }
        }
        if let Some(buffer) = pending_comma.take() {
            if c == '}' || c == ']' {
                // Keep the whitespace, drop the comma
                result.push_str(&buffer[1..]);
            } else {
                result.push_str(&buffer);
            }
        }

        match c {
            ',' => pending_comma = Some(String::from(",")),
            '"' => {
                in_string = true;
                result.push(c);
            }
            _ => result.push(c),
        }
    }

    if let Some(buffer) = pending_comma {
        result.push_str(&buffer);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_remove_comments() {
        let json = r#"{
            // This is a comment
            "key": "value" /* inline comment */
        }"#;

        let cleaned = remove_json_comments(json);
        assert!(!cleaned.contains("//"));
        assert!(!cleaned.contains("/*"));
        assert!(cleaned.contains("\"key\""));
    }

    #[test]
    fn test_comment_markers_inside_strings_survive() {
        let doc = parse_document(r#"{ "extends": "./base//config.json" }"#).unwrap();
        assert_eq!(doc["extends"], json!("./base//config.json"));
    }

    #[test]
    fn test_trailing_commas() {
        let doc = parse_document(
            r#"{
                "compilerOptions": {
                    "jsx": "react",
                    "lib": ["es2017", "dom",],
                },
            }"#,
        )
        .unwrap();
        assert_eq!(doc["compilerOptions"]["lib"], json!(["es2017", "dom"]));
    }

    #[test]
    fn test_commas_inside_strings_are_kept() {
        let doc = parse_document(r#"{ "a": "x,}", "b": 1 }"#).unwrap();
        assert_eq!(doc["a"], json!("x,}"));
    }

    #[test]
    fn test_rejects_non_object_documents() {
        let err = parse_document("[1, 2]").unwrap_err();
        assert_eq!(err, "expected an object, found an array");
    }

    #[test]
    fn test_reports_syntax_errors() {
        assert!(parse_document(r#"{ "compilerOptions": { "jsx": } }"#).is_err());
    }
}
