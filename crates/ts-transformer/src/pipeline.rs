//! The transform entry point.

use crate::assemble::{assemble, TransformResult};
use crate::compose::compose;
use crate::TransformError;
use metro_runner::{StageTwoResult, Transformer, UpstreamInput};
use serde::Deserialize;
use serde_json::{Map, Value};
use tsc_runner::{compile, is_typescript_file, Transpiler};
use tsconfig::{CompilerOptions, ResolvedTsConfig};

/// Arguments of one transform call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "ArgsRepr")]
pub struct TransformArgs {
    pub src: String,
    pub filename: String,
    pub options: Value,
}

/// Older downstream versions call `transform(src, filename, options)`, newer
/// ones pass a single `{ src, filename, options }` object.
#[derive(Deserialize)]
#[serde(untagged)]
enum ArgsRepr {
    Object {
        src: String,
        filename: String,
        #[serde(default = "empty_options")]
        options: Value,
    },
    Positional(String, String, Value),
    PositionalWithoutOptions(String, String),
}

fn empty_options() -> Value {
    Value::Object(Map::new())
}

impl From<ArgsRepr> for TransformArgs {
    fn from(repr: ArgsRepr) -> Self {
        match repr {
            ArgsRepr::Object {
                src,
                filename,
                options,
            }
            | ArgsRepr::Positional(src, filename, options) => Self {
                src,
                filename,
                options,
            },
            ArgsRepr::PositionalWithoutOptions(src, filename) => Self {
                src,
                filename,
                options: empty_options(),
            },
        }
    }
}

impl TransformArgs {
    pub fn new(src: impl Into<String>, filename: impl Into<String>, options: Value) -> Self {
        Self {
            src: src.into(),
            filename: filename.into(),
            options,
        }
    }

    /// Accepts either calling convention as JSON.
    pub fn from_json(value: Value) -> Result<Self, TransformError> {
        serde_json::from_value(value).map_err(TransformError::Arguments)
    }
}

impl<S: Into<String>, F: Into<String>> From<(S, F, Value)> for TransformArgs {
    fn from((src, filename, options): (S, F, Value)) -> Self {
        Self::new(src, filename, options)
    }
}

/// Compiles typed sources, runs the downstream transform and composes the
/// two source maps.
///
/// Compiler options are fixed when the pipeline is built and shared by every
/// call. Calls await each stage in turn.
pub struct Pipeline<T, M> {
    options: CompilerOptions,
    transpiler: T,
    transformer: M,
}

impl<T: Transpiler, M: Transformer> Pipeline<T, M> {
    pub fn new(options: CompilerOptions, transpiler: T, transformer: M) -> Self {
        Self {
            options,
            transpiler,
            transformer,
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn transformer(&self) -> &M {
        &self.transformer
    }

    /// Transforms one file.
    ///
    /// Files without a `.ts` or `.tsx` extension go straight to the downstream
    /// transformer and its result is returned as is.
    pub async fn transform(
        &self,
        args: impl Into<TransformArgs>,
    ) -> Result<TransformResult, TransformError> {
        let TransformArgs {
            src,
            filename,
            options,
        } = args.into();

        if !is_typescript_file(&filename) {
            tracing::debug!(file = %filename, "passing through to upstream transformer");
            let result = self
                .transformer
                .transform(UpstreamInput {
                    src: &src,
                    filename: &filename,
                    options: &options,
                })
                .await?;
            return Ok(TransformResult::from_upstream(result));
        }

        let compiled = compile(&self.transpiler, &src, &filename, &self.options).await?;

        let upstream = self
            .transformer
            .transform(UpstreamInput {
                src: &compiled.output_text,
                filename: &filename,
                options: &options,
            })
            .await?;
        let stage_two = StageTwoResult::from_upstream(upstream)?;
        tracing::debug!(file = %filename, shape = stage_two.kind(), "upstream transform done");

        let composed = compose(&compiled.source_map, stage_two, &filename, &src);
        Ok(assemble(composed))
    }

    /// Cache key for build artifacts produced with `config`.
    pub fn cache_key(&self, config: &ResolvedTsConfig) -> String {
        cache_key(self.transformer.cache_key(), &config.document_text())
    }
}

/// Hashes the downstream cache key, this transformer's identity and the
/// resolved configuration document. A change to any of them changes the key.
pub fn cache_key(upstream_key: Option<&str>, config_document: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(upstream_key.unwrap_or_default().as_bytes());
    hasher.update(b"\0");
    hasher.update(concat!(env!("CARGO_PKG_NAME"), "@", env!("CARGO_PKG_VERSION")).as_bytes());
    hasher.update(b"\0");
    hasher.update(config_document.as_bytes());
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_args_from_object() {
        let args = TransformArgs::from_json(json!({
            "src": "let a = 1",
            "filename": "a.ts",
            "options": { "dev": true }
        }))
        .unwrap();
        assert_eq!(args, TransformArgs::new("let a = 1", "a.ts", json!({ "dev": true })));
    }

    #[test]
    fn test_args_from_positional() {
        let args = TransformArgs::from_json(json!(["let a = 1", "a.ts", { "dev": false }])).unwrap();
        assert_eq!(args.options, json!({ "dev": false }));

        let args = TransformArgs::from_json(json!(["let a = 1", "a.ts"])).unwrap();
        assert_eq!(args.filename, "a.ts");
        assert_eq!(args.options, json!({}));
    }

    #[test]
    fn test_args_object_without_options() {
        let args = TransformArgs::from_json(json!({ "src": "", "filename": "a.js" })).unwrap();
        assert_eq!(args.options, json!({}));
    }

    #[test]
    fn test_args_rejected() {
        let err = TransformArgs::from_json(json!({ "filename": "a.ts" })).unwrap_err();
        assert!(matches!(err, TransformError::Arguments(_)));
    }

    #[test]
    fn test_args_from_tuple() {
        let args: TransformArgs = ("src", "a.tsx", json!(null)).into();
        assert_eq!(args.filename, "a.tsx");
        assert_eq!(args.options, Value::Null);
    }

    #[test]
    fn test_cache_key_changes_with_each_input() {
        let base = cache_key(Some("upstream"), "{}");
        assert_eq!(base.len(), 64);
        assert!(base.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(base, cache_key(Some("upstream"), "{}"));
        assert_ne!(base, cache_key(Some("other"), "{}"));
        assert_ne!(base, cache_key(None, "{}"));
        assert_ne!(base, cache_key(Some("upstream"), "{\"a\":1}"));
    }
}
