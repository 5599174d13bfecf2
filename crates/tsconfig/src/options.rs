//! The flat compiler options map handed to the TypeScript compiler.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Compiler options in document order.
///
/// Values are kept as raw JSON; the compiler interprets enum-valued options
/// such as `target` or `jsx` itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompilerOptions(IndexMap<String, Value>);

impl CompilerOptions {
    /// Creates an empty options map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw value of an option.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Returns a boolean option, `None` when absent or not a boolean.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(Value::as_bool)
    }

    /// Sets an option, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Returns the number of options set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no options are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates options in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Applies the settings composition depends on: source maps are always
    /// generated with the original text inlined, and never as an inline map.
    pub fn with_forced_overrides(mut self) -> Self {
        self.0.insert("sourceMap".to_string(), Value::Bool(true));
        self.0.insert("inlineSources".to_string(), Value::Bool(true));
        self.0.shift_remove("inlineSourceMap");
        self
    }

    /// Checks the module interop flags for combinations that compile but
    /// misbehave at runtime.
    pub fn interop_warnings(&self) -> Vec<ConfigWarning> {
        let interop = self.get_bool("esModuleInterop");
        let synthetic = self.get_bool("allowSyntheticDefaultImports");

        let mut warnings = Vec::new();
        if synthetic == Some(true) && interop != Some(true) {
            warnings.push(ConfigWarning::SyntheticDefaultsWithoutInterop);
        }
        if interop == Some(true) && synthetic == Some(false) {
            warnings.push(ConfigWarning::InteropWithoutSyntheticDefaults);
        }
        warnings
    }
}

impl From<serde_json::Map<String, Value>> for CompilerOptions {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        Self(map.into_iter().collect())
    }
}

/// An advisory about the resolved options. Never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigWarning {
    /// `allowSyntheticDefaultImports` without `esModuleInterop`.
    SyntheticDefaultsWithoutInterop,
    /// `esModuleInterop` with `allowSyntheticDefaultImports` set to `false`.
    InteropWithoutSyntheticDefaults,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::SyntheticDefaultsWithoutInterop => f.write_str(
                "'allowSyntheticDefaultImports' is enabled without 'esModuleInterop'; \
                 default imports of CommonJS modules will type-check but be undefined at runtime",
            ),
            ConfigWarning::InteropWithoutSyntheticDefaults => f.write_str(
                "'esModuleInterop' is enabled but 'allowSyntheticDefaultImports' is set to false; \
                 the emitted interop helpers will not match what the type checker accepts",
            ),
        }
    }
}
