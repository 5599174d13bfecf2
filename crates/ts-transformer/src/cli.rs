//! CLI argument parsing.

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use serde_json::{Map, Value};

/// TypeScript transformer for Metro with composed source maps.
#[derive(Debug, Parser)]
#[command(name = "ts-transformer")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// File to transform
    #[arg(required_unless_present = "print_cache_key")]
    pub file: Option<Utf8PathBuf>,

    /// Path to tsconfig.json (takes precedence over TSCONFIG_PATH)
    #[arg(long)]
    pub tsconfig: Option<Utf8PathBuf>,

    /// Project root: where tsconfig discovery starts and node modules resolve
    #[arg(long = "project-root", default_value = ".")]
    pub project_root: Utf8PathBuf,

    /// Transform in development mode
    #[arg(long)]
    pub dev: bool,

    /// Extra upstream transformer options (JSON object)
    #[arg(long)]
    pub options: Option<String>,

    /// What to print
    #[arg(long, value_enum, default_value = "json")]
    pub output: OutputFormat,

    /// Print the transformer cache key and exit
    #[arg(long = "print-cache-key")]
    pub print_cache_key: bool,

    /// Log format on stderr
    #[arg(long = "log-format", value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Generated code only
    Code,
    /// Composed source map only
    Map,
    /// The whole transform result (default)
    #[default]
    Json,
}

/// Log output format.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Text,
    /// JSON lines (machine-readable)
    Json,
}

impl Args {
    /// Options passed through to the upstream transformer.
    pub fn transform_options(&self) -> Result<Value, serde_json::Error> {
        let mut options = match &self.options {
            Some(json) => serde_json::from_str::<Map<String, Value>>(json)?,
            None => Map::new(),
        };
        options.insert("dev".to_string(), Value::Bool(self.dev));
        options
            .entry("projectRoot")
            .or_insert_with(|| Value::String(self.project_root.to_string()));
        Ok(Value::Object(options))
    }
}
