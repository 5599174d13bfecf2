//! The compiler seam and its node-backed implementation.

use crate::diagnostic::CompilerDiagnostic;
use crate::TscError;
use camino::Utf8Path;
use node_runner::{ensure_script, NodeWorker};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tsconfig::CompilerOptions;

const TSC_SCRIPT_FILENAME: &str = "ts-transformer-tsc-worker.cjs";
const TSC_SCRIPT_SOURCE: &str = r#"'use strict';
const { createInterface } = require('node:readline');
const { createRequire } = require('node:module');
const path = require('node:path');

let ts = null;
try {
  ts = createRequire(path.join(process.cwd(), 'package.json'))('typescript');
} catch (err) {
  const message = err && err.message ? err.message : String(err);
  console.error(`ts-transformer failed to load typescript: ${message}`);
  process.exit(2);
}

const write = (value) => process.stdout.write(JSON.stringify(value) + '\n');

write({ ready: true, version: ts.version });

const rl = createInterface({ input: process.stdin, crlfDelay: Infinity });

rl.on('line', (line) => {
  if (!line.trim()) return;

  let req;
  try {
    req = JSON.parse(line);
  } catch (err) {
    const message = err && err.message ? err.message : String(err);
    write({ id: null, error: `invalid json: ${message}` });
    return;
  }

  try {
    const result = ts.transpileModule(req.source, {
      compilerOptions: req.compilerOptions,
      fileName: req.fileName,
      reportDiagnostics: true,
    });
    const diagnostics = (result.diagnostics || []).map((d) => ({
      category: ts.DiagnosticCategory[d.category],
      code: d.code,
      messageText: d.messageText,
      file: d.file ? d.file.fileName : null,
      start: d.start === undefined ? null : d.start,
      length: d.length === undefined ? null : d.length,
    }));
    write({
      id: req.id,
      outputText: result.outputText,
      sourceMapText: result.sourceMapText || null,
      diagnostics,
    });
  } catch (err) {
    write({ id: req.id, error: err && err.message ? err.message : String(err) });
  }
});
"#;

/// Input to one transpilation.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranspileInput<'a> {
    pub source: &'a str,
    pub file_name: &'a str,
    pub compiler_options: &'a CompilerOptions,
}

/// What the compiler returns for one file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranspileOutput {
    /// The emitted JavaScript.
    pub output_text: String,
    /// The JSON-encoded source map, when source maps were requested.
    #[serde(default)]
    pub source_map_text: Option<String>,
    /// Every diagnostic, of every category.
    #[serde(default)]
    pub diagnostics: Vec<CompilerDiagnostic>,
}

/// Translates typed source into plain JavaScript.
///
/// Implementations are external collaborators; the pipeline only relies on
/// this contract.
#[allow(async_fn_in_trait)]
pub trait Transpiler {
    async fn transpile(&self, input: TranspileInput<'_>) -> Result<TranspileOutput, TscError>;
}

/// A transpiler backed by the project's own `typescript` package running in
/// a persistent node worker.
pub struct NodeTranspiler {
    worker: Mutex<NodeWorker>,
    version: Option<String>,
}

impl NodeTranspiler {
    /// Starts the worker with the project root as its working directory, so
    /// the project's `typescript` is the one loaded.
    pub async fn spawn(node_path: &Utf8Path, project_root: &Utf8Path) -> Result<Self, TscError> {
        let script = ensure_script(TSC_SCRIPT_FILENAME, TSC_SCRIPT_SOURCE)?;
        let worker = NodeWorker::spawn(node_path, project_root, &script).await?;
        let version = worker
            .handshake()
            .get("version")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        tracing::info!(version = version.as_deref().unwrap_or("unknown"), "typescript worker started");

        Ok(Self {
            worker: Mutex::new(worker),
            version,
        })
    }

    /// The `typescript` version the worker loaded.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

impl Transpiler for NodeTranspiler {
    async fn transpile(&self, input: TranspileInput<'_>) -> Result<TranspileOutput, TscError> {
        let mut worker = self.worker.lock().await;
        Ok(worker.request(&input).await?)
    }
}
