//! The downstream transformer seam and its node-backed implementation.

use crate::{MetroError, UpstreamInput, UpstreamResult};
use camino::Utf8Path;
use node_runner::{ensure_script, NodeWorker};
use serde::Deserialize;
use std::fmt;
use tokio::sync::Mutex;

const METRO_SCRIPT_FILENAME: &str = "ts-transformer-metro-worker.cjs";
const METRO_SCRIPT_SOURCE: &str = r#"'use strict';
const { createInterface } = require('node:readline');
const { createRequire } = require('node:module');
const path = require('node:path');

const projectRequire = createRequire(path.join(process.cwd(), 'package.json'));

// Newest first. The first module that loads is bound for the worker's lifetime.
const CANDIDATES = [
  ['babel-transformer', '@react-native/metro-babel-transformer'],
  ['babel-transformer', 'metro-react-native-babel-transformer'],
  ['react-native-transformer', 'metro/src/reactNativeTransformer'],
  ['metro-bundler', 'metro-bundler/src/transformer'],
  ['packager', 'react-native/packager/transformer'],
];

function bind() {
  for (const [api, id] of CANDIDATES) {
    let upstream;
    try {
      upstream = projectRequire(id);
    } catch (err) {
      continue;
    }
    const transform =
      api === 'packager'
        ? ({ src, filename, options }) => upstream.transform(src, filename, options)
        : (input) => upstream.transform(input);
    return { api, id, upstream, transform };
  }
  return null;
}

const bound = bind();
if (!bound) {
  console.error(
    'ts-transformer found no upstream transformer: tried ' +
      CANDIDATES.map(([, id]) => id).join(', ')
  );
  process.exit(2);
}

const write = (value) => process.stdout.write(JSON.stringify(value) + '\n');

let cacheKey = null;
if (typeof bound.upstream.getCacheKey === 'function') {
  cacheKey = String(bound.upstream.getCacheKey());
}

write({ ready: true, api: bound.api, module: bound.id, cacheKey });

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

  Promise.resolve()
    .then(() => bound.transform({ src: req.src, filename: req.filename, options: req.options }))
    .then(
      (result) => write({ id: req.id, result }),
      (err) => write({ id: req.id, error: err && err.message ? err.message : String(err) })
    );
});
"#;

/// Which upstream transformer API the worker bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpstreamApi {
    /// `@react-native/metro-babel-transformer` and its predecessor. Returns `ast`.
    BabelTransformer,
    /// `metro/src/reactNativeTransformer`.
    ReactNativeTransformer,
    /// `metro-bundler/src/transformer`.
    MetroBundler,
    /// `react-native/packager/transformer`, called with positional arguments.
    Packager,
}

impl UpstreamApi {
    fn parse(name: &str) -> Result<Self, MetroError> {
        serde_json::from_value(serde_json::Value::String(name.to_string()))
            .map_err(|_| MetroError::UnsupportedApi(name.to_string()))
    }
}

impl fmt::Display for UpstreamApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UpstreamApi::BabelTransformer => "babel-transformer",
            UpstreamApi::ReactNativeTransformer => "react-native-transformer",
            UpstreamApi::MetroBundler => "metro-bundler",
            UpstreamApi::Packager => "packager",
        })
    }
}

/// Runs the downstream transform on compiled JavaScript.
#[allow(async_fn_in_trait)]
pub trait Transformer {
    async fn transform(&self, input: UpstreamInput<'_>) -> Result<UpstreamResult, MetroError>;

    /// The transformer's own cache key, when it exposes one.
    fn cache_key(&self) -> Option<&str> {
        None
    }
}

#[derive(Deserialize)]
struct Reply {
    result: UpstreamResult,
}

/// Metro's upstream transformer hosted in a persistent node worker.
///
/// The API is negotiated once, when the worker starts.
pub struct MetroTransformer {
    worker: Mutex<NodeWorker>,
    api: UpstreamApi,
    cache_key: Option<String>,
}

impl MetroTransformer {
    pub async fn spawn(node_path: &Utf8Path, project_root: &Utf8Path) -> Result<Self, MetroError> {
        let script = ensure_script(METRO_SCRIPT_FILENAME, METRO_SCRIPT_SOURCE)?;
        let worker = NodeWorker::spawn(node_path, project_root, &script).await?;

        let handshake = worker.handshake();
        let api_name = handshake
            .get("api")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let api = UpstreamApi::parse(api_name)?;
        let cache_key = handshake
            .get("cacheKey")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        tracing::info!(
            %api,
            module = handshake.get("module").and_then(|v| v.as_str()).unwrap_or("unknown"),
            "upstream transformer bound"
        );

        Ok(Self {
            worker: Mutex::new(worker),
            api,
            cache_key,
        })
    }

    pub fn api(&self) -> UpstreamApi {
        self.api
    }
}

impl Transformer for MetroTransformer {
    async fn transform(&self, input: UpstreamInput<'_>) -> Result<UpstreamResult, MetroError> {
        let mut worker = self.worker.lock().await;
        let reply: Reply = worker.request(&input).await?;
        Ok(reply.result)
    }

    fn cache_key(&self) -> Option<&str> {
        self.cache_key.as_deref()
    }
}
