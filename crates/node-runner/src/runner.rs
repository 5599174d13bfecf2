//! node process runner.

use blake3::Hasher;
use camino::{Utf8Path, Utf8PathBuf};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs::{self, OpenOptions};
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;

/// Environment variable pointing at a specific node binary.
pub const NODE_BINARY_ENV: &str = "NODE_BINARY";

/// Error types for node runner.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Failed to spawn node process.
    #[error("failed to spawn node: {0}")]
    SpawnFailed(#[from] std::io::Error),

    /// node process exited with error.
    #[error("node exited with code {code}: {stderr}")]
    ProcessFailed { code: i32, stderr: String },

    /// node binary not found.
    #[error("node binary not found (set NODE_BINARY or add node to PATH)")]
    NotFound,

    /// Failed to install a worker script.
    #[error("failed to install worker script: {0}")]
    ScriptInstall(String),

    /// Worker protocol error.
    #[error("node worker protocol error: {0}")]
    ProtocolError(String),

    /// Failed to parse a worker reply.
    #[error("failed to parse node worker reply: {0}")]
    ParseError(String),

    /// The worker reported an error from the code it drives.
    #[error("{0}")]
    Remote(String),
}

/// Locates node and the cache directory worker scripts are installed into.
pub struct NodeRunner;

impl NodeRunner {
    /// Attempts to find node.
    ///
    /// Search order:
    /// 1. `NODE_BINARY` environment variable
    /// 2. Project node_modules/.bin/node (if project_root provided)
    /// 3. System PATH
    pub fn find_node(project_root: Option<&Utf8Path>) -> Option<Utf8PathBuf> {
        if let Ok(path) = std::env::var(NODE_BINARY_ENV) {
            let path = Utf8PathBuf::from(path);
            if path.is_file() {
                return Some(path);
            }
        }

        if let Some(project) = project_root {
            let candidates: &[&str] = if cfg!(windows) {
                &["node.exe", "node.cmd", "node"]
            } else {
                &["node"]
            };
            let bin = project.join("node_modules/.bin");
            for candidate in candidates {
                let path = bin.join(candidate);
                if path.is_file() {
                    return Some(path);
                }
            }
        }

        which::which("node")
            .ok()
            .and_then(|path| Utf8PathBuf::try_from(path).ok())
    }

    /// Gets the cache directory for ts-transformer.
    pub fn get_cache_dir() -> Option<Utf8PathBuf> {
        dirs::cache_dir()
            .and_then(|p| Utf8PathBuf::try_from(p).ok())
            .map(|p| p.join("ts-transformer"))
    }

    /// Gets the version reported by a node binary.
    pub async fn get_node_version(node_path: &Utf8Path) -> Result<String, NodeError> {
        let output = Command::new(node_path)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(NodeError::ProcessFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Installs an embedded worker script into the cache directory.
///
/// The file is rewritten only when its content hash differs, under an
/// exclusive lock so concurrent processes never observe a partial script.
pub fn ensure_script(file_name: &str, source: &str) -> Result<Utf8PathBuf, NodeError> {
    let cache_dir = NodeRunner::get_cache_dir()
        .ok_or_else(|| NodeError::ScriptInstall("could not determine cache directory".into()))?;
    fs::create_dir_all(&cache_dir)
        .map_err(|e| NodeError::ScriptInstall(format!("failed to create cache dir: {e}")))?;

    let script_path = cache_dir.join(file_name);
    let expected_hash = blake3::hash(source.as_bytes());
    if script_matches(&script_path, &expected_hash) {
        return Ok(script_path);
    }

    let lock_path = cache_dir.join(format!("{file_name}.lock"));
    let lock = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|e| NodeError::ScriptInstall(format!("failed to open {lock_path}: {e}")))?;
    lock.lock_exclusive()
        .map_err(|e| NodeError::ScriptInstall(format!("failed to lock {lock_path}: {e}")))?;

    // Another process may have finished the write while we waited
    let result = if script_matches(&script_path, &expected_hash) {
        Ok(())
    } else {
        fs::write(&script_path, source)
    };
    let _ = FileExt::unlock(&lock);

    result.map_err(|e| NodeError::ScriptInstall(format!("failed to write {script_path}: {e}")))?;
    tracing::debug!(script = %script_path, "installed node worker script");
    Ok(script_path)
}

fn script_matches(path: &Utf8Path, expected: &blake3::Hash) -> bool {
    match fs::read(path) {
        Ok(existing) => {
            let mut hasher = Hasher::new();
            hasher.update(&existing);
            hasher.finalize() == *expected
        }
        Err(_) => false,
    }
}

#[derive(Serialize)]
struct Envelope<'a, T> {
    id: u64,
    #[serde(flatten)]
    payload: &'a T,
}

/// A running worker process.
pub struct NodeWorker {
    child: Child,
    stdin: ChildStdin,
    stdout: tokio::io::Lines<BufReader<ChildStdout>>,
    stderr_task: Option<JoinHandle<String>>,
    handshake: Map<String, Value>,
    next_id: u64,
}

impl NodeWorker {
    /// Starts `script_path` under node and waits for its ready handshake.
    pub async fn spawn(
        node_path: &Utf8Path,
        project_root: &Utf8Path,
        script_path: &Utf8Path,
    ) -> Result<Self, NodeError> {
        let mut child = Command::new(node_path)
            .arg(script_path)
            .current_dir(project_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| NodeError::ProtocolError("failed to open node stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| NodeError::ProtocolError("failed to open node stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| NodeError::ProtocolError("failed to open node stderr".to_string()))?;

        let stderr_task = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut buffer = String::new();
            let _ = reader.read_to_string(&mut buffer).await;
            buffer
        });

        let mut worker = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            stderr_task: Some(stderr_task),
            handshake: Map::new(),
            next_id: 1,
        };

        let ready_line = worker.read_line().await?;
        let mut ready = parse_object(&ready_line)?;
        if ready.remove("ready") != Some(Value::Bool(true)) {
            return Err(NodeError::ProtocolError(format!(
                "unexpected node ready response: {ready_line}"
            )));
        }
        worker.handshake = ready;
        tracing::debug!(script = %script_path, "node worker ready");

        Ok(worker)
    }

    /// Fields the worker reported alongside `"ready": true`.
    pub fn handshake(&self) -> &Map<String, Value> {
        &self.handshake
    }

    /// Sends one request and waits for its reply.
    pub async fn request<Req, Resp>(&mut self, payload: &Req) -> Result<Resp, NodeError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let id = self.next_id;
        self.next_id += 1;

        let mut line = serde_json::to_string(&Envelope { id, payload })
            .map_err(|e| NodeError::ProtocolError(format!("failed to serialize request: {e}")))?;
        line.push('\n');
        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| NodeError::ProtocolError(format!("failed to write to node stdin: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| NodeError::ProtocolError(format!("failed to flush node stdin: {e}")))?;

        let reply_line = self.read_line().await?;
        let mut reply = parse_object(&reply_line)?;

        if let Some(error) = reply.remove("error") {
            return Err(NodeError::Remote(match error {
                Value::String(message) => message,
                other => other.to_string(),
            }));
        }

        match reply.remove("id") {
            Some(Value::Number(n)) if n.as_u64() == Some(id) => {}
            other => {
                return Err(NodeError::ProtocolError(format!(
                    "expected reply id {id}, got {}",
                    other.unwrap_or(Value::Null)
                )))
            }
        }

        serde_json::from_value(Value::Object(reply))
            .map_err(|e| NodeError::ParseError(format!("{e} ({reply_line})")))
    }

    async fn read_line(&mut self) -> Result<String, NodeError> {
        let line = self
            .stdout
            .next_line()
            .await
            .map_err(|e| NodeError::ProtocolError(format!("failed to read node output: {e}")))?;

        match line {
            Some(line) => Ok(line),
            None => {
                let stderr = match self.stderr_task.take() {
                    Some(handle) => handle.await.unwrap_or_default(),
                    None => String::new(),
                };
                let status = self.child.wait().await?;
                Err(NodeError::ProcessFailed {
                    code: status.code().unwrap_or(-1),
                    stderr,
                })
            }
        }
    }
}

fn parse_object(line: &str) -> Result<Map<String, Value>, NodeError> {
    match serde_json::from_str(line) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(NodeError::ParseError(format!("expected a JSON object: {line}"))),
        Err(e) => Err(NodeError::ParseError(format!("{e} ({line})"))),
    }
}
