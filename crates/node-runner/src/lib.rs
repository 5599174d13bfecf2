//! node process runner for the out-of-process collaborators.
//!
//! The TypeScript compiler and the Metro transformer both live in the node
//! ecosystem. Each is driven through a long-lived worker process speaking
//! newline-delimited JSON: one ready handshake, then one reply per request.

mod runner;

pub use runner::{ensure_script, NodeError, NodeRunner, NodeWorker, NODE_BINARY_ENV};
