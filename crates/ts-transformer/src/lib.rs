//! TypeScript transformer for Metro.
//!
//! Compiles `.ts` and `.tsx` files with the project's TypeScript, hands the
//! result to Metro's upstream transformer and composes the two source maps so
//! that positions in the final output point back into the typed source.
//!
//! ```text
//! source ──▶ compile ──▶ upstream transform ──▶ compose ──▶ assemble
//!              │                                   ▲
//!              └──────── compiler source map ──────┘
//! ```

mod assemble;
mod compose;
mod error;
mod pipeline;

pub use assemble::{assemble, TransformResult};
pub use compose::{
    compose, compose_raw, compose_structured, rewrite_locations, Composed, FinalMapping,
};
pub use error::TransformError;
pub use pipeline::{cache_key, Pipeline, TransformArgs};
