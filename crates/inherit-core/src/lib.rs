#![forbid(unsafe_code)]
//! Incremental inclusion tracking for file pipelines.
//!
//! Records flow through a [`Batch`] one at a time. Each one is keyed by its
//! normalized path, cached, and has its declared references recorded as
//! dependency edges. When the batch ends, every changed record that nothing
//! depends on is emitted along with every cached record that depends on a
//! changed one. The graph and cache live in a [`Context`] that outlasts the
//! batch, which is what makes later batches incremental.
//!
//! ```text
//! Record ─┬─> PathNormalizer ──> IdentityKey
//!         └─> Extractor ──> references ──> DependencyGraph edges
//!                                            │
//! end of batch: walk keys ── dependents ─────┴─> RecordCache clones ──> Downstream
//! ```
//!
//! # Conventions
//!
//! - **Errors**: construction returns [`InheritError`]; integration and
//!   emission are infallible.
//! - **Logging**: `tracing` macros (`debug!`, `trace!`, `warn!`).

pub mod cache;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod extract;
pub mod graph;
pub mod normalize;
pub mod record;

pub use cache::RecordCache;
pub use config::{CONFIG_FILE, EngineConfig, NormalizeMode, load_config, load_config_file};
pub use context::{Context, reset_shared, shared};
pub use engine::{Batch, Downstream, Engine, EngineBuilder};
pub use error::{ErrorCode, InheritError};
pub use extract::Extractor;
pub use graph::DependencyGraph;
pub use normalize::{IdentityKey, PathNormalizer};
pub use record::{FileRecord, Record};
