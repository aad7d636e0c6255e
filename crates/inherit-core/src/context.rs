//! Long-lived graph and cache shared by consecutive batches.
//!
//! A [`Context`] is what makes the engine incremental: it remembers every
//! record and edge seen so far. Independent projects in one process should
//! each own a context. [`shared`] hands out a process-wide default for hosts
//! that only ever track one project.

use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::debug;

use crate::cache::RecordCache;
use crate::graph::DependencyGraph;
use crate::record::{FileRecord, Record};

/// Dependency graph plus record cache with an explicit lifecycle.
#[derive(Debug, Clone)]
pub struct Context<R = FileRecord> {
    pub(crate) graph: DependencyGraph,
    pub(crate) cache: RecordCache<R>,
}

impl<R: Record> Default for Context<R> {
    fn default() -> Self {
        Self {
            graph: DependencyGraph::new(),
            cache: RecordCache::new(),
        }
    }
}

impl<R: Record> Context<R> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    #[must_use]
    pub const fn cache(&self) -> &RecordCache<R> {
        &self.cache
    }

    /// Clear graph and cache back to empty.
    pub fn reset(&mut self) {
        debug!(
            nodes = self.graph.node_count(),
            records = self.cache.len(),
            "resetting inheritance context"
        );
        self.graph.clear();
        self.cache.clear();
    }
}

static SHARED: OnceLock<Mutex<Context<FileRecord>>> = OnceLock::new();

/// Lock the process-wide default context.
///
/// The lock is held for as long as the guard lives, so keep it for exactly
/// one batch.
pub fn shared() -> MutexGuard<'static, Context<FileRecord>> {
    SHARED
        .get_or_init(|| Mutex::new(Context::new()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Reset the process-wide default context.
pub fn reset_shared() {
    shared().reset();
}
