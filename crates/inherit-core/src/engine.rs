//! Two-phase integration and emission engine.
//!
//! # Overview
//!
//! ```text
//! records ──> Batch::integrate (phase 1, once per record)
//!               ├─ key := normalize(path or original path)
//!               ├─ drop key's outgoing edges
//!               ├─ cache[key] := record
//!               └─ key → normalize(dir(key)/reference) for every reference
//!
//! Batch::flush (phase 2, once per batch)
//!               ├─ warn about cycles that involve batch keys
//!               └─ walk batch keys, emit leaves and their dependents once
//! ```
//!
//! A [`Batch`] holds the only mutable borrow of its [`Context`] for its whole
//! life, so no other batch or reset can interleave with it.

use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::mpsc::Sender;

use tracing::{Level, debug, instrument, trace, warn};

use crate::cache::RecordCache;
use crate::context::{Context, shared};
use crate::error::InheritError;
use crate::extract::Extractor;
use crate::graph::DependencyGraph;
use crate::normalize::{IdentityKey, PathNormalizer, resolve_lexically, working_dir};
use crate::record::{FileRecord, Record};

// ---------------------------------------------------------------------------
// Downstream
// ---------------------------------------------------------------------------

/// Receiver of emitted records.
pub trait Downstream<R> {
    fn push(&mut self, record: R);

    /// Called once after the last record of a batch.
    fn end(&mut self) {}
}

impl<R> Downstream<R> for Vec<R> {
    fn push(&mut self, record: R) {
        Self::push(self, record);
    }
}

impl<R> Downstream<R> for Sender<R> {
    fn push(&mut self, record: R) {
        if self.send(record).is_err() {
            debug!("downstream receiver dropped; discarding record");
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Configured extraction, normalization, and emission policy.
#[derive(Debug, Clone)]
pub struct Engine<R = FileRecord> {
    extractor: Extractor<R>,
    normalizer: PathNormalizer,
    root: PathBuf,
    include_all: bool,
    original_paths: bool,
}

impl<R: Record> Engine<R> {
    #[must_use]
    pub fn builder() -> EngineBuilder<R> {
        EngineBuilder::default()
    }

    #[must_use]
    pub const fn include_all(&self) -> bool {
        self.include_all
    }

    #[must_use]
    pub const fn original_paths(&self) -> bool {
        self.original_paths
    }

    #[must_use]
    pub const fn normalizer(&self) -> &PathNormalizer {
        &self.normalizer
    }

    /// Identity key of `record` under this engine's configuration.
    #[must_use]
    pub fn identity_of(&self, record: &R) -> IdentityKey {
        let raw = if self.original_paths {
            record.original_path()
        } else {
            record.path()
        };
        self.normalizer.normalize(&raw.to_string_lossy())
    }

    /// Key of `reference` as declared by the record keyed `from`.
    ///
    /// Relative references are taken relative to the directory of `from`.
    #[must_use]
    pub fn resolve_reference(&self, from: &IdentityKey, reference: &str) -> IdentityKey {
        let joined = resolve_lexically(&self.root, &from.parent_dir().join(reference));
        self.normalizer.normalize(&joined.to_string_lossy())
    }

    /// Start a batch against `context`.
    pub const fn begin<'e, 'c>(&'e self, context: &'c mut Context<R>) -> Batch<'e, 'c, R> {
        Batch {
            engine: self,
            context,
            keys: Vec::new(),
        }
    }

    /// Integrate every record as one batch and collect the emitted clones.
    pub fn run<I>(&self, context: &mut Context<R>, records: I) -> Vec<R>
    where
        I: IntoIterator<Item = R>,
    {
        let mut batch = self.begin(context);
        for record in records {
            batch.integrate(record);
        }
        batch.finish()
    }
}

impl Engine<FileRecord> {
    /// [`Engine::run`] against the process-wide default context.
    #[must_use]
    pub fn run_shared<I>(&self, records: I) -> Vec<FileRecord>
    where
        I: IntoIterator<Item = FileRecord>,
    {
        let mut context = shared();
        self.run(&mut context, records)
    }
}

// ---------------------------------------------------------------------------
// EngineBuilder
// ---------------------------------------------------------------------------

/// Construction options for an [`Engine`].
#[derive(Debug)]
pub struct EngineBuilder<R> {
    pattern: Option<String>,
    extractor: Option<Extractor<R>>,
    normalizer: Option<PathNormalizer>,
    root: Option<PathBuf>,
    include_all: bool,
    original_paths: bool,
}

impl<R> Default for EngineBuilder<R> {
    fn default() -> Self {
        Self {
            pattern: None,
            extractor: None,
            normalizer: None,
            root: None,
            include_all: false,
            original_paths: false,
        }
    }
}

impl<R: Record> EngineBuilder<R> {
    /// Emit every integrated record plus its direct dependents.
    #[must_use]
    pub const fn include_all(mut self, include_all: bool) -> Self {
        self.include_all = include_all;
        self
    }

    /// Key records by their original location instead of the current one.
    #[must_use]
    pub const fn original_paths(mut self, original_paths: bool) -> Self {
        self.original_paths = original_paths;
        self
    }

    /// Extract references with a one-group regular expression.
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Extract references with a caller function.
    #[must_use]
    pub fn extract_with<F>(self, f: F) -> Self
    where
        F: Fn(&R) -> Vec<String> + Send + Sync + 'static,
    {
        self.extractor(Extractor::function(f))
    }

    #[must_use]
    pub fn extractor(mut self, extractor: Extractor<R>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    #[must_use]
    pub fn normalize_with(mut self, normalizer: PathNormalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Directory relative paths resolve against. Defaults to the working directory.
    #[must_use]
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Validate the options and build the engine.
    ///
    /// # Errors
    ///
    /// Returns [`InheritError::MissingExtractor`] when neither a pattern nor an
    /// extractor was supplied, [`InheritError::ConflictingExtractors`] when
    /// both were, and the pattern errors of [`Extractor::pattern`].
    pub fn build(self) -> Result<Engine<R>, InheritError> {
        let extractor = match (self.pattern, self.extractor) {
            (Some(pattern), None) => Extractor::pattern(&pattern)?,
            (None, Some(extractor)) => extractor,
            (Some(_), Some(_)) => return Err(InheritError::ConflictingExtractors),
            (None, None) => return Err(InheritError::MissingExtractor),
        };

        let root = self.root.unwrap_or_else(working_dir);
        let normalizer = self
            .normalizer
            .unwrap_or_else(|| PathNormalizer::absolute_from(root.clone()));

        debug!(
            ?extractor,
            ?normalizer,
            include_all = self.include_all,
            original_paths = self.original_paths,
            "engine configured"
        );

        Ok(Engine {
            extractor,
            normalizer,
            root,
            include_all: self.include_all,
            original_paths: self.original_paths,
        })
    }
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// One pass of records through integration followed by one emission.
#[derive(Debug)]
pub struct Batch<'e, 'c, R: Record> {
    engine: &'e Engine<R>,
    context: &'c mut Context<R>,
    keys: Vec<IdentityKey>,
}

impl<R: Record> Batch<'_, '_, R> {
    /// Integrate one record into the graph and cache.
    ///
    /// Returns the record's key, or `None` when the record has no content and
    /// was skipped.
    #[instrument(skip_all, fields(path = %record.path().display()))]
    pub fn integrate(&mut self, record: R) -> Option<IdentityKey> {
        if record.contents().is_empty() {
            trace!("skipping record without content");
            return None;
        }

        let key = self.engine.identity_of(&record);
        let references = self.engine.extractor.extract(&record);
        let graph = &mut self.context.graph;

        graph.add_node(&key);
        graph.remove_all_outgoing(&key);
        self.context.cache.insert(key.clone(), record);
        self.keys.push(key.clone());

        for reference in &references {
            let dependency = self.engine.resolve_reference(&key, reference);
            graph.add_dependency(&key, &dependency);
        }

        debug!(%key, references = references.len(), "integrated record");
        Some(key)
    }

    /// Keys integrated so far, in order, duplicates included.
    #[must_use]
    pub fn keys(&self) -> &[IdentityKey] {
        &self.keys
    }

    /// Emit the batch into `downstream` and signal its end.
    ///
    /// Each key is emitted at most once. Returns the number of records pushed.
    #[instrument(skip_all, fields(batch = self.keys.len(), include_all = self.engine.include_all))]
    pub fn flush<D>(self, downstream: &mut D) -> usize
    where
        D: Downstream<R>,
    {
        let include_all = self.engine.include_all;
        let graph = &self.context.graph;
        let cache = &self.context.cache;
        let mut emitted: HashSet<IdentityKey> = HashSet::new();
        let mut pushed = 0;

        // One SCC pass per batch; skipped entirely when warnings are filtered.
        if tracing::enabled!(Level::WARN) {
            for cycle in cycles_touching(graph, &self.keys) {
                let cycle: Vec<&str> = cycle.iter().map(IdentityKey::as_str).collect();
                warn!(cycle = %cycle.join(" -> "), "dependency cycle");
            }
        }

        for key in &self.keys {
            let dependents: BTreeSet<IdentityKey> = if include_all {
                graph.direct_dependents(key)
            } else {
                graph.transitive_dependents(key)
            };

            if !emitted.contains(key) && (include_all || dependents.is_empty()) {
                pushed += emit(cache, key, &mut emitted, downstream);
            }

            for dependent in &dependents {
                if !emitted.contains(dependent) {
                    pushed += emit(cache, dependent, &mut emitted, downstream);
                }
            }
        }

        downstream.end();
        debug!(pushed, "batch emitted");
        pushed
    }

    /// Emit the batch into a `Vec`.
    #[must_use]
    pub fn finish(self) -> Vec<R> {
        let mut out = Vec::new();
        self.flush(&mut out);
        out
    }
}

/// Cycles with at least one member integrated in this batch.
fn cycles_touching(graph: &DependencyGraph, keys: &[IdentityKey]) -> Vec<Vec<IdentityKey>> {
    let batch: HashSet<&IdentityKey> = keys.iter().collect();
    graph
        .cycles()
        .into_iter()
        .filter(|cycle| cycle.iter().any(|key| batch.contains(key)))
        .collect()
}

fn emit<R, D>(
    cache: &RecordCache<R>,
    key: &IdentityKey,
    emitted: &mut HashSet<IdentityKey>,
    downstream: &mut D,
) -> usize
where
    R: Record,
    D: Downstream<R>,
{
    emitted.insert(key.clone());
    if let Some(record) = cache.checkout(key) {
        trace!(%key, "emitting");
        downstream.push(record);
        1
    } else {
        warn!(%key, "dependent has no cached record; skipping");
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INCLUDE: &str = r"(?m)^@include\s+(.+)$";

    fn engine(include_all: bool) -> Engine {
        Engine::builder()
            .pattern(INCLUDE)
            .root("/project")
            .include_all(include_all)
            .build()
            .expect("engine builds")
    }

    fn paths(records: &[FileRecord]) -> BTreeSet<String> {
        records.iter().map(|r| r.path().display().to_string()).collect()
    }

    #[test]
    fn builder_requires_an_extractor() {
        let err = Engine::<FileRecord>::builder().build().expect_err("no extractor");
        assert!(matches!(err, InheritError::MissingExtractor));
    }

    #[test]
    fn builder_rejects_two_extractors() {
        let err = Engine::<FileRecord>::builder()
            .pattern(INCLUDE)
            .extract_with(|_| Vec::new())
            .build()
            .expect_err("two extractors");
        assert!(matches!(err, InheritError::ConflictingExtractors));
    }

    #[test]
    fn references_resolve_against_record_directory() {
        let engine = engine(false);
        let from = IdentityKey::from("/project/styles/main.scss");
        assert_eq!(
            engine.resolve_reference(&from, "partials/_base.scss").as_str(),
            "/project/styles/partials/_base.scss"
        );
        assert_eq!(
            engine.resolve_reference(&from, "../vendor/reset.scss").as_str(),
            "/project/vendor/reset.scss"
        );
        assert_eq!(engine.resolve_reference(&from, "/abs/x").as_str(), "/abs/x");
    }

    #[test]
    fn empty_records_are_ignored() {
        let engine = engine(false);
        let mut ctx = Context::new();
        let mut batch = engine.begin(&mut ctx);
        assert!(batch.integrate(FileRecord::new("/project/empty", "")).is_none());
        assert!(batch.keys().is_empty());
        assert!(batch.finish().is_empty());
        assert_eq!(ctx.graph().node_count(), 0);
        assert!(ctx.cache().is_empty());
    }

    #[test]
    fn integration_records_edges_and_cache() {
        let engine = engine(false);
        let mut ctx = Context::new();
        let mut batch = engine.begin(&mut ctx);
        let key = batch
            .integrate(FileRecord::new("/project/a", "@include b\n@include sub/c\n"))
            .expect("integrated");
        assert_eq!(batch.keys(), std::slice::from_ref(&key));
        drop(batch);

        let deps: Vec<String> = ctx
            .graph()
            .dependencies_of(&key)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(deps, vec!["/project/b", "/project/sub/c"]);
        assert!(ctx.cache().contains(&key));
        assert!(!ctx.cache().contains(&IdentityKey::from("/project/b")));
    }

    #[test]
    fn reintegration_within_a_batch_emits_once() {
        let engine = engine(false);
        let mut ctx = Context::new();
        let mut batch = engine.begin(&mut ctx);
        batch.integrate(FileRecord::new("/project/a", "first"));
        batch.integrate(FileRecord::new("/project/a", "second"));
        assert_eq!(batch.keys().len(), 2);

        let out = batch.finish();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text(), "second");
    }

    #[test]
    fn include_all_uses_direct_dependents_only() {
        // top -> mid -> base; only base changes.
        let mut ctx = Context::new();
        engine(false).run(
            &mut ctx,
            [
                FileRecord::new("/project/top", "@include mid"),
                FileRecord::new("/project/mid", "@include base"),
                FileRecord::new("/project/base", "base"),
            ],
        );

        let all = engine(true).run(&mut ctx, [FileRecord::new("/project/base", "base v2")]);
        assert_eq!(
            paths(&all),
            BTreeSet::from(["/project/base".to_string(), "/project/mid".to_string()])
        );

        let minimal = engine(false).run(&mut ctx, [FileRecord::new("/project/base", "base v3")]);
        assert_eq!(
            paths(&minimal),
            BTreeSet::from(["/project/mid".to_string(), "/project/top".to_string()])
        );
    }

    #[test]
    fn flush_signals_end_once() {
        struct Probe {
            records: usize,
            ends: usize,
        }
        impl Downstream<FileRecord> for Probe {
            fn push(&mut self, _record: FileRecord) {
                self.records += 1;
            }
            fn end(&mut self) {
                self.ends += 1;
            }
        }

        let engine = engine(false);
        let mut ctx = Context::new();
        let mut batch = engine.begin(&mut ctx);
        batch.integrate(FileRecord::new("/project/a", "a"));
        let mut probe = Probe { records: 0, ends: 0 };
        assert_eq!(batch.flush(&mut probe), 1);
        assert_eq!(probe.records, 1);
        assert_eq!(probe.ends, 1);
    }

    #[test]
    fn sender_downstream_forwards_records() {
        let engine = engine(false);
        let mut ctx = Context::new();
        let (mut tx, rx) = std::sync::mpsc::channel();
        let mut batch = engine.begin(&mut ctx);
        batch.integrate(FileRecord::new("/project/a", "a"));
        batch.flush(&mut tx);
        drop(tx);
        let received: Vec<FileRecord> = rx.iter().collect();
        assert_eq!(received.len(), 1);
    }

    #[test]
    fn self_reference_does_not_hang_or_duplicate() {
        let engine = engine(false);
        let mut ctx = Context::new();
        let out = engine.run(&mut ctx, [FileRecord::new("/project/a", "@include a")]);
        // `a` depends on itself but transitive dependents exclude the key.
        assert_eq!(out.len(), 1);
        assert_eq!(ctx.graph().cycles().len(), 1);
    }

    #[test]
    fn cycle_check_covers_only_batch_members() {
        let engine = engine(false);
        let mut ctx = Context::new();
        let _ = engine.run(
            &mut ctx,
            [
                FileRecord::new("/project/a", "@include b"),
                FileRecord::new("/project/b", "@include a"),
            ],
        );
        let _ = engine.run(
            &mut ctx,
            [
                FileRecord::new("/project/x", "@include y"),
                FileRecord::new("/project/y", "@include x"),
                FileRecord::new("/project/z", "z"),
            ],
        );

        let key = |name: &str| IdentityKey::new(format!("/project/{name}"));
        assert_eq!(
            cycles_touching(ctx.graph(), &[key("y"), key("z")]),
            vec![vec![key("x"), key("y")]]
        );
        assert!(cycles_touching(ctx.graph(), &[key("z")]).is_empty());
        assert_eq!(cycles_touching(ctx.graph(), &[key("a"), key("x")]).len(), 2);
    }
}
