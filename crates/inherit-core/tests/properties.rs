use std::collections::BTreeSet;
use std::fmt::Write as _;

use inherit_core::{Context, Engine, FileRecord, IdentityKey, Record};
use proptest::prelude::*;

const INCLUDE: &str = r"(?m)^@include\s+(.+)$";

fn engine(include_all: bool) -> Engine {
    Engine::builder()
        .pattern(INCLUDE)
        .root("/p")
        .include_all(include_all)
        .build()
        .expect("engine")
}

fn record(node: usize, edges: &[(usize, usize)]) -> FileRecord {
    let mut content = format!("node {node}\n");
    for (_, to) in edges.iter().filter(|(from, _)| *from == node) {
        let _ = writeln!(content, "@include n{to}");
    }
    FileRecord::new(format!("/p/n{node}"), content)
}

fn key(node: usize) -> IdentityKey {
    IdentityKey::new(format!("/p/n{node}"))
}

fn emitted_keys(records: &[FileRecord]) -> Vec<String> {
    records.iter().map(|r| r.path().display().to_string()).collect()
}

/// Warm a context with every node, then run `batch` against it.
fn run_batch(
    include_all: bool,
    n: usize,
    edges: &[(usize, usize)],
    batch: &[usize],
) -> (Context, Vec<FileRecord>) {
    let mut ctx = Context::new();
    let _ = engine(false).run(&mut ctx, (0..n).map(|i| record(i, edges)));
    let out = engine(include_all).run(&mut ctx, batch.iter().map(|&i| record(i, edges)));
    (ctx, out)
}

/// Node count, edge list (cycles and self-loops allowed), and a shuffled
/// non-empty batch of nodes.
fn arb_case() -> impl Strategy<Value = (usize, Vec<(usize, usize)>, Vec<usize>)> {
    (2usize..8).prop_flat_map(|n| {
        let ids: Vec<usize> = (0..n).collect();
        (
            Just(n),
            prop::collection::vec((0..n, 0..n), 0..n * 2),
            prop::sample::subsequence(ids, 1..=n).prop_shuffle(),
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn emission_is_at_most_once((n, edges, batch) in arb_case(), include_all in any::<bool>()) {
        let (_, out) = run_batch(include_all, n, &edges, &batch);
        let keys = emitted_keys(&out);
        let unique: BTreeSet<&String> = keys.iter().collect();
        prop_assert_eq!(unique.len(), keys.len());
    }

    #[test]
    fn emitted_set_ignores_batch_order((n, edges, batch) in arb_case(), include_all in any::<bool>()) {
        let reversed: Vec<usize> = batch.iter().rev().copied().collect();
        let (_, forward) = run_batch(include_all, n, &edges, &batch);
        let (_, backward) = run_batch(include_all, n, &edges, &reversed);

        let forward: BTreeSet<String> = emitted_keys(&forward).into_iter().collect();
        let backward: BTreeSet<String> = emitted_keys(&backward).into_iter().collect();
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn every_integrated_record_is_represented((n, edges, batch) in arb_case()) {
        let (ctx, out) = run_batch(false, n, &edges, &batch);
        let emitted: BTreeSet<String> = emitted_keys(&out).into_iter().collect();

        for &node in &batch {
            let dependents = ctx.graph().transitive_dependents(&key(node));
            if dependents.is_empty() {
                prop_assert!(emitted.contains(key(node).as_str()));
            } else {
                for dependent in &dependents {
                    prop_assert!(emitted.contains(dependent.as_str()));
                }
            }
        }
    }

    #[test]
    fn include_all_emits_every_integrated_record((n, edges, batch) in arb_case()) {
        let (_, out) = run_batch(true, n, &edges, &batch);
        let emitted: BTreeSet<String> = emitted_keys(&out).into_iter().collect();
        for &node in &batch {
            prop_assert!(emitted.contains(key(node).as_str()));
        }
    }

    #[test]
    fn reintegration_is_idempotent((n, edges, _batch) in arb_case()) {
        let mut once = Context::new();
        let _ = engine(false).run(&mut once, (0..n).map(|i| record(i, &edges)));

        let mut twice = Context::new();
        let _ = engine(false).run(&mut twice, (0..n).map(|i| record(i, &edges)));
        let _ = engine(false).run(&mut twice, (0..n).map(|i| record(i, &edges)));

        prop_assert_eq!(once.graph().edge_count(), twice.graph().edge_count());
        for node in 0..n {
            prop_assert_eq!(
                once.graph().dependencies_of(&key(node)),
                twice.graph().dependencies_of(&key(node))
            );
        }
    }
}
