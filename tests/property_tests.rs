use std::collections::BTreeSet;

use proptest::prelude::*;

use loopscan::config::Config;
use loopscan::core::{RepoKey, RepositoryDescriptor, TargetRef};
use loopscan::cycles::{canonicalize, CycleDetector};
use loopscan::graph::{GraphBuilder, RepositoryGraph};
use loopscan::report::FindingKind;

/// Virtual repositories spread over two installations with arbitrary
/// membership lists, so any directed graph can be expressed.
fn descriptors(adjacency: &[Vec<usize>]) -> Vec<RepositoryDescriptor> {
    let n = adjacency.len();
    adjacency
        .iter()
        .enumerate()
        .map(|(i, targets)| {
            let refs = targets
                .iter()
                .map(|t| t % n)
                .map(|t| TargetRef::qualified(instance(t), format!("repo-{t}")))
                .collect();
            RepositoryDescriptor::virtual_repo(instance(i), format!("repo-{i}"), refs)
        })
        .collect()
}

fn instance(i: usize) -> String {
    format!("art{}", i % 2)
}

fn graph(adjacency: &[Vec<usize>]) -> RepositoryGraph {
    GraphBuilder::new().build(descriptors(adjacency)).graph
}

fn adjacency_strategy() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..7).prop_flat_map(|n| prop::collection::vec(prop::collection::vec(0..n, 0..4), n))
}

/// Edges only point to later nodes.
fn dag_strategy() -> impl Strategy<Value = Vec<Vec<usize>>> {
    adjacency_strategy().prop_map(|adj| {
        let n = adj.len();
        adj.into_iter()
            .enumerate()
            .map(|(i, targets)| {
                targets
                    .into_iter()
                    .filter(|t| *t > i && *t < n)
                    .collect()
            })
            .collect()
    })
}

fn has_edge(graph: &RepositoryGraph, from: &RepoKey, to: &RepoKey) -> bool {
    match (graph.id_of(from), graph.id_of(to)) {
        (Some(a), Some(b)) => graph.edge_kind(a, b).is_some(),
        _ => false,
    }
}

fn key(i: usize) -> RepoKey {
    RepoKey::new(instance(i), format!("repo-{i}"))
}

fn extend_path(
    path: &mut Vec<usize>,
    n: usize,
    has: &dyn Fn(usize, usize) -> bool,
    found: &mut Vec<Vec<usize>>,
) {
    let (first, last) = (path[0], path[path.len() - 1]);
    if has(last, first) {
        found.push(path.clone());
    }
    for next in 0..n {
        if !path.contains(&next) && has(last, next) {
            path.push(next);
            extend_path(path, n, has, found);
            path.pop();
        }
    }
}

/// Every simple cycle of the adjacency list, self-loops included, found by
/// walking every simple path from every node.
fn brute_force_cycles(adjacency: &[Vec<usize>]) -> BTreeSet<Vec<RepoKey>> {
    let n = adjacency.len();
    let has = |a: usize, b: usize| adjacency[a].iter().any(|t| t % n == b);
    let mut found = Vec::new();
    for start in 0..n {
        extend_path(&mut vec![start], n, &has, &mut found);
    }
    found
        .into_iter()
        .map(|path| canonicalize(&path.into_iter().map(key).collect::<Vec<_>>()))
        .collect()
}

// ---------------------------------------------------------------------------
// Cycle detector properties
// ---------------------------------------------------------------------------

proptest! {
    /// Rotating a reported cycle and re-canonicalizing gives it back unchanged.
    #[test]
    fn cycles_are_rotation_invariant(adjacency in adjacency_strategy(), shift in 0usize..8) {
        let graph = graph(&adjacency);
        let cycles = CycleDetector::new().detect(&graph);
        for cycle in cycles.iter() {
            let mut rotated = cycle.repositories.clone();
            let len = rotated.len();
            rotated.rotate_left(shift % len);
            prop_assert_eq!(canonicalize(&rotated), cycle.repositories.clone());
        }
    }

    /// No cycle is reported twice.
    #[test]
    fn cycles_are_unique(adjacency in adjacency_strategy()) {
        let graph = graph(&adjacency);
        let cycles = CycleDetector::new().detect(&graph);
        let distinct: BTreeSet<Vec<RepoKey>> =
            cycles.iter().map(|c| c.repositories.clone()).collect();
        prop_assert_eq!(distinct.len(), cycles.len());
    }

    /// The detector finds exactly the simple cycles an exhaustive walk finds.
    #[test]
    fn detector_finds_every_simple_cycle(adjacency in adjacency_strategy()) {
        let graph = graph(&adjacency);
        let cycles = CycleDetector::new().detect(&graph);
        prop_assert!(!cycles.truncated);
        let detected: BTreeSet<Vec<RepoKey>> =
            cycles.iter().map(|c| c.repositories.clone()).collect();
        prop_assert_eq!(detected, brute_force_cycles(&adjacency));
    }

    /// Every reported cycle is elementary and follows real edges.
    #[test]
    fn cycles_follow_edges(adjacency in adjacency_strategy()) {
        let graph = graph(&adjacency);
        let cycles = CycleDetector::new().detect(&graph);
        for cycle in cycles.iter() {
            let members: BTreeSet<&RepoKey> = cycle.repositories.iter().collect();
            prop_assert_eq!(members.len(), cycle.len());
            let n = cycle.len();
            for i in 0..n {
                let from = &cycle.repositories[i];
                let to = &cycle.repositories[(i + 1) % n];
                prop_assert!(has_edge(&graph, from, to), "missing edge {} -> {}", from, to);
            }
        }
    }

    /// A graph with no back edges has no loops of any kind.
    #[test]
    fn acyclic_graphs_have_no_loops(adjacency in dag_strategy()) {
        let analysis = loopscan::analyze(descriptors(&adjacency), &Config::default());
        prop_assert!(analysis.cycles.is_empty());
        prop_assert_eq!(analysis.report.count(FindingKind::Loop), 0);
        prop_assert_eq!(analysis.report.count(FindingKind::SelfLoop), 0);
        prop_assert_eq!(analysis.report.count(FindingKind::CrossInstanceLoop), 0);
    }

    /// Two runs over the same input produce identical reports.
    #[test]
    fn pipeline_is_idempotent(adjacency in adjacency_strategy()) {
        let config = Config::default();
        let first = loopscan::analyze(descriptors(&adjacency), &config);
        let second = loopscan::analyze(descriptors(&adjacency), &config);
        prop_assert_eq!(first.report, second.report);
    }

    /// Descriptor order never changes the outcome.
    #[test]
    fn pipeline_ignores_input_order(adjacency in adjacency_strategy()) {
        let config = Config::default();
        let forward = descriptors(&adjacency);
        let mut backward = forward.clone();
        backward.reverse();
        prop_assert_eq!(
            loopscan::analyze(forward, &config).report,
            loopscan::analyze(backward, &config).report
        );
    }

    /// Every cross-instance loop finding matches a loop finding.
    #[test]
    fn cross_instance_loops_are_loops(adjacency in adjacency_strategy()) {
        let analysis = loopscan::analyze(descriptors(&adjacency), &Config::default());
        let loops: BTreeSet<Vec<RepoKey>> = analysis
            .report
            .of_kind(FindingKind::Loop)
            .iter()
            .map(|f| f.repositories.clone())
            .collect();
        for finding in analysis.report.of_kind(FindingKind::CrossInstanceLoop) {
            prop_assert!(loops.contains(&finding.repositories));
        }
    }
}
