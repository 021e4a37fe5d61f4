//! Elementary cycle enumeration over the repository graph.
//!
//! The search runs a depth-first walk from every node, keeping the current
//! path as an ordered stack plus a membership table. A walk rooted at `s`
//! only steps onto nodes ordered after `s`, so every elementary cycle is
//! produced exactly once, already rotated to start at its smallest key.
//! Cycles are still deduplicated by canonical rotation before they are
//! reported. Exploration is bounded by a path-length cutoff and a cycle
//! cap; hitting either marks the result as truncated.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::{RepoKey, RepoKind};
use crate::graph::{EdgeKind, NodeId, RepositoryGraph};
use crate::report::{format_path, format_signature, Finding, FindingKind, Severity};

/// Exploration limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleOptions {
    /// Longest path (in repositories) the search will extend.
    pub max_path_length: usize,
    /// Stop after this many distinct cycles.
    pub max_cycles: usize,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            max_path_length: 25,
            max_cycles: 10_000,
        }
    }
}

/// One elementary cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    /// Nodes in traversal order, starting at the smallest key.
    pub repositories: Vec<RepoKey>,
    /// `kinds[i]` is the kind of `repositories[i]`.
    pub kinds: Vec<RepoKind>,
    /// `edge_kinds[i]` is the edge leaving `repositories[i]` for the next
    /// repository (wrapping around to the first).
    pub edge_kinds: Vec<EdgeKind>,
    /// Kinds around the cycle, rotated to lead with virtual, then remote.
    ///
    /// The rotation depends only on the kinds, so this is not index-aligned
    /// with `repositories`; use `kinds` for per-repository lookups.
    pub type_signature: Vec<RepoKind>,
    /// Distinct installations involved, sorted.
    pub instances: Vec<String>,
    pub spans_multiple_instances: bool,
}

impl Cycle {
    fn from_path(graph: &RepositoryGraph, path: &[NodeId]) -> Self {
        let repositories: Vec<RepoKey> = path.iter().map(|&id| graph.key(id).clone()).collect();
        let kinds: Vec<RepoKind> = path.iter().map(|&id| graph.kind(id)).collect();
        let edge_kinds: Vec<EdgeKind> = path
            .iter()
            .enumerate()
            .filter_map(|(i, &id)| graph.edge_kind(id, path[(i + 1) % path.len()]))
            .collect();
        let instances: Vec<String> = repositories
            .iter()
            .map(|k| k.instance_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Self {
            spans_multiple_instances: instances.len() > 1,
            type_signature: canonical_signature(&kinds),
            repositories,
            kinds,
            edge_kinds,
            instances,
        }
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    /// A repository referencing itself.
    pub fn is_self_loop(&self) -> bool {
        self.repositories.len() == 1
    }

    /// Every edge is a virtual including a member.
    pub fn is_includes_only(&self) -> bool {
        !self.edge_kinds.is_empty() && self.edge_kinds.iter().all(|k| *k == EdgeKind::Includes)
    }

    pub fn to_finding(&self) -> Finding {
        let path = format_path(&self.repositories, true);
        let signature = format_signature(&self.type_signature);
        let finding = if self.is_self_loop() {
            Finding::new(
                FindingKind::SelfLoop,
                Severity::Critical,
                self.repositories.clone(),
                format!("Repository references itself: {path}"),
                "Remove the repository from its own upstream or member list",
            )
        } else if self.is_includes_only() {
            Finding::new(
                FindingKind::Loop,
                Severity::Critical,
                self.repositories.clone(),
                format!("Repository loop ({signature}, includes only): {path}"),
                "Remove one virtual repository from another's member list",
            )
        } else {
            Finding::new(
                FindingKind::Loop,
                Severity::Critical,
                self.repositories.clone(),
                format!("Repository loop ({signature}): {path}"),
                "Break the loop by removing one of the includes or points-to relationships",
            )
        };
        finding
            .with_type_signature(self.type_signature.clone())
            .with_instances(self.instances.clone())
            .with_length(self.len())
            .with_edge_kinds(self.edge_kinds.clone())
    }
}

/// All cycles found in one graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSet {
    /// Cycles of two or more repositories, sorted by node sequence.
    pub cycles: Vec<Cycle>,
    /// Degenerate one-repository cycles, sorted by key.
    pub self_loops: Vec<Cycle>,
    /// Exploration stopped early; the sets above may be incomplete.
    pub truncated: bool,
}

impl CycleSet {
    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty() && self.self_loops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cycles.len() + self.self_loops.len()
    }

    /// Every cycle, self-loops included.
    pub fn iter(&self) -> impl Iterator<Item = &Cycle> {
        self.cycles.iter().chain(self.self_loops.iter())
    }

    /// Keys of every repository on some cycle.
    pub fn members(&self) -> BTreeSet<&RepoKey> {
        self.iter().flat_map(|c| c.repositories.iter()).collect()
    }

    /// `loop`, `self_loop` and truncation findings.
    pub fn findings(&self, options: &CycleOptions) -> Vec<Finding> {
        let mut findings: Vec<Finding> = self.iter().map(Cycle::to_finding).collect();
        if self.truncated {
            findings.push(Finding::new(
                FindingKind::CycleSearchTruncated,
                Severity::Low,
                Vec::new(),
                format!(
                    "Cycle search stopped early (max path length {}, max cycles {}); {} cycle(s) reported so far",
                    options.max_path_length,
                    options.max_cycles,
                    self.len()
                ),
                "Raise [cycles] max_path_length or max_cycles to search exhaustively",
            ));
        }
        findings
    }
}

/// Rotate a node sequence to start at its smallest element.
pub fn canonicalize<T: Ord + Clone>(cycle: &[T]) -> Vec<T> {
    let Some(start) = cycle
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(i, _)| i)
    else {
        return Vec::new();
    };
    let mut out = cycle.to_vec();
    out.rotate_left(start);
    out
}

fn signature_rank(kind: RepoKind) -> u8 {
    match kind {
        RepoKind::Virtual => 0,
        RepoKind::Remote => 1,
        RepoKind::Local => 2,
    }
}

/// Rotation of the kind sequence that leads with virtual, then remote, kinds.
///
/// Independent of repository names, so loops of the same shape share a
/// signature.
pub fn canonical_signature(kinds: &[RepoKind]) -> Vec<RepoKind> {
    let ranks: Vec<u8> = kinds.iter().map(|&k| signature_rank(k)).collect();
    (0..kinds.len())
        .min_by(|&a, &b| {
            let rot_a = ranks[a..].iter().chain(&ranks[..a]);
            let rot_b = ranks[b..].iter().chain(&ranks[..b]);
            rot_a.cmp(rot_b)
        })
        .map(|start| {
            let mut out = kinds.to_vec();
            out.rotate_left(start);
            out
        })
        .unwrap_or_default()
}

/// Enumerates elementary cycles.
#[derive(Debug, Clone, Default)]
pub struct CycleDetector {
    options: CycleOptions,
}

struct Search<'a> {
    graph: &'a RepositoryGraph,
    options: CycleOptions,
    path: Vec<NodeId>,
    on_path: Vec<bool>,
    seen: BTreeSet<Vec<NodeId>>,
    found: Vec<Vec<NodeId>>,
    truncated: bool,
}

impl Search<'_> {
    fn full(&self) -> bool {
        self.found.len() >= self.options.max_cycles
    }

    /// Stopped because a cycle beyond the cap was found.
    fn capped(&self) -> bool {
        self.truncated && self.full()
    }

    fn emit(&mut self) {
        let canonical = canonicalize(&self.path);
        if self.seen.contains(&canonical) {
            return;
        }
        if self.full() {
            self.truncated = true;
            return;
        }
        self.seen.insert(canonical.clone());
        self.found.push(canonical);
    }

    fn walk(&mut self, start: NodeId, current: NodeId) {
        for &(next, _) in self.graph.successors(current) {
            if self.capped() {
                return;
            }
            if next == start {
                if self.path.len() >= 2 {
                    self.emit();
                }
                continue;
            }
            if next < start || self.on_path[next.index()] {
                continue;
            }
            if self.path.len() >= self.options.max_path_length {
                self.truncated = true;
                continue;
            }
            self.path.push(next);
            self.on_path[next.index()] = true;
            self.walk(start, next);
            self.on_path[next.index()] = false;
            self.path.pop();
        }
    }
}

impl CycleDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CycleOptions) -> Self {
        Self { options }
    }

    pub fn with_max_path_length(mut self, max: usize) -> Self {
        self.options.max_path_length = max;
        self
    }

    pub fn with_max_cycles(mut self, max: usize) -> Self {
        self.options.max_cycles = max;
        self
    }

    pub fn options(&self) -> &CycleOptions {
        &self.options
    }

    pub fn detect(&self, graph: &RepositoryGraph) -> CycleSet {
        let mut search = Search {
            graph,
            options: self.options,
            path: Vec::new(),
            on_path: vec![false; graph.node_count()],
            seen: BTreeSet::new(),
            found: Vec::new(),
            truncated: false,
        };

        for start in graph.node_ids() {
            if search.capped() {
                break;
            }
            search.path.push(start);
            search.on_path[start.index()] = true;
            search.walk(start, start);
            search.on_path[start.index()] = false;
            search.path.pop();
        }

        let self_loops: Vec<Cycle> = graph
            .node_ids()
            .filter(|&id| graph.successors(id).iter().any(|&(t, _)| t == id))
            .map(|id| Cycle::from_path(graph, &[id]))
            .collect();

        // NodeId order is key order, so this sorts by repository keys.
        search.found.sort();
        let cycles: Vec<Cycle> = search
            .found
            .iter()
            .map(|path| Cycle::from_path(graph, path))
            .collect();

        if search.truncated {
            tracing::warn!(
                "Cycle search truncated after {} cycles (max path length {}, max cycles {})",
                cycles.len(),
                self.options.max_path_length,
                self.options.max_cycles
            );
        }
        tracing::info!(
            "Detected {} repository loops and {} self-references",
            cycles.len(),
            self_loops.len()
        );

        CycleSet {
            cycles,
            self_loops,
            truncated: search.truncated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RepositoryDescriptor, TargetRef};
    use crate::graph::GraphBuilder;

    fn key(instance: &str, name: &str) -> RepoKey {
        RepoKey::new(instance, name)
    }

    fn virt(instance: &str, name: &str, members: &[&str]) -> RepositoryDescriptor {
        RepositoryDescriptor::virtual_repo(
            instance,
            name,
            members.iter().map(|m| TargetRef::bare(*m)).collect(),
        )
    }

    fn detect(descriptors: Vec<RepositoryDescriptor>) -> CycleSet {
        let graph = GraphBuilder::new().build(descriptors).graph;
        CycleDetector::new().detect(&graph)
    }

    #[test]
    fn test_canonicalize_rotates_to_smallest() {
        assert_eq!(canonicalize(&["b", "c", "a"]), vec!["a", "b", "c"]);
        assert_eq!(canonicalize(&["a", "b"]), vec!["a", "b"]);
        assert_eq!(canonicalize::<u8>(&[]), Vec::<u8>::new());
    }

    #[test]
    fn test_canonical_signature() {
        use RepoKind::*;
        assert_eq!(canonical_signature(&[Remote, Virtual]), vec![Virtual, Remote]);
        assert_eq!(canonical_signature(&[Virtual, Virtual]), vec![Virtual, Virtual]);
        assert_eq!(
            canonical_signature(&[Remote, Virtual, Remote, Virtual, Virtual]),
            vec![Virtual, Virtual, Remote, Virtual, Remote]
        );
    }

    #[test]
    fn test_no_cycles_in_chain() {
        let set = detect(vec![
            virt("a", "v1", &["v2"]),
            virt("a", "v2", &["l"]),
            RepositoryDescriptor::local("a", "l"),
        ]);
        assert!(set.is_empty());
        assert!(!set.truncated);
        assert!(set.findings(&CycleOptions::default()).is_empty());
    }

    #[test]
    fn test_two_node_cycle() {
        let set = detect(vec![
            virt("a", "v", &["r"]),
            RepositoryDescriptor::remote("a", "r", Some(TargetRef::bare("v"))),
        ]);
        assert_eq!(set.cycles.len(), 1);
        let cycle = &set.cycles[0];
        assert_eq!(cycle.repositories, vec![key("a", "r"), key("a", "v")]);
        assert_eq!(cycle.type_signature, vec![RepoKind::Virtual, RepoKind::Remote]);
        assert_eq!(cycle.kinds, vec![RepoKind::Remote, RepoKind::Virtual]);
        assert_eq!(cycle.edge_kinds, vec![EdgeKind::PointsTo, EdgeKind::Includes]);
        assert!(!cycle.is_includes_only());
        assert!(!cycle.spans_multiple_instances);
        assert_eq!(cycle.instances, vec!["a".to_string()]);
    }

    #[test]
    fn test_triangle_reported_once() {
        let set = detect(vec![
            virt("a", "x", &["y"]),
            virt("a", "y", &["z"]),
            virt("a", "z", &["x"]),
        ]);
        assert_eq!(set.cycles.len(), 1);
        assert_eq!(
            set.cycles[0].repositories,
            vec![key("a", "x"), key("a", "y"), key("a", "z")]
        );
    }

    #[test]
    fn test_overlapping_cycles_all_found() {
        // x <-> y, y <-> z, x -> y -> z -> x
        let set = detect(vec![
            virt("a", "x", &["y"]),
            virt("a", "y", &["x", "z"]),
            virt("a", "z", &["y", "x"]),
        ]);
        let paths: Vec<Vec<String>> = set
            .cycles
            .iter()
            .map(|c| c.repositories.iter().map(|k| k.name.clone()).collect())
            .collect();
        assert_eq!(
            paths,
            vec![
                vec!["x".to_string(), "y".to_string()],
                vec!["x".to_string(), "y".to_string(), "z".to_string()],
                vec!["y".to_string(), "z".to_string()],
            ]
        );
    }

    #[test]
    fn test_self_loop_is_separate() {
        let set = detect(vec![virt("a", "v", &["v", "w"]), virt("a", "w", &["v"])]);
        assert_eq!(set.self_loops.len(), 1);
        assert!(set.self_loops[0].is_self_loop());
        assert_eq!(set.cycles.len(), 1);
        let kinds: Vec<FindingKind> = set
            .findings(&CycleOptions::default())
            .iter()
            .map(|f| f.kind)
            .collect();
        assert_eq!(kinds, vec![FindingKind::Loop, FindingKind::SelfLoop]);
    }

    #[test]
    fn test_cross_instance_flag() {
        let set = detect(vec![
            RepositoryDescriptor::virtual_repo("art2", "npm-virt", vec![TargetRef::qualified("art1", "npm-virt")]),
            RepositoryDescriptor::virtual_repo("art1", "npm-virt", vec![TargetRef::qualified("art2", "npm-virt")]),
        ]);
        assert_eq!(set.cycles.len(), 1);
        assert!(set.cycles[0].spans_multiple_instances);
        assert_eq!(set.cycles[0].instances, vec!["art1".to_string(), "art2".to_string()]);
        assert_eq!(set.cycles[0].repositories[0], key("art1", "npm-virt"));
    }

    #[test]
    fn test_path_cutoff_truncates() {
        // A 4-cycle cannot be closed with a 3-node path budget.
        let descriptors = vec![
            virt("a", "n1", &["n2"]),
            virt("a", "n2", &["n3"]),
            virt("a", "n3", &["n4"]),
            virt("a", "n4", &["n1"]),
        ];
        let graph = GraphBuilder::new().build(descriptors).graph;
        let set = CycleDetector::new().with_max_path_length(3).detect(&graph);
        assert!(set.cycles.is_empty());
        assert!(set.truncated);

        let findings = set.findings(&CycleOptions {
            max_path_length: 3,
            max_cycles: 10,
        });
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::CycleSearchTruncated);

        let set = CycleDetector::new().with_max_path_length(4).detect(&graph);
        assert_eq!(set.cycles.len(), 1);
        assert!(!set.truncated);
    }

    #[test]
    fn test_max_cycles_truncates() {
        let graph = GraphBuilder::new()
            .build(vec![
                virt("a", "x", &["y"]),
                virt("a", "y", &["x", "z"]),
                virt("a", "z", &["y"]),
            ])
            .graph;

        let set = CycleDetector::new().with_max_cycles(1).detect(&graph);
        assert_eq!(set.cycles.len(), 1);
        assert!(set.truncated);

        // Reaching the cap exactly is not a truncation.
        let set = CycleDetector::new().with_max_cycles(2).detect(&graph);
        assert_eq!(set.cycles.len(), 2);
        assert!(!set.truncated);
    }

    #[test]
    fn test_loop_finding_payload() {
        let set = detect(vec![
            virt("a", "v", &["r"]),
            RepositoryDescriptor::remote("a", "r", Some(TargetRef::bare("v"))),
        ]);
        let finding = set.cycles[0].to_finding();
        assert_eq!(finding.kind, FindingKind::Loop);
        assert_eq!(finding.severity, Severity::Critical);
        assert_eq!(finding.details.length, Some(2));
        assert!(finding.message.contains("a:r -> a:v -> a:r"));
        assert!(finding.message.contains("virtual, remote"));
        assert_eq!(finding.details.includes_only, Some(false));
        assert_eq!(
            finding.details.edge_kinds,
            Some(vec![EdgeKind::PointsTo, EdgeKind::Includes])
        );
    }

    #[test]
    fn test_includes_only_loop() {
        let set = detect(vec![
            virt("a", "x", &["y"]),
            virt("a", "y", &["z"]),
            virt("a", "z", &["x"]),
        ]);
        let cycle = &set.cycles[0];
        assert_eq!(cycle.edge_kinds, vec![EdgeKind::Includes; 3]);
        assert!(cycle.is_includes_only());

        let finding = cycle.to_finding();
        assert_eq!(finding.details.includes_only, Some(true));
        assert!(finding.message.contains("includes only"));
    }

    #[test]
    fn test_kinds_follow_repositories() {
        // Key order puts the remote first, the signature puts the virtual first.
        let set = detect(vec![
            virt("a", "b-virtual", &["a-remote"]),
            RepositoryDescriptor::remote("a", "a-remote", Some(TargetRef::bare("b-virtual"))),
        ]);
        let cycle = &set.cycles[0];
        assert_eq!(cycle.repositories[0], key("a", "a-remote"));
        assert_eq!(cycle.kinds[0], RepoKind::Remote);
        assert_eq!(cycle.type_signature[0], RepoKind::Virtual);
    }
}
