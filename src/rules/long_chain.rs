//! Excessively deep resolution chains.
//!
//! Repositories sharing a loop from the cycle set are merged into one
//! component, so the longest-path search runs on a DAG and a loop counts as a
//! single step. The condensed graph is walked in post-order, which finishes
//! every successor before its predecessor. If the cycle search was truncated
//! some loops may survive condensation; edges back into an unfinished
//! component are then ignored, so lengths stay finite.

use std::collections::BTreeSet;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::DfsPostOrder;

use crate::core::{RepoKey, RepoKind, Rule as RuleTrait, RuleContext};
use crate::cycles::CycleSet;
use crate::graph::{NodeId, RepositoryGraph};
use crate::report::{format_path, Finding, FindingKind, Severity};

/// Default maximum chain length, in repositories.
pub const DEFAULT_MAX_LENGTH: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    max_length: usize,
}

impl Default for Rule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule {
    pub fn new() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
        }
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

/// A longest chain starting at some root component.
///
/// A collapsed loop appears once, under its smallest key. The entry after it
/// is reached from some member of the loop, not necessarily from that key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub repositories: Vec<RepoKey>,
    /// Whether any step on the chain stands for a collapsed loop.
    pub collapses_loop: bool,
}

impl Chain {
    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}

struct Condensed {
    /// Smallest node of each component.
    representative: Vec<NodeId>,
    size: Vec<usize>,
    successors: Vec<BTreeSet<usize>>,
    has_predecessor: Vec<bool>,
    has_outbound_kind: Vec<bool>,
    dag: DiGraph<(), ()>,
}

/// Union-find root; the smaller index always becomes the root.
fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

fn condense(graph: &RepositoryGraph, cycles: &CycleSet) -> Condensed {
    let mut parent: Vec<usize> = (0..graph.node_count()).collect();
    for cycle in &cycles.cycles {
        let ids: Vec<usize> = cycle
            .repositories
            .iter()
            .filter_map(|k| graph.id_of(k))
            .map(NodeId::index)
            .collect();
        for pair in ids.windows(2) {
            let (a, b) = (find(&mut parent, pair[0]), find(&mut parent, pair[1]));
            if a != b {
                parent[a.max(b)] = a.min(b);
            }
        }
    }

    // Roots are the smallest member, so they are numbered before the rest.
    let mut component = vec![0usize; graph.node_count()];
    let mut representative = Vec::new();
    let mut size = Vec::new();
    let mut has_outbound_kind = Vec::new();
    for id in graph.node_ids() {
        let root = find(&mut parent, id.index());
        let c = if root == id.index() {
            representative.push(id);
            size.push(0);
            has_outbound_kind.push(false);
            representative.len() - 1
        } else {
            component[root]
        };
        component[id.index()] = c;
        size[c] += 1;
        has_outbound_kind[c] |= graph.kind(id) != RepoKind::Local;
    }

    let count = representative.len();
    let mut successors = vec![BTreeSet::new(); count];
    let mut has_predecessor = vec![false; count];
    for source in graph.node_ids() {
        for &(target, _) in graph.successors(source) {
            let (cs, ct) = (component[source.index()], component[target.index()]);
            if cs != ct {
                successors[cs].insert(ct);
                has_predecessor[ct] = true;
            }
        }
    }

    let mut dag: DiGraph<(), ()> = DiGraph::with_capacity(count, count);
    let indices: Vec<NodeIndex> = (0..count).map(|_| dag.add_node(())).collect();
    for (c, targets) in successors.iter().enumerate() {
        for &t in targets {
            dag.add_edge(indices[c], indices[t], ());
        }
    }

    Condensed {
        representative,
        size,
        successors,
        has_predecessor,
        has_outbound_kind,
        dag,
    }
}

/// Longest chain from every root component (no predecessors) that contains
/// a remote or virtual repository, ordered by the root's key.
///
/// Loops are taken from `cycles`, which must come from the same graph.
pub fn longest_chains(graph: &RepositoryGraph, cycles: &CycleSet) -> Vec<Chain> {
    if graph.is_empty() {
        return Vec::new();
    }
    let condensed = condense(graph, cycles);
    let count = condensed.representative.len();

    let mut length = vec![1usize; count];
    let mut next: Vec<Option<usize>> = vec![None; count];
    let mut finished = vec![false; count];
    let mut dfs = DfsPostOrder::empty(&condensed.dag);
    for start in condensed.dag.node_indices() {
        if finished[start.index()] {
            continue;
        }
        dfs.move_to(start);
        while let Some(ni) = dfs.next(&condensed.dag) {
            let c = ni.index();
            let best = condensed.successors[c]
                .iter()
                .copied()
                .filter(|&s| finished[s])
                .max_by(|&a, &b| {
                    length[a]
                        .cmp(&length[b])
                        .then_with(|| condensed.representative[b].cmp(&condensed.representative[a]))
                });
            if let Some(s) = best {
                length[c] = length[s] + 1;
                next[c] = Some(s);
            }
            finished[c] = true;
        }
    }

    let mut roots: Vec<usize> = (0..count)
        .filter(|&c| !condensed.has_predecessor[c] && condensed.has_outbound_kind[c])
        .collect();
    roots.sort_by_key(|&c| condensed.representative[c]);

    roots
        .into_iter()
        .map(|root| {
            let mut repositories = Vec::with_capacity(length[root]);
            let mut collapses_loop = false;
            let mut cursor = Some(root);
            while let Some(c) = cursor {
                repositories.push(graph.key(condensed.representative[c]).clone());
                collapses_loop |= condensed.size[c] > 1;
                cursor = next[c];
            }
            Chain {
                repositories,
                collapses_loop,
            }
        })
        .collect()
}

impl RuleTrait for Rule {
    fn name(&self) -> &'static str {
        "long_chain"
    }

    fn description(&self) -> &'static str {
        "Dependency chains longer than the configured threshold"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        longest_chains(ctx.graph, ctx.cycles)
            .into_iter()
            .filter(|chain| chain.len() > self.max_length)
            .map(|chain| {
                let mut message = format!(
                    "Dependency chain of {} repositories (threshold {}): {}",
                    chain.len(),
                    self.max_length,
                    format_path(&chain.repositories, false)
                );
                if chain.collapses_loop {
                    message.push_str(" (loops collapsed to one step)");
                }
                Finding::new(
                    FindingKind::LongChain,
                    Severity::Medium,
                    chain.repositories.clone(),
                    message,
                    "Shorten the chain by pointing closer to the artifact source",
                )
                .with_length(chain.len())
            })
            .collect()
    }
}
