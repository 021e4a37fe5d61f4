//! Remote repositories whose upstream is another remote.
//!
//! A remote has at most one upstream, so remote-to-remote edges form simple
//! chains. Each chain is reported once from its head, the remote that no
//! other remote points to. Chains made only of remotes that close on
//! themselves have no head and are left to loop detection.

use std::collections::BTreeSet;

use crate::core::{RepoKind, Rule as RuleTrait, RuleContext};
use crate::graph::{EdgeKind, NodeId, RepositoryGraph};
use crate::report::{format_path, Finding, FindingKind, Severity};

pub const RECOMMENDATION: &str =
    "Point the first remote directly at the upstream the chain finally reaches";

#[derive(Debug, Default, Clone, Copy)]
pub struct Rule;

impl Rule {
    pub fn new() -> Self {
        Self
    }
}

/// Remote upstream of `id`, if `id` is a remote mirroring another remote.
fn remote_upstream(graph: &RepositoryGraph, id: NodeId) -> Option<NodeId> {
    if graph.kind(id) != RepoKind::Remote {
        return None;
    }
    graph
        .successors(id)
        .iter()
        .find(|&&(target, kind)| kind == EdgeKind::PointsTo && graph.kind(target) == RepoKind::Remote)
        .map(|&(target, _)| target)
}

fn is_head(graph: &RepositoryGraph, id: NodeId) -> bool {
    remote_upstream(graph, id).is_some()
        && !graph
            .predecessors(id)
            .iter()
            .any(|&(source, _)| remote_upstream(graph, source) == Some(id))
}

impl RuleTrait for Rule {
    fn name(&self) -> &'static str {
        "remote_chain"
    }

    fn description(&self) -> &'static str {
        "Remote repositories pointing to other remote repositories"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let graph = ctx.graph;

        graph
            .node_ids()
            .filter(|&id| is_head(graph, id))
            .map(|head| {
                let mut visited = BTreeSet::new();
                let mut chain = Vec::new();
                let mut cursor = Some(head);
                while let Some(id) = cursor {
                    if !visited.insert(id) {
                        break;
                    }
                    chain.push(graph.key(id).clone());
                    cursor = remote_upstream(graph, id);
                }
                Finding::new(
                    FindingKind::RemoteChain,
                    Severity::Low,
                    chain.clone(),
                    format!(
                        "Chain of {} remote repositories: {}",
                        chain.len(),
                        format_path(&chain, false)
                    ),
                    RECOMMENDATION,
                )
                .with_length(chain.len())
            })
            .collect()
    }
}
