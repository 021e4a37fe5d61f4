//! Repository dependency graph.
//!
//! Nodes live in an arena sorted by identity key, so a [`NodeId`] orders the
//! same way as the [`RepoKey`] it stands for. Edges are kept both as a flat,
//! serializable list and as per-node adjacency for traversal.

mod builder;
pub mod dot;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use builder::{BuildOutput, GraphBuilder, ResolutionOptions};

use crate::core::{RepoKey, RepoKind, TargetRef};

/// Index of a node in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Relationship carried by an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// A remote mirroring its upstream.
    PointsTo,
    /// A virtual aggregating a member.
    Includes,
}

impl EdgeKind {
    /// Edge kind originating from a repository of the given kind.
    pub fn for_source(kind: RepoKind) -> Option<Self> {
        match kind {
            RepoKind::Remote => Some(EdgeKind::PointsTo),
            RepoKind::Virtual => Some(EdgeKind::Includes),
            RepoKind::Local => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::PointsTo => "points_to",
            EdgeKind::Includes => "includes",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Graph vertex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub key: RepoKey,
    pub kind: RepoKind,
}

/// Directed, typed edge between two materialized nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub kind: EdgeKind,
    pub source: RepoKey,
    pub target: RepoKey,
}

/// Why a reference could not be turned into an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Unresolved {
    /// No analyzed repository matches; treated as an external endpoint.
    External,
    /// The bare name matches repositories on several other installations.
    Ambiguous { candidates: Vec<RepoKey> },
}

/// Annotation for a reference that is not a graph edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalTarget {
    pub kind: EdgeKind,
    pub source: RepoKey,
    pub target: TargetRef,
    #[serde(flatten)]
    pub unresolved: Unresolved,
}

/// Immutable repository graph for one analysis run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepositoryGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    external_targets: Vec<ExternalTarget>,
    #[serde(skip)]
    index: BTreeMap<RepoKey, NodeId>,
    #[serde(skip)]
    outgoing: Vec<Vec<(NodeId, EdgeKind)>>,
    #[serde(skip)]
    incoming: Vec<Vec<(NodeId, EdgeKind)>>,
}

impl RepositoryGraph {
    /// Assemble a graph from nodes already sorted by key and resolved edges.
    pub(crate) fn from_parts(
        nodes: Vec<Node>,
        edges: Vec<(NodeId, NodeId, EdgeKind)>,
        external_targets: Vec<ExternalTarget>,
    ) -> Self {
        let index: BTreeMap<RepoKey, NodeId> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.key.clone(), NodeId(i)))
            .collect();

        let mut outgoing = vec![Vec::new(); nodes.len()];
        let mut incoming = vec![Vec::new(); nodes.len()];
        let mut flat = Vec::with_capacity(edges.len());
        for (source, target, kind) in edges {
            outgoing[source.0].push((target, kind));
            incoming[target.0].push((source, kind));
            flat.push(Edge {
                kind,
                source: nodes[source.0].key.clone(),
                target: nodes[target.0].key.clone(),
            });
        }

        Self {
            nodes,
            edges: flat,
            external_targets,
            index,
            outgoing,
            incoming,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn external_targets(&self) -> &[ExternalTarget] {
        &self.external_targets
    }

    /// Node ids in key order.
    pub fn node_ids(&self) -> impl DoubleEndedIterator<Item = NodeId> + ExactSizeIterator + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn key(&self, id: NodeId) -> &RepoKey {
        &self.nodes[id.0].key
    }

    pub fn kind(&self, id: NodeId) -> RepoKind {
        self.nodes[id.0].kind
    }

    pub fn id_of(&self, key: &RepoKey) -> Option<NodeId> {
        self.index.get(key).copied()
    }

    pub fn contains(&self, key: &RepoKey) -> bool {
        self.index.contains_key(key)
    }

    /// Outgoing edges of a node, in reference order.
    pub fn successors(&self, id: NodeId) -> &[(NodeId, EdgeKind)] {
        &self.outgoing[id.0]
    }

    /// Incoming edges of a node.
    pub fn predecessors(&self, id: NodeId) -> &[(NodeId, EdgeKind)] {
        &self.incoming[id.0]
    }

    pub fn in_degree(&self, id: NodeId, kind: EdgeKind) -> usize {
        self.incoming[id.0].iter().filter(|(_, k)| *k == kind).count()
    }

    /// Resolve `(source, target)` edge ids to the edge kind, if connected.
    pub fn edge_kind(&self, source: NodeId, target: NodeId) -> Option<EdgeKind> {
        self.outgoing[source.0]
            .iter()
            .find(|(t, _)| *t == target)
            .map(|(_, k)| *k)
    }

    /// Nodes grouped by installation, in key order.
    pub fn instances(&self) -> BTreeMap<&str, Vec<NodeId>> {
        let mut out: BTreeMap<&str, Vec<NodeId>> = BTreeMap::new();
        for id in self.node_ids() {
            out.entry(self.key(id).instance_id.as_str())
                .or_default()
                .push(id);
        }
        out
    }
}
