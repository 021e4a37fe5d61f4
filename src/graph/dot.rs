//! Graphviz DOT export.
//!
//! Repositories are clustered per installation and colored by kind: local
//! green, remote blue, virtual red. Unresolved references are drawn as grey
//! dashed edges to plaintext endpoints.

use std::collections::BTreeMap;
use std::fmt::Write;

use super::{EdgeKind, RepositoryGraph, Unresolved};
use crate::core::{RepoKey, RepoKind};

fn node_color(kind: RepoKind) -> &'static str {
    match kind {
        RepoKind::Local => "green",
        RepoKind::Remote => "blue",
        RepoKind::Virtual => "red",
    }
}

fn edge_color(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::PointsTo => "blue",
        EdgeKind::Includes => "red",
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn node_id(key: &RepoKey) -> String {
    format!("\"{}\"", escape(&key.to_string()))
}

/// Render the graph as a DOT document. Output depends only on the graph.
pub fn to_dot(graph: &RepositoryGraph) -> String {
    let mut out = String::from("digraph repositories {\n");
    out.push_str("    rankdir=LR;\n");
    out.push_str("    node [shape=box, style=\"rounded,filled\", fontcolor=white];\n\n");

    for (index, (instance, ids)) in graph.instances().into_iter().enumerate() {
        let _ = writeln!(out, "    subgraph cluster_{} {{", index);
        let _ = writeln!(out, "        label=\"{}\";", escape(instance));
        for id in ids {
            let node = graph.node(id);
            let _ = writeln!(
                out,
                "        {} [label=\"{}\", fillcolor={}];",
                node_id(&node.key),
                escape(&node.key.name),
                node_color(node.kind)
            );
        }
        out.push_str("    }\n\n");
    }

    for edge in graph.edges() {
        let _ = writeln!(
            out,
            "    {} -> {} [label=\"{}\", color={}];",
            node_id(&edge.source),
            node_id(&edge.target),
            edge.kind,
            edge_color(edge.kind)
        );
    }

    // One plaintext node per distinct unresolved target.
    let mut endpoints: BTreeMap<String, usize> = BTreeMap::new();
    for external in graph.external_targets() {
        let next = endpoints.len();
        endpoints.entry(external.target.to_string()).or_insert(next);
    }
    if !endpoints.is_empty() {
        out.push('\n');
    }
    for (target, index) in &endpoints {
        let _ = writeln!(
            out,
            "    ext_{} [label=\"{}\", shape=plaintext, style=\"\", fontcolor=grey40];",
            index,
            escape(target)
        );
    }
    for external in graph.external_targets() {
        let index = endpoints[&external.target.to_string()];
        let label = match &external.unresolved {
            Unresolved::External => external.kind.as_str().to_string(),
            Unresolved::Ambiguous { .. } => format!("{} (ambiguous)", external.kind),
        };
        let _ = writeln!(
            out,
            "    {} -> ext_{} [label=\"{}\", color=grey, style=dashed];",
            node_id(&external.source),
            index,
            label
        );
    }

    out.push_str("}\n");
    out
}
