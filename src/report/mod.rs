//! Aggregated analysis report.
//!
//! Findings from the builder, the cycle detector and the rules are merged
//! into groups ordered by kind; within a group findings are ordered by the
//! keys they involve. Identical input yields identical output.

mod types;

use serde::{Deserialize, Serialize};

pub use types::*;

use crate::cycles::CycleSet;
use crate::graph::{ExternalTarget, RepositoryGraph};

/// All findings of one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingGroup {
    pub kind: FindingKind,
    pub title: String,
    pub findings: Vec<Finding>,
}

/// Summary statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub repositories: usize,
    pub instances: usize,
    pub edges: usize,
    pub external_targets: usize,
    pub loops: usize,
    pub cross_instance_loops: usize,
    pub total_findings: usize,
    pub critical_count: usize,
    pub high_count: usize,
    pub medium_count: usize,
    pub low_count: usize,
    pub cycle_search_truncated: bool,
}

/// Final analysis result handed to formatting and visualization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub summary: Summary,
    pub groups: Vec<FindingGroup>,
    pub external_targets: Vec<ExternalTarget>,
}

impl Report {
    /// Aggregate findings into a stably ordered report.
    pub fn new(graph: &RepositoryGraph, cycles: &CycleSet, mut findings: Vec<Finding>) -> Self {
        findings.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let summary = calculate_summary(graph, cycles, &findings);

        let mut groups: Vec<FindingGroup> = Vec::new();
        for finding in findings {
            match groups.last_mut() {
                Some(group) if group.kind == finding.kind => group.findings.push(finding),
                _ => groups.push(FindingGroup {
                    kind: finding.kind,
                    title: finding.kind.title().to_string(),
                    findings: vec![finding],
                }),
            }
        }

        Self {
            summary,
            groups,
            external_targets: graph.external_targets().to_vec(),
        }
    }

    /// All findings in report order.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.groups.iter().flat_map(|g| g.findings.iter())
    }

    /// Findings of one kind.
    pub fn of_kind(&self, kind: FindingKind) -> &[Finding] {
        self.groups
            .iter()
            .find(|g| g.kind == kind)
            .map(|g| g.findings.as_slice())
            .unwrap_or(&[])
    }

    pub fn count(&self, kind: FindingKind) -> usize {
        self.of_kind(kind).len()
    }

    pub fn is_clean(&self) -> bool {
        self.groups.is_empty()
    }
}

fn calculate_summary(graph: &RepositoryGraph, cycles: &CycleSet, findings: &[Finding]) -> Summary {
    let mut summary = Summary {
        repositories: graph.node_count(),
        instances: graph.instances().len(),
        edges: graph.edge_count(),
        external_targets: graph.external_targets().len(),
        loops: cycles.len(),
        cross_instance_loops: cycles
            .cycles
            .iter()
            .filter(|c| c.spans_multiple_instances)
            .count(),
        total_findings: findings.len(),
        cycle_search_truncated: cycles.truncated,
        ..Default::default()
    };

    for finding in findings {
        match finding.severity {
            Severity::Critical => summary.critical_count += 1,
            Severity::High => summary.high_count += 1,
            Severity::Medium => summary.medium_count += 1,
            Severity::Low => summary.low_count += 1,
        }
    }

    summary
}
