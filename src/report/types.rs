//! Finding types shared by the builder, the cycle detector and the rules.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{RepoKey, RepoKind};
use crate::graph::EdgeKind;

/// Category of a detected defect.
///
/// Declaration order is the report's grouping order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    Loop,
    SelfLoop,
    CrossInstanceLoop,
    RemoteToVirtual,
    Shadowing,
    LongChain,
    RemoteChain,
    IsolatedRepository,
    DuplicateRepository,
    AmbiguousReference,
    InvalidDescriptor,
    CycleSearchTruncated,
}

impl FindingKind {
    pub const ALL: [FindingKind; 12] = [
        FindingKind::Loop,
        FindingKind::SelfLoop,
        FindingKind::CrossInstanceLoop,
        FindingKind::RemoteToVirtual,
        FindingKind::Shadowing,
        FindingKind::LongChain,
        FindingKind::RemoteChain,
        FindingKind::IsolatedRepository,
        FindingKind::DuplicateRepository,
        FindingKind::AmbiguousReference,
        FindingKind::InvalidDescriptor,
        FindingKind::CycleSearchTruncated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::Loop => "loop",
            FindingKind::SelfLoop => "self_loop",
            FindingKind::CrossInstanceLoop => "cross_instance_loop",
            FindingKind::RemoteToVirtual => "remote_to_virtual",
            FindingKind::Shadowing => "shadowing",
            FindingKind::LongChain => "long_chain",
            FindingKind::RemoteChain => "remote_chain",
            FindingKind::IsolatedRepository => "isolated_repository",
            FindingKind::DuplicateRepository => "duplicate_repository",
            FindingKind::AmbiguousReference => "ambiguous_reference",
            FindingKind::InvalidDescriptor => "invalid_descriptor",
            FindingKind::CycleSearchTruncated => "cycle_search_truncated",
        }
    }

    /// Human-readable group title.
    pub fn title(&self) -> &'static str {
        match self {
            FindingKind::Loop => "Repository loops",
            FindingKind::SelfLoop => "Self-referencing repositories",
            FindingKind::CrossInstanceLoop => "Cross-instance loops",
            FindingKind::RemoteToVirtual => "Remote repositories pointing to virtual repositories",
            FindingKind::Shadowing => "Shadowed repository names",
            FindingKind::LongChain => "Long dependency chains",
            FindingKind::RemoteChain => "Remote repositories mirroring remotes",
            FindingKind::IsolatedRepository => "Isolated local repositories",
            FindingKind::DuplicateRepository => "Duplicate repository descriptors",
            FindingKind::AmbiguousReference => "Ambiguous references",
            FindingKind::InvalidDescriptor => "Invalid descriptors",
            FindingKind::CycleSearchTruncated => "Cycle search truncated",
        }
    }

    /// Structural input problems rather than topology defects.
    pub fn is_diagnostic(&self) -> bool {
        matches!(
            self,
            FindingKind::DuplicateRepository
                | FindingKind::AmbiguousReference
                | FindingKind::InvalidDescriptor
                | FindingKind::CycleSearchTruncated
        )
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn weight(&self) -> u32 {
        match self {
            Severity::Critical => 4,
            Severity::High => 3,
            Severity::Medium => 2,
            Severity::Low => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific payload of a finding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_signature: Option<Vec<RepoKind>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instances: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    /// Edge kinds around a loop, `edge_kinds[i]` leaving `repositories[i]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_kinds: Option<Vec<EdgeKind>>,
    /// The loop is made of `includes` edges only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub includes_only: Option<bool>,
}

/// One detected defect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub severity: Severity,
    /// Involved repositories, in the order relevant to the kind.
    pub repositories: Vec<RepoKey>,
    pub message: String,
    pub recommendation: String,
    #[serde(default)]
    pub details: FindingDetails,
}

impl Finding {
    pub fn new(
        kind: FindingKind,
        severity: Severity,
        repositories: Vec<RepoKey>,
        message: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            repositories,
            message: message.into(),
            recommendation: recommendation.into(),
            details: FindingDetails::default(),
        }
    }

    pub fn with_type_signature(mut self, signature: Vec<RepoKind>) -> Self {
        self.details.type_signature = Some(signature);
        self
    }

    pub fn with_instances(mut self, instances: Vec<String>) -> Self {
        self.details.instances = Some(instances);
        self
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.details.length = Some(length);
        self
    }

    pub fn with_edge_kinds(mut self, edge_kinds: Vec<EdgeKind>) -> Self {
        self.details.includes_only = Some(edge_kinds.iter().all(|k| *k == EdgeKind::Includes));
        self.details.edge_kinds = Some(edge_kinds);
        self
    }

    /// A descriptor excluded from the graph; `key` is `None` when the record
    /// was too malformed to identify.
    pub fn invalid_descriptor(key: Option<RepoKey>, reason: &str) -> Self {
        let label = key
            .as_ref()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "<unidentified>".to_string());
        Finding::new(
            FindingKind::InvalidDescriptor,
            Severity::High,
            key.into_iter().collect(),
            format!("Descriptor {label} was excluded: {reason}"),
            "Fix the repository definition so it matches the local/remote/virtual rules",
        )
    }

    /// Stable ordering: kind, then involved keys, then message.
    pub fn sort_key(&self) -> (FindingKind, &[RepoKey], &str) {
        (self.kind, &self.repositories, &self.message)
    }
}

/// Format a repository path for display, closing it when it is a loop.
pub fn format_path(repositories: &[RepoKey], closed: bool) -> String {
    let mut parts: Vec<String> = repositories.iter().map(|k| k.to_string()).collect();
    if closed {
        if let Some(first) = repositories.first() {
            parts.push(first.to_string());
        }
    }
    parts.join(" -> ")
}

/// Format a type signature as `virtual, remote`.
pub fn format_signature(signature: &[RepoKind]) -> String {
    signature
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_order_matches_declaration() {
        let mut kinds = FindingKind::ALL.to_vec();
        kinds.reverse();
        kinds.sort();
        assert_eq!(kinds, FindingKind::ALL.to_vec());
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&FindingKind::CrossInstanceLoop).unwrap();
        assert_eq!(json, "\"cross_instance_loop\"");
        for kind in FindingKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_diagnostic_kinds() {
        assert!(FindingKind::DuplicateRepository.is_diagnostic());
        assert!(FindingKind::CycleSearchTruncated.is_diagnostic());
        assert!(!FindingKind::Loop.is_diagnostic());
        assert!(!FindingKind::Shadowing.is_diagnostic());
    }

    #[test]
    fn test_severity_weight() {
        assert!(Severity::Critical.weight() > Severity::High.weight());
        assert!(Severity::High.weight() > Severity::Medium.weight());
        assert!(Severity::Medium.weight() > Severity::Low.weight());
    }

    #[test]
    fn test_format_path() {
        let keys = vec![RepoKey::new("art1", "a"), RepoKey::new("art2", "b")];
        assert_eq!(format_path(&keys, false), "art1:a -> art2:b");
        assert_eq!(format_path(&keys, true), "art1:a -> art2:b -> art1:a");
        assert_eq!(format_path(&[], true), "");
    }

    #[test]
    fn test_format_signature() {
        assert_eq!(
            format_signature(&[RepoKind::Virtual, RepoKind::Remote]),
            "virtual, remote"
        );
    }

    #[test]
    fn test_finding_details_skip_empty() {
        let finding = Finding::new(
            FindingKind::IsolatedRepository,
            Severity::Low,
            vec![RepoKey::new("art1", "libs")],
            "msg",
            "rec",
        );
        let json = serde_json::to_string(&finding).unwrap();
        assert!(json.contains("\"isolated_repository\""));
        assert!(!json.contains("type_signature"));
        assert!(!json.contains("length"));

        let finding = finding.with_length(7);
        let json = serde_json::to_string(&finding).unwrap();
        assert!(json.contains("\"length\":7"));
        assert!(!json.contains("edge_kinds"));
    }

    #[test]
    fn test_with_edge_kinds_sets_includes_only() {
        let finding = Finding::new(FindingKind::Loop, Severity::Critical, Vec::new(), "m", "r")
            .with_edge_kinds(vec![EdgeKind::Includes, EdgeKind::Includes]);
        assert_eq!(finding.details.includes_only, Some(true));

        let finding = finding.with_edge_kinds(vec![EdgeKind::Includes, EdgeKind::PointsTo]);
        assert_eq!(finding.details.includes_only, Some(false));
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["details"]["edge_kinds"][1], "points_to");
    }

    #[test]
    fn test_invalid_descriptor_finding() {
        let finding = Finding::invalid_descriptor(Some(RepoKey::new("a", "x")), "bad kind");
        assert_eq!(finding.kind, FindingKind::InvalidDescriptor);
        assert_eq!(finding.repositories, vec![RepoKey::new("a", "x")]);
        assert!(finding.message.contains("a:x"));

        let finding = Finding::invalid_descriptor(None, "not an object");
        assert!(finding.repositories.is_empty());
        assert!(finding.message.contains("<unidentified>"));
    }
}
