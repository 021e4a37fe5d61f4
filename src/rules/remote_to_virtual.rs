//! Remote repositories whose upstream is a virtual repository.
//!
//! A virtual upstream re-exports everything it aggregates, which is how most
//! repository loops start.

use crate::core::{RepoKind, Rule as RuleTrait, RuleContext};
use crate::graph::EdgeKind;
use crate::report::{Finding, FindingKind, Severity};

pub const RECOMMENDATION: &str =
    "Point to a specific local or remote repository instead of the virtual repository";

#[derive(Debug, Default, Clone, Copy)]
pub struct Rule;

impl Rule {
    pub fn new() -> Self {
        Self
    }
}

impl RuleTrait for Rule {
    fn name(&self) -> &'static str {
        "remote_to_virtual"
    }

    fn description(&self) -> &'static str {
        "Remote repositories pointing to a virtual repository"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let graph = ctx.graph;
        let mut findings = Vec::new();

        for source in graph.node_ids() {
            for &(target, kind) in graph.successors(source) {
                if kind != EdgeKind::PointsTo || graph.kind(target) != RepoKind::Virtual {
                    continue;
                }
                let (remote, virt) = (graph.key(source), graph.key(target));
                findings.push(Finding::new(
                    FindingKind::RemoteToVirtual,
                    Severity::High,
                    vec![remote.clone(), virt.clone()],
                    format!("Remote repository {remote} points to virtual repository {virt}"),
                    RECOMMENDATION,
                ));
            }
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RepoKey, RepositoryDescriptor, TargetRef};
    use crate::rules::test_support::evaluate;

    #[test]
    fn test_remote_to_virtual_fires() {
        let findings = evaluate(
            &Rule::new(),
            vec![
                RepositoryDescriptor::remote("inst1", "R", Some(TargetRef::bare("V"))),
                RepositoryDescriptor::virtual_repo("inst1", "V", Vec::new()),
            ],
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::RemoteToVirtual);
        assert_eq!(
            findings[0].repositories,
            vec![RepoKey::new("inst1", "R"), RepoKey::new("inst1", "V")]
        );
        assert_eq!(findings[0].recommendation, RECOMMENDATION);
    }

    #[test]
    fn test_remote_to_remote_and_local_do_not_fire() {
        let findings = evaluate(
            &Rule::new(),
            vec![
                RepositoryDescriptor::remote("a", "r1", Some(TargetRef::bare("r2"))),
                RepositoryDescriptor::remote("a", "r2", Some(TargetRef::bare("l"))),
                RepositoryDescriptor::local("a", "l"),
            ],
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn test_virtual_including_virtual_does_not_fire() {
        let findings = evaluate(
            &Rule::new(),
            vec![
                RepositoryDescriptor::virtual_repo("a", "v1", vec![TargetRef::bare("v2")]),
                RepositoryDescriptor::virtual_repo("a", "v2", Vec::new()),
            ],
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn test_external_upstream_does_not_fire() {
        let findings = evaluate(
            &Rule::new(),
            vec![RepositoryDescriptor::remote(
                "a",
                "r",
                Some(TargetRef::bare("https://registry.npmjs.org")),
            )],
        );
        assert!(findings.is_empty());
    }
}
