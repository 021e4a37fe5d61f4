//! Local repositories no virtual repository includes.

use crate::core::{RepoKind, Rule as RuleTrait, RuleContext};
use crate::graph::EdgeKind;
use crate::report::{Finding, FindingKind, Severity};

#[derive(Debug, Default, Clone, Copy)]
pub struct Rule;

impl Rule {
    pub fn new() -> Self {
        Self
    }
}

impl RuleTrait for Rule {
    fn name(&self) -> &'static str {
        "isolated_repository"
    }

    fn description(&self) -> &'static str {
        "Local repositories not included in any virtual repository"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let graph = ctx.graph;
        graph
            .node_ids()
            .filter(|&id| graph.kind(id) == RepoKind::Local)
            .filter(|&id| graph.in_degree(id, EdgeKind::Includes) == 0)
            .map(|id| {
                let key = graph.key(id);
                Finding::new(
                    FindingKind::IsolatedRepository,
                    Severity::Low,
                    vec![key.clone()],
                    format!("Local repository {key} is not included in any virtual repository"),
                    "Add it to a virtual repository or remove it if it is unused",
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RepoKey, RepositoryDescriptor, TargetRef};
    use crate::rules::test_support::evaluate;

    #[test]
    fn test_unreferenced_local_fires() {
        let findings = evaluate(&Rule::new(), vec![RepositoryDescriptor::local("a", "libs")]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].repositories, vec![RepoKey::new("a", "libs")]);
    }

    #[test]
    fn test_included_local_does_not_fire() {
        let findings = evaluate(
            &Rule::new(),
            vec![
                RepositoryDescriptor::local("a", "libs"),
                RepositoryDescriptor::virtual_repo("a", "v", vec![TargetRef::bare("libs")]),
            ],
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn test_points_to_does_not_count_as_inclusion() {
        let findings = evaluate(
            &Rule::new(),
            vec![
                RepositoryDescriptor::local("a", "libs"),
                RepositoryDescriptor::remote("b", "mirror", Some(TargetRef::qualified("a", "libs"))),
            ],
        );
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_unreferenced_remote_and_virtual_ignored() {
        let findings = evaluate(
            &Rule::new(),
            vec![
                RepositoryDescriptor::remote("a", "r", None),
                RepositoryDescriptor::virtual_repo("a", "v", Vec::new()),
            ],
        );
        assert!(findings.is_empty());
    }
}
