//! Repository names reused across installations.

use std::collections::BTreeMap;

use crate::core::{RepoKey, Rule as RuleTrait, RuleContext};
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
        "shadowing"
    }

    fn description(&self) -> &'static str {
        "Repositories sharing a name across installations"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let mut by_name: BTreeMap<&str, Vec<&RepoKey>> = BTreeMap::new();
        for node in ctx.graph.nodes() {
            by_name.entry(node.key.name.as_str()).or_default().push(&node.key);
        }

        // Keys are unique, so more than one entry means distinct installations.
        by_name
            .into_iter()
            .filter(|(_, keys)| keys.len() > 1)
            .map(|(name, keys)| {
                let instances: Vec<String> = keys.iter().map(|k| k.instance_id.clone()).collect();
                Finding::new(
                    FindingKind::Shadowing,
                    Severity::Medium,
                    keys.into_iter().cloned().collect(),
                    format!(
                        "Repository name `{name}` exists on {} installations: {}",
                        instances.len(),
                        instances.join(", ")
                    ),
                    "Give repositories installation-specific names, or qualify references to them",
                )
                .with_instances(instances)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RepositoryDescriptor;
    use crate::rules::test_support::evaluate;

    #[test]
    fn test_shadowing_lists_both_keys() {
        let findings = evaluate(
            &Rule::new(),
            vec![
                RepositoryDescriptor::remote("inst2", "npm-remote", None),
                RepositoryDescriptor::local("inst1", "npm-remote"),
            ],
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].repositories,
            vec![RepoKey::new("inst1", "npm-remote"), RepoKey::new("inst2", "npm-remote")]
        );
        assert_eq!(
            findings[0].details.instances,
            Some(vec!["inst1".to_string(), "inst2".to_string()])
        );
    }

    #[test]
    fn test_unique_names_do_not_fire() {
        let findings = evaluate(
            &Rule::new(),
            vec![
                RepositoryDescriptor::local("inst1", "a"),
                RepositoryDescriptor::local("inst2", "b"),
                RepositoryDescriptor::local("inst1", "b-local"),
            ],
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn test_one_finding_per_name() {
        let findings = evaluate(
            &Rule::new(),
            vec![
                RepositoryDescriptor::local("a1", "x"),
                RepositoryDescriptor::local("a2", "x"),
                RepositoryDescriptor::local("a3", "x"),
                RepositoryDescriptor::local("a1", "y"),
                RepositoryDescriptor::local("a2", "y"),
            ],
        );
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].repositories.len(), 3);
        assert_eq!(findings[1].repositories.len(), 2);
    }
}
