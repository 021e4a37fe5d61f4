//! Loops spanning more than one installation.

use crate::core::{Rule as RuleTrait, RuleContext};
use crate::report::{format_path, Finding, FindingKind, Severity};

#[derive(Debug, Default, Clone, Copy)]
pub struct Rule;

impl Rule {
    pub fn new() -> Self {
        Self
    }
}

impl RuleTrait for Rule {
    fn name(&self) -> &'static str {
        "cross_instance_loop"
    }

    fn description(&self) -> &'static str {
        "Repository loops whose members live on different installations"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        ctx.cycles
            .cycles
            .iter()
            .filter(|c| c.spans_multiple_instances)
            .map(|cycle| {
                Finding::new(
                    FindingKind::CrossInstanceLoop,
                    Severity::Critical,
                    cycle.repositories.clone(),
                    format!(
                        "Loop spans installations {}: {}",
                        cycle.instances.join(", "),
                        format_path(&cycle.repositories, true)
                    ),
                    "Make one installation the single source of truth and point the others at its local or remote repositories",
                )
                .with_instances(cycle.instances.clone())
                .with_length(cycle.len())
            })
            .collect()
    }
}
