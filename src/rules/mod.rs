//! Anti-pattern rules evaluated over the repository graph and its cycles.
//!
//! Every rule is a pure function of a [`RuleContext`], so the engine runs
//! them in parallel and re-sorts the combined output for stable reports.

pub mod cross_instance;
pub mod isolated;
pub mod long_chain;
pub mod remote_chain;
pub mod remote_to_virtual;
pub mod shadowing;

use rayon::prelude::*;

use crate::config::RulesConfig;
use crate::core::{Rule, RuleContext};
use crate::report::Finding;

/// Every rule, configured, in registry order.
pub fn all(config: &RulesConfig) -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(remote_to_virtual::Rule::new()),
        Box::new(cross_instance::Rule::new()),
        Box::new(shadowing::Rule::new()),
        Box::new(long_chain::Rule::new().with_max_length(config.max_chain_length)),
        Box::new(remote_chain::Rule::new()),
        Box::new(isolated::Rule::new()),
    ]
}

/// Rules not listed in `config.disabled`.
pub fn enabled(config: &RulesConfig) -> Vec<Box<dyn Rule>> {
    all(config)
        .into_iter()
        .filter(|rule| !config.disabled.iter().any(|name| name == rule.name()))
        .collect()
}

/// Runs a set of rules against one context.
pub struct Engine {
    rules: Vec<Box<dyn Rule>>,
}

impl Engine {
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    pub fn from_config(config: &RulesConfig) -> Self {
        for name in &config.disabled {
            if !all(config).iter().any(|r| r.name() == name) {
                tracing::warn!("Unknown rule `{}` in disabled list", name);
            }
        }
        Self::new(enabled(config))
    }

    pub fn rules(&self) -> &[Box<dyn Rule>] {
        &self.rules
    }

    /// Evaluate every rule; output is sorted by kind, then involved keys.
    pub fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings: Vec<Finding> = self
            .rules
            .par_iter()
            .flat_map_iter(|rule| {
                let found = rule.evaluate(ctx);
                tracing::debug!("Rule {} reported {} finding(s)", rule.name(), found.len());
                found
            })
            .collect();
        findings.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        findings
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::core::{RepositoryDescriptor, Rule, RuleContext};
    use crate::cycles::CycleDetector;
    use crate::graph::GraphBuilder;
    use crate::report::Finding;

    /// Build the graph and cycle set for `descriptors`, then run one rule.
    pub fn evaluate(rule: &dyn Rule, descriptors: Vec<RepositoryDescriptor>) -> Vec<Finding> {
        let graph = GraphBuilder::new().build(descriptors).graph;
        let cycles = CycleDetector::new().detect(&graph);
        rule.evaluate(&RuleContext::new(&graph, &cycles))
    }
}
