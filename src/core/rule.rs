//! Rule trait and the context shared by all rule evaluators.

use crate::cycles::CycleSet;
use crate::graph::RepositoryGraph;
use crate::report::Finding;

/// Trait implemented by all anti-pattern rules.
///
/// Rules are pure functions of the context: they never re-derive the graph
/// or the cycle set, and report "nothing found" as an empty list.
pub trait Rule: Send + Sync {
    /// Unique identifier for this rule.
    fn name(&self) -> &'static str;

    /// Human-readable description.
    fn description(&self) -> &'static str;

    /// Evaluate the rule.
    fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Finding>;
}

/// Immutable inputs shared by every rule during one run.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub graph: &'a RepositoryGraph,
    pub cycles: &'a CycleSet,
}

impl<'a> RuleContext<'a> {
    pub fn new(graph: &'a RepositoryGraph, cycles: &'a CycleSet) -> Self {
        Self { graph, cycles }
    }
}
