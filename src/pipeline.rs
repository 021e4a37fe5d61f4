//! End-to-end analysis of one descriptor snapshot.
//!
//! The builder runs first; the cycle detector and the rules then read the
//! finished graph. Nothing is shared between runs.

use serde::Serialize;

use crate::config::Config;
use crate::core::{RawDescriptor, RepositoryDescriptor, RuleContext};
use crate::cycles::{CycleDetector, CycleOptions, CycleSet};
use crate::graph::{BuildOutput, GraphBuilder, RepositoryGraph, ResolutionOptions};
use crate::report::Report;
use crate::rules::Engine;
use crate::source::{Records, Snapshot};

/// Everything produced by one run.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub graph: RepositoryGraph,
    pub cycles: CycleSet,
    pub report: Report,
}

/// Analyze typed descriptors.
pub fn analyze<I>(descriptors: I, config: &Config) -> Analysis
where
    I: IntoIterator<Item = RepositoryDescriptor>,
{
    let output = builder(config).build(descriptors);
    finish(output, config)
}

/// Analyze loosely-typed records; malformed ones become findings.
pub fn analyze_raw<I>(raw: I, config: &Config) -> Analysis
where
    I: IntoIterator<Item = RawDescriptor>,
{
    let output = builder(config).build_raw(raw);
    finish(output, config)
}

/// Analyze a loaded snapshot; entries that could not be read are reported
/// alongside the findings of the rest.
pub fn analyze_snapshot(snapshot: Snapshot, config: &Config) -> Analysis {
    let Records {
        descriptors,
        mut rejected,
    } = snapshot.into_records();
    let mut output = builder(config).build_raw(descriptors);
    rejected.append(&mut output.findings);
    output.findings = rejected;
    finish(output, config)
}

fn builder(config: &Config) -> GraphBuilder {
    GraphBuilder::with_options(ResolutionOptions::from(&config.resolution))
}

fn finish(output: BuildOutput, config: &Config) -> Analysis {
    let BuildOutput {
        graph,
        mut findings,
    } = output;

    let cycle_options = CycleOptions::from(&config.cycles);
    let cycles = CycleDetector::with_options(cycle_options).detect(&graph);
    findings.extend(cycles.findings(&cycle_options));

    let engine = Engine::from_config(&config.rules);
    findings.extend(engine.evaluate(&RuleContext::new(&graph, &cycles)));

    let report = Report::new(&graph, &cycles, findings);
    tracing::info!(
        "Analysis complete: {} finding(s) across {} repositories",
        report.summary.total_findings,
        report.summary.repositories
    );

    Analysis {
        graph,
        cycles,
        report,
    }
}
