//! Loopscan - topology analysis for artifact repository managers.
//!
//! Local, remote and virtual repository descriptors from one or more
//! installations are resolved into a typed dependency graph. The graph is
//! searched for resolution loops and checked against a set of anti-pattern
//! rules; everything found is aggregated into a deterministic report.
//!
//! # Example
//!
//! ```
//! use loopscan::config::Config;
//! use loopscan::core::{RepositoryDescriptor, TargetRef};
//! use loopscan::report::FindingKind;
//!
//! let descriptors = vec![
//!     RepositoryDescriptor::virtual_repo("art1", "maven-virtual", vec![TargetRef::bare("maven-remote")]),
//!     RepositoryDescriptor::remote("art1", "maven-remote", Some(TargetRef::bare("maven-virtual"))),
//! ];
//! let analysis = loopscan::analyze(descriptors, &Config::default());
//! assert_eq!(analysis.report.count(FindingKind::Loop), 1);
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod cycles;
pub mod graph;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod rules;
pub mod source;

pub use pipeline::{analyze, analyze_raw, analyze_snapshot, Analysis};
