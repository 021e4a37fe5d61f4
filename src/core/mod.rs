//! Core types and traits for repository topology analysis.

mod descriptor;
mod error;
mod rule;

pub use descriptor::{
    DescriptorError, RawDescriptor, RawTargetRef, RepoKey, RepoKind, RepositoryDescriptor,
    TargetRef,
};
pub use error::{Error, Result};
pub use rule::{Rule, RuleContext};
