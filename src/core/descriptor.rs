//! Repository descriptors: the normalized input unit of an analysis run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Repository class as reported by the repository manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoKind {
    /// Stores artifacts directly.
    Local,
    /// Mirrors an upstream target.
    Remote,
    /// Aggregates member repositories.
    Virtual,
}

impl RepoKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepoKind::Local => "local",
            RepoKind::Remote => "remote",
            RepoKind::Virtual => "virtual",
        }
    }
}

impl fmt::Display for RepoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepoKind {
    type Err = DescriptorError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            "virtual" => Ok(Self::Virtual),
            _ => Err(DescriptorError::UnknownKind(s.to_string())),
        }
    }
}

/// Identity of a repository: unique across the whole input set.
///
/// Ordering is by installation first, then by repository name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RepoKey {
    pub instance_id: String,
    pub name: String,
}

impl RepoKey {
    pub fn new(instance_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.instance_id, self.name)
    }
}

/// A reference from one repository to its upstream or to a member.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TargetRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
}

impl TargetRef {
    /// Reference by bare repository name.
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instance_id: None,
        }
    }

    /// Reference qualified with its installation.
    pub fn qualified(instance_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instance_id: Some(instance_id.into()),
        }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.instance_id {
            Some(instance) => write!(f, "{}:{}", instance, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Strictly-typed description of one repository on one installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    pub instance_id: String,
    pub name: String,
    pub kind: RepoKind,
    #[serde(default)]
    pub target_refs: Vec<TargetRef>,
}

impl RepositoryDescriptor {
    pub fn new(
        instance_id: impl Into<String>,
        name: impl Into<String>,
        kind: RepoKind,
        target_refs: Vec<TargetRef>,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            name: name.into(),
            kind,
            target_refs,
        }
    }

    pub fn local(instance_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(instance_id, name, RepoKind::Local, Vec::new())
    }

    pub fn remote(
        instance_id: impl Into<String>,
        name: impl Into<String>,
        upstream: Option<TargetRef>,
    ) -> Self {
        Self::new(
            instance_id,
            name,
            RepoKind::Remote,
            upstream.into_iter().collect(),
        )
    }

    pub fn virtual_repo(
        instance_id: impl Into<String>,
        name: impl Into<String>,
        members: Vec<TargetRef>,
    ) -> Self {
        Self::new(instance_id, name, RepoKind::Virtual, members)
    }

    pub fn key(&self) -> RepoKey {
        RepoKey::new(self.instance_id.clone(), self.name.clone())
    }

    /// Check the per-kind cardinality rules on `target_refs`.
    pub fn validate(&self) -> std::result::Result<(), DescriptorError> {
        if self.instance_id.trim().is_empty() {
            return Err(DescriptorError::EmptyField("instance_id"));
        }
        if self.name.trim().is_empty() {
            return Err(DescriptorError::EmptyField("name"));
        }
        if self.target_refs.iter().any(|r| r.name.trim().is_empty()) {
            return Err(DescriptorError::EmptyField("target_refs.name"));
        }
        match self.kind {
            RepoKind::Local if !self.target_refs.is_empty() => {
                Err(DescriptorError::LocalWithTargets {
                    count: self.target_refs.len(),
                })
            }
            RepoKind::Remote if self.target_refs.len() > 1 => {
                Err(DescriptorError::TooManyUpstreams {
                    count: self.target_refs.len(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Reasons a descriptor is refused at the input boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),

    #[error("unknown repository kind `{0}` (expected local, remote or virtual)")]
    UnknownKind(String),

    #[error("remote repository lists {count} upstream targets, at most one is allowed")]
    TooManyUpstreams { count: usize },

    #[error("local repository lists {count} targets, none are allowed")]
    LocalWithTargets { count: usize },
}

/// Loosely-typed descriptor as delivered by a fetch collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDescriptor {
    #[serde(default, alias = "instance")]
    pub instance_id: Option<String>,
    #[serde(default, alias = "key")]
    pub name: Option<String>,
    #[serde(default, alias = "type")]
    pub kind: Option<String>,
    /// Repository class as spelled by the REST API; used when `kind` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rclass: Option<String>,
    #[serde(default, alias = "repositories")]
    pub target_refs: Vec<RawTargetRef>,
}

impl RawDescriptor {
    /// Identity of this record, when both parts are present.
    pub fn key(&self) -> Option<RepoKey> {
        match (&self.instance_id, &self.name) {
            (Some(instance), Some(name)) => Some(RepoKey::new(instance.clone(), name.clone())),
            _ => None,
        }
    }
}

/// A target reference in any of its accepted spellings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTargetRef {
    /// `"name"` or `"instance:name"`.
    Text(String),
    /// `{ "name": ..., "instance_id": ... }`.
    Record {
        name: String,
        #[serde(default, alias = "instance")]
        instance_id: Option<String>,
    },
}

impl From<RawTargetRef> for TargetRef {
    fn from(raw: RawTargetRef) -> Self {
        match raw {
            RawTargetRef::Record { name, instance_id } => TargetRef { name, instance_id },
            RawTargetRef::Text(text) => match text.split_once(':') {
                // URLs carry a scheme separator, not an installation qualifier.
                Some((instance, name))
                    if !instance.is_empty() && !name.is_empty() && !name.starts_with("//") =>
                {
                    TargetRef::qualified(instance, name)
                }
                _ => TargetRef::bare(text),
            },
        }
    }
}

impl TryFrom<RawDescriptor> for RepositoryDescriptor {
    type Error = DescriptorError;

    fn try_from(raw: RawDescriptor) -> std::result::Result<Self, Self::Error> {
        let instance_id = raw
            .instance_id
            .ok_or(DescriptorError::MissingField("instance_id"))?;
        let name = raw.name.ok_or(DescriptorError::MissingField("name"))?;
        let kind: RepoKind = raw
            .kind
            .or(raw.rclass)
            .ok_or(DescriptorError::MissingField("kind"))?
            .parse()?;

        let descriptor = RepositoryDescriptor::new(
            instance_id,
            name,
            kind,
            raw.target_refs.into_iter().map(TargetRef::from).collect(),
        );
        descriptor.validate()?;
        Ok(descriptor)
    }
}
