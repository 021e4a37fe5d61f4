//! Descriptor snapshots: the hand-off format from fetch collaborators.

pub mod artifactory;

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{Error, RawDescriptor, RepoKey, Result};
use crate::report::Finding;

pub use artifactory::{InstanceSnapshot, RepositoryRecord};

/// A point-in-time dump of one or more installations.
///
/// Entries are kept as plain values until [`Snapshot::into_records`], so one
/// malformed record cannot reject the whole file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    /// Already-normalized descriptors.
    pub descriptors: Vec<Value>,
    /// Raw API dumps, normalized on demand.
    pub instances: Vec<Value>,
}

/// Records read from a snapshot, plus the ones that could not be read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Records {
    pub descriptors: Vec<RawDescriptor>,
    /// One `invalid_descriptor` finding per skipped entry.
    pub rejected: Vec<Finding>,
}

impl Snapshot {
    /// Load a snapshot from a `.json` or `.toml` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        let snapshot = match extension.as_deref() {
            Some("json") => Self::from_json(&content)?,
            Some("toml") => toml::from_str(&content)?,
            other => {
                return Err(Error::snapshot(
                    path,
                    format!("unsupported extension {:?}, expected json or toml", other.unwrap_or("")),
                ))
            }
        };
        tracing::info!(
            "Loaded snapshot {} with {} descriptor(s) and {} instance(s)",
            path.display(),
            snapshot.descriptors.len(),
            snapshot.instances.len()
        );
        Ok(snapshot)
    }

    /// Parse JSON; a bare array is read as a list of descriptors.
    pub fn from_json(content: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(content)? {
            Value::Array(descriptors) => Ok(Self {
                descriptors,
                instances: Vec::new(),
            }),
            other => Ok(serde_json::from_value(other)?),
        }
    }

    /// Every readable descriptor: explicit ones first, then the normalized
    /// instance dumps. Unreadable entries come back as findings.
    pub fn into_records(self) -> Records {
        let mut rejected = Vec::new();
        let mut descriptors: Vec<RawDescriptor> = self
            .descriptors
            .into_iter()
            .filter_map(|value| {
                let key = descriptor_key(&value);
                match serde_json::from_value(value) {
                    Ok(raw) => Some(raw),
                    Err(err) => {
                        tracing::warn!(
                            "Skipping descriptor {}: {}",
                            key.as_ref().map(|k| k.to_string()).unwrap_or_default(),
                            err
                        );
                        rejected.push(Finding::invalid_descriptor(key, &err.to_string()));
                        None
                    }
                }
            })
            .collect();

        let (instances, skipped) = artifactory::parse_instances(self.instances);
        rejected.extend(skipped);
        descriptors.extend(artifactory::normalize(&instances));

        Records {
            descriptors,
            rejected,
        }
    }
}

/// Identity of an entry that may not deserialize, read from whichever
/// spelling of each field is present.
fn descriptor_key(value: &Value) -> Option<RepoKey> {
    let field = |names: &[&str]| {
        names
            .iter()
            .find_map(|name| value.get(*name).and_then(Value::as_str))
    };
    Some(RepoKey::new(field(&["instance_id", "instance"])?, field(&["name", "key"])?))
}
