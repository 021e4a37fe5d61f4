//! Normalization of repository-manager API dumps into raw descriptors.
//!
//! Remote repositories name their upstream by URL. When that URL lives under
//! the base URL of another analyzed installation, the repository key is
//! recovered from the path and the reference is qualified with that
//! installation; otherwise the URL itself is kept as an unresolvable name.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{RawDescriptor, RawTargetRef, RepoKey};
use crate::report::Finding;

/// One installation as dumped by a fetch collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub repositories: Vec<RepositoryRecord>,
}

/// Repository detail record in the shape of the REST API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRecord {
    pub key: String,
    #[serde(default)]
    pub rclass: Option<String>,
    /// Older API versions spell the class `type`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub repo_type: Option<String>,
    /// Upstream URL of a remote repository.
    #[serde(default)]
    pub url: Option<String>,
    /// Members of a virtual repository.
    #[serde(default)]
    pub repositories: Vec<String>,
    #[serde(default)]
    pub package_type: Option<String>,
}

impl RepositoryRecord {
    /// Repository class, preferring `rclass` over `type`.
    pub fn class(&self) -> Option<&str> {
        self.rclass.as_deref().or(self.repo_type.as_deref())
    }
}

#[derive(Deserialize)]
struct InstanceHeader {
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    repositories: Vec<Value>,
}

fn string_field<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value.get(field).and_then(Value::as_str)
}

/// Read instance dumps record by record.
///
/// A dump without a usable name or URL is skipped whole; a malformed
/// repository record is skipped on its own. Each skip becomes an
/// `invalid_descriptor` finding.
pub fn parse_instances(values: Vec<Value>) -> (Vec<InstanceSnapshot>, Vec<Finding>) {
    let mut instances = Vec::new();
    let mut rejected = Vec::new();

    for value in values {
        let label = string_field(&value, "name").unwrap_or("<unnamed>").to_string();
        let header: InstanceHeader = match serde_json::from_value(value) {
            Ok(header) => header,
            Err(err) => {
                tracing::warn!("Skipping instance dump {}: {}", label, err);
                rejected.push(Finding::invalid_descriptor(
                    None,
                    &format!("instance dump {label}: {err}"),
                ));
                continue;
            }
        };

        let mut repositories = Vec::with_capacity(header.repositories.len());
        for record in header.repositories {
            let key = string_field(&record, "key")
                .map(|name| RepoKey::new(header.name.clone(), name));
            match serde_json::from_value::<RepositoryRecord>(record) {
                Ok(record) => repositories.push(record),
                Err(err) => {
                    tracing::warn!("Skipping repository record in {}: {}", header.name, err);
                    rejected.push(Finding::invalid_descriptor(key, &err.to_string()));
                }
            }
        }

        instances.push(InstanceSnapshot {
            name: header.name,
            url: header.url,
            repositories,
        });
    }

    (instances, rejected)
}

/// Extract the repository key from `url` if it lives under `base_url`.
///
/// `https://host/artifactory/libs-release/` yields `libs-release`; without an
/// `artifactory` segment the first path segment is used. API endpoints are
/// never repository URLs.
pub fn extract_repo_key(url: &str, base_url: &str) -> Option<String> {
    let base = base_url.trim_end_matches('/');
    let rest = url.strip_prefix(base)?;
    if !(rest.is_empty() || rest.starts_with('/')) {
        return None;
    }
    let parts: Vec<&str> = rest.split('/').filter(|p| !p.is_empty()).collect();

    if parts.first() == Some(&"api") {
        return None;
    }
    if let Some(pos) = parts.iter().position(|p| *p == "artifactory") {
        if parts.get(pos + 1) == Some(&"api") {
            return None;
        }
        return parts.get(pos + 1).map(|p| p.to_string());
    }
    parts.first().map(|p| p.to_string())
}

/// Turn installation dumps into raw descriptors, in dump order.
pub fn normalize(instances: &[InstanceSnapshot]) -> Vec<RawDescriptor> {
    let mut out = Vec::new();
    for instance in instances {
        for repo in &instance.repositories {
            let kind = repo.class().map(|k| k.to_lowercase());
            let target_refs = match kind.as_deref() {
                Some("remote") => repo
                    .url
                    .as_deref()
                    .filter(|u| !u.trim().is_empty())
                    .map(|u| resolve_upstream(u, instances))
                    .into_iter()
                    .collect(),
                Some("virtual") => repo
                    .repositories
                    .iter()
                    .map(|member| RawTargetRef::Record {
                        name: member.clone(),
                        instance_id: Some(instance.name.clone()),
                    })
                    .collect(),
                _ => Vec::new(),
            };

            out.push(RawDescriptor {
                instance_id: Some(instance.name.clone()),
                name: Some(repo.key.clone()),
                kind: repo.class().map(str::to_string),
                rclass: None,
                target_refs,
            });
        }
    }
    out
}

fn resolve_upstream(url: &str, instances: &[InstanceSnapshot]) -> RawTargetRef {
    // Prefer the longest matching base URL when installations are nested.
    let mut candidates: Vec<&InstanceSnapshot> = instances
        .iter()
        .filter(|i| !i.url.trim().is_empty())
        .collect();
    candidates.sort_by_key(|i| std::cmp::Reverse(i.url.trim_end_matches('/').len()));

    for target in candidates {
        if let Some(key) = extract_repo_key(url, &target.url) {
            return RawTargetRef::Record {
                name: key,
                instance_id: Some(target.name.clone()),
            };
        }
    }
    tracing::debug!("Upstream {} is outside the analyzed installations", url);
    RawTargetRef::Record {
        name: url.to_string(),
        instance_id: None,
    }
}
