//! Graph construction from repository descriptors.

use std::collections::{BTreeMap, HashSet};

use crate::core::{RawDescriptor, RepoKey, RepositoryDescriptor, TargetRef};
use crate::report::{Finding, FindingKind, Severity};

use super::{EdgeKind, ExternalTarget, Node, NodeId, RepositoryGraph, Unresolved};

/// How bare target names are resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionOptions {
    /// Fall back to other installations when a bare name is not found locally.
    pub cross_instance: bool,
}

/// Graph plus the structural findings raised while building it.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub graph: RepositoryGraph,
    pub findings: Vec<Finding>,
}

/// Converts descriptor collections into a [`RepositoryGraph`].
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    options: ResolutionOptions,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ResolutionOptions) -> Self {
        Self { options }
    }

    pub fn with_cross_instance(mut self, enabled: bool) -> Self {
        self.options.cross_instance = enabled;
        self
    }

    /// Build from loosely-typed records, rejecting malformed ones as findings.
    pub fn build_raw<I>(&self, raw: I) -> BuildOutput
    where
        I: IntoIterator<Item = RawDescriptor>,
    {
        let mut findings = Vec::new();
        let mut descriptors = Vec::new();

        for record in raw {
            let key = record.key();
            match RepositoryDescriptor::try_from(record) {
                Ok(desc) => descriptors.push(desc),
                Err(err) => {
                    tracing::warn!(
                        "Rejecting descriptor {}: {}",
                        key.as_ref().map(|k| k.to_string()).unwrap_or_default(),
                        err
                    );
                    findings.push(Finding::invalid_descriptor(key, &err.to_string()));
                }
            }
        }

        let mut output = self.build(descriptors);
        findings.append(&mut output.findings);
        output.findings = findings;
        output
    }

    /// Build from typed descriptors.
    ///
    /// Duplicate identity keys keep the first descriptor seen. References are
    /// resolved against the accepted set only.
    pub fn build<I>(&self, descriptors: I) -> BuildOutput
    where
        I: IntoIterator<Item = RepositoryDescriptor>,
    {
        let mut findings = Vec::new();
        let mut accepted: BTreeMap<RepoKey, RepositoryDescriptor> = BTreeMap::new();

        for desc in descriptors {
            if let Err(err) = desc.validate() {
                tracing::warn!("Rejecting descriptor {}: {}", desc.key(), err);
                findings.push(Finding::invalid_descriptor(Some(desc.key()), &err.to_string()));
                continue;
            }
            let key = desc.key();
            if accepted.contains_key(&key) {
                tracing::warn!("Duplicate descriptor for {}, keeping the first", key);
                findings.push(Finding::new(
                    FindingKind::DuplicateRepository,
                    Severity::High,
                    vec![key.clone()],
                    format!("Repository {key} is described more than once; later descriptors were ignored"),
                    "Remove the duplicate entry from the repository snapshot",
                ));
                continue;
            }
            accepted.insert(key, desc);
        }

        // BTreeMap iteration is key order, which fixes NodeId order.
        let nodes: Vec<Node> = accepted
            .values()
            .map(|d| Node {
                key: d.key(),
                kind: d.kind,
            })
            .collect();
        let index: BTreeMap<&RepoKey, NodeId> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (&n.key, NodeId(i)))
            .collect();
        let mut by_name: BTreeMap<&str, Vec<&RepoKey>> = BTreeMap::new();
        for node in &nodes {
            by_name.entry(node.key.name.as_str()).or_default().push(&node.key);
        }

        let resolver = Resolver {
            options: self.options,
            index: &index,
            by_name: &by_name,
        };

        let mut edges = Vec::new();
        let mut external_targets = Vec::new();
        for (source_idx, desc) in accepted.values().enumerate() {
            let Some(edge_kind) = EdgeKind::for_source(desc.kind) else {
                continue;
            };
            let source = NodeId(source_idx);
            let source_key = &nodes[source_idx].key;
            let mut seen: HashSet<NodeId> = HashSet::new();

            for target_ref in &desc.target_refs {
                match resolver.resolve(&desc.instance_id, target_ref) {
                    Ok(target) => {
                        if seen.insert(target) {
                            edges.push((source, target, edge_kind));
                        } else {
                            tracing::debug!(
                                "Ignoring repeated reference {} -> {}",
                                source_key,
                                target_ref
                            );
                        }
                    }
                    Err(unresolved) => {
                        if let Unresolved::Ambiguous { candidates } = &unresolved {
                            tracing::warn!(
                                "Reference {} from {} is ambiguous across {} installations",
                                target_ref,
                                source_key,
                                candidates.len()
                            );
                            let mut involved = vec![source_key.clone()];
                            involved.extend(candidates.iter().cloned());
                            findings.push(Finding::new(
                                FindingKind::AmbiguousReference,
                                Severity::Medium,
                                involved,
                                format!(
                                    "Reference `{}` from {} matches {} repositories on other installations",
                                    target_ref,
                                    source_key,
                                    candidates.len()
                                ),
                                "Qualify the reference with its installation",
                            ));
                        } else {
                            tracing::debug!(
                                "Reference {} from {} is external",
                                target_ref,
                                source_key
                            );
                        }
                        external_targets.push(ExternalTarget {
                            kind: edge_kind,
                            source: source_key.clone(),
                            target: target_ref.clone(),
                            unresolved,
                        });
                    }
                }
            }
        }

        tracing::info!(
            "Built repository graph with {} nodes, {} edges and {} external targets",
            nodes.len(),
            edges.len(),
            external_targets.len()
        );

        BuildOutput {
            graph: RepositoryGraph::from_parts(nodes, edges, external_targets),
            findings,
        }
    }
}

struct Resolver<'a> {
    options: ResolutionOptions,
    index: &'a BTreeMap<&'a RepoKey, NodeId>,
    by_name: &'a BTreeMap<&'a str, Vec<&'a RepoKey>>,
}

impl Resolver<'_> {
    fn resolve(&self, source_instance: &str, target: &TargetRef) -> Result<NodeId, Unresolved> {
        let lookup = |instance: &str| self.index.get(&RepoKey::new(instance, target.name.as_str())).copied();

        if let Some(instance) = &target.instance_id {
            return lookup(instance).ok_or(Unresolved::External);
        }
        if let Some(id) = lookup(source_instance) {
            return Ok(id);
        }
        if !self.options.cross_instance {
            return Err(Unresolved::External);
        }

        let candidates: Vec<&RepoKey> = self
            .by_name
            .get(target.name.as_str())
            .map(|keys| {
                keys.iter()
                    .copied()
                    .filter(|k| k.instance_id != source_instance)
                    .collect()
            })
            .unwrap_or_default();

        match candidates.as_slice() {
            [] => Err(Unresolved::External),
            [only] => self.index.get(*only).copied().ok_or(Unresolved::External),
            many => Err(Unresolved::Ambiguous {
                candidates: many.iter().map(|k| (*k).clone()).collect(),
            }),
        }
    }
}
