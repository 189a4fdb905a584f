//! Dependency-ordered resource plans.
//!
//! [`resolve`] turns an unordered batch of [`ResourceDescriptor`]s into a
//! [`ResourcePlan`] in which every descriptor's requirements are provided by
//! strictly earlier entries.
//!
//! Resolution runs in three steps:
//!
//! 1. **Coalesce identical resources.** Descriptors with the same kind and
//!    locator collapse to the richest one (more provides, then more requires,
//!    then the later arrival).
//! 2. **Coalesce shared capabilities.** Descriptors providing the same
//!    capability collapse to the one with the larger requires set; equal sizes
//!    keep the later arrival. Every capability the dropped descriptor provided
//!    is redirected to the survivor.
//! 3. **Order.** Kahn's algorithm over provider → dependent edges. Among
//!    resources with no ordering constraint, higher priority comes first, then
//!    earlier arrival, so identical input always yields an identical plan.

use core::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use serde::{Deserialize, Serialize};

use crate::descriptor::{CapabilityTag, Locator, ResourceDescriptor, ResourceKind};
use crate::error::{RequirementPolicy, ResolutionError};

// ─────────────────────────────────────────────────────────────────────────────
// ResourcePlan
// ─────────────────────────────────────────────────────────────────────────────

/// Resources in a valid load order. Immutable once resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourcePlan(Vec<ResourceDescriptor>);

impl ResourcePlan {
    /// Descriptors in load order.
    #[must_use]
    pub fn entries(&self) -> &[ResourceDescriptor] {
        &self.0
    }

    /// Number of resources to load.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing needs loading.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical JSON text of the plan.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Position of the first entry providing `capability`.
    #[must_use]
    pub fn position_of(&self, capability: &str) -> Option<usize> {
        self.0.iter().position(|d| {
            d.provides_set()
                .iter()
                .any(|tag| tag.as_str() == capability)
        })
    }
}

impl<'a> IntoIterator for &'a ResourcePlan {
    type Item = &'a ResourceDescriptor;
    type IntoIter = core::slice::Iter<'a, ResourceDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entry points
// ─────────────────────────────────────────────────────────────────────────────

/// A descriptor tagged with its arrival position and contributor.
#[derive(Debug, Clone)]
pub(crate) struct Contribution {
    pub(crate) descriptor: ResourceDescriptor,
    pub(crate) arrival: usize,
    pub(crate) provider: Option<String>,
}

/// Resolves a complete set with [`RequirementPolicy::Strict`].
///
/// # Errors
///
/// - [`ResolutionError::UnsatisfiedRequirement`] if a requirement has no provider
/// - [`ResolutionError::Cycle`] if requirements are circular
///
/// # Example
///
/// ```
/// use portico_resources::{resolve, ResourceDescriptor};
///
/// let plan = resolve([
///     ResourceDescriptor::script_uri("/ui.js").provides(["jquery-ui"]).requires(["jquery"]),
///     ResourceDescriptor::script_uri("/jq.js").provides(["jquery"]),
/// ])
/// .unwrap();
///
/// assert_eq!(plan.position_of("jquery"), Some(0));
/// ```
pub fn resolve<I>(descriptors: I) -> Result<ResourcePlan, ResolutionError>
where
    I: IntoIterator<Item = ResourceDescriptor>,
{
    resolve_with_policy(descriptors, RequirementPolicy::Strict)
}

/// Resolves a complete set with an explicit requirement policy.
///
/// # Errors
///
/// See [`resolve`]. Under [`RequirementPolicy::Warn`] only
/// [`ResolutionError::Cycle`] is returned.
pub fn resolve_with_policy<I>(
    descriptors: I,
    policy: RequirementPolicy,
) -> Result<ResourcePlan, ResolutionError>
where
    I: IntoIterator<Item = ResourceDescriptor>,
{
    let contributions = descriptors
        .into_iter()
        .enumerate()
        .map(|(arrival, descriptor)| Contribution {
            descriptor,
            arrival,
            provider: None,
        })
        .collect();
    resolve_contributions(contributions, policy)
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal: coalescing and ordering
// ─────────────────────────────────────────────────────────────────────────────

/// Union-find over contribution indices; the root of a set is the survivor.
struct Survivors {
    parent: Vec<usize>,
}

impl Survivors {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn drop_into(&mut self, loser: usize, winner: usize) {
        self.parent[loser] = winner;
    }

    fn is_alive(&mut self, i: usize) -> bool {
        self.find(i) == i
    }
}

pub(crate) fn resolve_contributions(
    mut entries: Vec<Contribution>,
    policy: RequirementPolicy,
) -> Result<ResourcePlan, ResolutionError> {
    entries.sort_by_key(|entry| entry.arrival);
    let n = entries.len();
    let mut survivors = Survivors::new(n);

    // Pass 1: identical (kind, locator).
    let richness = |e: &Contribution| {
        (
            e.descriptor.provides_set().len(),
            e.descriptor.requires_set().len(),
            e.arrival,
        )
    };
    let mut by_locator: BTreeMap<(ResourceKind, &Locator), usize> = BTreeMap::new();
    for (i, entry) in entries.iter().enumerate() {
        let key = (entry.descriptor.kind(), entry.descriptor.locator());
        match by_locator.get(&key).copied() {
            Some(existing) if richness(&entries[existing]) >= richness(entry) => {
                survivors.drop_into(i, existing);
            }
            Some(existing) => {
                survivors.drop_into(existing, i);
                by_locator.insert(key, i);
            }
            None => {
                by_locator.insert(key, i);
            }
        }
    }

    // Pass 2: shared capabilities.
    let specificity = |e: &Contribution| (e.descriptor.requires_set().len(), e.arrival);
    let mut providers: BTreeMap<&CapabilityTag, usize> = BTreeMap::new();
    for (i, entry) in entries.iter().enumerate() {
        for tag in entry.descriptor.provides_set() {
            let current = survivors.find(i);
            let Some(&previous) = providers.get(tag) else {
                providers.insert(tag, current);
                continue;
            };
            let previous = survivors.find(previous);
            if previous == current {
                continue;
            }
            let (winner, loser) = if specificity(&entries[current]) > specificity(&entries[previous])
            {
                (current, previous)
            } else {
                (previous, current)
            };
            tracing::debug!(
                capability = %tag,
                kept = %entries[winner].descriptor.label(),
                dropped = %entries[loser].descriptor.label(),
                "coalescing duplicate capability provider"
            );
            survivors.drop_into(loser, winner);
            providers.insert(tag, winner);
        }
    }

    let nodes: Vec<usize> = (0..n).filter(|&i| survivors.is_alive(i)).collect();
    let slot: BTreeMap<usize, usize> = nodes.iter().enumerate().map(|(s, &i)| (i, s)).collect();

    // Edges provider -> dependent, deduplicated per dependent.
    let mut in_degree = vec![0usize; nodes.len()];
    let mut dependents: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); nodes.len()];
    let mut requirement_edges: Vec<(usize, usize, &CapabilityTag)> = Vec::new();

    for (s, &i) in nodes.iter().enumerate() {
        let entry = &entries[i];
        let mut needed: BTreeSet<usize> = BTreeSet::new();
        for tag in entry.descriptor.requires_set() {
            let provider = providers
                .get(tag)
                .map(|&p| survivors.find(p))
                .and_then(|p| slot.get(&p).copied());
            match provider {
                Some(p) => {
                    needed.insert(p);
                    requirement_edges.push((p, s, tag));
                }
                None => match policy {
                    RequirementPolicy::Strict => {
                        return Err(ResolutionError::UnsatisfiedRequirement {
                            capability: tag.clone(),
                            required_by: entry.descriptor.label(),
                        });
                    }
                    RequirementPolicy::Warn => {
                        tracing::warn!(
                            capability = %tag,
                            required_by = %entry.descriptor.label(),
                            provider = entry.provider.as_deref().unwrap_or("-"),
                            "ignoring unsatisfied resource requirement"
                        );
                    }
                },
            }
        }
        in_degree[s] = needed.len();
        for p in needed {
            dependents[p].insert(s);
        }
    }

    // Kahn's algorithm: highest priority first, then earliest arrival.
    let key = |s: usize| {
        let entry = &entries[nodes[s]];
        (entry.descriptor.priority(), Reverse(entry.arrival), s)
    };
    let mut ready: BinaryHeap<(i32, Reverse<usize>, usize)> = (0..nodes.len())
        .filter(|&s| in_degree[s] == 0)
        .map(key)
        .collect();
    let mut order: Vec<usize> = Vec::with_capacity(nodes.len());

    while let Some((_, _, s)) = ready.pop() {
        order.push(s);
        for &d in &dependents[s] {
            in_degree[d] -= 1;
            if in_degree[d] == 0 {
                ready.push(key(d));
            }
        }
    }

    if order.len() != nodes.len() {
        return Err(ResolutionError::Cycle {
            capabilities: cycle_capabilities(&in_degree, &dependents, &requirement_edges),
        });
    }

    Ok(ResourcePlan(
        order
            .into_iter()
            .map(|s| entries[nodes[s]].descriptor.clone())
            .collect(),
    ))
}

/// Capabilities on the cycles left after Kahn's algorithm stalls.
///
/// Nodes that merely depend on a cycle are peeled off first: a node with no
/// dependents left in the remaining set cannot be part of a cycle.
fn cycle_capabilities(
    in_degree: &[usize],
    dependents: &[BTreeSet<usize>],
    requirement_edges: &[(usize, usize, &CapabilityTag)],
) -> Vec<CapabilityTag> {
    let mut remaining: BTreeSet<usize> = (0..in_degree.len())
        .filter(|&s| in_degree[s] > 0)
        .collect();

    loop {
        let leaves: Vec<usize> = remaining
            .iter()
            .copied()
            .filter(|s| !dependents[*s].iter().any(|d| remaining.contains(d)))
            .collect();
        if leaves.is_empty() {
            break;
        }
        for leaf in leaves {
            remaining.remove(&leaf);
        }
    }

    requirement_edges
        .iter()
        .filter(|(provider, dependent, _)| {
            remaining.contains(provider) && remaining.contains(dependent)
        })
        .map(|(_, _, tag)| (*tag).clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(uri: &str) -> ResourceDescriptor {
        ResourceDescriptor::script_uri(uri)
    }

    fn uris(plan: &ResourcePlan) -> Vec<String> {
        plan.entries().iter().map(ResourceDescriptor::label).collect()
    }

    #[test]
    fn empty_input_resolves_to_empty_plan() {
        let plan = resolve(Vec::<ResourceDescriptor>::new()).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn unconstrained_resources_keep_arrival_order() {
        let plan = resolve([script("/c.js"), script("/a.js"), script("/b.js")]).unwrap();
        assert_eq!(uris(&plan), vec!["/c.js", "/a.js", "/b.js"]);
    }

    #[test]
    fn higher_priority_loads_first() {
        let plan = resolve([
            script("/low.js"),
            script("/high.js").with_priority(10),
            script("/mid.js").with_priority(5),
        ])
        .unwrap();
        assert_eq!(uris(&plan), vec!["/high.js", "/mid.js", "/low.js"]);
    }

    #[test]
    fn priority_never_overrides_requirements() {
        let plan = resolve([
            script("/base.js").provides(["base"]),
            script("/eager.js").requires(["base"]).with_priority(100),
        ])
        .unwrap();
        assert_eq!(uris(&plan), vec!["/base.js", "/eager.js"]);
    }

    #[test]
    fn identical_locators_keep_richest() {
        let plan = resolve([
            script("/jq.js").provides(["jquery"]),
            script("/jq.js"),
        ])
        .unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.entries()[0].provides_set().len(), 1);
    }

    #[test]
    fn same_uri_different_kind_is_not_a_duplicate() {
        let plan = resolve([
            ResourceDescriptor::script_uri("/theme"),
            ResourceDescriptor::style_uri("/theme"),
        ])
        .unwrap();
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn shared_capability_equal_specificity_keeps_later_arrival() {
        let plan = resolve([
            script("/jq-3.6.js").provides(["jquery"]),
            script("/jq-3.7.js").provides(["jquery"]),
        ])
        .unwrap();
        assert_eq!(uris(&plan), vec!["/jq-3.7.js"]);
    }

    #[test]
    fn dropped_provider_capabilities_redirect_to_survivor() {
        // The loser also provided "sizzle"; its dependent must follow the survivor.
        let plan = resolve([
            script("/bundle.js").provides(["jquery", "sizzle"]),
            script("/jq.js").provides(["jquery"]).requires(["polyfills"]),
            script("/poly.js").provides(["polyfills"]),
            script("/selector.js").requires(["sizzle"]),
        ])
        .unwrap();

        assert_eq!(uris(&plan), vec!["/poly.js", "/jq.js", "/selector.js"]);
    }

    #[test]
    fn self_requirement_is_a_cycle() {
        let err = resolve([script("/loop.js").provides(["x"]).requires(["x"])]).unwrap_err();
        assert_eq!(
            err,
            ResolutionError::Cycle {
                capabilities: vec!["x".into()]
            }
        );
    }

    #[test]
    fn dependents_of_a_cycle_are_not_reported() {
        let err = resolve([
            script("/a.js").provides(["a"]).requires(["b"]),
            script("/b.js").provides(["b"]).requires(["a"]),
            script("/c.js").provides(["c"]).requires(["a"]),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            ResolutionError::Cycle {
                capabilities: vec!["a".into(), "b".into()]
            }
        );
    }

    #[test]
    fn strict_policy_names_missing_capability() {
        let err = resolve([script("/ui.js").provides(["ui"]).requires(["jquery"])]).unwrap_err();
        assert_eq!(
            err,
            ResolutionError::UnsatisfiedRequirement {
                capability: "jquery".into(),
                required_by: "/ui.js".into(),
            }
        );
    }

    #[test]
    fn warn_policy_drops_missing_edge() {
        let plan = resolve_with_policy(
            [
                script("/ui.js").provides(["ui"]).requires(["jquery"]),
                script("/app.js").requires(["ui"]),
            ],
            RequirementPolicy::Warn,
        )
        .unwrap();
        assert_eq!(uris(&plan), vec!["/ui.js", "/app.js"]);
    }

    #[test]
    fn plan_json_is_an_array() {
        let plan = resolve([script("/a.js").provides(["a"])]).unwrap();
        let json = plan.to_json().unwrap();
        assert!(json.starts_with('['));
        assert!(json.contains("\"provides\":[\"a\"]"));
    }
}
