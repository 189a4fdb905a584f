//! Streaming accumulation of descriptors from independent providers.

use parking_lot::Mutex;

use crate::descriptor::ResourceDescriptor;
use crate::error::{RequirementPolicy, ResolutionError};
use crate::resolver::{Contribution, ResourcePlan, resolve_contributions};

/// Thread-safe accumulator for descriptor batches.
///
/// Each provider contributes its batch when a console becomes ready; the
/// collector assigns arrival order as batches come in, and
/// [`finalize`](Self::finalize) resolves everything gathered so far.
///
/// # Example
///
/// ```
/// use portico_resources::{RequirementPolicy, ResourceCollector, ResourceDescriptor};
///
/// let collector = ResourceCollector::new();
/// collector.contribute("widgets", [
///     ResourceDescriptor::script_uri("/grid.js").provides(["grid"]).requires(["jquery"]),
/// ]);
/// collector.contribute("libraries", [
///     ResourceDescriptor::script_uri("/jquery.js").provides(["jquery"]),
/// ]);
///
/// let plan = collector.finalize(RequirementPolicy::Strict).unwrap();
/// assert_eq!(plan.position_of("jquery"), Some(0));
/// ```
#[derive(Debug, Default)]
pub struct ResourceCollector {
    contributions: Mutex<Vec<Contribution>>,
}

impl ResourceCollector {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a provider's batch. Returns how many descriptors it added.
    pub fn contribute<I>(&self, provider: &str, batch: I) -> usize
    where
        I: IntoIterator<Item = ResourceDescriptor>,
    {
        let mut contributions = self.contributions.lock();
        let before = contributions.len();
        for descriptor in batch {
            let arrival = contributions.len();
            contributions.push(Contribution {
                descriptor,
                arrival,
                provider: Some(provider.to_string()),
            });
        }
        let added = contributions.len() - before;
        tracing::trace!(provider, added, "resource batch contributed");
        added
    }

    /// Number of descriptors contributed so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contributions.lock().len()
    }

    /// Returns true if nothing has been contributed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contributions.lock().is_empty()
    }

    /// Resolves everything contributed so far.
    ///
    /// The collector keeps its contents, so finalizing twice yields the same
    /// plan.
    ///
    /// # Errors
    ///
    /// Same as [`resolve_with_policy`](crate::resolve_with_policy).
    pub fn finalize(&self, policy: RequirementPolicy) -> Result<ResourcePlan, ResolutionError> {
        let snapshot = self.contributions.lock().clone();
        resolve_contributions(snapshot, policy)
    }
}
