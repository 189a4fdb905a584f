//! Resolution errors.

use serde::{Deserialize, Serialize};

use crate::descriptor::CapabilityTag;

/// Why a set of descriptors could not be ordered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    /// Requirements form a cycle. Lists the capabilities on the cycle.
    #[error("dependency cycle among capabilities: {}", join(capabilities))]
    Cycle {
        /// Capabilities participating in the cycle, sorted.
        capabilities: Vec<CapabilityTag>,
    },

    /// A requirement is provided by nothing in the set.
    #[error("'{required_by}' requires capability '{capability}', which nothing provides")]
    UnsatisfiedRequirement {
        /// The missing capability.
        capability: CapabilityTag,
        /// Label of the descriptor that requires it.
        required_by: String,
    },
}

fn join(tags: &[CapabilityTag]) -> String {
    tags.iter()
        .map(CapabilityTag::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// What to do with a requirement nothing provides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementPolicy {
    /// Fail with [`ResolutionError::UnsatisfiedRequirement`].
    #[default]
    Strict,
    /// Log a warning and ignore the requirement.
    Warn,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_lists_tags() {
        let err = ResolutionError::Cycle {
            capabilities: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "dependency cycle among capabilities: a, b");
    }

    #[test]
    fn policy_deserializes_lowercase() {
        let policy: RequirementPolicy = serde_json::from_str("\"warn\"").unwrap();
        assert_eq!(policy, RequirementPolicy::Warn);
        assert_eq!(RequirementPolicy::default(), RequirementPolicy::Strict);
    }
}
