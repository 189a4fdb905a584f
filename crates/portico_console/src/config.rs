//! Console configuration.

use std::time::Duration;

use portico_resources::RequirementPolicy;
use portico_system::resource::GlobalResource;
use serde::{Deserialize, Serialize};

/// Runtime settings of the console.
///
/// Deserializes from partial input; every missing field takes its default.
/// Durations are whole seconds.
///
/// ```
/// use std::time::Duration;
/// use portico_console::ConsoleConfig;
///
/// let config: ConsoleConfig =
///     serde_json::from_str(r#"{"inactivity_timeout": 300, "supported_locales": ["en", "de"]}"#)
///         .unwrap();
/// assert_eq!(config.inactivity_timeout, Duration::from_secs(300));
/// assert_eq!(config.sweep_interval, Duration::from_secs(30));
/// assert!(config.supports_locale("DE"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Connections silent for this long are closed by the sweeper.
    #[serde(with = "secs")]
    pub inactivity_timeout: Duration,
    /// How often the sweeper looks for idle connections.
    #[serde(with = "secs")]
    pub sweep_interval: Duration,
    /// Locale of a freshly opened connection.
    pub default_locale: String,
    /// Locales accepted by `setLocale`.
    pub supported_locales: Vec<String>,
    /// Treatment of page-resource requirements nothing provides.
    pub requirement_policy: RequirementPolicy,
}

impl GlobalResource for ConsoleConfig {}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout: Duration::from_secs(120),
            sweep_interval: Duration::from_secs(30),
            default_locale: String::from("en"),
            supported_locales: vec![String::from("en")],
            requirement_policy: RequirementPolicy::Strict,
        }
    }
}

impl ConsoleConfig {
    /// The supported spelling of `tag`, compared case-insensitively.
    #[must_use]
    pub fn canonical_locale(&self, tag: &str) -> Option<&str> {
        self.supported_locales
            .iter()
            .find(|supported| supported.eq_ignore_ascii_case(tag))
            .map(String::as_str)
    }

    /// Returns true if `tag` is a supported locale.
    #[must_use]
    pub fn supports_locale(&self, tag: &str) -> bool {
        self.canonical_locale(tag).is_some()
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ConsoleConfig::default();
        assert_eq!(config.inactivity_timeout, Duration::from_secs(120));
        assert_eq!(config.default_locale, "en");
        assert_eq!(config.requirement_policy, RequirementPolicy::Strict);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: ConsoleConfig =
            serde_json::from_str(r#"{"requirement_policy": "warn"}"#).unwrap();
        assert_eq!(config.requirement_policy, RequirementPolicy::Warn);
        assert_eq!(config.sweep_interval, Duration::from_secs(30));
    }

    #[test]
    fn serializes_durations_as_seconds() {
        let value = serde_json::to_value(ConsoleConfig::default()).unwrap();
        assert_eq!(value["inactivity_timeout"], 120);
    }

    #[test]
    fn locale_lookup_is_case_insensitive() {
        let config = ConsoleConfig {
            supported_locales: vec!["en".into(), "de-CH".into()],
            ..ConsoleConfig::default()
        };
        assert_eq!(config.canonical_locale("DE-ch"), Some("de-CH"));
        assert!(!config.supports_locale("fr"));
    }
}
