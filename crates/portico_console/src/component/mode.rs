//! Render modes.

use core::fmt;
use core::str::FromStr;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A named presentation variant of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Compact dashboard tile.
    Preview,
    /// Full-size view.
    View,
    /// Settings editor.
    Edit,
    /// Help text.
    Help,
    /// Content embedded in another component.
    Content,
}

impl RenderMode {
    /// Every mode in protocol order.
    pub const ALL: [Self; 5] = [
        Self::Preview,
        Self::View,
        Self::Edit,
        Self::Help,
        Self::Content,
    ];

    /// Wire name of the mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preview => "preview",
            Self::View => "view",
            Self::Edit => "edit",
            Self::Help => "help",
            Self::Content => "content",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown render mode '{s}'"))
    }
}

/// Ordered set of render modes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenderModes(BTreeSet<RenderMode>);

impl RenderModes {
    /// The empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses wire names, skipping the ones that are not modes.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter_map(|name| name.as_ref().parse().ok())
            .collect()
    }

    /// Wire names in mode order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|mode| mode.as_str().to_string()).collect()
    }

    /// Adds a mode. Returns false if it was already present.
    pub fn insert(&mut self, mode: RenderMode) -> bool {
        self.0.insert(mode)
    }

    /// Returns true if `mode` is in the set.
    #[must_use]
    pub fn contains(&self, mode: RenderMode) -> bool {
        self.0.contains(&mode)
    }

    /// Modes present in both sets.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        self.0.intersection(&other.0).copied().collect()
    }

    /// Number of modes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Modes in order.
    pub fn iter(&self) -> impl Iterator<Item = RenderMode> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<RenderMode> for RenderModes {
    fn from_iter<I: IntoIterator<Item = RenderMode>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[RenderMode; N]> for RenderModes {
    fn from(modes: [RenderMode; N]) -> Self {
        modes.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively_and_skips_unknown() {
        let modes = RenderModes::from_names(["View", "preview", "fullscreen", "view"]);
        assert_eq!(modes.names(), vec!["preview", "view"]);
    }

    #[test]
    fn intersection_keeps_order() {
        let supported = RenderModes::from([RenderMode::Preview, RenderMode::View]);
        let requested = RenderModes::from([RenderMode::Help, RenderMode::View, RenderMode::Preview]);
        assert_eq!(
            requested.intersection(&supported).iter().collect::<Vec<_>>(),
            vec![RenderMode::Preview, RenderMode::View]
        );
    }

    #[test]
    fn serializes_as_lowercase_list() {
        let modes = RenderModes::from([RenderMode::Edit, RenderMode::Preview]);
        assert_eq!(serde_json::to_string(&modes).unwrap(), r#"["preview","edit"]"#);
    }
}
