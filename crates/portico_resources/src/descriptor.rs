//! Resource descriptors: what a page needs loaded, and what it depends on.

use core::fmt;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Opaque name of a client-side library or feature, such as `"jquery"`.
///
/// Only used to order resources; never interpreted as a URI.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityTag(String);

impl CapabilityTag {
    /// Creates a tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the tag text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapabilityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CapabilityTag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for CapabilityTag {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

/// Script or stylesheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// A `<script>` element.
    Script,
    /// A `<link rel="stylesheet">` or `<style>` element.
    Style,
}

/// Where the resource content comes from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Locator {
    /// Loaded from a URI.
    Uri(String),
    /// Embedded source text.
    Inline(String),
}

/// How the browser should treat a script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptType {
    /// `type="text/javascript"`.
    #[default]
    Classic,
    /// `type="module"`.
    Module,
    /// A data block, not executed.
    Data,
}

/// A script or style resource with the capabilities it provides and requires.
///
/// # Example
///
/// ```
/// use portico_resources::ResourceDescriptor;
///
/// let gridstack = ResourceDescriptor::script_uri("/lib/gridstack.js")
///     .provides(["gridstack"])
///     .requires(["jquery", "jquery-ui"]);
///
/// assert_eq!(gridstack.requires_set().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    kind: ResourceKind,
    locator: Locator,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    provides: BTreeSet<CapabilityTag>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    requires: BTreeSet<CapabilityTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    script_type: Option<ScriptType>,
    #[serde(default)]
    priority: i32,
}

impl ResourceDescriptor {
    fn with_locator(kind: ResourceKind, locator: Locator) -> Self {
        let script_type = match kind {
            ResourceKind::Script => Some(ScriptType::Classic),
            ResourceKind::Style => None,
        };
        Self {
            kind,
            locator,
            provides: BTreeSet::new(),
            requires: BTreeSet::new(),
            script_type,
            priority: 0,
        }
    }

    /// A classic script loaded from `uri`.
    #[must_use]
    pub fn script_uri(uri: impl Into<String>) -> Self {
        Self::with_locator(ResourceKind::Script, Locator::Uri(uri.into()))
    }

    /// A classic script with embedded source.
    #[must_use]
    pub fn inline_script(source: impl Into<String>) -> Self {
        Self::with_locator(ResourceKind::Script, Locator::Inline(source.into()))
    }

    /// A stylesheet loaded from `uri`.
    #[must_use]
    pub fn style_uri(uri: impl Into<String>) -> Self {
        Self::with_locator(ResourceKind::Style, Locator::Uri(uri.into()))
    }

    /// A stylesheet with embedded source.
    #[must_use]
    pub fn inline_style(source: impl Into<String>) -> Self {
        Self::with_locator(ResourceKind::Style, Locator::Inline(source.into()))
    }

    /// Adds provided capabilities.
    #[must_use]
    pub fn provides<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<CapabilityTag>,
    {
        self.provides.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Adds required capabilities.
    #[must_use]
    pub fn requires<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<CapabilityTag>,
    {
        self.requires.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Sets the script type. Ignored for styles.
    #[must_use]
    pub fn with_script_type(mut self, script_type: ScriptType) -> Self {
        if self.kind == ResourceKind::Script {
            self.script_type = Some(script_type);
        }
        self
    }

    /// Sets the load priority. Among unconstrained resources, higher loads
    /// first.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Script or style.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Where the content comes from.
    #[must_use]
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Capabilities this resource provides.
    #[must_use]
    pub fn provides_set(&self) -> &BTreeSet<CapabilityTag> {
        &self.provides
    }

    /// Capabilities that must be loaded before this resource.
    #[must_use]
    pub fn requires_set(&self) -> &BTreeSet<CapabilityTag> {
        &self.requires
    }

    /// Script type, `None` for styles.
    #[must_use]
    pub fn script_type(&self) -> Option<ScriptType> {
        self.script_type
    }

    /// Load priority.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Short human-readable name for logs and errors.
    #[must_use]
    pub fn label(&self) -> String {
        let kind = match self.kind {
            ResourceKind::Script => "script",
            ResourceKind::Style => "style",
        };
        match (&self.locator, self.provides.first()) {
            (Locator::Uri(uri), _) => uri.clone(),
            (Locator::Inline(_), Some(tag)) => format!("inline {kind} providing '{tag}'"),
            (Locator::Inline(source), None) => {
                let head: String = source.chars().take(24).collect();
                format!("inline {kind} '{head}'")
            }
        }
    }
}
