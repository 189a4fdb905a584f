//! Server integration.
//!
//! [`ConsolePlugin`] exposes three build-time APIs to other plugins and, once
//! every plugin is built, freezes what they registered into the [`Console`]
//! global resource:
//!
//! - [`ComponentTypesAPI`] - component types
//! - [`PageResourcesAPI`] - page resource providers
//! - [`TemplatesAPI`](crate::TemplatesAPI) - fragment templates
//!
//! # Example
//!
//! ```
//! use portico_console::{Console, ConsolePlugin, PageResourcesAPI, StaticResources};
//! use portico_core_plugins::MinimalPlugins;
//! use portico_resources::ResourceDescriptor;
//! use portico_system::plugin::{Plugin, PluginGroup, PluginId};
//! use portico_system::server::Server;
//!
//! struct JqueryPlugin;
//!
//! impl Plugin for JqueryPlugin {
//!     fn build(&self, server: &mut Server) {
//!         let api = server.api::<PageResourcesAPI>().expect("ConsolePlugin added");
//!         api.add(StaticResources::new("jquery", [
//!             ResourceDescriptor::script_uri("/lib/jquery.js").provides(["jquery"]),
//!         ]));
//!     }
//!
//!     fn dependencies(&self) -> Vec<PluginId> {
//!         vec![PluginId::of::<ConsolePlugin>()]
//!     }
//! }
//!
//! let mut server = Server::new();
//! server
//!     .add_plugins(MinimalPlugins.build())
//!     .add_plugins(ConsolePlugin::default())
//!     .add_plugins(JqueryPlugin);
//! server.finish();
//!
//! assert!(server.get_global::<Console>().is_some());
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use portico_core_plugins::{Clock, Storage, StoragePlugin, TimePlugin};
use portico_resources::{RequirementPolicy, ResourceDescriptor};
use portico_system::api::API;
use portico_system::plugin::{Plugin, PluginId};
use portico_system::server::Server;

use crate::component::{Component, ComponentTypes, ErasedComponent};
use crate::config::ConsoleConfig;
use crate::coordinator::Console;
use crate::template::TemplatesAPI;

// ─────────────────────────────────────────────────────────────────────────────
// Page resource providers
// ─────────────────────────────────────────────────────────────────────────────

/// Contributes page resources when a console becomes ready.
pub trait PageResourceProvider: Send + Sync + 'static {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// The provider's descriptor batch.
    fn page_resources(&self) -> Vec<ResourceDescriptor>;
}

/// A provider with a fixed batch.
#[derive(Debug, Clone)]
pub struct StaticResources {
    name: String,
    descriptors: Vec<ResourceDescriptor>,
}

impl StaticResources {
    /// A provider named `name` contributing `descriptors`.
    pub fn new(
        name: impl Into<String>,
        descriptors: impl IntoIterator<Item = ResourceDescriptor>,
    ) -> Self {
        Self {
            name: name.into(),
            descriptors: descriptors.into_iter().collect(),
        }
    }
}

impl PageResourceProvider for StaticResources {
    fn name(&self) -> &str {
        &self.name
    }

    fn page_resources(&self) -> Vec<ResourceDescriptor> {
        self.descriptors.clone()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Build-time APIs
// ─────────────────────────────────────────────────────────────────────────────

/// Build-time component type registration.
#[derive(Default)]
pub struct ComponentTypesAPI {
    types: Mutex<ComponentTypes>,
}

impl API for ComponentTypesAPI {}

impl ComponentTypesAPI {
    /// Registers a component type.
    pub fn register<C: Component>(&self, component: C) {
        self.types.lock().register(component);
    }

    /// Registers an already erased component type.
    pub fn register_shared(&self, component: Arc<dyn ErasedComponent>) {
        self.types.lock().register_shared(component);
    }

    /// Returns true if `type_name` is registered.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.lock().contains(type_name)
    }

    fn take(&self) -> ComponentTypes {
        core::mem::take(&mut *self.types.lock())
    }
}

/// Build-time page resource provider registration.
#[derive(Default)]
pub struct PageResourcesAPI {
    providers: Mutex<Vec<Arc<dyn PageResourceProvider>>>,
}

impl API for PageResourcesAPI {}

impl PageResourcesAPI {
    /// Adds a provider. Providers contribute in the order they were added.
    pub fn add(&self, provider: impl PageResourceProvider) {
        self.providers.lock().push(Arc::new(provider));
    }

    /// Number of providers added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.lock().len()
    }

    /// Returns true if no provider was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.lock().is_empty()
    }

    fn take(&self) -> Vec<Arc<dyn PageResourceProvider>> {
        core::mem::take(&mut *self.providers.lock())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ConsolePlugin
// ─────────────────────────────────────────────────────────────────────────────

/// Provides the [`Console`] global resource.
///
/// # Dependencies
///
/// - [`TimePlugin`]
/// - [`StoragePlugin`]
///
/// # Resources
///
/// - [`ConsoleConfig`] (global, from `build()`)
/// - [`Console`] (global, from `ready()`)
#[derive(Debug, Clone, Default)]
pub struct ConsolePlugin {
    config: ConsoleConfig,
}

impl ConsolePlugin {
    /// Uses a complete configuration.
    #[must_use]
    pub fn with_config(config: ConsoleConfig) -> Self {
        Self { config }
    }

    /// Sets the inactivity timeout.
    #[must_use]
    pub fn with_inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.config.inactivity_timeout = timeout;
        self
    }

    /// Sets how often idle connections are swept.
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Sets the default locale and the supported set. The default is added
    /// to the set if missing.
    #[must_use]
    pub fn with_locales<I, S>(mut self, default: impl Into<String>, supported: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let default = default.into();
        let mut supported: Vec<String> = supported.into_iter().map(Into::into).collect();
        if !supported.iter().any(|tag| tag.eq_ignore_ascii_case(&default)) {
            supported.insert(0, default.clone());
        }
        self.config.default_locale = default;
        self.config.supported_locales = supported;
        self
    }

    /// Sets how unsatisfied requirements are handled.
    #[must_use]
    pub fn with_requirement_policy(mut self, policy: RequirementPolicy) -> Self {
        self.config.requirement_policy = policy;
        self
    }

    /// The configuration this plugin installs.
    #[must_use]
    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }
}

impl Plugin for ConsolePlugin {
    fn build(&self, server: &mut Server) {
        server.insert_global(self.config.clone());
        server.insert_api(ComponentTypesAPI::default());
        server.insert_api(PageResourcesAPI::default());
        server.insert_api(TemplatesAPI::default());
    }

    fn ready(&self, server: &mut Server) {
        let types = server
            .api::<ComponentTypesAPI>()
            .map(ComponentTypesAPI::take)
            .unwrap_or_default();
        let providers = server
            .api::<PageResourcesAPI>()
            .map(PageResourcesAPI::take)
            .unwrap_or_default();
        let templates = server
            .api::<TemplatesAPI>()
            .map(TemplatesAPI::take)
            .unwrap_or_default();
        let clock = server.get_global::<Clock>().cloned().unwrap_or_default();
        let storage = server.get_global::<Storage>().cloned().unwrap_or_default();
        let config = server
            .get_global::<ConsoleConfig>()
            .cloned()
            .unwrap_or_else(|| self.config.clone());

        let console = Console::builder()
            .with_config(config)
            .with_clock(clock)
            .with_storage(storage)
            .with_templates(templates)
            .with_types(types)
            .with_providers(providers)
            .build();
        server.insert_global(console);
    }

    fn dependencies(&self) -> Vec<PluginId> {
        vec![PluginId::of::<TimePlugin>(), PluginId::of::<StoragePlugin>()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locales_include_default() {
        let plugin = ConsolePlugin::default().with_locales("de", ["en", "fr"]);
        assert_eq!(plugin.config().default_locale, "de");
        assert_eq!(plugin.config().supported_locales, vec!["de", "en", "fr"]);

        let plugin = ConsolePlugin::default().with_locales("en", ["EN", "fr"]);
        assert_eq!(plugin.config().supported_locales, vec!["EN", "fr"]);
    }

    #[test]
    fn builder_methods() {
        let plugin = ConsolePlugin::default()
            .with_inactivity_timeout(Duration::from_secs(5))
            .with_sweep_interval(Duration::from_secs(1))
            .with_requirement_policy(RequirementPolicy::Warn);
        assert_eq!(plugin.config().inactivity_timeout, Duration::from_secs(5));
        assert_eq!(plugin.config().sweep_interval, Duration::from_secs(1));
        assert_eq!(plugin.config().requirement_policy, RequirementPolicy::Warn);
    }

    #[test]
    fn static_resources_provider() {
        let provider = StaticResources::new(
            "libs",
            [ResourceDescriptor::script_uri("/a.js").provides(["a"])],
        );
        assert_eq!(provider.name(), "libs");
        assert_eq!(provider.page_resources().len(), 1);
    }
}
