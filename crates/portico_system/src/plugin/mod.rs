//! Plugin system for extensible console functionality.
//!
//! Plugins are the unit of composition in Portico. Component types, page
//! resource providers, storage backends and logging are all delivered by
//! plugins; the server only orders and drives them.
//!
//! # Example
//!
//! ```
//! use portico_system::plugin::{Plugin, PluginId};
//! use portico_system::server::Server;
//!
//! struct StoragePlugin;
//! impl Plugin for StoragePlugin {
//!     fn build(&self, _server: &mut Server) {}
//! }
//!
//! struct NotesPlugin;
//!
//! impl Plugin for NotesPlugin {
//!     fn build(&self, _server: &mut Server) {}
//!
//!     fn dependencies(&self) -> Vec<PluginId> {
//!         vec![PluginId::of::<StoragePlugin>()]
//!     }
//! }
//!
//! let mut server = Server::new();
//! server.add_plugins(NotesPlugin).add_plugins(StoragePlugin);
//! server.run();
//! ```

use core::any::TypeId;

use crate::server::Server;

// ─────────────────────────────────────────────────────────────────────────────
// PluginId
// ─────────────────────────────────────────────────────────────────────────────

/// Unique identifier for a plugin type.
///
/// Used for dependency resolution and duplicate detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PluginId {
    type_id: TypeId,
    type_name: &'static str,
}

impl PluginId {
    /// Creates a `PluginId` for the given plugin type.
    #[must_use]
    pub fn of<P: Plugin>() -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            type_name: core::any::type_name::<P>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name for debugging.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Plugin Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A unit of console functionality.
///
/// The server drives every plugin through a fixed lifecycle:
///
/// 1. **Build Phase** - `build()` in dependency order. Register APIs,
///    resources, component types and page resource providers here.
/// 2. **Ready Phase** - `ready()` in dependency order, after every plugin has
///    been built. Freeze registries, validate required resources.
/// 3. **Cleanup Phase** - `cleanup()` in reverse dependency order.
///
/// Because all plugins are built before any is readied, a registry plugin can
/// collect registrations from its dependents in their `build()` and freeze
/// them in its own `ready()`.
pub trait Plugin: Send + Sync + 'static {
    /// Configures the server. Called once, in dependency order.
    fn build(&self, server: &mut Server);

    /// Called after all plugins have been built.
    fn ready(&self, _server: &mut Server) {}

    /// Called when the server shuts down, dependents before dependencies.
    fn cleanup(&self, _server: &mut Server) {}

    /// Returns the plugin's name for debugging and error messages.
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    /// Declares plugins that must be built before this one.
    ///
    /// [`Server::finish`] panics if a dependency was never added.
    fn dependencies(&self) -> Vec<PluginId> {
        Vec::new()
    }

    /// Returns true if this plugin can only be added once (the default).
    fn is_unique(&self) -> bool {
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Plugins Trait (for add_plugins polymorphism)
// ─────────────────────────────────────────────────────────────────────────────

/// Types that can be handed to [`Server::add_plugins`]: single plugins and
/// [`PluginGroupBuilder`]s.
pub trait Plugins {
    /// Adds these plugins to the server.
    fn add_to_server(self, server: &mut Server);
}

impl<P: Plugin> Plugins for P {
    fn add_to_server(self, server: &mut Server) {
        // Capture the id while the concrete type is still known.
        let id = PluginId::of::<P>();
        server.add_plugin_boxed(id, Box::new(self));
    }
}

impl Plugins for PluginGroupBuilder {
    fn add_to_server(self, server: &mut Server) {
        for boxed in self.plugins {
            server.add_plugin_boxed(boxed.id, boxed.plugin);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PluginGroup
// ─────────────────────────────────────────────────────────────────────────────

/// A bundle of plugins added together, customizable before insertion.
///
/// ```ignore
/// server.add_plugins(
///     DefaultPlugins
///         .build()
///         .disable::<TracingPlugin>()
/// );
/// ```
pub trait PluginGroup {
    /// Returns the plugins in this group.
    fn build(self) -> PluginGroupBuilder;
}

/// A boxed plugin with its captured [`PluginId`].
pub(crate) struct BoxedPlugin {
    pub(crate) id: PluginId,
    pub(crate) plugin: Box<dyn Plugin>,
}

impl BoxedPlugin {
    fn name(&self) -> &str {
        self.plugin.name()
    }
}

/// Builder for customizing plugin groups.
#[derive(Default)]
pub struct PluginGroupBuilder {
    pub(crate) plugins: Vec<BoxedPlugin>,
}

impl PluginGroupBuilder {
    /// Creates a new empty plugin group builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    /// Adds a plugin to the end of the group.
    #[must_use]
    #[expect(
        clippy::should_implement_trait,
        reason = "This is a builder method, not std::ops::Add"
    )]
    /// Appends a plugin.
    pub fn add<P: Plugin>(mut self, plugin: P) -> Self {
        self.plugins.push(BoxedPlugin {
            id: PluginId::of::<P>(),
            plugin: Box::new(plugin),
        });
        self
    }

    /// Adds a plugin before `Target`, or at the beginning if `Target` is absent.
    #[must_use]
    pub fn add_before<P: Plugin, Target: Plugin>(mut self, plugin: P) -> Self {
        let position = self.position_of::<Target>().unwrap_or(0);
        self.plugins.insert(
            position,
            BoxedPlugin {
                id: PluginId::of::<P>(),
                plugin: Box::new(plugin),
            },
        );
        self
    }

    /// Adds a plugin after `Target`, or at the end if `Target` is absent.
    #[must_use]
    pub fn add_after<P: Plugin, Target: Plugin>(mut self, plugin: P) -> Self {
        let position = self
            .position_of::<Target>()
            .map_or(self.plugins.len(), |i| i + 1);
        self.plugins.insert(
            position,
            BoxedPlugin {
                id: PluginId::of::<P>(),
                plugin: Box::new(plugin),
            },
        );
        self
    }

    /// Removes a plugin from the group by type. No-op if absent.
    #[must_use]
    pub fn disable<P: Plugin>(mut self) -> Self {
        let target = PluginId::of::<P>();
        self.plugins.retain(|p| p.id != target);
        self
    }

    /// Returns true if the group contains a plugin of type `P`.
    #[must_use]
    pub fn contains<P: Plugin>(&self) -> bool {
        self.position_of::<P>().is_some()
    }

    /// Returns the number of plugins in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns true if the group contains no plugins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    fn position_of<P: Plugin>(&self) -> Option<usize> {
        let target = PluginId::of::<P>();
        self.plugins.iter().position(|p| p.id == target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Storage;
    impl Plugin for Storage {
        fn build(&self, _server: &mut Server) {}
    }

    struct Console;
    impl Plugin for Console {
        fn build(&self, _server: &mut Server) {}
        fn dependencies(&self) -> Vec<PluginId> {
            vec![PluginId::of::<Storage>()]
        }
    }

    struct Libraries;
    impl Plugin for Libraries {
        fn build(&self, _server: &mut Server) {}
    }

    fn names(builder: &PluginGroupBuilder) -> Vec<&str> {
        builder.plugins.iter().map(BoxedPlugin::name).collect()
    }

    #[test]
    fn plugin_id_equality() {
        assert_eq!(PluginId::of::<Storage>(), PluginId::of::<Storage>());
        assert_ne!(PluginId::of::<Storage>(), PluginId::of::<Console>());
        assert_eq!(PluginId::of::<Storage>().type_id(), TypeId::of::<Storage>());
    }

    #[test]
    fn plugin_defaults() {
        assert!(Storage.name().contains("Storage"));
        assert!(Storage.is_unique());
        assert!(Storage.dependencies().is_empty());
        assert_eq!(Console.dependencies(), vec![PluginId::of::<Storage>()]);
    }

    #[test]
    fn group_add_before_and_after() {
        let builder = PluginGroupBuilder::new()
            .add(Storage)
            .add(Console)
            .add_before::<_, Console>(Libraries);
        let order = names(&builder);
        assert!(order[0].contains("Storage"));
        assert!(order[1].contains("Libraries"));
        assert!(order[2].contains("Console"));

        let builder = PluginGroupBuilder::new()
            .add(Storage)
            .add(Console)
            .add_after::<_, Storage>(Libraries);
        assert!(names(&builder)[1].contains("Libraries"));
    }

    #[test]
    fn group_missing_target_positions() {
        let before = PluginGroupBuilder::new()
            .add(Storage)
            .add_before::<_, Console>(Libraries);
        assert!(names(&before)[0].contains("Libraries"));

        let after = PluginGroupBuilder::new()
            .add(Storage)
            .add_after::<_, Console>(Libraries);
        assert!(names(&after)[1].contains("Libraries"));
    }

    #[test]
    fn group_disable() {
        let builder = PluginGroupBuilder::new()
            .add(Storage)
            .add(Console)
            .disable::<Storage>()
            .disable::<Libraries>();
        assert_eq!(builder.len(), 1);
        assert!(builder.contains::<Console>());
        assert!(!builder.contains::<Storage>());
    }

    #[test]
    fn empty_group() {
        let builder = PluginGroupBuilder::new();
        assert!(builder.is_empty());
        assert_eq!(builder.len(), 0);
    }
}
