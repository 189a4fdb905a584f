//! Server runtime for plugin orchestration.
//!
//! The [`Server`] owns every plugin, global resource and API of a console
//! deployment. It orders plugins by their declared dependencies, builds them,
//! readies them, and tears them down in reverse on shutdown.
//!
//! # Lifecycle
//!
//! ```text
//! add_plugins() ─► finish() ─► [build all] ─► [ready all] ─► ... ─► cleanup()
//! ```
//!
//! # Example
//!
//! ```
//! use portico_system::plugin::Plugin;
//! use portico_system::resource::GlobalResource;
//! use portico_system::server::Server;
//!
//! struct Limits { max_instances: usize }
//! impl GlobalResource for Limits {}
//!
//! struct LimitsPlugin;
//! impl Plugin for LimitsPlugin {
//!     fn build(&self, server: &mut Server) {
//!         server.insert_global(Limits { max_instances: 64 });
//!     }
//! }
//!
//! let mut server = Server::new();
//! server.add_plugins(LimitsPlugin);
//! server.finish();
//! assert_eq!(server.get_global::<Limits>().map(|l| l.max_instances), Some(64));
//! ```

use core::any::{Any, TypeId};
use core::cmp::Reverse;
use std::collections::BinaryHeap;

use hashbrown::{HashMap, HashSet};

use crate::api::API;
use crate::plugin::{Plugin, PluginId, Plugins};
use crate::resource::{GlobalResource, Resource, Resources};

/// Build progress of a [`Server`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildState {
    NotStarted,
    Building,
    Built,
}

struct PluginEntry {
    id: PluginId,
    plugin: Box<dyn Plugin>,
    name: String,
}

/// Orchestrates plugins, global resources and APIs.
pub struct Server {
    global: Resources,
    resources: Resources,
    apis: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    pending_plugins: Vec<PluginEntry>,
    built_plugins: Vec<PluginEntry>,
    plugin_ids: HashSet<PluginId>,
    build_state: BuildState,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Server {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Server")
            .field("global", &self.global)
            .field("resources", &self.resources)
            .field("apis", &self.apis.len())
            .field("plugins", &self.plugin_names())
            .field("build_state", &self.build_state)
            .finish()
    }
}

impl Server {
    /// Creates a new empty server.
    #[must_use]
    pub fn new() -> Self {
        Self {
            global: Resources::new(),
            resources: Resources::new(),
            apis: HashMap::new(),
            pending_plugins: Vec::new(),
            built_plugins: Vec::new(),
            plugin_ids: HashSet::new(),
            build_state: BuildState::NotStarted,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Plugin Management
    // ─────────────────────────────────────────────────────────────────────────

    /// Adds a plugin or a [`PluginGroupBuilder`](crate::plugin::PluginGroupBuilder).
    ///
    /// # Panics
    ///
    /// Panics if a unique plugin is added twice.
    pub fn add_plugins<P: Plugins>(&mut self, plugins: P) -> &mut Self {
        plugins.add_to_server(self);
        self
    }

    pub(crate) fn add_plugin_boxed(&mut self, id: PluginId, plugin: Box<dyn Plugin>) {
        let name = plugin.name().to_string();

        let first = self.plugin_ids.insert(id);
        if plugin.is_unique() && !first {
            panic!(
                "Plugin '{name}' is unique and was already added.\n\
                 Override `is_unique()` to return false to allow duplicates."
            );
        }

        let entry = PluginEntry { id, plugin, name };

        // Plugins added from inside another plugin's build() are built at once.
        if self.build_state == BuildState::Building {
            entry.plugin.build(self);
            self.built_plugins.push(entry);
        } else {
            self.pending_plugins.push(entry);
        }
    }

    /// Returns true if a plugin of type `P` has been added.
    #[must_use]
    pub fn has_plugin<P: Plugin>(&self) -> bool {
        self.plugin_ids.contains(&PluginId::of::<P>())
    }

    /// Names of all plugins, built ones first in build order.
    #[must_use]
    pub fn plugin_names(&self) -> Vec<&str> {
        self.built_plugins
            .iter()
            .chain(self.pending_plugins.iter())
            .map(|entry| entry.name.as_str())
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Server Resources
    // ─────────────────────────────────────────────────────────────────────────

    /// Inserts a mutable server resource, returning the previous value.
    pub fn insert_resource<R: Resource>(&mut self, resource: R) -> Option<R> {
        self.resources.insert(resource)
    }

    /// Returns true if a server resource of type `R` exists.
    #[must_use]
    pub fn contains_resource<R: Resource>(&self) -> bool {
        self.resources.contains::<R>()
    }

    /// Returns the server resource of type `R`.
    #[must_use]
    pub fn get_resource<R: Resource>(&self) -> Option<&R> {
        self.resources.get::<R>().ok()
    }

    /// Returns the server resource of type `R` mutably.
    pub fn get_resource_mut<R: Resource>(&mut self) -> Option<&mut R> {
        self.resources.get_mut::<R>().ok()
    }

    /// Removes and returns the server resource of type `R`.
    pub fn remove_resource<R: Resource>(&mut self) -> Option<R> {
        self.resources.remove::<R>()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Global Resources
    // ─────────────────────────────────────────────────────────────────────────

    /// Inserts a global resource, returning the previous value.
    pub fn insert_global<R: GlobalResource>(&mut self, resource: R) -> Option<R> {
        self.global.insert(resource)
    }

    /// Returns true if a global resource of type `R` exists.
    #[must_use]
    pub fn contains_global<R: GlobalResource>(&self) -> bool {
        self.global.contains::<R>()
    }

    /// Returns the global resource of type `R`.
    #[must_use]
    pub fn get_global<R: GlobalResource>(&self) -> Option<&R> {
        self.global.get::<R>().ok()
    }

    /// Returns true once [`finish`](Self::finish) has completed.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.build_state == BuildState::Built
    }

    // ─────────────────────────────────────────────────────────────────────────
    // APIs
    // ─────────────────────────────────────────────────────────────────────────

    /// Registers an API, returning the previous instance of the same type.
    ///
    /// ```ignore
    /// fn build(&self, server: &mut Server) {
    ///     server.insert_api(ComponentTypesAPI::new());
    /// }
    /// ```
    pub fn insert_api<A: API>(&mut self, api: A) -> Option<A> {
        self.apis
            .insert(TypeId::of::<A>(), Box::new(api))
            .and_then(|old| old.downcast::<A>().ok())
            .map(|boxed| *boxed)
    }

    /// Returns the API of type `A`, if registered.
    #[must_use]
    pub fn api<A: API>(&self) -> Option<&A> {
        self.apis
            .get(&TypeId::of::<A>())
            .and_then(|boxed| boxed.downcast_ref::<A>())
    }

    /// Returns true if an API of type `A` is registered.
    #[must_use]
    pub fn contains_api<A: API>(&self) -> bool {
        self.apis.contains_key(&TypeId::of::<A>())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Orders plugins by dependency, then builds and readies all of them.
    ///
    /// Plugins without a dependency relation keep the order they were added in.
    ///
    /// # Panics
    ///
    /// - If a plugin's dependency was never added
    /// - If plugin dependencies form a cycle
    /// - If called more than once
    pub fn finish(&mut self) {
        if self.build_state != BuildState::NotStarted {
            panic!("Server::finish() was already called. Cannot build twice.");
        }

        let sorted = self.sort_plugins_by_dependencies();

        self.build_state = BuildState::Building;
        for entry in sorted {
            entry.plugin.build(self);
            self.built_plugins.push(entry);
        }

        let plugins = core::mem::take(&mut self.built_plugins);
        for entry in &plugins {
            entry.plugin.ready(self);
        }
        self.restore_plugins(plugins);

        self.build_state = BuildState::Built;
    }

    /// Alias for [`finish`](Self::finish).
    pub fn run(&mut self) {
        self.finish();
    }

    /// Cleans up all plugins in reverse build order.
    pub fn cleanup(&mut self) {
        let plugins = core::mem::take(&mut self.built_plugins);
        for entry in plugins.iter().rev() {
            entry.plugin.cleanup(self);
        }
        self.restore_plugins(plugins);
    }

    fn restore_plugins(&mut self, plugins: Vec<PluginEntry>) {
        let added = core::mem::replace(&mut self.built_plugins, plugins);
        self.built_plugins.extend(added);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal: Dependency Resolution
    // ─────────────────────────────────────────────────────────────────────────

    /// Kahn's algorithm over pending plugins. Ties are broken by insertion
    /// index so independent plugins keep their relative order.
    fn sort_plugins_by_dependencies(&mut self) -> Vec<PluginEntry> {
        let pending = core::mem::take(&mut self.pending_plugins);
        let n = pending.len();

        let mut index_of: HashMap<PluginId, usize> = HashMap::with_capacity(n);
        for (i, entry) in pending.iter().enumerate() {
            index_of.entry(entry.id).or_insert(i);
        }

        let mut in_degree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (i, entry) in pending.iter().enumerate() {
            for dep in entry.plugin.dependencies() {
                match index_of.get(&dep) {
                    Some(&dep_idx) => {
                        dependents[dep_idx].push(i);
                        in_degree[i] += 1;
                    }
                    None if self.built_plugins.iter().any(|p| p.id == dep) => {}
                    None => panic!(
                        "Plugin '{}' requires '{}' which was not added.\n\
                         Add {} to the server, or use a plugin group that includes it.",
                        entry.name,
                        dep.type_name(),
                        dep.type_name()
                    ),
                }
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, deg)| **deg == 0)
            .map(|(i, _)| Reverse(i))
            .collect();
        let mut order = Vec::with_capacity(n);

        while let Some(Reverse(idx)) = ready.pop() {
            order.push(idx);
            for &dependent in &dependents[idx] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.push(Reverse(dependent));
                }
            }
        }

        if order.len() != n {
            let in_cycle: Vec<&str> = in_degree
                .iter()
                .enumerate()
                .filter(|(_, deg)| **deg > 0)
                .map(|(i, _)| pending[i].name.as_str())
                .collect();
            panic!(
                "Circular dependency detected among plugins: {in_cycle:?}\n\
                 Break the cycle by extracting shared functionality into a separate plugin."
            );
        }

        let mut slots: Vec<Option<PluginEntry>> = pending.into_iter().map(Some).collect();
        order
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .collect()
    }
}
