//! Core infrastructure plugins for Portico.
//!
//! - [`ServerInfoPlugin`] - Deployment metadata
//! - [`TimePlugin`] - Global [`Clock`], mockable for tests
//! - [`TracingPlugin`] - `tracing` subscriber setup
//! - [`StoragePlugin`] - Path-addressed key-value [`Storage`] for components
//! - [`DefaultPlugins`] / [`MinimalPlugins`] - Bundles of the above
//!
//! # Feature Flags
//!
//! - `test-utils` - Enables [`MockClock`] for deterministic time in tests
//!
//! # Example
//!
//! ```no_run
//! use portico_system::server::Server;
//! use portico_system::plugin::PluginGroup;
//! use portico_core_plugins::{DefaultPlugins, TracingPlugin};
//! use tracing::Level;
//!
//! Server::new()
//!     .add_plugins(
//!         DefaultPlugins
//!             .build()
//!             .disable::<TracingPlugin>()
//!             .add(TracingPlugin::default().with_level(Level::DEBUG)),
//!     )
//!     .run();
//! ```

mod server_info;
mod storage;
mod time;
mod tracing_plugin;

pub use server_info::{ServerInfo, ServerInfoPlugin};
pub use storage::{KeyValueStore, MemoryStore, Storage, StorageAPI, StorageError, StoragePlugin};
pub use time::{Clock, ClockProvider, TimePlugin};
pub use tracing_plugin::{TracingConfig, TracingFormat, TracingOutput, TracingPlugin};

#[cfg(any(test, feature = "test-utils"))]
pub use time::MockClock;

use portico_system::plugin::{PluginGroup, PluginGroupBuilder};

/// Every infrastructure plugin: server info, clock, tracing and storage.
pub struct DefaultPlugins;

impl PluginGroup for DefaultPlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::new()
            .add(ServerInfoPlugin::default())
            .add(TimePlugin::default())
            .add(TracingPlugin::default())
            .add(StoragePlugin::default())
    }
}

/// [`DefaultPlugins`] without tracing, for tests and embedding hosts that
/// install their own subscriber.
pub struct MinimalPlugins;

impl PluginGroup for MinimalPlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::new()
            .add(ServerInfoPlugin::default())
            .add(TimePlugin::default())
            .add(StoragePlugin::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_system::server::Server;

    #[test]
    fn group_sizes() {
        assert_eq!(DefaultPlugins.build().len(), 4);
        assert_eq!(MinimalPlugins.build().len(), 3);
        assert!(!MinimalPlugins.build().contains::<TracingPlugin>());
    }

    #[test]
    fn server_with_minimal_plugins() {
        let mut server = Server::new();
        server.add_plugins(MinimalPlugins.build());
        server.finish();

        assert!(server.contains_global::<ServerInfo>());
        assert!(server.contains_global::<Clock>());
        assert!(server.contains_global::<Storage>());
    }
}
