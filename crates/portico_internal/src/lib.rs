//! # Portico Internal Library
//!
//! Re-exports the core Portico crates for convenience.

/// Layer 1: plugin orchestration.
pub use portico_system;

/// Layer 1: infrastructure plugins.
pub use portico_core_plugins;

/// Layer 2: page resource ordering.
pub use portico_resources;

/// Layer 2: console message protocol.
pub use portico_protocol;

/// Layer 2: connections and component lifecycle.
pub use portico_console;

/// Layer 3: demo components.
pub use portico_conlets;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use portico_console::{
        Component, ComponentFault, ComponentInfo, ConnectionId, Console, ConsolePlugin,
        ConsoleSession, InstanceContext, InstanceId, ModelMutation, Release, RenderMode,
        RenderModes, RenderedFragment,
    };
    pub use portico_core_plugins::{DefaultPlugins, MinimalPlugins};
    pub use portico_resources::ResourceDescriptor;
    pub use portico_system::prelude::*;
}
