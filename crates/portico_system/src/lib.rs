//! The plugin orchestration layer of Portico (Layer 1).
//!
//! `portico_system` provides the primitives every console is assembled from:
//!
//! - [`api`] - API trait for build-time capability registries
//! - [`plugin`] - Plugin trait and plugin groups
//! - [`resource`] - Type-keyed resource storage
//! - [`server`] - Server runtime that orders, builds and readies plugins
//!
//! # Architecture
//!
//! - **Layer 1** (`portico_system`, `portico_core_plugins`): plugin orchestration
//!   and infrastructure (this crate)
//! - **Layer 2** (`portico_resources`, `portico_protocol`, `portico_console`):
//!   page resources, the console protocol and the component lifecycle
//! - **Layer 3** (`portico_conlets`): concrete components
//!
//! # Example
//!
//! ```
//! use portico_system::plugin::Plugin;
//! use portico_system::server::Server;
//! use portico_system::resource::GlobalResource;
//!
//! #[derive(Default)]
//! struct Branding { title: String }
//! impl GlobalResource for Branding {}
//!
//! struct BrandingPlugin;
//!
//! impl Plugin for BrandingPlugin {
//!     fn build(&self, server: &mut Server) {
//!         server.insert_global(Branding { title: "Console".into() });
//!     }
//! }
//!
//! let mut server = Server::new();
//! server.add_plugins(BrandingPlugin);
//! server.run();
//! assert!(server.contains_global::<Branding>());
//! ```

/// API trait for capability registration.
pub mod api;

/// Plugin trait for extensible functionality.
pub mod plugin;

/// Resource container management.
pub mod resource;

/// Server runtime for plugin orchestration.
pub mod server;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::api::*;
    pub use crate::plugin::*;
    pub use crate::resource::*;
    pub use crate::server::*;
}
