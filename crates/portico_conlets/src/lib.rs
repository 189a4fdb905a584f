//! Demo components and page libraries for Portico.
//!
//! Each component ships as a standalone plugin that registers the component
//! type and its templates with [`ConsolePlugin`](portico_console::ConsolePlugin).
//! [`ConletsPlugin`] bundles all of them with [`LibrariesPlugin`].
//!
//! | Component | Plugin | Instances |
//! |-----------|--------|-----------|
//! | [`HelloWorld`] | [`HelloWorldPlugin`] | many |
//! | [`SysInfo`] | [`SysInfoPlugin`] | one per connection |
//! | [`MessageBox`] | [`MessageBoxPlugin`] | many, stored |
//!
//! # Usage
//!
//! ```
//! use portico_conlets::ConletsPlugin;
//! use portico_console::{Console, ConsolePlugin};
//! use portico_core_plugins::MinimalPlugins;
//! use portico_system::plugin::PluginGroup;
//! use portico_system::server::Server;
//!
//! let mut server = Server::new();
//! server
//!     .add_plugins(MinimalPlugins.build())
//!     .add_plugins(ConsolePlugin::default())
//!     .add_plugins(ConletsPlugin.build());
//! server.finish();
//!
//! let console = server.get_global::<Console>().unwrap();
//! assert!(console.component_types().contains("HelloWorld"));
//! ```

mod hello_world;
mod libraries;
mod message_box;
mod sys_info;

pub use hello_world::{HelloWorld, HelloWorldModel, HelloWorldPlugin};
pub use libraries::{LibrariesPlugin, libraries};
pub use message_box::{MessageBox, MessageBoxModel, MessageBoxPlugin};
pub use sys_info::{SysInfo, SysInfoModel, SysInfoPlugin};

use portico_console::{ComponentTypesAPI, TemplatesAPI};
use portico_system::plugin::{PluginGroup, PluginGroupBuilder};
use portico_system::server::Server;

/// Every demo component plus [`LibrariesPlugin`].
pub struct ConletsPlugin;

impl PluginGroup for ConletsPlugin {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::new()
            .add(LibrariesPlugin)
            .add(HelloWorldPlugin)
            .add(SysInfoPlugin)
            .add(MessageBoxPlugin)
    }
}

fn registration_apis<'a>(
    server: &'a Server,
    plugin: &str,
) -> (&'a ComponentTypesAPI, &'a TemplatesAPI) {
    let (Some(types), Some(templates)) = (
        server.api::<ComponentTypesAPI>(),
        server.api::<TemplatesAPI>(),
    ) else {
        panic!("Console APIs not found. Make sure to add ConsolePlugin before {plugin}.");
    };
    (types, templates)
}
