//! Console connections and the component lifecycle (Layer 2).
//!
//! # Core Types
//!
//! - [`Console`] - coordinator: connections, page setup, instance lifecycle
//! - [`ConsoleConnection`] / [`ConnectionRegistry`] - per-tab state, looked up by id
//! - [`Component`] / [`ComponentTypes`] - pluggable UI units and their registry
//! - [`ConsoleSession`] - per-connection dispatch loop over protocol frames
//! - [`Sequencer`] - per-instance FIFO of operations
//! - [`ConsolePlugin`] - wires all of it into a [`Server`](portico_system::server::Server)
//!
//! # Example
//!
//! ```
//! use portico_console::{Console, ConnectionId};
//!
//! # tokio_test::block_on(async {
//! let console = Console::builder().build();
//! let connection = console.open(ConnectionId::new("tab-1")).unwrap();
//! let mut outbound = connection.take_outbound().unwrap();
//!
//! console.console_ready(connection.id()).unwrap();
//! let first = outbound.try_recv().unwrap();
//! assert_eq!(first.as_message().unwrap().method(), "resourcesToLoad");
//!
//! console.close(connection.id()).await;
//! assert!(console.connection(&ConnectionId::new("tab-1")).is_none());
//! # });
//! ```

mod component;
mod config;
mod connection;
mod coordinator;
mod error;
mod plugin;
mod registry;
mod sequencer;
mod session;
mod template;

pub use component::{
    Component, ComponentInfo, ComponentTypes, ConnectionId, ErasedComponent, InstanceContext,
    InstanceId, Model, ModelMutation, Release, RenderMode, RenderModes, RenderedFragment,
};
pub use config::ConsoleConfig;
pub use connection::{ConsoleConnection, InstancePhase, InstanceSnapshot};
pub use coordinator::{Console, ConsoleBuilder, RESOURCE_LOAD_FAILED_REASON};
pub use error::{ComponentFault, ConsoleError, LifecycleError};
pub use plugin::{
    ComponentTypesAPI, ConsolePlugin, PageResourceProvider, PageResourcesAPI, StaticResources,
};
pub use registry::ConnectionRegistry;
pub use sequencer::{Sequencer, Ticket, Turn};
pub use session::ConsoleSession;
pub use template::{
    FragmentRenderer, FunctionTemplates, TemplateError, Templates, TemplatesAPI, escape_html,
};
