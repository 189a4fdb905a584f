//! The console protocol (Layer 2).
//!
//! Browser and server exchange JSON-RPC 2.0 style frames over one persistent
//! channel. This crate decodes and validates those frames and gives them
//! types:
//!
//! - [`Envelope`] / [`Response`] - wire shapes
//! - [`ParamType`] / [`MethodSchema`] / [`SchemaRegistry`] - per-method
//!   positional parameter validation, no coercion
//! - [`Inbound`] / [`OutboundMessage`] / [`OutboundFrame`] - typed messages
//! - [`ProtocolError`] - rejection of a single frame
//!
//! # Example
//!
//! ```
//! use portico_protocol::{Inbound, SchemaRegistry};
//!
//! let registry = SchemaRegistry::console();
//! let envelope = registry
//!     .decode(r#"{"jsonrpc":"2.0","method":"deleteComponent","params":["HelloWorld-a1"]}"#)
//!     .unwrap();
//!
//! assert_eq!(
//!     Inbound::from_envelope(&envelope).unwrap(),
//!     Inbound::DeleteComponent { instance: "HelloWorld-a1".into() }
//! );
//! ```

mod envelope;
mod error;
mod message;
/// Method name constants.
pub mod method;
mod schema;

pub use envelope::{Envelope, ErrorBody, JSONRPC_VERSION, Response};
pub use error::ProtocolError;
pub use message::{Inbound, OutboundFrame, OutboundMessage};
pub use schema::{MethodSchema, ParamType, SchemaRegistry, json_type_name};
