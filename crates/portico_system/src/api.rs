//! API trait for capability registration.
//!
//! APIs are build-time registries that plugins use to expose capabilities
//! to other plugins. A component plugin registers its component type with the
//! console's registry API during `build()`; the console plugin freezes the
//! registry into its runtime during `ready()`.
//!
//! # API vs Resource
//!
//! | Aspect | API | Resource |
//! |--------|-----|----------|
//! | **Purpose** | Plugin orchestration | Runtime state |
//! | **Accessed by** | Plugins | Plugins and the running console |
//! | **Access method** | `server.api::<A>()` | `server.get_global::<R>()` |
//! | **Phase** | Build/Ready | Any |
//!
//! # Interior Mutability Pattern
//!
//! `server.api::<A>()` hands out `&A`, so APIs that accept registrations use
//! interior mutability:
//!
//! ```
//! use std::sync::Mutex;
//! use portico_system::api::API;
//!
//! #[derive(Default)]
//! pub struct WidgetAPI {
//!     names: Mutex<Vec<String>>,
//! }
//!
//! impl API for WidgetAPI {}
//!
//! impl WidgetAPI {
//!     pub fn register(&self, name: &str) {
//!         self.names.lock().unwrap().push(name.to_string());
//!     }
//! }
//! ```

/// Marker trait for capability APIs.
///
/// # Usage in Plugins
///
/// ```ignore
/// impl Plugin for RegistryPlugin {
///     fn build(&self, server: &mut Server) {
///         server.insert_api(WidgetAPI::default());
///     }
/// }
///
/// impl Plugin for ConsumerPlugin {
///     fn build(&self, server: &mut Server) {
///         server.api::<WidgetAPI>()
///             .expect("RegistryPlugin must be added first")
///             .register("clock");
///     }
/// }
/// ```
pub trait API: Send + Sync + 'static {}
