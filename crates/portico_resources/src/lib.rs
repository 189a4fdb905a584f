//! Page resources for Portico consoles (Layer 2).
//!
//! Components and libraries each declare the scripts and styles they need as
//! [`ResourceDescriptor`]s, naming the capabilities (`"jquery"`,
//! `"gridstack"`) they provide and require. When a console becomes ready the
//! descriptors are gathered in a [`ResourceCollector`] and resolved into a
//! [`ResourcePlan`]: duplicates coalesced, requirements loaded first.
//!
//! # Example
//!
//! ```
//! use portico_resources::{resolve, ResourceDescriptor};
//!
//! let plan = resolve([
//!     ResourceDescriptor::script_uri("/gridstack.js")
//!         .provides(["gridstack"])
//!         .requires(["jquery", "jquery-ui"]),
//!     ResourceDescriptor::script_uri("/jquery-ui.js")
//!         .provides(["jquery-ui"])
//!         .requires(["jquery"]),
//!     ResourceDescriptor::script_uri("/jquery.js").provides(["jquery"]),
//! ])
//! .unwrap();
//!
//! let order: Vec<String> = plan.entries().iter().map(|d| d.label()).collect();
//! assert_eq!(order, ["/jquery.js", "/jquery-ui.js", "/gridstack.js"]);
//! ```

mod collector;
mod descriptor;
mod error;
mod resolver;

pub use collector::ResourceCollector;
pub use descriptor::{CapabilityTag, Locator, ResourceDescriptor, ResourceKind, ScriptType};
pub use error::{RequirementPolicy, ResolutionError};
pub use resolver::{ResourcePlan, resolve, resolve_with_policy};
