//! A server-rendered web console framework in Rust.
//!

pub use portico_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use portico_internal::prelude::*;
}
