//! Resource storage.
//!
//! Resources are values stored on the [`Server`](crate::server::Server) keyed
//! by their type. Two scopes exist:
//!
//! - **Global resources** ([`GlobalResource`]) are read-only once the server
//!   is built and shared by everything that holds the server: configuration,
//!   the clock, the running console.
//! - **Server resources** (any [`Resource`]) are mutable scratch state used by
//!   plugins during build, typically frozen into a global in `ready()`.

use core::any::{Any, TypeId};
use hashbrown::HashMap;

/// A value that can be stored in [`Resources`].
///
/// Blanket-implemented for every `Send + Sync + 'static` type.
pub trait Resource: Send + Sync + 'static {
    /// Returns the type name for debugging purposes.
    fn type_name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

impl<T: Send + Sync + 'static> Resource for T {}

/// Marker trait for global, read-only resources.
///
/// # Example
///
/// ```
/// use portico_system::resource::GlobalResource;
/// use portico_system::server::Server;
///
/// struct Branding { title: String }
/// impl GlobalResource for Branding {}
///
/// let mut server = Server::new();
/// server.insert_global(Branding { title: "Console".into() });
/// assert_eq!(server.get_global::<Branding>().unwrap().title, "Console");
/// ```
pub trait GlobalResource: Resource {}

/// Errors that can occur during resource operations.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// The requested resource type was not found in the container.
    #[error("resource not found: {0}")]
    NotFound(&'static str),
}

/// Type-keyed container of resources.
#[derive(Default)]
pub struct Resources {
    entries: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl core::fmt::Debug for Resources {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Resources")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl Resources {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Inserts a resource, returning the previous value of the same type.
    pub fn insert<R: Resource>(&mut self, resource: R) -> Option<R> {
        self.entries
            .insert(TypeId::of::<R>(), Box::new(resource))
            .and_then(|old| old.downcast::<R>().ok())
            .map(|boxed| *boxed)
    }

    /// Returns true if a resource of type `R` exists.
    #[must_use]
    pub fn contains<R: Resource>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<R>())
    }

    /// Returns a reference to the resource of type `R`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] if no such resource was inserted.
    pub fn get<R: Resource>(&self) -> Result<&R, ResourceError> {
        self.entries
            .get(&TypeId::of::<R>())
            .and_then(|boxed| boxed.downcast_ref::<R>())
            .ok_or(ResourceError::NotFound(core::any::type_name::<R>()))
    }

    /// Returns a mutable reference to the resource of type `R`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] if no such resource was inserted.
    pub fn get_mut<R: Resource>(&mut self) -> Result<&mut R, ResourceError> {
        self.entries
            .get_mut(&TypeId::of::<R>())
            .and_then(|boxed| boxed.downcast_mut::<R>())
            .ok_or(ResourceError::NotFound(core::any::type_name::<R>()))
    }

    /// Removes and returns the resource of type `R`.
    pub fn remove<R: Resource>(&mut self) -> Option<R> {
        self.entries
            .remove(&TypeId::of::<R>())
            .and_then(|boxed| boxed.downcast::<R>().ok())
            .map(|boxed| *boxed)
    }

    /// Returns the number of stored resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
