//! Console error taxonomy.

use portico_protocol::ProtocolError;
use portico_resources::ResolutionError;

use crate::component::{ConnectionId, InstanceId};

/// A request that does not fit the current connection or instance state.
///
/// Returned to the caller; nothing is half-applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// No open connection has this id.
    #[error("Unknown connection: {0}")]
    UnknownConnection(ConnectionId),

    /// The connection has no instance with this id.
    #[error("Unknown instance: {0}")]
    UnknownInstance(InstanceId),

    /// A connection with this id is already open.
    #[error("Connection already open: {0}")]
    AlreadyOpen(ConnectionId),

    /// The type's previous instance was retained and its advertisement withdrawn.
    #[error("Component type '{0}' is retained on this connection and cannot be added again")]
    SingletonConflict(String),

    /// No component type is registered under this tag.
    #[error("Unknown component type: {0}")]
    UnknownComponentType(String),

    /// The locale is not in the configured supported set.
    #[error("Unsupported locale: {0}")]
    UnsupportedLocale(String),
}

impl LifecycleError {
    /// Stable identifier used in error envelopes.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownConnection(_) => "UnknownConnection",
            Self::UnknownInstance(_) => "UnknownInstance",
            Self::AlreadyOpen(_) => "AlreadyOpen",
            Self::SingletonConflict(_) => "SingletonConflict",
            Self::UnknownComponentType(_) => "UnknownComponentType",
            Self::UnsupportedLocale(_) => "UnsupportedLocale",
        }
    }
}

/// A failure raised inside a component hook, panics included.
///
/// Caught at the instance boundary; the instance keeps its last good state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("component '{component_type}' instance '{instance}' faulted: {message}")]
pub struct ComponentFault {
    /// Component type tag.
    pub component_type: String,
    /// Instance id, or the type tag if the fault happened before allocation.
    pub instance: String,
    /// What went wrong.
    pub message: String,
}

impl ComponentFault {
    /// Creates a fault.
    pub fn new(
        component_type: impl Into<String>,
        instance: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            component_type: component_type.into(),
            instance: instance.into(),
            message: message.into(),
        }
    }
}

/// Any error a console operation can return.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// Page resources could not be ordered.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// A frame was rejected.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The request does not fit the current state.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// A component hook failed.
    #[error(transparent)]
    Component(#[from] ComponentFault),
}

impl ConsoleError {
    /// Stable identifier used in error envelopes.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Resolution(ResolutionError::Cycle { .. }) => "Cycle",
            Self::Resolution(ResolutionError::UnsatisfiedRequirement { .. }) => {
                "UnsatisfiedRequirement"
            }
            Self::Protocol(err) => err.kind(),
            Self::Lifecycle(err) => err.kind(),
            Self::Component(_) => "ComponentFault",
        }
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn core::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("hook panicked")
    }
}
