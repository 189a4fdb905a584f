//! What a hook sees of its connection.

use core::any::Any;

use portico_core_plugins::Storage;
use serde_json::Value;

use super::id::{ConnectionId, InstanceId};
use crate::error::ComponentFault;
use crate::template::Templates;

/// Per-call context handed to component hooks.
///
/// View notifications raised through [`notify_view`](Self::notify_view) are
/// buffered and sent only if the hook succeeds, together with the state change
/// that caused them.
#[derive(Debug)]
pub struct InstanceContext {
    connection: ConnectionId,
    instance: InstanceId,
    component_type: String,
    locale: String,
    storage: Storage,
    templates: Templates,
    notifications: Vec<(String, Vec<Value>)>,
    persisted: bool,
}

impl InstanceContext {
    /// Creates a context. The console builds these; tests of individual
    /// components may too.
    pub fn new(
        connection: ConnectionId,
        instance: InstanceId,
        component_type: impl Into<String>,
        locale: impl Into<String>,
        storage: Storage,
        templates: Templates,
    ) -> Self {
        Self {
            connection,
            instance,
            component_type: component_type.into(),
            locale: locale.into(),
            storage,
            templates,
            notifications: Vec::new(),
            persisted: false,
        }
    }

    /// The owning connection.
    #[must_use]
    pub fn connection(&self) -> &ConnectionId {
        &self.connection
    }

    /// The instance the hook runs for.
    #[must_use]
    pub fn instance(&self) -> &InstanceId {
        &self.instance
    }

    /// The instance's component type.
    #[must_use]
    pub fn component_type(&self) -> &str {
        &self.component_type
    }

    /// The connection's locale tag.
    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Key-value storage.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Fragment templates.
    #[must_use]
    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    /// Renders a template, converting failures into a [`ComponentFault`].
    ///
    /// # Errors
    ///
    /// Returns a fault naming this instance if the template fails.
    pub fn render_template(&self, name: &str, model: &Value) -> Result<String, ComponentFault> {
        self.templates
            .render(name, model, &self.locale)
            .map_err(|err| self.fault(err.to_string()))
    }

    /// Queues `notifyView(instance, method, args...)`.
    pub fn notify_view(&mut self, method: impl Into<String>, args: Vec<Value>) {
        self.notifications.push((method.into(), args));
    }

    /// Marks the instance as persisted externally. Closing the connection
    /// then leaves its state alone instead of calling `release`.
    pub fn mark_persisted(&mut self) {
        self.persisted = true;
    }

    /// A fault attributed to this instance.
    pub fn fault(&self, message: impl Into<String>) -> ComponentFault {
        ComponentFault::new(
            self.component_type.clone(),
            self.instance.as_str(),
            message,
        )
    }

    /// Buffered view notifications, in order.
    #[must_use]
    pub fn pending_notifications(&self) -> &[(String, Vec<Value>)] {
        &self.notifications
    }

    /// Returns true if [`mark_persisted`](Self::mark_persisted) was called.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub(crate) fn take_notifications(&mut self) -> Vec<(String, Vec<Value>)> {
        core::mem::take(&mut self.notifications)
    }
}

type ApplyFn = dyn FnOnce(&mut InstanceContext, &mut (dyn Any + Send + Sync)) -> Result<(), ComponentFault>
    + Send;

/// A change to an instance's model.
pub enum ModelMutation {
    /// A component-defined update method, as sent by the browser.
    Method {
        /// Method name.
        name: String,
        /// Method arguments.
        params: Vec<Value>,
    },
    /// A typed server-side change. Build with [`ModelMutation::apply`].
    Apply(Box<ApplyFn>),
}

impl core::fmt::Debug for ModelMutation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Method { name, params } => f
                .debug_struct("Method")
                .field("name", name)
                .field("params", params)
                .finish(),
            Self::Apply(_) => f.write_str("Apply(..)"),
        }
    }
}

impl ModelMutation {
    /// Invokes the component's `update` hook with `name` and `params`.
    pub fn method(name: impl Into<String>, params: Vec<Value>) -> Self {
        Self::Method {
            name: name.into(),
            params,
        }
    }

    /// Runs `mutate` on the model, which must be an `S`.
    pub fn apply<S, F>(mutate: F) -> Self
    where
        S: 'static,
        F: FnOnce(&mut InstanceContext, &mut S) -> Result<(), ComponentFault> + Send + 'static,
    {
        Self::Apply(Box::new(move |ctx, model| match model.downcast_mut::<S>() {
            Some(state) => mutate(ctx, state),
            None => Err(ctx.fault(format!(
                "model is not a {}",
                core::any::type_name::<S>()
            ))),
        }))
    }
}
