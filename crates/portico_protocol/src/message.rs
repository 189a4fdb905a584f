//! Typed protocol messages.
//!
//! [`Inbound`] is what the dispatch loop matches on; [`OutboundMessage`] is
//! what the console queues for the browser. Both convert to and from
//! [`Envelope`]s.

use portico_resources::ResourcePlan;
use serde_json::{Map, Value};

use crate::envelope::{Envelope, Response};
use crate::error::ProtocolError;
use crate::method;

// ─────────────────────────────────────────────────────────────────────────────
// Inbound
// ─────────────────────────────────────────────────────────────────────────────

/// A message from the browser.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// The page is loaded and wants its resources.
    ConsoleReady,
    /// Heartbeat.
    KeepAlive,
    /// Create a component instance.
    AddComponent {
        /// Registered component type.
        component_type: String,
        /// Initial properties.
        properties: Map<String, Value>,
    },
    /// Render an instance in the given modes.
    RenderComponent {
        /// Target instance.
        instance: String,
        /// Requested render mode names.
        modes: Vec<String>,
    },
    /// Invoke a component-defined update method.
    UpdateComponent {
        /// Target instance.
        instance: String,
        /// Component method name.
        method: String,
        /// Method arguments.
        params: Vec<Value>,
    },
    /// Delete an instance.
    DeleteComponent {
        /// Target instance.
        instance: String,
    },
    /// Switch the connection locale.
    SetLocale {
        /// BCP 47 language tag.
        locale: String,
    },
}

fn string_at(envelope: &Envelope, index: usize) -> Result<String, ProtocolError> {
    envelope
        .params
        .get(index)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ProtocolError::SchemaMismatch {
            method: envelope.method.clone(),
            index,
            expected: Some(crate::ParamType::String),
            found: envelope
                .params
                .get(index)
                .map_or("missing", crate::schema::json_type_name),
        })
}

fn strings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl Inbound {
    /// Converts a schema-validated envelope into a typed message.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownMethod`] for methods the server does not
    /// handle, including outbound-only methods.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, ProtocolError> {
        let message = match envelope.method.as_str() {
            method::CONSOLE_READY => Self::ConsoleReady,
            method::KEEP_ALIVE => Self::KeepAlive,
            method::ADD_COMPONENT => Self::AddComponent {
                component_type: string_at(envelope, 0)?,
                properties: envelope
                    .params
                    .get(1)
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
            },
            method::RENDER_COMPONENT => Self::RenderComponent {
                instance: string_at(envelope, 0)?,
                modes: strings(envelope.params.get(1)),
            },
            method::UPDATE_COMPONENT => Self::UpdateComponent {
                instance: string_at(envelope, 0)?,
                method: string_at(envelope, 1)?,
                params: envelope.params.iter().skip(2).cloned().collect(),
            },
            method::DELETE_COMPONENT => Self::DeleteComponent {
                instance: string_at(envelope, 0)?,
            },
            method::SET_LOCALE => Self::SetLocale {
                locale: string_at(envelope, 0)?,
            },
            other => return Err(ProtocolError::UnknownMethod(other.to_string())),
        };
        Ok(message)
    }

    /// Method name of this message.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::ConsoleReady => method::CONSOLE_READY,
            Self::KeepAlive => method::KEEP_ALIVE,
            Self::AddComponent { .. } => method::ADD_COMPONENT,
            Self::RenderComponent { .. } => method::RENDER_COMPONENT,
            Self::UpdateComponent { .. } => method::UPDATE_COMPONENT,
            Self::DeleteComponent { .. } => method::DELETE_COMPONENT,
            Self::SetLocale { .. } => method::SET_LOCALE,
        }
    }

    /// Target instance, for messages addressed to one.
    #[must_use]
    pub fn instance(&self) -> Option<&str> {
        match self {
            Self::RenderComponent { instance, .. }
            | Self::UpdateComponent { instance, .. }
            | Self::DeleteComponent { instance } => Some(instance),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Outbound
// ─────────────────────────────────────────────────────────────────────────────

/// A message to the browser.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    /// Ordered resources to load.
    ResourcesToLoad(ResourcePlan),
    /// Resource setup failed; the console keeps running without it.
    ResourceLoadFailed {
        /// Generic reason shown to the user.
        reason: String,
    },
    /// A component type the user may add.
    AddComponentType {
        /// Type tag.
        component_type: String,
        /// Name shown in menus.
        display_name: String,
        /// Supported render mode names.
        modes: Vec<String>,
    },
    /// Changes the advertised modes of a type. An empty list withdraws it.
    UpdateComponentType {
        /// Type tag.
        component_type: String,
        /// Supported render mode names.
        modes: Vec<String>,
    },
    /// An instance was created.
    ComponentAdded {
        /// New instance id.
        instance: String,
        /// Supported render mode names.
        modes: Vec<String>,
    },
    /// An HTML fragment for one mode of an instance.
    ComponentRendered {
        /// Instance id.
        instance: String,
        /// Render mode name.
        mode: String,
        /// Fragment markup.
        html: String,
    },
    /// Invoke a client-side view function of an instance.
    NotifyView {
        /// Instance id.
        instance: String,
        /// JavaScript function name.
        method: String,
        /// Function arguments.
        args: Vec<Value>,
    },
    /// An instance was removed.
    ComponentDeleted {
        /// Instance id.
        instance: String,
    },
    /// A transient notification.
    DisplayNotification {
        /// Notification markup.
        html: String,
        /// Client options such as `autoClose`.
        options: Map<String, Value>,
    },
    /// A modal dialog.
    OpenModalDialog {
        /// Dialog markup.
        html: String,
        /// Client options such as `title`.
        options: Map<String, Value>,
    },
}

fn string_list(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

impl OutboundMessage {
    /// Method name of this message.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::ResourcesToLoad(_) => method::RESOURCES_TO_LOAD,
            Self::ResourceLoadFailed { .. } => method::RESOURCE_LOAD_FAILED,
            Self::AddComponentType { .. } => method::ADD_COMPONENT_TYPE,
            Self::UpdateComponentType { .. } => method::UPDATE_COMPONENT_TYPE,
            Self::ComponentAdded { .. } => method::COMPONENT_ADDED,
            Self::ComponentRendered { .. } => method::COMPONENT_RENDERED,
            Self::NotifyView { .. } => method::NOTIFY_VIEW,
            Self::ComponentDeleted { .. } => method::COMPONENT_DELETED,
            Self::DisplayNotification { .. } => method::DISPLAY_NOTIFICATION,
            Self::OpenModalDialog { .. } => method::OPEN_MODAL_DIALOG,
        }
    }

    /// Notification envelope for this message.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] if the resource plan fails to
    /// serialize.
    pub fn to_envelope(&self) -> Result<Envelope, ProtocolError> {
        let params = match self {
            Self::ResourcesToLoad(plan) => vec![serde_json::to_value(plan)?],
            Self::ResourceLoadFailed { reason } => vec![Value::from(reason.as_str())],
            Self::AddComponentType {
                component_type,
                display_name,
                modes,
            } => vec![
                Value::from(component_type.as_str()),
                Value::from(display_name.as_str()),
                string_list(modes),
            ],
            Self::UpdateComponentType {
                component_type,
                modes,
            } => vec![Value::from(component_type.as_str()), string_list(modes)],
            Self::ComponentAdded { instance, modes } => {
                vec![Value::from(instance.as_str()), string_list(modes)]
            }
            Self::ComponentRendered {
                instance,
                mode,
                html,
            } => vec![
                Value::from(instance.as_str()),
                Value::from(mode.as_str()),
                Value::from(html.as_str()),
            ],
            Self::NotifyView {
                instance,
                method,
                args,
            } => {
                let mut params = vec![Value::from(instance.as_str()), Value::from(method.as_str())];
                params.extend(args.iter().cloned());
                params
            }
            Self::ComponentDeleted { instance } => vec![Value::from(instance.as_str())],
            Self::DisplayNotification { html, options } | Self::OpenModalDialog { html, options } => {
                vec![Value::from(html.as_str()), Value::Object(options.clone())]
            }
        };
        Ok(Envelope::notification(self.method(), params))
    }
}

/// One frame queued for the browser.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    /// A server-initiated notification.
    Message(OutboundMessage),
    /// A reply to a browser request.
    Response(Response),
}

impl OutboundFrame {
    /// JSON text of this frame.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        match self {
            Self::Message(message) => message.to_envelope()?.encode(),
            Self::Response(response) => response.encode(),
        }
    }

    /// The message, if this frame is not a response.
    #[must_use]
    pub fn as_message(&self) -> Option<&OutboundMessage> {
        match self {
            Self::Message(message) => Some(message),
            Self::Response(_) => None,
        }
    }
}

impl From<OutboundMessage> for OutboundFrame {
    fn from(message: OutboundMessage) -> Self {
        Self::Message(message)
    }
}

impl From<Response> for OutboundFrame {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}
