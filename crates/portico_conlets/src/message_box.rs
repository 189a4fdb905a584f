//! A component whose text lives in [`Storage`](portico_core_plugins::Storage).
//!
//! Each instance stores its model at `/portico/message_box/<instance>` and
//! marks itself persisted, so closing a connection leaves the entry in place.
//! Deleting the instance removes it.
//!
//! After a reconnect the browser adds the box again with a `restore`
//! property naming the old instance id. The stored entry then moves to the
//! new instance, so a box never has more than one entry.

use futures::FutureExt;
use futures::future::BoxFuture;
use portico_console::{
    Component, ComponentFault, ComponentInfo, ConsolePlugin, InstanceContext, InstanceId,
    Release, RenderMode, RenderModes, RenderedFragment, TemplateError, escape_html,
};
use portico_system::plugin::{Plugin, PluginId};
use portico_system::server::Server;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

const TYPE_NAME: &str = "MessageBox";
const TEMPLATE: &str = "message_box";
const DEFAULT_MESSAGE: &str = "Your message here";
const RESTORE: &str = "restore";

/// Stored model of one message box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBoxModel {
    /// Displayed text.
    pub message: String,
}

/// Shows a short message, kept in storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageBox;

impl MessageBox {
    /// Storage path of an instance's model.
    #[must_use]
    pub fn storage_path(instance: &InstanceId) -> String {
        format!("/portico/message_box/{instance}")
    }

    fn save(ctx: &InstanceContext, model: &MessageBoxModel) -> Result<(), ComponentFault> {
        ctx.storage()
            .store(&Self::storage_path(ctx.instance()), model)
            .map_err(|err| ctx.fault(err.to_string()))
    }

    /// The storage path and model stored for instance `previous`, if any.
    fn stored(
        ctx: &InstanceContext,
        previous: &str,
    ) -> Result<Option<(String, MessageBoxModel)>, ComponentFault> {
        if !previous.starts_with(&format!("{TYPE_NAME}-")) {
            return Err(ctx.fault(format!("cannot restore from '{previous}'")));
        }
        let path = Self::storage_path(&InstanceId::new(previous));
        let stored = ctx
            .storage()
            .load::<MessageBoxModel>(&path)
            .map_err(|err| ctx.fault(err.to_string()))?;
        if stored.is_none() {
            debug!(instance = %ctx.instance(), previous = %previous, "nothing stored to restore");
        }
        Ok(stored.map(|model| (path, model)))
    }
}

impl Component for MessageBox {
    type State = MessageBoxModel;

    fn info(&self) -> ComponentInfo {
        ComponentInfo::new(TYPE_NAME, "Message Box")
            .with_modes([RenderMode::Preview, RenderMode::View])
    }

    fn add(
        &self,
        ctx: &mut InstanceContext,
        properties: &Map<String, Value>,
    ) -> Result<MessageBoxModel, ComponentFault> {
        let restored = match properties.get(RESTORE) {
            Some(Value::String(previous)) => Self::stored(ctx, previous)?,
            Some(_) => return Err(ctx.fault("restore expects an instance id")),
            None => None,
        };
        let (previous, model) = match restored {
            Some((path, model)) => (Some(path), model),
            None => (
                None,
                MessageBoxModel {
                    message: properties
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or(DEFAULT_MESSAGE)
                        .to_string(),
                },
            ),
        };
        Self::save(ctx, &model)?;
        if let Some(path) = previous
            && let Err(err) = ctx.storage().delete(&path)
        {
            warn!(
                instance = %ctx.instance(),
                path = %path,
                error = %err,
                "restored entry could not be removed"
            );
        }
        ctx.mark_persisted();
        Ok(model)
    }

    fn render<'a>(
        &'a self,
        ctx: &'a InstanceContext,
        state: &'a MessageBoxModel,
        modes: &'a RenderModes,
    ) -> BoxFuture<'a, Result<Vec<RenderedFragment>, ComponentFault>> {
        async move {
            let html = ctx.render_template(TEMPLATE, &json!({ "message": state.message }))?;
            Ok(modes
                .iter()
                .map(|mode| RenderedFragment::new(mode, html.clone()))
                .collect())
        }
        .boxed()
    }

    fn update(
        &self,
        ctx: &mut InstanceContext,
        state: &mut MessageBoxModel,
        method: &str,
        params: &[Value],
    ) -> Result<(), ComponentFault> {
        match (method, params.first()) {
            ("setMessage", Some(Value::String(message))) => {
                state.message.clone_from(message);
                Self::save(ctx, state)?;
                ctx.notify_view("setMessage", vec![Value::from(escape_html(message))]);
                Ok(())
            }
            ("setMessage", _) => Err(ctx.fault("setMessage expects a string")),
            (other, _) => Err(ctx.fault(format!("unsupported update method '{other}'"))),
        }
    }

    fn release(&self, ctx: &mut InstanceContext, _state: &MessageBoxModel) -> Release {
        if let Err(err) = ctx.storage().delete(&Self::storage_path(ctx.instance())) {
            warn!(instance = %ctx.instance(), error = %err, "stored message could not be removed");
        }
        Release::Discard
    }
}

fn render(model: &Value, _locale: &str) -> Result<String, TemplateError> {
    let message = model["message"]
        .as_str()
        .ok_or_else(|| TemplateError::render(TEMPLATE, "missing message"))?;
    Ok(format!(
        "<div class=\"message-box\"><p>{}</p></div>",
        escape_html(message)
    ))
}

/// Registers [`MessageBox`] and its template.
///
/// # Dependencies
///
/// - [`ConsolePlugin`]
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageBoxPlugin;

impl Plugin for MessageBoxPlugin {
    fn build(&self, server: &mut Server) {
        let (types, templates) = crate::registration_apis(server, "MessageBoxPlugin");
        types.register(MessageBox);
        templates.register(TEMPLATE, render);
    }

    fn dependencies(&self) -> Vec<PluginId> {
        vec![PluginId::of::<ConsolePlugin>()]
    }
}
