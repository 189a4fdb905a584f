//! The "Hello World" component.

use futures::FutureExt;
use futures::future::BoxFuture;
use portico_console::{
    Component, ComponentFault, ComponentInfo, ConsolePlugin, InstanceContext, RenderMode,
    RenderModes, RenderedFragment, TemplateError,
};
use portico_resources::ResourceDescriptor;
use portico_system::plugin::{Plugin, PluginId};
use portico_system::server::Server;
use serde::Serialize;
use serde_json::{Map, Value, json};

const TYPE_NAME: &str = "HelloWorld";
const PREVIEW_TEMPLATE: &str = "hello_world.preview";
const VIEW_TEMPLATE: &str = "hello_world.view";

/// Model of one `HelloWorld` instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HelloWorldModel {
    /// Whether the view shows the globe.
    pub world_visible: bool,
}

impl Default for HelloWorldModel {
    fn default() -> Self {
        Self {
            world_visible: true,
        }
    }
}

/// Greets the world. Any number of instances; `toggleVisibility` hides and
/// shows the globe in the browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct HelloWorld;

impl Component for HelloWorld {
    type State = HelloWorldModel;

    fn info(&self) -> ComponentInfo {
        ComponentInfo::new(TYPE_NAME, "Hello World")
            .with_modes([RenderMode::Preview, RenderMode::View])
    }

    fn add(
        &self,
        _ctx: &mut InstanceContext,
        _properties: &Map<String, Value>,
    ) -> Result<HelloWorldModel, ComponentFault> {
        Ok(HelloWorldModel::default())
    }

    fn render<'a>(
        &'a self,
        ctx: &'a InstanceContext,
        state: &'a HelloWorldModel,
        modes: &'a RenderModes,
    ) -> BoxFuture<'a, Result<Vec<RenderedFragment>, ComponentFault>> {
        async move {
            let model = json!({
                "instance": ctx.instance().as_str(),
                "world_visible": state.world_visible,
            });
            let mut fragments = Vec::with_capacity(modes.len());
            for mode in modes.iter() {
                let template = match mode {
                    RenderMode::Preview => PREVIEW_TEMPLATE,
                    RenderMode::View => VIEW_TEMPLATE,
                    _ => continue,
                };
                fragments.push(RenderedFragment::new(
                    mode,
                    ctx.render_template(template, &model)?,
                ));
            }
            Ok(fragments)
        }
        .boxed()
    }

    fn update(
        &self,
        ctx: &mut InstanceContext,
        state: &mut HelloWorldModel,
        method: &str,
        _params: &[Value],
    ) -> Result<(), ComponentFault> {
        match method {
            "toggleVisibility" => {
                state.world_visible = !state.world_visible;
                ctx.notify_view("setWorldVisible", vec![Value::from(state.world_visible)]);
                Ok(())
            }
            other => Err(ctx.fault(format!("unsupported update method '{other}'"))),
        }
    }

    fn page_resources(&self) -> Vec<ResourceDescriptor> {
        vec![
            ResourceDescriptor::script_uri("/portico/conlets/hello-world/hello-world.js")
                .provides(["conlet.hello-world"])
                .requires(["jquery"]),
            ResourceDescriptor::style_uri("/portico/conlets/hello-world/hello-world.css"),
        ]
    }
}

fn greeting(locale: &str) -> &'static str {
    match locale.split(['-', '_']).next().unwrap_or_default() {
        "de" => "Hallo Welt!",
        "fr" => "Bonjour le monde !",
        _ => "Hello World!",
    }
}

fn instance_of(model: &Value, template: &str) -> Result<String, TemplateError> {
    model["instance"]
        .as_str()
        .map(portico_console::escape_html)
        .ok_or_else(|| TemplateError::render(template, "missing instance"))
}

fn render_preview(model: &Value, locale: &str) -> Result<String, TemplateError> {
    let instance = instance_of(model, PREVIEW_TEMPLATE)?;
    Ok(format!(
        "<div class=\"hello-world-preview\" data-instance=\"{instance}\">{}</div>",
        greeting(locale)
    ))
}

fn render_view(model: &Value, locale: &str) -> Result<String, TemplateError> {
    let instance = instance_of(model, VIEW_TEMPLATE)?;
    let hidden = if model["world_visible"].as_bool() == Some(true) {
        ""
    } else {
        " hidden"
    };
    Ok(format!(
        "<div class=\"hello-world-view\" data-instance=\"{instance}\">\
         <p>{}</p><img class=\"globe\" src=\"/portico/conlets/hello-world/globe.png\"{hidden}>\
         <button data-action=\"toggleVisibility\">Toggle</button></div>",
        greeting(locale)
    ))
}

/// Registers [`HelloWorld`] and its templates.
///
/// # Dependencies
///
/// - [`ConsolePlugin`]
#[derive(Debug, Clone, Copy, Default)]
pub struct HelloWorldPlugin;

impl Plugin for HelloWorldPlugin {
    fn build(&self, server: &mut Server) {
        let (types, templates) = crate::registration_apis(server, "HelloWorldPlugin");
        types.register(HelloWorld);
        templates.register(PREVIEW_TEMPLATE, render_preview);
        templates.register(VIEW_TEMPLATE, render_view);
    }

    fn dependencies(&self) -> Vec<PluginId> {
        vec![PluginId::of::<ConsolePlugin>()]
    }
}
