//! Console wiring through the plugin server.

use futures::FutureExt;
use futures::future::BoxFuture;
use portico_console::{
    Component, ComponentFault, ComponentInfo, ComponentTypesAPI, ConnectionId, Console,
    ConsoleConfig, ConsolePlugin, InstanceContext, PageResourcesAPI, RenderMode, RenderModes,
    RenderedFragment, StaticResources, TemplatesAPI, escape_html,
};
use portico_core_plugins::{MinimalPlugins, Storage};
use portico_protocol::OutboundMessage;
use portico_resources::ResourceDescriptor;
use portico_system::plugin::{Plugin, PluginGroup, PluginId};
use portico_system::server::Server;
use serde_json::{Map, Value, json};
use std::time::Duration;

struct Note;

impl Component for Note {
    type State = String;

    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("Note", "Note").with_modes([RenderMode::View])
    }

    fn add(&self, ctx: &mut InstanceContext, properties: &Map<String, Value>) -> Result<String, ComponentFault> {
        let text = properties
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let path = format!("/notes/{}", ctx.instance());
        ctx.storage()
            .store(&path, &text)
            .map_err(|err| ctx.fault(err.to_string()))?;
        Ok(text)
    }

    fn render<'a>(
        &'a self,
        ctx: &'a InstanceContext,
        state: &'a String,
        _: &'a RenderModes,
    ) -> BoxFuture<'a, Result<Vec<RenderedFragment>, ComponentFault>> {
        async move {
            let html = ctx.render_template("note", &json!({ "text": state }))?;
            Ok(vec![RenderedFragment::new(RenderMode::View, html)])
        }
        .boxed()
    }

    fn page_resources(&self) -> Vec<ResourceDescriptor> {
        vec![ResourceDescriptor::script_uri("/note.js").requires(["jquery"])]
    }
}

struct NotePlugin;

impl Plugin for NotePlugin {
    fn build(&self, server: &mut Server) {
        if let Some(types) = server.api::<ComponentTypesAPI>() {
            types.register(Note);
        }
        if let Some(templates) = server.api::<TemplatesAPI>() {
            templates.register("note", |model, locale| {
                let text = model["text"].as_str().unwrap_or_default();
                Ok(format!("<p lang=\"{locale}\">{}</p>", escape_html(text)))
            });
        }
        if let Some(resources) = server.api::<PageResourcesAPI>() {
            resources.add(StaticResources::new(
                "jquery",
                [ResourceDescriptor::script_uri("/jquery.js").provides(["jquery"])],
            ));
        }
    }

    fn dependencies(&self) -> Vec<PluginId> {
        vec![PluginId::of::<ConsolePlugin>()]
    }
}

fn server(plugin: ConsolePlugin) -> Server {
    let mut server = Server::new();
    server
        .add_plugins(MinimalPlugins.build())
        .add_plugins(plugin)
        .add_plugins(NotePlugin);
    server.finish();
    server
}

#[tokio::test]
async fn registrations_reach_the_console() {
    let server = server(ConsolePlugin::default());
    let console = server.get_global::<Console>().cloned().unwrap();
    assert!(console.component_types().contains("Note"));

    let conn = console.open(ConnectionId::new("tab")).unwrap();
    let mut outbound = conn.take_outbound().unwrap();
    let plan = console.console_ready(conn.id()).unwrap();
    assert_eq!(plan.len(), 2);
    assert_eq!(plan.position_of("jquery"), Some(0));

    let mut properties = Map::new();
    properties.insert("text".into(), json!("<hi>"));
    let instance = console.add(conn.id(), "Note", properties).await.unwrap();
    console
        .render(conn.id(), &instance, RenderModes::from([RenderMode::View]))
        .await
        .unwrap();

    let storage = server.get_global::<Storage>().unwrap();
    let stored: Option<String> = storage
        .load(&format!("/notes/{instance}"))
        .unwrap();
    assert_eq!(stored.as_deref(), Some("<hi>"));

    let mut rendered = None;
    while let Ok(frame) = outbound.try_recv() {
        if let Some(OutboundMessage::ComponentRendered { html, .. }) = frame.as_message() {
            rendered = Some(html.clone());
        }
    }
    assert_eq!(rendered.as_deref(), Some("<p lang=\"en\">&lt;hi&gt;</p>"));
}

#[test]
fn plugin_configuration_becomes_global() {
    let server = server(
        ConsolePlugin::default()
            .with_inactivity_timeout(Duration::from_secs(5))
            .with_locales("de", ["en"]),
    );

    let config = server.get_global::<ConsoleConfig>().unwrap();
    assert_eq!(config.inactivity_timeout, Duration::from_secs(5));
    assert_eq!(config.default_locale, "de");

    let console = server.get_global::<Console>().unwrap();
    assert_eq!(console.config().default_locale, "de");
    assert!(console.config().supports_locale("EN"));
}
