//! Demo components running on a full server.

use portico_conlets::{ConletsPlugin, HelloWorldModel, MessageBox, MessageBoxModel};
use portico_console::{
    ConnectionId, Console, ConsoleError, ConsolePlugin, InstancePhase, ModelMutation, RenderMode,
    RenderModes,
};
use portico_core_plugins::{MinimalPlugins, ServerInfoPlugin, Storage};
use portico_protocol::{OutboundFrame, OutboundMessage};
use portico_system::plugin::PluginGroup;
use portico_system::server::Server;
use serde_json::{Map, json};
use tokio::sync::mpsc;

fn server() -> Server {
    let mut server = Server::new();
    server
        .add_plugins(
            MinimalPlugins
                .build()
                .disable::<ServerInfoPlugin>()
                .add(ServerInfoPlugin::default().with_name("Test Portal")),
        )
        .add_plugins(ConsolePlugin::default().with_locales("en", ["de"]))
        .add_plugins(ConletsPlugin.build());
    server.finish();
    server
}

fn drain(outbound: &mut mpsc::UnboundedReceiver<OutboundFrame>) -> Vec<OutboundMessage> {
    let mut messages = Vec::new();
    while let Ok(frame) = outbound.try_recv() {
        if let OutboundFrame::Message(message) = frame {
            messages.push(message);
        }
    }
    messages
}

fn rendered_html(messages: &[OutboundMessage]) -> Vec<&str> {
    messages
        .iter()
        .filter_map(|message| match message {
            OutboundMessage::ComponentRendered { html, .. } => Some(html.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn console_ready_orders_libraries_and_advertises_conlets() {
    let server = server();
    let console = server.get_global::<Console>().cloned().unwrap();
    let conn = console.open(ConnectionId::new("tab")).unwrap();
    let mut outbound = conn.take_outbound().unwrap();

    let plan = console.console_ready(conn.id()).unwrap();
    let jquery = plan.position_of("jquery").unwrap();
    let jquery_ui = plan.position_of("jquery-ui").unwrap();
    let gridstack = plan.position_of("gridstack").unwrap();
    let hello = plan.position_of("conlet.hello-world").unwrap();
    assert_eq!(jquery, 0);
    assert!(jquery_ui < gridstack);
    assert!(jquery < hello);

    let advertised: Vec<String> = drain(&mut outbound)
        .into_iter()
        .filter_map(|message| match message {
            OutboundMessage::AddComponentType { component_type, .. } => Some(component_type),
            _ => None,
        })
        .collect();
    assert_eq!(advertised, vec!["HelloWorld", "SysInfo", "MessageBox"]);
}

#[tokio::test]
async fn hello_world_toggles_and_follows_locale() {
    let server = server();
    let console = server.get_global::<Console>().cloned().unwrap();
    let conn = console.open(ConnectionId::new("tab")).unwrap();
    let mut outbound = conn.take_outbound().unwrap();
    let id = conn.id().clone();

    let instance = console.add(&id, "HelloWorld", Map::new()).await.unwrap();
    assert!(instance.as_str().starts_with("HelloWorld-"));
    let rendered = console
        .render(&id, &instance, RenderModes::from([RenderMode::Preview]))
        .await
        .unwrap();
    assert_eq!(rendered, RenderModes::from([RenderMode::Preview]));

    let messages = drain(&mut outbound);
    assert_eq!(rendered_html(&messages).len(), 1);
    assert!(rendered_html(&messages)[0].contains("Hello World!"));

    console
        .update(&id, &instance, ModelMutation::method("toggleVisibility", vec![]))
        .await
        .unwrap();
    let notifications: Vec<_> = drain(&mut outbound)
        .into_iter()
        .filter(|message| matches!(message, OutboundMessage::NotifyView { .. }))
        .collect();
    assert_eq!(
        notifications,
        vec![OutboundMessage::NotifyView {
            instance: instance.to_string(),
            method: "setWorldVisible".into(),
            args: vec![json!(false)],
        }]
    );
    assert_eq!(
        console.with_model(&id, &instance, HelloWorldModel::clone),
        Some(HelloWorldModel {
            world_visible: false
        })
    );

    console.set_locale(&id, "de").await.unwrap();
    let messages = drain(&mut outbound);
    assert_eq!(rendered_html(&messages), vec![
        format!("<div class=\"hello-world-preview\" data-instance=\"{instance}\">Hallo Welt!</div>")
    ]);
}

#[tokio::test]
async fn sys_info_is_a_refreshable_singleton() {
    let server = server();
    let console = server.get_global::<Console>().cloned().unwrap();
    let conn = console.open(ConnectionId::new("tab")).unwrap();
    let mut outbound = conn.take_outbound().unwrap();
    let id = conn.id().clone();

    let first = console.add(&id, "SysInfo", Map::new()).await.unwrap();
    let second = console.add(&id, "SysInfo", Map::new()).await.unwrap();
    assert_eq!(first, second);

    console
        .render(&id, &first, RenderModes::from([RenderMode::View]))
        .await
        .unwrap();
    let messages = drain(&mut outbound);
    assert!(rendered_html(&messages)[0].contains("Test Portal"));

    console
        .update(&id, &first, ModelMutation::method("refresh", vec![]))
        .await
        .unwrap();
    let messages = drain(&mut outbound);
    assert!(matches!(
        &messages[..],
        [OutboundMessage::NotifyView { method, args, .. }]
            if method == "updateInfo" && args[0]["server_name"] == "Test Portal"
    ));

    let err = console
        .update(&id, &first, ModelMutation::method("reboot", vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, ConsoleError::Component(_)));
}

#[tokio::test]
async fn message_box_storage_follows_lifecycle() {
    let server = server();
    let storage = server.get_global::<Storage>().cloned().unwrap();
    let console = server.get_global::<Console>().cloned().unwrap();
    let conn = console.open(ConnectionId::new("tab")).unwrap();
    let id = conn.id().clone();

    let mut properties = Map::new();
    properties.insert("message".into(), json!("Maintenance at noon"));
    let kept = console.add(&id, "MessageBox", properties).await.unwrap();
    let removed = console.add(&id, "MessageBox", Map::new()).await.unwrap();
    assert!(console.instance(&id, &kept).unwrap().persisted);

    console
        .update(
            &id,
            &removed,
            ModelMutation::method("setMessage", vec![json!("Bye")]),
        )
        .await
        .unwrap();
    let stored: Option<MessageBoxModel> = storage.load(&MessageBox::storage_path(&removed)).unwrap();
    assert_eq!(stored.unwrap().message, "Bye");

    let err = console
        .update(&id, &removed, ModelMutation::method("setMessage", vec![json!(3)]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "ComponentFault");
    assert_eq!(
        console.instance(&id, &removed).unwrap().phase,
        InstancePhase::Rendered
    );

    console.delete(&id, &removed).await.unwrap();
    let gone: Option<MessageBoxModel> = storage.load(&MessageBox::storage_path(&removed)).unwrap();
    assert!(gone.is_none());

    console.close(&id).await;
    let survived: Option<MessageBoxModel> = storage.load(&MessageBox::storage_path(&kept)).unwrap();
    assert_eq!(survived.unwrap().message, "Maintenance at noon");
}

#[tokio::test]
async fn message_box_restores_after_reconnect() {
    let server = server();
    let storage = server.get_global::<Storage>().cloned().unwrap();
    let console = server.get_global::<Console>().cloned().unwrap();

    let first = console.open(ConnectionId::new("tab-1")).unwrap();
    let mut properties = Map::new();
    properties.insert("message".into(), json!("Back soon"));
    let old = console
        .add(first.id(), "MessageBox", properties)
        .await
        .unwrap();
    console.close(first.id()).await;

    let second = console.open(ConnectionId::new("tab-2")).unwrap();
    let mut outbound = second.take_outbound().unwrap();
    let mut properties = Map::new();
    properties.insert("restore".into(), json!(old.as_str()));
    let new = console
        .add(second.id(), "MessageBox", properties)
        .await
        .unwrap();
    assert_ne!(old, new);
    assert_eq!(
        console.with_model(second.id(), &new, MessageBoxModel::clone),
        Some(MessageBoxModel {
            message: "Back soon".into()
        })
    );

    let entries = storage.get("/portico/message_box").unwrap();
    assert_eq!(
        entries.keys().cloned().collect::<Vec<_>>(),
        vec![MessageBox::storage_path(&new)],
        "the entry moves to the new instance"
    );

    console
        .render(second.id(), &new, RenderModes::from([RenderMode::View]))
        .await
        .unwrap();
    assert!(rendered_html(&drain(&mut outbound))[0].contains("Back soon"));

    let mut properties = Map::new();
    properties.insert("restore".into(), json!(old.as_str()));
    let fresh = console
        .add(second.id(), "MessageBox", properties)
        .await
        .unwrap();
    assert_eq!(
        console
            .with_model(second.id(), &fresh, MessageBoxModel::clone)
            .unwrap()
            .message,
        "Your message here"
    );

    let mut properties = Map::new();
    properties.insert("restore".into(), json!("HelloWorld-x"));
    let err = console
        .add(second.id(), "MessageBox", properties)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "ComponentFault");
}
