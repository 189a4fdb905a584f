//! Driving a connection with protocol frames.

use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use portico_console::{
    Component, ComponentFault, ComponentInfo, ConnectionId, Console, ConsoleSession,
    InstanceContext, InstanceId, RenderMode, RenderModes, RenderedFragment,
};
use portico_protocol::{OutboundFrame, OutboundMessage, Response};
use serde_json::{Map, Value, json};
use tokio::sync::mpsc;

struct Tally;

impl Component for Tally {
    type State = i64;

    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("Tally", "Tally").with_modes([RenderMode::View])
    }

    fn add(&self, _: &mut InstanceContext, properties: &Map<String, Value>) -> Result<i64, ComponentFault> {
        Ok(properties.get("start").and_then(Value::as_i64).unwrap_or(0))
    }

    fn render<'a>(
        &'a self,
        _: &'a InstanceContext,
        state: &'a i64,
        _: &'a RenderModes,
    ) -> BoxFuture<'a, Result<Vec<RenderedFragment>, ComponentFault>> {
        async move {
            Ok(vec![RenderedFragment::new(
                RenderMode::View,
                format!("<span>{state}</span>"),
            )])
        }
        .boxed()
    }

    fn update(
        &self,
        ctx: &mut InstanceContext,
        state: &mut i64,
        method: &str,
        params: &[Value],
    ) -> Result<(), ComponentFault> {
        match method {
            "increment" => {
                *state += params.first().and_then(Value::as_i64).unwrap_or(1);
                ctx.notify_view("setCount", vec![json!(*state)]);
                Ok(())
            }
            other => Err(ctx.fault(format!("unsupported update method '{other}'"))),
        }
    }
}

struct Banner;

impl Component for Banner {
    type State = String;

    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("Banner", "Banner")
            .with_modes([RenderMode::View])
            .singleton()
    }

    fn add(&self, _: &mut InstanceContext, _: &Map<String, Value>) -> Result<String, ComponentFault> {
        Ok(String::from("Welcome"))
    }

    fn render<'a>(
        &'a self,
        _: &'a InstanceContext,
        state: &'a String,
        _: &'a RenderModes,
    ) -> BoxFuture<'a, Result<Vec<RenderedFragment>, ComponentFault>> {
        async move { Ok(vec![RenderedFragment::new(RenderMode::View, state.clone())]) }.boxed()
    }
}

fn console() -> Console {
    Console::builder()
        .with_component(Tally)
        .with_component(Banner)
        .build()
}

/// Receives until the response to `id` arrives, collecting messages sent
/// before it.
async fn response_to(
    outbound: &mut mpsc::UnboundedReceiver<OutboundFrame>,
    id: i64,
    seen: &mut Vec<OutboundMessage>,
) -> Response {
    let wait = async {
        loop {
            match outbound.recv().await {
                Some(OutboundFrame::Message(message)) => seen.push(message),
                Some(OutboundFrame::Response(response)) if response.id == json!(id) => {
                    return response;
                }
                Some(OutboundFrame::Response(other)) => panic!("unexpected response {other:?}"),
                None => panic!("outbox closed before response {id}"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("response within timeout")
}

async fn response_to_null(outbound: &mut mpsc::UnboundedReceiver<OutboundFrame>) -> Response {
    match tokio::time::timeout(Duration::from_secs(5), outbound.recv()).await {
        Ok(Some(OutboundFrame::Response(response))) if response.id.is_null() => response,
        other => panic!("expected a reply with a null id, got {other:?}"),
    }
}

fn error_kind(response: &Response) -> Option<&str> {
    response.outcome.as_ref().err().map(|body| body.kind.as_str())
}

#[tokio::test]
async fn request_flow_over_frames() {
    let console = console();
    let mut session = ConsoleSession::open(&console, ConnectionId::new("tab")).unwrap();
    let mut outbound = session.take_outbound().unwrap();
    let mut seen = Vec::new();

    session
        .handle_frame(r#"{"jsonrpc":"2.0","method":"consoleReady","id":1}"#)
        .await;
    let ready = response_to(&mut outbound, 1, &mut seen).await;
    assert_eq!(ready.outcome, Ok(json!(0)));
    assert_eq!(seen[0].method(), "resourcesToLoad");
    assert_eq!(seen.len(), 3, "plan plus two addable types");

    session
        .handle_frame(r#"{"jsonrpc":"2.0","method":"addComponent","params":["Tally",{"start":3}],"id":2}"#)
        .await;
    let added = response_to(&mut outbound, 2, &mut seen).await;
    let instance = added.outcome.unwrap().as_str().unwrap().to_string();
    assert!(instance.starts_with("Tally-"));

    let render = json!({
        "jsonrpc": "2.0",
        "method": "renderComponent",
        "params": [instance, ["view", "edit"]],
        "id": 3
    });
    session.handle_frame(&render.to_string()).await;
    seen.clear();
    let rendered = response_to(&mut outbound, 3, &mut seen).await;
    assert_eq!(rendered.outcome, Ok(json!(["view"])));
    assert_eq!(
        seen,
        vec![OutboundMessage::ComponentRendered {
            instance: instance.clone(),
            mode: "view".into(),
            html: "<span>3</span>".into(),
        }]
    );

    let update = json!({
        "jsonrpc": "2.0",
        "method": "updateComponent",
        "params": [instance, "increment", 2],
        "id": 4
    });
    session.handle_frame(&update.to_string()).await;
    seen.clear();
    let updated = response_to(&mut outbound, 4, &mut seen).await;
    assert_eq!(updated.outcome, Ok(Value::Null));
    assert_eq!(
        seen,
        vec![OutboundMessage::NotifyView {
            instance: instance.clone(),
            method: "setCount".into(),
            args: vec![json!(5)],
        }],
        "notification is queued before the reply"
    );

    let delete = json!({"method": "deleteComponent", "params": [instance], "id": 5});
    session.handle_frame(&delete.to_string()).await;
    seen.clear();
    let deleted = response_to(&mut outbound, 5, &mut seen).await;
    assert_eq!(deleted.outcome, Ok(Value::Null));
    assert_eq!(seen[0].method(), "componentDeleted");

    session.finish().await;
    assert!(console.connection(&ConnectionId::new("tab")).is_none());
}

#[tokio::test]
async fn rejected_frames_keep_the_session_alive() {
    let console = console();
    let mut session = ConsoleSession::open(&console, ConnectionId::new("tab")).unwrap();
    let mut outbound = session.take_outbound().unwrap();
    let mut seen = Vec::new();

    session.handle_frame("not json at all").await;
    let unreadable = response_to_null(&mut outbound).await;
    assert_eq!(error_kind(&unreadable), Some("MalformedEnvelope"));

    session
        .handle_frame(r#"{"method":"renderComponent","params":[1]}"#)
        .await;
    assert!(outbound.try_recv().is_err(), "no reply without an id");

    session
        .handle_frame(r#"{"jsonrpc":"2.0","method":"addComponent","params":{"type":"Tally"},"id":6}"#)
        .await;
    let malformed = response_to(&mut outbound, 6, &mut seen).await;
    assert_eq!(error_kind(&malformed), Some("MalformedEnvelope"));
    assert!(session.connection().instance_ids().is_empty());

    session
        .handle_frame(r#"{"method":"renderComponent","params":[1],"id":7}"#)
        .await;
    let mismatch = response_to(&mut outbound, 7, &mut seen).await;
    assert_eq!(error_kind(&mismatch), Some("SchemaMismatch"));

    session.handle_frame(r#"{"method":"frobnicate","id":8}"#).await;
    let unknown = response_to(&mut outbound, 8, &mut seen).await;
    assert_eq!(error_kind(&unknown), Some("UnknownMethod"));

    session
        .handle_frame(r#"{"method":"addComponent","params":["Nope",{}],"id":9}"#)
        .await;
    let no_type = response_to(&mut outbound, 9, &mut seen).await;
    assert_eq!(error_kind(&no_type), Some("UnknownComponentType"));

    session
        .handle_frame(r#"{"method":"renderComponent","params":["Tally-missing",["view"]],"id":10}"#)
        .await;
    let no_instance = response_to(&mut outbound, 10, &mut seen).await;
    assert_eq!(error_kind(&no_instance), Some("UnknownInstance"));

    session
        .handle_frame(r#"{"method":"setLocale","params":["xx"],"id":11}"#)
        .await;
    let locale = response_to(&mut outbound, 11, &mut seen).await;
    assert_eq!(error_kind(&locale), Some("UnsupportedLocale"));

    session.handle_frame(r#"{"method":"keepAlive","id":12}"#).await;
    let alive = response_to(&mut outbound, 12, &mut seen).await;
    assert_eq!(alive.outcome, Ok(Value::Null));
    assert!(seen.is_empty());
    assert!(session.connection().is_connected());
}

#[tokio::test]
async fn singleton_add_after_queued_delete_creates_it_again() {
    let console = console();
    let mut session = ConsoleSession::open(&console, ConnectionId::new("tab")).unwrap();
    let mut outbound = session.take_outbound().unwrap();
    let mut seen = Vec::new();

    session
        .handle_frame(r#"{"method":"addComponent","params":["Banner",{}],"id":1}"#)
        .await;
    let first = response_to(&mut outbound, 1, &mut seen).await;
    assert_eq!(first.outcome, Ok(json!("Banner")));

    session
        .handle_frame(r#"{"method":"deleteComponent","params":["Banner"],"id":2}"#)
        .await;
    session
        .handle_frame(r#"{"method":"addComponent","params":["Banner",{}],"id":3}"#)
        .await;

    seen.clear();
    let mut responses = Vec::new();
    while responses.len() < 2 {
        match tokio::time::timeout(Duration::from_secs(5), outbound.recv()).await {
            Ok(Some(OutboundFrame::Response(response))) => responses.push(response),
            Ok(Some(OutboundFrame::Message(message))) => seen.push(message),
            other => panic!("expected two responses, got {other:?}"),
        }
    }
    assert_eq!(
        responses,
        vec![
            Response::success(json!(2), Value::Null),
            Response::success(json!(3), json!("Banner")),
        ]
    );
    assert_eq!(
        seen.iter().map(OutboundMessage::method).collect::<Vec<_>>(),
        vec!["componentDeleted", "componentAdded"]
    );
    assert_eq!(
        session.connection().instance_ids(),
        vec![InstanceId::new("Banner")]
    );
    session.finish().await;
}

#[tokio::test]
async fn run_joins_operations_before_closing() {
    let console = console();
    let session = ConsoleSession::open(&console, ConnectionId::new("tab")).unwrap();
    let mut outbound = session.take_outbound().unwrap();

    let frames = stream::iter(vec![
        String::from(r#"{"method":"addComponent","params":["Banner",{}],"id":1}"#),
        String::from(r#"{"method":"renderComponent","params":["Banner",["view"]],"id":2}"#),
    ]);
    session.run(frames).await;

    assert!(console.connection_ids().is_empty());

    let mut responses = Vec::new();
    let mut messages = Vec::new();
    while let Ok(frame) = outbound.try_recv() {
        match frame {
            OutboundFrame::Response(response) => responses.push(response),
            OutboundFrame::Message(message) => messages.push(message),
        }
    }
    assert_eq!(
        responses,
        vec![
            Response::success(json!(1), json!("Banner")),
            Response::success(json!(2), json!(["view"])),
        ]
    );
    assert_eq!(
        messages.iter().map(OutboundMessage::method).collect::<Vec<_>>(),
        vec!["componentAdded", "componentRendered"]
    );
}

#[tokio::test]
async fn run_stops_when_connection_closes_elsewhere() {
    let console = console();
    let session = ConsoleSession::open(&console, ConnectionId::new("tab")).unwrap();
    let id = session.id().clone();
    console.close(&id).await;

    let frames = stream::iter(vec![String::from(r#"{"method":"keepAlive"}"#)])
        .chain(stream::pending());
    tokio::time::timeout(Duration::from_secs(5), session.run(frames))
        .await
        .expect("session ends once its connection is gone");
}
