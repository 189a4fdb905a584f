//! Per-connection dispatch loop.
//!
//! A [`ConsoleSession`] reads frames of one connection in arrival order and
//! maps each method to a [`Console`] operation. Connection-level methods run
//! inline. Instance operations take their place in the instance's queue
//! inline and then finish on a spawned task, so a slow render of one instance
//! does not hold up frames addressed to others.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use portico_protocol::{Envelope, Inbound, OutboundFrame, Response};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::component::{ConnectionId, InstanceId, ModelMutation, RenderModes};
use crate::connection::ConsoleConnection;
use crate::coordinator::Console;
use crate::error::{ConsoleError, LifecycleError};

/// Drives one connection from decoded transport frames.
pub struct ConsoleSession {
    console: Console,
    connection: Arc<ConsoleConnection>,
    tasks: JoinSet<()>,
}

impl core::fmt::Debug for ConsoleSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConsoleSession")
            .field("connection", self.connection.id())
            .field("in_flight", &self.tasks.len())
            .finish()
    }
}

fn respond(
    connection: &ConsoleConnection,
    reply_to: Option<Value>,
    result: Result<Value, ConsoleError>,
) {
    let Some(id) = reply_to else {
        if let Err(err) = result {
            debug!(
                connection = %connection.id(),
                kind = err.kind(),
                error = %err,
                "notification failed"
            );
        }
        return;
    };
    let response = match result {
        Ok(value) => Response::success(id, value),
        Err(err) => Response::error(id, err.kind(), err.to_string()),
    };
    connection.send(OutboundFrame::Response(response));
}

impl ConsoleSession {
    /// Wraps an open connection.
    #[must_use]
    pub fn new(console: Console, connection: Arc<ConsoleConnection>) -> Self {
        Self {
            console,
            connection,
            tasks: JoinSet::new(),
        }
    }

    /// Opens `id` on `console` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AlreadyOpen`] if `id` is already open.
    pub fn open(console: &Console, id: ConnectionId) -> Result<Self, LifecycleError> {
        let connection = console.open(id)?;
        Ok(Self::new(console.clone(), connection))
    }

    /// The connection id.
    #[must_use]
    pub fn id(&self) -> &ConnectionId {
        self.connection.id()
    }

    /// The wrapped connection.
    #[must_use]
    pub fn connection(&self) -> &Arc<ConsoleConnection> {
        &self.connection
    }

    /// The receiving end of the connection's outbox. Only the first call
    /// gets it.
    pub fn take_outbound(&self) -> Option<mpsc::UnboundedReceiver<OutboundFrame>> {
        self.connection.take_outbound()
    }

    /// Operations spawned and not yet reaped.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Handles one frame of JSON text.
    ///
    /// Rejected frames never end the session. A request gets an error
    /// response and a failed notification is only logged. A malformed frame
    /// is answered with its `id` if one can be read from it, `null` if not.
    pub async fn handle_frame(&mut self, text: &str) {
        self.reap();
        self.console.touch(self.connection.id());

        let envelope = match Envelope::parse(text) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(connection = %self.connection.id(), error = %err, "rejecting malformed frame");
                respond(&self.connection, Some(Envelope::reply_id(text)), Err(err.into()));
                return;
            }
        };
        let reply_to = envelope.id.clone();

        if let Err(err) = self
            .console
            .schemas()
            .validate(&envelope.method, &envelope.params)
        {
            debug!(connection = %self.connection.id(), method = %envelope.method, error = %err, "rejecting frame");
            respond(&self.connection, reply_to, Err(err.into()));
            return;
        }

        match Inbound::from_envelope(&envelope) {
            Ok(message) => self.dispatch(message, reply_to).await,
            Err(err) => {
                debug!(connection = %self.connection.id(), method = %envelope.method, error = %err, "rejecting frame");
                respond(&self.connection, reply_to, Err(err.into()));
            }
        }
    }

    async fn dispatch(&mut self, message: Inbound, reply_to: Option<Value>) {
        debug!(connection = %self.connection.id(), method = message.method(), "dispatching");
        let console = self.console.clone();
        let id = self.connection.id().clone();

        match message {
            Inbound::ConsoleReady => {
                let result = console
                    .console_ready(&id)
                    .map(|plan| Value::from(plan.len()));
                respond(&self.connection, reply_to, result);
            }
            Inbound::KeepAlive => respond(&self.connection, reply_to, Ok(Value::Null)),
            Inbound::AddComponent {
                component_type,
                properties,
            } => {
                let result = console
                    .add(&id, &component_type, properties)
                    .await
                    .map(|instance| Value::from(instance.as_str()));
                respond(&self.connection, reply_to, result);
            }
            Inbound::RenderComponent { instance, modes } => {
                let pending =
                    console.render(&id, &InstanceId::from(instance), RenderModes::from_names(&modes));
                self.spawn(reply_to, async move {
                    pending.await.map(|rendered| Value::from(rendered.names()))
                });
            }
            Inbound::UpdateComponent {
                instance,
                method,
                params,
            } => {
                let pending = console.update(
                    &id,
                    &InstanceId::from(instance),
                    ModelMutation::method(method, params),
                );
                self.spawn(reply_to, async move { pending.await.map(|()| Value::Null) });
            }
            Inbound::DeleteComponent { instance } => {
                let pending = console.delete(&id, &InstanceId::from(instance));
                self.spawn(reply_to, async move { pending.await.map(|()| Value::Null) });
            }
            Inbound::SetLocale { locale } => {
                let pending = console.set_locale(&id, &locale);
                self.spawn(reply_to, async move { pending.await.map(|()| Value::Null) });
            }
        }
    }

    fn spawn<F>(&mut self, reply_to: Option<Value>, operation: F)
    where
        F: Future<Output = Result<Value, ConsoleError>> + Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        self.tasks.spawn(async move {
            let result = operation.await;
            respond(&connection, reply_to, result);
        });
    }

    fn reap(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            if let Err(err) = joined {
                warn!(connection = %self.connection.id(), error = %err, "operation task failed");
            }
        }
    }

    /// Waits for spawned operations, then closes the connection.
    pub async fn finish(mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(err) = joined {
                warn!(connection = %self.connection.id(), error = %err, "operation task failed");
            }
        }
        self.console.close(self.connection.id()).await;
    }

    /// Handles frames until the stream ends or the connection is closed
    /// elsewhere, then [`finish`](Self::finish)es.
    pub async fn run<S>(mut self, mut frames: S)
    where
        S: Stream<Item = String> + Unpin,
    {
        info!(connection = %self.connection.id(), "console session started");
        while let Some(frame) = frames.next().await {
            self.handle_frame(&frame).await;
            if !self.connection.is_connected() {
                info!(connection = %self.connection.id(), "connection closed; stopping session");
                break;
            }
        }
        self.finish().await;
    }
}
