//! Per-connection state.
//!
//! A [`ConsoleConnection`] owns its component instances, the resource plan of
//! its page and the outbox feeding its transport. All of it sits behind the
//! connection's own locks; nothing here is shared between connections.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use portico_protocol::{OutboundFrame, OutboundMessage};
use portico_resources::ResourcePlan;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::component::{ConnectionId, ErasedComponent, InstanceId, Model, RenderModes};
use crate::sequencer::Sequencer;

// ─────────────────────────────────────────────────────────────────────────────
// Instances
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle phase of a component instance.
///
/// `Rendered` is the only resting phase; the others last for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstancePhase {
    /// Not (or no longer) present.
    Absent,
    /// The `add` hook is running.
    Adding,
    /// Idle.
    Rendered,
    /// The `update` hook is running.
    Updating,
    /// The `release` hook is running.
    Deleting,
}

#[derive(Debug)]
pub(crate) struct SlotState {
    pub(crate) phase: InstancePhase,
    pub(crate) rendered_modes: RenderModes,
    pub(crate) model: Option<Model>,
    pub(crate) render_in_flight: bool,
    pub(crate) persisted: bool,
}

pub(crate) struct InstanceSlot {
    pub(crate) id: InstanceId,
    pub(crate) component_type: String,
    pub(crate) component: Arc<dyn ErasedComponent>,
    pub(crate) sequencer: Arc<Sequencer>,
    pub(crate) state: Mutex<SlotState>,
}

impl InstanceSlot {
    pub(crate) fn new(
        id: InstanceId,
        component_type: String,
        component: Arc<dyn ErasedComponent>,
    ) -> Self {
        Self {
            id,
            component_type,
            component,
            sequencer: Sequencer::new(),
            state: Mutex::new(SlotState {
                phase: InstancePhase::Adding,
                rendered_modes: RenderModes::new(),
                model: None,
                render_in_flight: false,
                persisted: false,
            }),
        }
    }

    pub(crate) fn snapshot(&self) -> InstanceSnapshot {
        let state = self.state.lock();
        InstanceSnapshot {
            id: self.id.clone(),
            component_type: self.component_type.clone(),
            phase: state.phase,
            rendered_modes: state.rendered_modes.clone(),
            render_in_flight: state.render_in_flight,
            persisted: state.persisted,
        }
    }
}

/// Point-in-time view of an instance, for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSnapshot {
    /// Instance id.
    pub id: InstanceId,
    /// Component type tag.
    pub component_type: String,
    /// Lifecycle phase.
    pub phase: InstancePhase,
    /// Modes delivered by the last successful render.
    pub rendered_modes: RenderModes,
    /// A render is running.
    pub render_in_flight: bool,
    /// The component stores its own state; `release` is skipped on close.
    pub persisted: bool,
}

pub(crate) struct RetainedInstance {
    pub(crate) id: InstanceId,
    pub(crate) _model: Model,
}

// ─────────────────────────────────────────────────────────────────────────────
// ConsoleConnection
// ─────────────────────────────────────────────────────────────────────────────

/// One browser tab's console.
pub struct ConsoleConnection {
    id: ConnectionId,
    /// Operations hold a read guard; `close` takes the write guard.
    pub(crate) gate: tokio::sync::RwLock<()>,
    connected: AtomicBool,
    last_activity: Mutex<Instant>,
    locale: RwLock<String>,
    plan: RwLock<Option<Arc<ResourcePlan>>>,
    pub(crate) instances: Mutex<IndexMap<InstanceId, Arc<InstanceSlot>>>,
    pub(crate) retained: Mutex<IndexMap<String, RetainedInstance>>,
    advertised: Mutex<IndexMap<String, RenderModes>>,
    session_data: RwLock<Map<String, Value>>,
    outbox: mpsc::UnboundedSender<OutboundFrame>,
    outbound: Mutex<Option<mpsc::UnboundedReceiver<OutboundFrame>>>,
}

impl core::fmt::Debug for ConsoleConnection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConsoleConnection")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .field("locale", &*self.locale.read())
            .field("instances", &self.instances.lock().len())
            .finish_non_exhaustive()
    }
}

impl ConsoleConnection {
    pub(crate) fn new(id: ConnectionId, locale: String, now: Instant) -> Self {
        let (outbox, outbound) = mpsc::unbounded_channel();
        Self {
            id,
            gate: tokio::sync::RwLock::new(()),
            connected: AtomicBool::new(true),
            last_activity: Mutex::new(now),
            locale: RwLock::new(locale),
            plan: RwLock::new(None),
            instances: Mutex::new(IndexMap::new()),
            retained: Mutex::new(IndexMap::new()),
            advertised: Mutex::new(IndexMap::new()),
            session_data: RwLock::new(Map::new()),
            outbox,
            outbound: Mutex::new(Some(outbound)),
        }
    }

    /// The connection id.
    #[must_use]
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// False once `close` has begun.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub(crate) fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// The receiving end of the outbox. Only the first call gets it.
    pub fn take_outbound(&self) -> Option<mpsc::UnboundedReceiver<OutboundFrame>> {
        self.outbound.lock().take()
    }

    /// Queues a frame for the browser. Dropped silently once the connection
    /// is closed or the receiver is gone.
    pub fn send(&self, frame: impl Into<OutboundFrame>) {
        let frame = frame.into();
        if !self.is_connected() {
            tracing::trace!(connection = %self.id, "dropping frame for closed connection");
            return;
        }
        if self.outbox.send(frame).is_err() {
            tracing::trace!(connection = %self.id, "dropping frame; transport receiver gone");
        }
    }

    pub(crate) fn send_message(&self, message: OutboundMessage) {
        self.send(OutboundFrame::Message(message));
    }

    /// When the browser was last heard from.
    #[must_use]
    pub fn last_activity(&self) -> Instant {
        *self.last_activity.lock()
    }

    pub(crate) fn touch(&self, now: Instant) {
        let mut last = self.last_activity.lock();
        if now > *last {
            *last = now;
        }
    }

    /// Current locale tag.
    #[must_use]
    pub fn locale(&self) -> String {
        self.locale.read().clone()
    }

    pub(crate) fn set_locale(&self, locale: String) {
        *self.locale.write() = locale;
    }

    /// The resource plan sent on `consoleReady`, if any.
    #[must_use]
    pub fn plan(&self) -> Option<Arc<ResourcePlan>> {
        self.plan.read().clone()
    }

    pub(crate) fn set_plan(&self, plan: Arc<ResourcePlan>) {
        *self.plan.write() = Some(plan);
    }

    /// Live instance ids in creation order.
    #[must_use]
    pub fn instance_ids(&self) -> Vec<InstanceId> {
        self.instances.lock().keys().cloned().collect()
    }

    /// Number of live instances.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.instances.lock().len()
    }

    pub(crate) fn slot(&self, instance: &InstanceId) -> Option<Arc<InstanceSlot>> {
        self.instances.lock().get(instance).cloned()
    }

    pub(crate) fn slots(&self) -> Vec<Arc<InstanceSlot>> {
        self.instances.lock().values().cloned().collect()
    }

    /// Ids of instances retained after deletion, by component type.
    #[must_use]
    pub fn retained(&self) -> Vec<(String, InstanceId)> {
        self.retained
            .lock()
            .iter()
            .map(|(component_type, retained)| (component_type.clone(), retained.id.clone()))
            .collect()
    }

    /// Modes currently advertised for `component_type`. An empty set means
    /// the type was withdrawn.
    #[must_use]
    pub fn advertised_modes(&self, component_type: &str) -> Option<RenderModes> {
        self.advertised.lock().get(component_type).cloned()
    }

    pub(crate) fn advertise(&self, component_type: &str, modes: RenderModes) {
        self.advertised
            .lock()
            .insert(component_type.to_string(), modes);
    }

    /// A value stored on this connection's session.
    #[must_use]
    pub fn session_value(&self, key: &str) -> Option<Value> {
        self.session_data.read().get(key).cloned()
    }

    /// Stores a value on this connection's session, returning the old one.
    pub fn set_session_value(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.session_data.write().insert(key.into(), value)
    }
}
