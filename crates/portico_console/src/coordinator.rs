//! The component lifecycle coordinator.
//!
//! [`Console`] owns the connection registry and drives every instance
//! through `Absent → Adding → Rendered ⇄ Updating → Deleting → Absent`.
//!
//! # Ordering
//!
//! Operations addressed to one instance (`render`, `update`, `delete`) take a
//! [`Ticket`](crate::Ticket) when they are *issued*, before the returned
//! future is first polled, and run one at a time in issue order. Operations on
//! different instances do not wait for each other.
//!
//! Each running operation also holds a read guard on its connection's gate.
//! [`Console::close`] takes the write guard, so it waits for operations in
//! flight and everything queued after it finds the connection gone.
//!
//! # Faults
//!
//! Hook errors and panics become [`ComponentFault`]s. The instance goes back
//! to `Rendered` with the model it had before the failed call.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use portico_core_plugins::{Clock, Storage};
use portico_protocol::{OutboundMessage, SchemaRegistry};
use portico_resources::{ResourceCollector, ResourcePlan};
use portico_system::resource::GlobalResource;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::component::{
    Component, ComponentTypes, ConnectionId, InstanceContext, InstanceId, ModelMutation, Release,
    RenderModes,
};
use crate::config::ConsoleConfig;
use crate::connection::{
    ConsoleConnection, InstancePhase, InstanceSlot, InstanceSnapshot, RetainedInstance,
};
use crate::error::{ComponentFault, ConsoleError, LifecycleError, panic_message};
use crate::plugin::PageResourceProvider;
use crate::registry::ConnectionRegistry;
use crate::template::Templates;

/// Reason sent to the browser when its page resources cannot be ordered.
pub const RESOURCE_LOAD_FAILED_REASON: &str = "Page resources could not be loaded.";

struct ConsoleInner {
    registry: ConnectionRegistry,
    types: ComponentTypes,
    providers: Vec<Arc<dyn PageResourceProvider>>,
    templates: Templates,
    storage: Storage,
    clock: Clock,
    config: ConsoleConfig,
    schemas: SchemaRegistry,
}

/// The console. Cloning shares the same registry.
#[derive(Clone)]
pub struct Console {
    inner: Arc<ConsoleInner>,
}

impl GlobalResource for Console {}

impl core::fmt::Debug for Console {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Console")
            .field("connections", &self.inner.registry.len())
            .field("types", &self.inner.types)
            .field("providers", &self.inner.providers.len())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

fn caught<T>(
    outcome: std::thread::Result<Result<T, ComponentFault>>,
    ctx: &InstanceContext,
) -> Result<T, ComponentFault> {
    match outcome {
        Ok(result) => result,
        Err(payload) => Err(ctx.fault(format!("panicked: {}", panic_message(payload.as_ref())))),
    }
}

fn flush_notifications(conn: &ConsoleConnection, instance: &InstanceId, ctx: &mut InstanceContext) {
    for (method, args) in ctx.take_notifications() {
        conn.send_message(OutboundMessage::NotifyView {
            instance: instance.to_string(),
            method,
            args,
        });
    }
}

fn ensure_live(conn: &ConsoleConnection, slot: &InstanceSlot) -> Result<(), LifecycleError> {
    if !conn.is_connected() {
        return Err(LifecycleError::UnknownConnection(conn.id().clone()));
    }
    if slot.state.lock().phase == InstancePhase::Absent {
        return Err(LifecycleError::UnknownInstance(slot.id.clone()));
    }
    Ok(())
}

impl Console {
    /// Starts building a console.
    #[must_use]
    pub fn builder() -> ConsoleBuilder {
        ConsoleBuilder::default()
    }

    /// The configuration this console was built with.
    #[must_use]
    pub fn config(&self) -> &ConsoleConfig {
        &self.inner.config
    }

    /// Parameter schemas of the console protocol.
    #[must_use]
    pub fn schemas(&self) -> &SchemaRegistry {
        &self.inner.schemas
    }

    /// Registered component types.
    #[must_use]
    pub fn component_types(&self) -> &ComponentTypes {
        &self.inner.types
    }

    /// The clock used for activity timestamps.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.inner.clock
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Connections
    // ─────────────────────────────────────────────────────────────────────────

    /// Opens a connection in the default locale.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AlreadyOpen`] if `id` is already open.
    pub fn open(&self, id: ConnectionId) -> Result<Arc<ConsoleConnection>, LifecycleError> {
        let conn = self.inner.registry.open(
            id,
            self.inner.config.default_locale.clone(),
            self.inner.clock.now(),
        )?;
        info!(connection = %conn.id(), locale = %conn.locale(), "console connection opened");
        Ok(conn)
    }

    /// The open connection with this id.
    #[must_use]
    pub fn connection(&self, id: &ConnectionId) -> Option<Arc<ConsoleConnection>> {
        self.inner.registry.get(id)
    }

    /// Ids of open connections, sorted.
    #[must_use]
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.inner.registry.ids()
    }

    /// Records activity on a connection, postponing its inactivity timeout.
    pub fn touch(&self, id: &ConnectionId) {
        if let Some(conn) = self.inner.registry.get(id) {
            conn.touch(self.inner.clock.now());
        }
    }

    fn lookup(&self, id: &ConnectionId) -> Result<Arc<ConsoleConnection>, LifecycleError> {
        self.inner
            .registry
            .get(id)
            .ok_or_else(|| LifecycleError::UnknownConnection(id.clone()))
    }

    fn target(
        &self,
        id: &ConnectionId,
        instance: &InstanceId,
    ) -> Result<(Arc<ConsoleConnection>, Arc<InstanceSlot>), LifecycleError> {
        let conn = self.lookup(id)?;
        let slot = conn
            .slot(instance)
            .ok_or_else(|| LifecycleError::UnknownInstance(instance.clone()))?;
        Ok((conn, slot))
    }

    /// `locale` is the connection's locale when the operation was issued.
    fn context(
        &self,
        conn: &ConsoleConnection,
        slot: &InstanceSlot,
        locale: String,
    ) -> InstanceContext {
        InstanceContext::new(
            conn.id().clone(),
            slot.id.clone(),
            slot.component_type.clone(),
            locale,
            self.inner.storage.clone(),
            self.inner.templates.clone(),
        )
    }

    /// Closes a connection once its in-flight operations finish.
    ///
    /// Instances not marked as persisted get their `release` hook. Closing
    /// an unknown or already closed connection does nothing.
    pub async fn close(&self, id: &ConnectionId) {
        let Some(conn) = self.inner.registry.remove(id) else {
            debug!(connection = %id, "close of unknown connection ignored");
            return;
        };
        conn.disconnect();
        let _gate = conn.gate.write().await;

        let slots: Vec<_> = conn
            .instances
            .lock()
            .drain(..)
            .map(|(_, slot)| slot)
            .collect();
        let mut released = 0_usize;
        let mut persisted = 0_usize;
        for slot in slots {
            let (model, is_persisted) = {
                let mut state = slot.state.lock();
                state.phase = InstancePhase::Absent;
                (state.model.take(), state.persisted)
            };
            let Some(model) = model else { continue };
            if is_persisted {
                persisted += 1;
                continue;
            }
            let mut ctx = self.context(&conn, &slot, conn.locale());
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
                slot.component.release_erased(&mut ctx, &model)
            }));
            if let Err(payload) = outcome {
                warn!(
                    connection = %id,
                    instance = %slot.id,
                    component_type = %slot.component_type,
                    error = %panic_message(payload.as_ref()),
                    "release hook panicked"
                );
            }
            released += 1;
        }
        conn.retained.lock().clear();
        info!(connection = %id, released, persisted, "console connection closed");
    }

    /// Closes every connection idle for at least the configured inactivity
    /// timeout. Returns the closed ids.
    pub async fn sweep_inactive(&self) -> Vec<ConnectionId> {
        let idle = self
            .inner
            .registry
            .idle(self.inner.clock.now(), self.inner.config.inactivity_timeout);
        for id in &idle {
            info!(connection = %id, "closing inactive connection");
            self.close(id).await;
        }
        idle
    }

    /// Runs [`sweep_inactive`](Self::sweep_inactive) every `sweep_interval`
    /// on the current tokio runtime.
    #[must_use]
    pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let console = self.clone();
        let period = self.inner.config.sweep_interval.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(period);
            ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                let closed = console.sweep_inactive().await;
                if !closed.is_empty() {
                    debug!(closed = closed.len(), "inactivity sweep finished");
                }
            }
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Page setup
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolves the page resources of a connection and advertises the
    /// addable component types.
    ///
    /// On a resolution failure the browser gets `resourceLoadFailed` and the
    /// connection stays open.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::UnknownConnection`] or the
    /// [`ResolutionError`](portico_resources::ResolutionError).
    pub fn console_ready(&self, id: &ConnectionId) -> Result<Arc<ResourcePlan>, ConsoleError> {
        let conn = self.lookup(id)?;

        let collector = ResourceCollector::new();
        for provider in &self.inner.providers {
            collector.contribute(provider.name(), provider.page_resources());
        }
        for (name, component) in self.inner.types.iter() {
            collector.contribute(name, component.page_resources());
        }

        let outcome = collector.finalize(self.inner.config.requirement_policy);
        let plan = match outcome {
            Ok(plan) => Arc::new(plan),
            Err(err) => {
                error!(connection = %id, error = %err, "page resources could not be resolved");
                conn.send_message(OutboundMessage::ResourceLoadFailed {
                    reason: String::from(RESOURCE_LOAD_FAILED_REASON),
                });
                self.advertise_types(&conn);
                return Err(err.into());
            }
        };

        conn.set_plan(Arc::clone(&plan));
        conn.send_message(OutboundMessage::ResourcesToLoad(ResourcePlan::clone(&plan)));
        self.advertise_types(&conn);
        info!(connection = %id, resources = plan.len(), "console ready");
        Ok(plan)
    }

    fn advertise_types(&self, conn: &ConsoleConnection) {
        for (name, component) in self.inner.types.iter() {
            let info = component.info();
            if !info.addable || conn.retained.lock().contains_key(name) {
                continue;
            }
            conn.advertise(name, info.supported_modes.clone());
            conn.send_message(OutboundMessage::AddComponentType {
                component_type: name.to_string(),
                display_name: info.display_name,
                modes: info.supported_modes.names(),
            });
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Instance lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Creates an instance and announces it with `componentAdded`.
    ///
    /// A singleton type that already has a live instance returns that
    /// instance's id instead, once the operations already queued on it have
    /// run.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::UnknownConnection`] / [`LifecycleError::UnknownComponentType`]
    /// - [`LifecycleError::SingletonConflict`] if the type was retained on delete
    /// - [`ComponentFault`] if the `add` hook fails; no instance is created
    pub async fn add(
        &self,
        id: &ConnectionId,
        component_type: &str,
        properties: Map<String, Value>,
    ) -> Result<InstanceId, ConsoleError> {
        let conn = self.lookup(id)?;
        let component = self
            .inner
            .types
            .get(component_type)
            .cloned()
            .ok_or_else(|| LifecycleError::UnknownComponentType(component_type.to_string()))?;
        let info = component.info();

        // A live singleton may still have a delete queued; wait for the
        // operations issued before this one to settle its fate.
        if info.singleton
            && let Some(slot) = conn.slot(&InstanceId::new(info.type_name.clone()))
        {
            let _turn = slot.sequencer.ticket().wait().await;
            if conn.is_connected() && slot.state.lock().phase != InstancePhase::Absent {
                debug!(connection = %id, instance = %slot.id, "singleton already present");
                return Ok(slot.id.clone());
            }
        }

        let _gate = conn.gate.read().await;
        if !conn.is_connected() {
            return Err(LifecycleError::UnknownConnection(id.clone()).into());
        }
        if conn.retained.lock().contains_key(&info.type_name) {
            return Err(LifecycleError::SingletonConflict(info.type_name).into());
        }

        let (slot, ticket) = {
            let mut instances = conn.instances.lock();
            let instance = if info.singleton {
                let existing = InstanceId::new(info.type_name.clone());
                if instances.contains_key(&existing) {
                    debug!(connection = %id, instance = %existing, "singleton already present");
                    return Ok(existing);
                }
                existing
            } else {
                loop {
                    let candidate = InstanceId::allocate(&info.type_name);
                    if !instances.contains_key(&candidate) {
                        break candidate;
                    }
                }
            };
            let slot = Arc::new(InstanceSlot::new(
                instance.clone(),
                info.type_name.clone(),
                Arc::clone(&component),
            ));
            // The first ticket is held until the model exists, so operations
            // issued meanwhile queue behind `add`.
            let ticket = slot.sequencer.ticket();
            instances.insert(instance, Arc::clone(&slot));
            (slot, ticket)
        };

        let mut ctx = self.context(&conn, &slot, conn.locale());
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
            component.add_erased(&mut ctx, &properties)
        }));
        let model = match caught(outcome, &ctx) {
            Ok(model) => model,
            Err(fault) => {
                conn.instances.lock().shift_remove(&slot.id);
                slot.state.lock().phase = InstancePhase::Absent;
                warn!(
                    connection = %id,
                    component_type = %slot.component_type,
                    error = %fault,
                    "add hook failed"
                );
                return Err(fault.into());
            }
        };

        {
            let mut state = slot.state.lock();
            state.model = Some(model);
            state.persisted = ctx.is_persisted();
            state.phase = InstancePhase::Rendered;
            conn.send_message(OutboundMessage::ComponentAdded {
                instance: slot.id.to_string(),
                modes: info.supported_modes.names(),
            });
            flush_notifications(&conn, &slot.id, &mut ctx);
        }
        drop(ticket);

        info!(
            connection = %id,
            instance = %slot.id,
            component_type = %slot.component_type,
            "component added"
        );
        Ok(slot.id.clone())
    }

    /// Renders an instance, sending one `componentRendered` per delivered
    /// mode. Resolves to the modes actually rendered.
    ///
    /// Requested modes the type does not support are skipped; the component
    /// may decline more.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::UnknownConnection`], [`LifecycleError::UnknownInstance`]
    /// or the render hook's [`ComponentFault`].
    pub fn render(
        &self,
        id: &ConnectionId,
        instance: &InstanceId,
        requested: RenderModes,
    ) -> BoxFuture<'static, Result<RenderModes, ConsoleError>> {
        let (conn, slot) = match self.target(id, instance) {
            Ok(target) => target,
            Err(err) => return futures::future::ready(Err(err.into())).boxed(),
        };
        let ticket = slot.sequencer.ticket();
        let locale = conn.locale();
        let console = self.clone();

        async move {
            let _turn = ticket.wait().await;
            let _gate = conn.gate.read().await;
            ensure_live(&conn, &slot)?;

            let modes = requested.intersection(&slot.component.info().supported_modes);
            let ctx = console.context(&conn, &slot, locale);
            let model = {
                let mut state = slot.state.lock();
                let Some(model) = state
                    .model
                    .as_ref()
                    .and_then(|model| slot.component.snapshot(model))
                else {
                    return Err(ctx.fault("instance has no model").into());
                };
                state.render_in_flight = true;
                model
            };

            let outcome = AssertUnwindSafe(slot.component.render_erased(&ctx, &model, &modes))
                .catch_unwind()
                .await;
            let result = caught(outcome, &ctx);

            let mut state = slot.state.lock();
            state.render_in_flight = false;
            match result {
                Ok(fragments) => {
                    let mut rendered = RenderModes::new();
                    for fragment in fragments {
                        if !modes.contains(fragment.mode) || !rendered.insert(fragment.mode) {
                            debug!(
                                instance = %slot.id,
                                mode = %fragment.mode,
                                "dropping fragment for unrequested or repeated mode"
                            );
                            continue;
                        }
                        conn.send_message(OutboundMessage::ComponentRendered {
                            instance: slot.id.to_string(),
                            mode: fragment.mode.as_str().to_string(),
                            html: fragment.html,
                        });
                    }
                    state.rendered_modes = rendered.clone();
                    debug!(
                        connection = %conn.id(),
                        instance = %slot.id,
                        modes = ?rendered.names(),
                        "component rendered"
                    );
                    Ok(rendered)
                }
                Err(fault) => {
                    warn!(
                        connection = %conn.id(),
                        instance = %slot.id,
                        component_type = %slot.component_type,
                        error = %fault,
                        "render hook failed"
                    );
                    Err(fault.into())
                }
            }
        }
        .boxed()
    }

    /// Applies a mutation to an instance's model.
    ///
    /// View notifications raised by the hook are queued before the future
    /// resolves, in the same critical section that publishes the new model.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::UnknownConnection`], [`LifecycleError::UnknownInstance`]
    /// or the hook's [`ComponentFault`], in which case the model is unchanged
    /// and nothing is sent.
    pub fn update(
        &self,
        id: &ConnectionId,
        instance: &InstanceId,
        mutation: ModelMutation,
    ) -> BoxFuture<'static, Result<(), ConsoleError>> {
        let (conn, slot) = match self.target(id, instance) {
            Ok(target) => target,
            Err(err) => return futures::future::ready(Err(err.into())).boxed(),
        };
        let ticket = slot.sequencer.ticket();
        let locale = conn.locale();
        let console = self.clone();

        async move {
            let _turn = ticket.wait().await;
            let _gate = conn.gate.read().await;
            ensure_live(&conn, &slot)?;

            let mut ctx = console.context(&conn, &slot, locale);
            let working = {
                let mut state = slot.state.lock();
                let working = state
                    .model
                    .as_ref()
                    .and_then(|model| slot.component.snapshot(model));
                if working.is_some() {
                    state.phase = InstancePhase::Updating;
                }
                working
            };
            let Some(mut working) = working else {
                return Err(ctx.fault("instance has no model").into());
            };

            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| match mutation {
                ModelMutation::Method { name, params } => {
                    slot.component
                        .update_erased(&mut ctx, &mut working, &name, &params)
                }
                ModelMutation::Apply(apply) => apply(&mut ctx, &mut *working),
            }));
            let result = caught(outcome, &ctx);

            let mut state = slot.state.lock();
            state.phase = InstancePhase::Rendered;
            match result {
                Ok(()) => {
                    state.model = Some(working);
                    if ctx.is_persisted() {
                        state.persisted = true;
                    }
                    flush_notifications(&conn, &slot.id, &mut ctx);
                    debug!(connection = %conn.id(), instance = %slot.id, "component updated");
                    Ok(())
                }
                Err(fault) => {
                    warn!(
                        connection = %conn.id(),
                        instance = %slot.id,
                        component_type = %slot.component_type,
                        error = %fault,
                        "update hook failed; model unchanged"
                    );
                    Err(fault.into())
                }
            }
        }
        .boxed()
    }

    /// Deletes an instance after running its `release` hook.
    ///
    /// Deleting an absent instance succeeds without doing anything. A
    /// [`Release::Retain`] keeps the state and withdraws the type with
    /// `updateComponentType(type, [])`.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::UnknownConnection`] only.
    pub fn delete(
        &self,
        id: &ConnectionId,
        instance: &InstanceId,
    ) -> BoxFuture<'static, Result<(), ConsoleError>> {
        let conn = match self.lookup(id) {
            Ok(conn) => conn,
            Err(err) => return futures::future::ready(Err(err.into())).boxed(),
        };
        let Some(slot) = conn.slot(instance) else {
            debug!(connection = %id, instance = %instance, "delete of absent instance ignored");
            return futures::future::ready(Ok(())).boxed();
        };
        let ticket = slot.sequencer.ticket();
        let locale = conn.locale();
        let console = self.clone();

        async move {
            let _turn = ticket.wait().await;
            let _gate = conn.gate.read().await;
            if !conn.is_connected() {
                return Err(LifecycleError::UnknownConnection(conn.id().clone()).into());
            }

            let model = {
                let mut state = slot.state.lock();
                if state.phase == InstancePhase::Absent {
                    return Ok(());
                }
                state.phase = InstancePhase::Deleting;
                state.model.take()
            };

            let mut ctx = console.context(&conn, &slot, locale);
            let release = match &model {
                Some(model) => std::panic::catch_unwind(AssertUnwindSafe(|| {
                    slot.component.release_erased(&mut ctx, model)
                }))
                .unwrap_or_else(|payload| {
                    warn!(
                        connection = %conn.id(),
                        instance = %slot.id,
                        error = %panic_message(payload.as_ref()),
                        "release hook panicked; discarding state"
                    );
                    Release::Discard
                }),
                None => Release::Discard,
            };

            conn.instances.lock().shift_remove(&slot.id);
            slot.state.lock().phase = InstancePhase::Absent;

            if let (Release::Retain, Some(model)) = (release, model) {
                conn.retained.lock().insert(
                    slot.component_type.clone(),
                    RetainedInstance {
                        id: slot.id.clone(),
                        _model: model,
                    },
                );
                conn.advertise(&slot.component_type, RenderModes::new());
                conn.send_message(OutboundMessage::UpdateComponentType {
                    component_type: slot.component_type.clone(),
                    modes: Vec::new(),
                });
                info!(
                    connection = %conn.id(),
                    component_type = %slot.component_type,
                    "component retained; type withdrawn"
                );
            }
            conn.send_message(OutboundMessage::ComponentDeleted {
                instance: slot.id.to_string(),
            });
            info!(connection = %conn.id(), instance = %slot.id, "component deleted");
            Ok(())
        }
        .boxed()
    }

    /// Switches a connection's locale and re-renders every rendered instance
    /// in its current modes. Re-render faults are logged, not returned.
    ///
    /// The locale is stored and the re-renders are queued before this returns.
    /// Operations issued earlier still run under the locale they were issued
    /// with.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::UnknownConnection`] or
    /// [`LifecycleError::UnsupportedLocale`].
    pub fn set_locale(
        &self,
        id: &ConnectionId,
        locale: &str,
    ) -> BoxFuture<'static, Result<(), ConsoleError>> {
        let conn = match self.lookup(id) {
            Ok(conn) => conn,
            Err(err) => return futures::future::ready(Err(err.into())).boxed(),
        };
        let Some(canonical) = self.inner.config.canonical_locale(locale) else {
            debug!(connection = %id, locale, "unsupported locale rejected");
            let err = LifecycleError::UnsupportedLocale(locale.to_string());
            return futures::future::ready(Err(err.into())).boxed();
        };
        conn.set_locale(canonical.to_string());
        info!(connection = %id, locale = canonical, "locale changed");

        let renders: Vec<_> = conn
            .slots()
            .into_iter()
            .filter_map(|slot| {
                let modes = slot.state.lock().rendered_modes.clone();
                (!modes.is_empty()).then(|| (slot.id.clone(), self.render(id, &slot.id, modes)))
            })
            .collect();

        async move {
            let (ids, pending): (Vec<_>, Vec<_>) = renders.into_iter().unzip();
            for (instance, result) in ids.into_iter().zip(join_all(pending).await) {
                if let Err(err) = result {
                    debug!(instance = %instance, error = %err, "re-render after locale change failed");
                }
            }
            Ok(())
        }
        .boxed()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Server-initiated messages
    // ─────────────────────────────────────────────────────────────────────────

    /// Queues any outbound message on a connection.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::UnknownConnection`].
    pub fn push(&self, id: &ConnectionId, message: OutboundMessage) -> Result<(), LifecycleError> {
        let conn = self.lookup(id)?;
        debug!(connection = %id, method = message.method(), "pushing server message");
        conn.send_message(message);
        Ok(())
    }

    /// Shows a transient notification in the browser.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::UnknownConnection`].
    pub fn display_notification(
        &self,
        id: &ConnectionId,
        html: impl Into<String>,
        options: Map<String, Value>,
    ) -> Result<(), LifecycleError> {
        self.push(
            id,
            OutboundMessage::DisplayNotification {
                html: html.into(),
                options,
            },
        )
    }

    /// Opens a modal dialog in the browser.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::UnknownConnection`].
    pub fn open_modal_dialog(
        &self,
        id: &ConnectionId,
        html: impl Into<String>,
        options: Map<String, Value>,
    ) -> Result<(), LifecycleError> {
        self.push(
            id,
            OutboundMessage::OpenModalDialog {
                html: html.into(),
                options,
            },
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────────────────

    /// Snapshot of a live instance.
    #[must_use]
    pub fn instance(&self, id: &ConnectionId, instance: &InstanceId) -> Option<InstanceSnapshot> {
        let (_, slot) = self.target(id, instance).ok()?;
        Some(slot.snapshot())
    }

    /// Runs `inspect` on an instance's model if it is an `S`.
    pub fn with_model<S: 'static, R>(
        &self,
        id: &ConnectionId,
        instance: &InstanceId,
        inspect: impl FnOnce(&S) -> R,
    ) -> Option<R> {
        let (_, slot) = self.target(id, instance).ok()?;
        let state = slot.state.lock();
        state.model.as_ref()?.downcast_ref::<S>().map(inspect)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ConsoleBuilder
// ─────────────────────────────────────────────────────────────────────────────

/// Assembles a [`Console`]. [`ConsolePlugin`](crate::ConsolePlugin) uses this
/// in `ready()`; tests and embedders may use it directly.
#[derive(Default)]
pub struct ConsoleBuilder {
    config: ConsoleConfig,
    clock: Option<Clock>,
    storage: Option<Storage>,
    templates: Option<Templates>,
    types: ComponentTypes,
    providers: Vec<Arc<dyn PageResourceProvider>>,
}

impl ConsoleBuilder {
    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ConsoleConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses `clock` instead of the system clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Uses `storage` instead of a fresh in-memory store.
    #[must_use]
    pub fn with_storage(mut self, storage: Storage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Uses `templates` for fragment rendering.
    #[must_use]
    pub fn with_templates(mut self, templates: Templates) -> Self {
        self.templates = Some(templates);
        self
    }

    /// Registers a component type.
    #[must_use]
    pub fn with_component<C: Component>(mut self, component: C) -> Self {
        self.types.register(component);
        self
    }

    /// Replaces the component type registry.
    #[must_use]
    pub fn with_types(mut self, types: ComponentTypes) -> Self {
        self.types = types;
        self
    }

    /// Adds a page resource provider.
    #[must_use]
    pub fn with_provider(mut self, provider: impl PageResourceProvider) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Adds several shared page resource providers.
    #[must_use]
    pub fn with_providers(
        mut self,
        providers: impl IntoIterator<Item = Arc<dyn PageResourceProvider>>,
    ) -> Self {
        self.providers.extend(providers);
        self
    }

    /// Builds the console with an empty connection registry.
    #[must_use]
    pub fn build(self) -> Console {
        info!(
            types = self.types.len(),
            providers = self.providers.len(),
            "console assembled"
        );
        Console {
            inner: Arc::new(ConsoleInner {
                registry: ConnectionRegistry::new(),
                types: self.types,
                providers: self.providers,
                templates: self.templates.unwrap_or_default(),
                storage: self.storage.unwrap_or_default(),
                clock: self.clock.unwrap_or_default(),
                config: self.config,
                schemas: SchemaRegistry::console(),
            }),
        }
    }
}
