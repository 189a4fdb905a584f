//! Component model.
//!
//! A component type implements [`Component`] over its own `State`. The console
//! stores instances type-erased through [`ErasedComponent`] and looks types up
//! in a [`ComponentTypes`] registry populated at startup.
//!
//! # Example
//!
//! ```
//! use futures::FutureExt;
//! use futures::future::BoxFuture;
//! use portico_console::{
//!     Component, ComponentFault, ComponentInfo, InstanceContext, RenderMode, RenderModes,
//!     RenderedFragment,
//! };
//! use serde_json::{Map, Value};
//!
//! struct Counter;
//!
//! impl Component for Counter {
//!     type State = u64;
//!
//!     fn info(&self) -> ComponentInfo {
//!         ComponentInfo::new("Counter", "Counter").with_modes([RenderMode::Preview])
//!     }
//!
//!     fn add(&self, _: &mut InstanceContext, _: &Map<String, Value>) -> Result<u64, ComponentFault> {
//!         Ok(0)
//!     }
//!
//!     fn render<'a>(
//!         &'a self,
//!         _: &'a InstanceContext,
//!         count: &'a u64,
//!         _: &'a RenderModes,
//!     ) -> BoxFuture<'a, Result<Vec<RenderedFragment>, ComponentFault>> {
//!         async move { Ok(vec![RenderedFragment::new(RenderMode::Preview, count.to_string())]) }
//!             .boxed()
//!     }
//! }
//! ```

mod context;
mod id;
mod mode;

use core::any::Any;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use portico_resources::ResourceDescriptor;
use serde_json::{Map, Value};

pub use context::{InstanceContext, ModelMutation};
pub use id::{ConnectionId, InstanceId};
pub use mode::{RenderMode, RenderModes};

use crate::error::ComponentFault;

/// Type-erased instance model.
pub type Model = Box<dyn Any + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// Descriptive types
// ─────────────────────────────────────────────────────────────────────────────

/// Static description of a component type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentInfo {
    /// Type tag, used in `addComponent` and as the instance id prefix.
    pub type_name: String,
    /// Name shown in the browser's add menu.
    pub display_name: String,
    /// At most one live instance per connection; its id is the type tag.
    pub singleton: bool,
    /// Modes the type can render.
    pub supported_modes: RenderModes,
    /// Whether the type is advertised to the browser after `consoleReady`.
    pub addable: bool,
}

impl ComponentInfo {
    /// An addable multi-instance type supporting no modes yet.
    pub fn new(type_name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            display_name: display_name.into(),
            singleton: false,
            supported_modes: RenderModes::new(),
            addable: true,
        }
    }

    /// Sets the supported render modes.
    #[must_use]
    pub fn with_modes(mut self, modes: impl IntoIterator<Item = RenderMode>) -> Self {
        self.supported_modes = modes.into_iter().collect();
        self
    }

    /// Allows at most one instance per connection.
    #[must_use]
    pub fn singleton(mut self) -> Self {
        self.singleton = true;
        self
    }

    /// Hides the type from the add menu.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.addable = false;
        self
    }
}

/// One rendered HTML fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFragment {
    /// Mode the fragment is for.
    pub mode: RenderMode,
    /// Fragment markup.
    pub html: String,
}

impl RenderedFragment {
    /// A fragment for `mode`.
    pub fn new(mode: RenderMode, html: impl Into<String>) -> Self {
        Self {
            mode,
            html: html.into(),
        }
    }
}

/// Outcome of a component's `release` hook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Release {
    /// Drop the instance state.
    #[default]
    Discard,
    /// Keep the state and withdraw the type from the add menu on this
    /// connection.
    Retain,
}

// ─────────────────────────────────────────────────────────────────────────────
// Component trait
// ─────────────────────────────────────────────────────────────────────────────

/// A pluggable server-side unit producing HTML fragments.
///
/// Hooks for one instance never overlap: the console runs them one at a time
/// in request order. Hooks of different instances may run concurrently.
pub trait Component: Send + Sync + 'static {
    /// Per-instance model.
    type State: Clone + Send + Sync + 'static;

    /// Static description of the type.
    fn info(&self) -> ComponentInfo;

    /// Creates the model of a new instance.
    ///
    /// # Errors
    ///
    /// A fault aborts the add; no instance is created.
    fn add(
        &self,
        ctx: &mut InstanceContext,
        properties: &Map<String, Value>,
    ) -> Result<Self::State, ComponentFault>;

    /// Renders `modes`, already narrowed to the supported ones. Returning
    /// fewer fragments than requested declines the missing modes.
    fn render<'a>(
        &'a self,
        ctx: &'a InstanceContext,
        state: &'a Self::State,
        modes: &'a RenderModes,
    ) -> BoxFuture<'a, Result<Vec<RenderedFragment>, ComponentFault>>;

    /// Applies a browser-initiated update method.
    ///
    /// # Errors
    ///
    /// A fault leaves the model as it was before the call. The default
    /// rejects every method.
    fn update(
        &self,
        ctx: &mut InstanceContext,
        _state: &mut Self::State,
        method: &str,
        _params: &[Value],
    ) -> Result<(), ComponentFault> {
        Err(ctx.fault(format!("unsupported update method '{method}'")))
    }

    /// Called when the instance is deleted or its connection closes.
    fn release(&self, _ctx: &mut InstanceContext, _state: &Self::State) -> Release {
        Release::Discard
    }

    /// Page resources this type needs in the browser.
    fn page_resources(&self) -> Vec<ResourceDescriptor> {
        Vec::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Type erasure
// ─────────────────────────────────────────────────────────────────────────────

/// Object-safe view of a [`Component`].
///
/// Blanket-implemented; implement [`Component`] instead.
pub trait ErasedComponent: Send + Sync + 'static {
    /// See [`Component::info`].
    fn info(&self) -> ComponentInfo;

    /// Runs [`Component::add`] and boxes the new state.
    fn add_erased(
        &self,
        ctx: &mut InstanceContext,
        properties: &Map<String, Value>,
    ) -> Result<Model, ComponentFault>;

    /// Runs [`Component::render`] on a boxed model.
    fn render_erased<'a>(
        &'a self,
        ctx: &'a InstanceContext,
        model: &'a Model,
        modes: &'a RenderModes,
    ) -> BoxFuture<'a, Result<Vec<RenderedFragment>, ComponentFault>>;

    /// Runs [`Component::update`] on a boxed model.
    fn update_erased(
        &self,
        ctx: &mut InstanceContext,
        model: &mut Model,
        method: &str,
        params: &[Value],
    ) -> Result<(), ComponentFault>;

    /// Runs [`Component::release`] on a boxed model.
    fn release_erased(&self, ctx: &mut InstanceContext, model: &Model) -> Release;

    /// Clones the model, or `None` if it is not this type's state.
    fn snapshot(&self, model: &Model) -> Option<Model>;

    /// See [`Component::page_resources`].
    fn page_resources(&self) -> Vec<ResourceDescriptor>;
}

fn state_mismatch<S>(ctx: &InstanceContext) -> ComponentFault {
    ctx.fault(format!("model is not a {}", core::any::type_name::<S>()))
}

impl<C: Component> ErasedComponent for C {
    fn info(&self) -> ComponentInfo {
        Component::info(self)
    }

    fn add_erased(
        &self,
        ctx: &mut InstanceContext,
        properties: &Map<String, Value>,
    ) -> Result<Model, ComponentFault> {
        let state = Component::add(self, ctx, properties)?;
        Ok(Box::new(state))
    }

    fn render_erased<'a>(
        &'a self,
        ctx: &'a InstanceContext,
        model: &'a Model,
        modes: &'a RenderModes,
    ) -> BoxFuture<'a, Result<Vec<RenderedFragment>, ComponentFault>> {
        match model.downcast_ref::<C::State>() {
            Some(state) => Component::render(self, ctx, state, modes),
            None => futures::future::ready(Err(state_mismatch::<C::State>(ctx))).boxed(),
        }
    }

    fn update_erased(
        &self,
        ctx: &mut InstanceContext,
        model: &mut Model,
        method: &str,
        params: &[Value],
    ) -> Result<(), ComponentFault> {
        match model.downcast_mut::<C::State>() {
            Some(state) => Component::update(self, ctx, state, method, params),
            None => Err(state_mismatch::<C::State>(ctx)),
        }
    }

    fn release_erased(&self, ctx: &mut InstanceContext, model: &Model) -> Release {
        match model.downcast_ref::<C::State>() {
            Some(state) => Component::release(self, ctx, state),
            None => Release::Discard,
        }
    }

    fn snapshot(&self, model: &Model) -> Option<Model> {
        model
            .downcast_ref::<C::State>()
            .map(|state| Box::new(state.clone()) as Model)
    }

    fn page_resources(&self) -> Vec<ResourceDescriptor> {
        Component::page_resources(self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Type tag → component lookup, in registration order.
#[derive(Default, Clone)]
pub struct ComponentTypes {
    types: IndexMap<String, Arc<dyn ErasedComponent>>,
}

impl core::fmt::Debug for ComponentTypes {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.types.keys()).finish()
    }
}

impl ComponentTypes {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a component under its [`ComponentInfo::type_name`].
    /// A second registration of the same tag replaces the first.
    pub fn register<C: Component>(&mut self, component: C) -> &mut Self {
        self.register_shared(Arc::new(component))
    }

    /// Registers an already erased component.
    pub fn register_shared(&mut self, component: Arc<dyn ErasedComponent>) -> &mut Self {
        let type_name = component.info().type_name;
        if self.types.insert(type_name.clone(), component).is_some() {
            tracing::warn!(component_type = %type_name, "component type registered twice; replacing");
        } else {
            tracing::debug!(component_type = %type_name, "component type registered");
        }
        self
    }

    /// The component registered as `type_name`.
    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<&Arc<dyn ErasedComponent>> {
        self.types.get(type_name)
    }

    /// Returns true if `type_name` is registered.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Registered components in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn ErasedComponent>)> {
        self.types.iter().map(|(name, component)| (name.as_str(), component))
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if no type is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_core_plugins::Storage;

    use crate::template::Templates;

    #[derive(Clone)]
    struct Tally {
        count: i64,
    }

    struct Counter;

    impl Component for Counter {
        type State = Tally;

        fn info(&self) -> ComponentInfo {
            ComponentInfo::new("Counter", "Counter").with_modes([RenderMode::Preview])
        }

        fn add(
            &self,
            _: &mut InstanceContext,
            properties: &Map<String, Value>,
        ) -> Result<Tally, ComponentFault> {
            Ok(Tally {
                count: properties.get("start").and_then(Value::as_i64).unwrap_or(0),
            })
        }

        fn render<'a>(
            &'a self,
            _: &'a InstanceContext,
            state: &'a Tally,
            _: &'a RenderModes,
        ) -> BoxFuture<'a, Result<Vec<RenderedFragment>, ComponentFault>> {
            async move {
                Ok(vec![RenderedFragment::new(
                    RenderMode::Preview,
                    state.count.to_string(),
                )])
            }
            .boxed()
        }

        fn update(
            &self,
            ctx: &mut InstanceContext,
            state: &mut Tally,
            method: &str,
            _: &[Value],
        ) -> Result<(), ComponentFault> {
            match method {
                "increment" => {
                    state.count += 1;
                    ctx.notify_view("setCount", vec![Value::from(state.count)]);
                    Ok(())
                }
                other => Err(ctx.fault(format!("unsupported update method '{other}'"))),
            }
        }
    }

    fn context() -> InstanceContext {
        InstanceContext::new(
            ConnectionId::new("c"),
            InstanceId::new("Counter-1"),
            "Counter",
            "en",
            Storage::default(),
            Templates::default(),
        )
    }

    #[tokio::test]
    async fn erased_hooks_reach_typed_state() {
        let erased: Arc<dyn ErasedComponent> = Arc::new(Counter);
        let mut ctx = context();

        let mut properties = Map::new();
        properties.insert("start".into(), Value::from(41));
        let mut model = erased.add_erased(&mut ctx, &properties).unwrap();

        erased
            .update_erased(&mut ctx, &mut model, "increment", &[])
            .unwrap();
        assert_eq!(
            ctx.pending_notifications(),
            &[("setCount".to_string(), vec![Value::from(42)])]
        );

        let modes = RenderModes::from([RenderMode::Preview]);
        let fragments = erased.render_erased(&ctx, &model, &modes).await.unwrap();
        assert_eq!(fragments, vec![RenderedFragment::new(RenderMode::Preview, "42")]);
    }

    #[test]
    fn unknown_update_is_a_fault_naming_the_instance() {
        let erased: Arc<dyn ErasedComponent> = Arc::new(Counter);
        let mut ctx = context();
        let mut model = erased.add_erased(&mut ctx, &Map::new()).unwrap();

        let fault = erased
            .update_erased(&mut ctx, &mut model, "explode", &[])
            .unwrap_err();
        assert_eq!(fault.instance, "Counter-1");
        assert_eq!(fault.message, "unsupported update method 'explode'");
    }

    #[test]
    fn foreign_model_is_rejected() {
        let erased: Arc<dyn ErasedComponent> = Arc::new(Counter);
        let mut ctx = context();
        let mut model: Model = Box::new("not a tally");

        assert!(erased.snapshot(&model).is_none());
        let fault = erased
            .update_erased(&mut ctx, &mut model, "increment", &[])
            .unwrap_err();
        assert!(fault.message.starts_with("model is not a"));
    }

    #[test]
    fn typed_mutation_downcasts() {
        let mut ctx = context();
        let mut model: Model = Box::new(Tally { count: 1 });

        let ModelMutation::Apply(apply) = ModelMutation::apply(|_, tally: &mut Tally| {
            tally.count = 10;
            Ok(())
        }) else {
            panic!("expected Apply");
        };
        apply(&mut ctx, model.as_mut()).unwrap();
        assert_eq!(model.downcast_ref::<Tally>().map(|t| t.count), Some(10));
    }

    #[test]
    fn registry_keeps_registration_order() {
        let mut types = ComponentTypes::new();
        types.register(Counter);
        assert!(types.contains("Counter"));
        assert_eq!(types.iter().map(|(name, _)| name).collect::<Vec<_>>(), ["Counter"]);
        types.register(Counter);
        assert_eq!(types.len(), 1);
    }
}
