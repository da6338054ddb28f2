//! Schema nodes and their lifecycle.
//!
//! A [`SchemaRenderer`] owns everything one schema node needs across its
//! life: the resolved renderer, the mounted child instance, event bindings,
//! animation metadata and teardown callbacks.
//!
//! ```text
//! Constructed -> Resolved -> Mounted -> (update)* -> Unmounting -> Released
//! ```
//!
//! Nodes are single-threaded handles. Async loads keep only a weak reference
//! and become no-ops once the node is released.

pub mod lazy;
mod render;
mod resolve;

use core::{
    cell::{Cell, RefCell},
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};
use std::{
    rc::{Rc, Weak},
    sync::Arc,
};

use futures::{FutureExt, future::LocalBoxFuture};
use serde_json::Value;
use stencil_core::{
    Element, Instance, InstanceRef, Prop, Props, Result, RendererEvent, SchemaNode, StatusStore,
    Subscription, animation::AnimationMeta,
};
use tracing::{debug, trace};

use crate::{
    env::RendererEnv,
    events::Unbind,
    merge::NodeCallbacks,
    registry::RendererDescriptor,
};
use lazy::LazySlot;
use resolve::ResolvedSchema;

/// Process-unique node identity, used by the render queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Inputs of a node: its schema, path, scope and ambient properties.
#[derive(Debug, Clone, Default)]
pub struct NodeProps {
    /// Schema to render. `None` renders nothing.
    pub schema: Option<SchemaNode>,
    /// Resolution path, e.g. `page/body/0/form`.
    pub path: String,
    /// Scope handle; ignored by the update gate.
    pub scope: Option<Prop>,
    /// Everything else: `data`, stores, the host `render` callback, inherited
    /// flags.
    pub rest: Props,
}

impl NodeProps {
    /// Inputs for `schema` at `path`.
    pub fn new(schema: impl Into<SchemaNode>, path: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Adds an ambient property.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Prop>) -> Self {
        self.rest.insert(key, value);
        self
    }

    /// Sets the scope handle.
    #[must_use]
    pub fn scope(mut self, scope: Prop) -> Self {
        self.scope = Some(scope);
        self
    }
}

/// Lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Built; renderer not resolved yet.
    Constructed,
    /// Renderer resolved.
    Resolved,
    /// Mounted by the host.
    Mounted,
    /// Teardown in progress.
    Unmounting,
    /// Torn down; every later call is a no-op.
    Released,
}

struct NodeState {
    props: NodeProps,
    phase: Phase,
    resolved: Option<ResolvedSchema>,
    renderer_key: String,
    renderer: Option<Arc<RendererDescriptor>>,
    child: Option<InstanceRef>,
    to_dispose: Vec<Box<dyn FnOnce()>>,
    unbind_event: Option<Unbind>,
    unbind_global_event: Option<Unbind>,
    animation: Option<AnimationMeta>,
    is_static: Option<bool>,
    lazy: LazySlot,
    load_generation: u64,
    overlay: Option<OverlayWatch>,
}

/// The overlay entries a node is subscribed to.
struct OverlayWatch {
    store: Rc<StatusStore>,
    id: Option<String>,
    name: Option<String>,
    _subscription: Subscription,
}

impl OverlayWatch {
    fn watches(&self, store: &Rc<StatusStore>, id: Option<&str>, name: Option<&str>) -> bool {
        Rc::ptr_eq(&self.store, store) && self.id.as_deref() == id && self.name.as_deref() == name
    }
}

pub(crate) struct NodeCell {
    id: NodeId,
    env: Rc<RendererEnv>,
    alive: Cell<bool>,
    callbacks: NodeCallbacks,
    state: RefCell<NodeState>,
}

/// A mounted child instance together with the node that owns it.
#[derive(Clone)]
pub struct ChildRef {
    instance: InstanceRef,
    owner: Weak<NodeCell>,
}

impl fmt::Debug for ChildRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildRef")
            .field("owner", &self.owner().map(|owner| owner.id()))
            .finish_non_exhaustive()
    }
}

impl ChildRef {
    /// The innermost instance.
    #[must_use]
    pub const fn instance(&self) -> &InstanceRef {
        &self.instance
    }

    /// The owning node, while it exists.
    #[must_use]
    pub fn owner(&self) -> Option<SchemaRenderer> {
        self.owner.upgrade().map(|cell| SchemaRenderer { cell })
    }

    /// The instance's own properties, or the owning node's live properties
    /// when the instance does not track any.
    #[must_use]
    pub fn props(&self) -> Option<Props> {
        self.instance
            .props()
            .or_else(|| self.owner().map(|owner| owner.props().rest))
    }
}

/// One schema node.
#[derive(Clone)]
pub struct SchemaRenderer {
    cell: Rc<NodeCell>,
}

impl fmt::Debug for SchemaRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("SchemaRenderer");
        out.field("id", &self.cell.id);
        if let Ok(state) = self.cell.state.try_borrow() {
            out.field("path", &state.props.path)
                .field("phase", &state.phase)
                .field("renderer", &state.renderer.as_ref().map(|r| r.type_name()));
        }
        out.finish_non_exhaustive()
    }
}

fn node_callbacks(weak: &Weak<NodeCell>) -> NodeCallbacks {
    let render = {
        let weak = weak.clone();
        Rc::new(move |region: &str, node: &SchemaNode, props: Props| {
            weak.upgrade().map_or(Ok(Element::Empty), |cell| {
                SchemaRenderer { cell }.render_child(region, node, props)
            })
        })
    };
    let dispatch = {
        let weak = weak.clone();
        Rc::new(move |event: &str, data: Value| match weak.upgrade() {
            Some(cell) => SchemaRenderer { cell }.dispatch_event(event, data),
            None => async { None }.boxed_local(),
        })
    };
    NodeCallbacks { render, dispatch }
}

impl SchemaRenderer {
    /// Builds a node, derives its animation metadata, resolves its renderer
    /// and subscribes to the overlay entries for its id and name.
    ///
    /// Animated schemas without an `id` get a stylesheet named after the node
    /// identity, so sibling nodes never share one.
    #[must_use]
    pub fn new(env: Rc<RendererEnv>, props: NodeProps) -> Self {
        let id = NodeId::next();
        let animation = props
            .schema
            .as_ref()
            .and_then(SchemaNode::as_schema)
            .and_then(|schema| {
                let animations = schema.animations()?;
                let style_id = schema
                    .id()
                    .map_or_else(|| format!("node-{}", id.0), str::to_owned);
                Some(AnimationMeta::new(animations, Some(&style_id)))
            });

        let cell = Rc::new_cyclic(|weak| NodeCell {
            id,
            env,
            alive: Cell::new(true),
            callbacks: node_callbacks(weak),
            state: RefCell::new(NodeState {
                props,
                phase: Phase::Constructed,
                resolved: None,
                renderer_key: String::new(),
                renderer: None,
                child: None,
                to_dispose: Vec::new(),
                unbind_event: None,
                unbind_global_event: None,
                animation,
                is_static: None,
                lazy: LazySlot::Idle,
                load_generation: 0,
                overlay: None,
            }),
        });
        let node = Self { cell };

        node.resolve(false);
        node.cell.state.borrow_mut().phase = Phase::Resolved;
        node.sync_overlay();
        debug!(id = ?node.id(), "node constructed");
        node
    }

    /// Subscribes to the overlay entries for the schema's filtered id and
    /// name, replacing the previous subscription when the store or the keys
    /// changed.
    fn sync_overlay(&self) {
        let target = {
            let state = self.cell.state.borrow();
            let schema = state.props.schema.as_ref().and_then(SchemaNode::as_schema);
            match (state.props.rest.status_store(), schema) {
                (Some(store), Some(schema)) => {
                    let data = state.props.rest.data().cloned().unwrap_or(Value::Null);
                    let evaluator = self.cell.env.evaluator();
                    let key = |raw: Option<&str>| {
                        raw.map(|raw| evaluator.filter(raw, &data))
                            .filter(|key| !key.is_empty())
                    };
                    Some((store.clone(), key(schema.id()), key(schema.name())))
                }
                _ => None,
            }
        };

        let unchanged = {
            let state = self.cell.state.borrow();
            match (&state.overlay, &target) {
                (Some(watch), Some((store, id, name))) => {
                    watch.watches(store, id.as_deref(), name.as_deref())
                }
                (None, None) => true,
                _ => false,
            }
        };
        if unchanged {
            return;
        }

        let previous = self.cell.state.borrow_mut().overlay.take();
        drop(previous);
        let Some((store, id, name)) = target else {
            debug!(id = ?self.cell.id, "overlay store detached");
            return;
        };

        let weak = Rc::downgrade(&self.cell);
        let subscription = store.watch(id.clone(), name.clone(), move || {
            if let Some(cell) = weak.upgrade().filter(|cell| cell.alive.get()) {
                cell.env.queue().request(cell.id);
            }
        });
        debug!(id = ?self.cell.id, key = ?id, name = ?name, "watching overlay entries");
        self.cell.state.borrow_mut().overlay = Some(OverlayWatch {
            store,
            id,
            name,
            _subscription: subscription,
        });
    }

    /// Node identity.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.cell.id
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.cell.state.borrow().phase
    }

    /// Whether the node has not been released.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.cell.alive.get()
    }

    /// Current inputs.
    #[must_use]
    pub fn props(&self) -> NodeProps {
        self.cell.state.borrow().props.clone()
    }

    /// Environment the node renders in.
    #[must_use]
    pub fn env(&self) -> &Rc<RendererEnv> {
        &self.cell.env
    }

    /// Resolved renderer, if any.
    #[must_use]
    pub fn renderer(&self) -> Option<Arc<RendererDescriptor>> {
        self.cell.state.borrow().renderer.clone()
    }

    /// Animation metadata, when the schema declares animations.
    #[must_use]
    pub fn animation(&self) -> Option<AnimationMeta> {
        self.cell.state.borrow().animation.clone()
    }

    /// Static flag read from the overlay during the last render.
    #[must_use]
    pub fn is_static(&self) -> Option<bool> {
        self.cell.state.borrow().is_static
    }

    /// The mounted child, unwrapped to its innermost instance.
    #[must_use]
    pub fn child(&self) -> Option<ChildRef> {
        let instance = self.cell.state.borrow().child.clone()?;
        Some(ChildRef {
            instance,
            owner: Rc::downgrade(&self.cell),
        })
    }

    /// Resolved path and schema after `$ref` expansion.
    #[must_use]
    pub fn resolved(&self) -> Option<(String, SchemaNode)> {
        self.resolve(false)
    }

    /// Installs the animation stylesheet.
    pub fn mount(&self) {
        if !self.is_alive() {
            return;
        }
        let animation = {
            let mut state = self.cell.state.borrow_mut();
            state.phase = Phase::Mounted;
            state.animation.clone()
        };
        if let Some(meta) = animation {
            self.cell
                .env
                .styles()
                .create_style(&meta.style_id, &meta.animations);
        }
    }

    /// Stores new inputs and reports whether they require a render.
    pub fn update(&self, next: NodeProps) -> bool {
        if !self.is_alive() {
            return false;
        }
        let changed = {
            let mut state = self.cell.state.borrow_mut();
            let changed = crate::gate::should_update(&state.props, &next);
            state.props = next;
            changed
        };
        if changed {
            self.resolve(false);
        }
        self.sync_overlay();
        changed
    }

    /// Attaches the instance the rendered component produced.
    ///
    /// Wrapper instances are followed to the innermost instance, and the
    /// node's event bindings are moved onto it.
    pub fn attach_child(&self, instance: Option<InstanceRef>) {
        if !self.is_alive() {
            return;
        }
        let mut instance = instance;
        while let Some(inner) = instance.as_ref().and_then(|i| i.wrapped_instance()) {
            instance = Some(inner);
        }

        if let Some(instance) = &instance {
            self.unbind_events();
            let child = ChildRef {
                instance: instance.clone(),
                owner: Rc::downgrade(&self.cell),
            };
            let binder = self.cell.env.binder();
            let unbind = binder.bind(&child);
            let unbind_global = binder.bind_global(&child);
            let mut state = self.cell.state.borrow_mut();
            state.unbind_event = Some(unbind);
            state.unbind_global_event = Some(unbind_global);
        }
        self.cell.state.borrow_mut().child = instance;
    }

    fn unbind_events(&self) {
        let (local, global) = {
            let mut state = self.cell.state.borrow_mut();
            (state.unbind_event.take(), state.unbind_global_event.take())
        };
        if let Some(unbind) = local {
            unbind();
        }
        if let Some(unbind) = global {
            unbind();
        }
    }

    /// Registers a callback to run on unmount.
    pub fn on_dispose(&self, f: impl FnOnce() + 'static) {
        if self.is_alive() {
            self.cell.state.borrow_mut().to_dispose.push(Box::new(f));
        }
    }

    /// Tears the node down: runs teardown callbacks in registration order,
    /// unbinds events and removes the animation stylesheet. Idempotent.
    pub fn unmount(&self) {
        if !self.is_alive() {
            return;
        }
        let (overlay, to_dispose) = {
            let mut state = self.cell.state.borrow_mut();
            state.phase = Phase::Unmounting;
            (state.overlay.take(), core::mem::take(&mut state.to_dispose))
        };
        drop(overlay);
        for dispose in to_dispose {
            dispose();
        }
        self.unbind_events();
        let animation = self.cell.state.borrow().animation.clone();
        if let Some(meta) = animation {
            self.cell.env.styles().remove_style(&meta.style_id);
        }

        self.cell.alive.set(false);
        let mut state = self.cell.state.borrow_mut();
        state.child = None;
        state.discard_load();
        state.phase = Phase::Released;
        debug!(id = ?self.cell.id, "node released");
    }

    /// Resolves again, ignoring the cached renderer, and schedules a render.
    pub fn re_render(&self) {
        if !self.is_alive() {
            return;
        }
        self.resolve(true);
        self.request_render();
    }

    fn request_render(&self) {
        trace!(id = ?self.cell.id, "render requested");
        self.cell.env.queue().request(self.cell.id);
    }

    /// Renders `node` as a child of this node.
    ///
    /// The child inherits this node's ambient properties minus the ones that
    /// must not propagate (and the renderer's own `props_list`), gets a
    /// `defaultStatic` and `data`, and then `sub_props` on top.
    ///
    /// # Errors
    ///
    /// [`stencil_core::Error::MissingCollaborator`] when the node has no
    /// `render` callback.
    pub fn render_child(&self, region: &str, node: &SchemaNode, sub_props: Props) -> Result<Element> {
        let path = self
            .resolve(false)
            .map(|(path, _)| path)
            .unwrap_or_else(|| self.cell.state.borrow().props.path.clone());
        let (ambient, child_props) = self.child_props(sub_props);
        let child_path = if region.is_empty() {
            path
        } else {
            format!("{path}/{region}")
        };
        ambient.render_child(&child_path, node, child_props)
    }

    /// Dispatches an event with the mounted child as its target.
    pub fn dispatch_event(
        &self,
        event: &str,
        data: Value,
    ) -> LocalBoxFuture<'static, Option<RendererEvent>> {
        match self.cell.env.dispatcher() {
            Some(dispatcher) if self.is_alive() => dispatcher.dispatch(event, self.child(), data),
            _ => {
                trace!(event, "no event dispatcher");
                async { None }.boxed_local()
            }
        }
    }
}

impl Instance for SchemaRenderer {
    fn wrapped_instance(&self) -> Option<InstanceRef> {
        self.cell.state.borrow().child.clone()
    }

    fn props(&self) -> Option<Props> {
        Some(self.cell.state.borrow().props.rest.clone())
    }
}
