//! Loading renderers that are not available yet.
//!
//! Two cases reach this module: a schema whose type the registry does not
//! know, handed to the host's [`RendererLoader`], and a registered renderer
//! whose implementation is still behind an async provider. At most one load
//! is in flight per node; its completion only touches the node if the node
//! is still alive and still resolves to the type the load was started for.

use std::{rc::Rc, sync::Arc};

use futures::{future::LocalBoxFuture, task::LocalSpawnExt};
use stencil_core::{ComponentRef, Element, Result, Schema, Unresolved};
use tracing::{debug, warn};

use super::{NodeCell, NodeState, SchemaRenderer};
use crate::registry::{RendererDescriptor, load_async_renderer};

/// What a loader may produce.
#[derive(Debug, Clone)]
pub enum Loaded {
    /// An implementation, rendered with the node's properties.
    Component(ComponentRef),
    /// Finished output, rendered as is.
    Element(Element),
}

/// Host hook fetching renderers the registry does not know.
pub trait RendererLoader {
    /// Loads a renderer for `schema` at `path`. `on_ready` forces the node to
    /// resolve again, for loaders that register the renderer later on.
    ///
    /// `Ok(None)` and `Err(_)` both end in the unresolved placeholder.
    fn load(
        &self,
        schema: &Schema,
        path: &str,
        on_ready: Rc<dyn Fn()>,
    ) -> LocalBoxFuture<'static, Result<Option<Loaded>>>;
}

/// Output adopted from a finished load.
#[derive(Debug, Clone)]
pub(crate) enum LazyOutput {
    Component(ComponentRef),
    Element(Element),
    Failed(Unresolved),
}

/// Per-node load state.
#[derive(Debug, Clone, Default)]
pub(crate) enum LazySlot {
    #[default]
    Idle,
    Pending,
    Ready(LazyOutput),
}

fn unresolved(schema: &Schema, path: &str) -> Unresolved {
    Unresolved {
        type_name: schema.type_name().map(str::to_owned),
        path: path.to_owned(),
    }
}

impl NodeState {
    /// Forgets the current load. Completions of loads started before this
    /// call are ignored.
    pub(super) fn discard_load(&mut self) {
        self.lazy = LazySlot::Idle;
        self.load_generation = self.load_generation.wrapping_add(1);
    }
}

/// Runs `task` against the node if it is still alive and has not discarded
/// the load started at `generation`.
fn with_current_load(
    cell: &std::rc::Weak<NodeCell>,
    generation: u64,
    task: impl FnOnce(&SchemaRenderer),
) {
    let Some(cell) = cell.upgrade().filter(|cell| cell.alive.get()) else {
        warn!("renderer load settled after the node was released");
        return;
    };
    let current = cell.state.borrow().load_generation;
    if current != generation {
        debug!(id = ?cell.id, generation, current, "ignoring outdated renderer load");
        return;
    }
    task(&SchemaRenderer { cell });
}

impl SchemaRenderer {
    fn load_generation(&self) -> u64 {
        self.cell.state.borrow().load_generation
    }

    fn set_lazy(&self, slot: LazySlot) {
        self.cell.state.borrow_mut().lazy = slot;
    }

    /// Starts loading a renderer for an unknown type. Returns the output to
    /// show right away.
    pub(super) fn load_missing(&self, schema: &Schema, path: &str) -> Element {
        let Some(loader) = self.cell.env.loader().cloned() else {
            debug!(path, "no renderer loader, rendering placeholder");
            let failed = unresolved(schema, path);
            self.set_lazy(LazySlot::Ready(LazyOutput::Failed(failed.clone())));
            return Element::Unresolved(failed);
        };

        let weak = Rc::downgrade(&self.cell);
        let generation = self.load_generation();
        let on_ready: Rc<dyn Fn()> = {
            let weak = weak.clone();
            Rc::new(move || with_current_load(&weak, generation, SchemaRenderer::re_render))
        };
        let fallback = unresolved(schema, path);
        let load = loader.load(schema, path, on_ready);
        let task = async move {
            let result = load.await;
            with_current_load(&weak, generation, |node| {
                let output = match result {
                    Ok(Some(Loaded::Component(component))) => LazyOutput::Component(component),
                    Ok(Some(Loaded::Element(element))) => LazyOutput::Element(element),
                    Ok(None) => LazyOutput::Failed(fallback),
                    Err(err) => {
                        warn!(path = fallback.path, "renderer load failed: {err}");
                        LazyOutput::Failed(fallback)
                    }
                };
                let failed = matches!(output, LazyOutput::Failed(_));
                node.set_lazy(LazySlot::Ready(output));
                if failed {
                    node.re_render();
                } else {
                    node.request_render();
                }
            });
        };

        self.set_lazy(LazySlot::Pending);
        if let Err(err) = self.cell.env.spawner().spawn_local(task) {
            warn!(path, "cannot spawn renderer load: {err}");
            let failed = unresolved(schema, path);
            self.set_lazy(LazySlot::Ready(LazyOutput::Failed(failed.clone())));
            return Element::Unresolved(failed);
        }
        Element::Pending
    }

    /// Fetches the implementation of an async renderer. Nothing is shown in
    /// the meantime.
    pub(super) fn load_async(
        &self,
        descriptor: Arc<RendererDescriptor>,
        schema: &Schema,
        path: &str,
    ) -> Element {
        let weak = Rc::downgrade(&self.cell);
        let generation = self.load_generation();
        let fallback = unresolved(schema, path);
        let task = async move {
            let result = load_async_renderer(&descriptor).await;
            with_current_load(&weak, generation, |node| match result {
                Ok(()) => {
                    node.set_lazy(LazySlot::Idle);
                    node.re_render();
                }
                Err(err) => {
                    warn!(path = fallback.path, "{err}");
                    node.set_lazy(LazySlot::Ready(LazyOutput::Failed(fallback)));
                    node.request_render();
                }
            });
        };

        self.set_lazy(LazySlot::Pending);
        if let Err(err) = self.cell.env.spawner().spawn_local(task) {
            warn!(path, "cannot spawn async renderer load: {err}");
            self.set_lazy(LazySlot::Ready(LazyOutput::Failed(unresolved(schema, path))));
        }
        Element::Empty
    }
}
