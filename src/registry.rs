//! Renderer registry.
//!
//! Maps a schema's `type` (or a custom test on path and schema) to a
//! [`RendererDescriptor`]. The registry is process-wide and shared across
//! threads; descriptors are immutable once registered except for the one-time
//! fill of an async component.

use core::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use futures::future::BoxFuture;
use serde_json::{Map, Value};
use stencil_core::{ComponentRef, Error, Props, Result, Schema};
use tracing::debug;

/// Computes renderer-level default properties from `(type, schema)`.
pub type DefaultProps = Arc<dyn Fn(&str, &Schema) -> Map<String, Value> + Send + Sync>;

/// Fetches a component implementation asynchronously.
pub type ComponentProvider =
    Arc<dyn Fn() -> BoxFuture<'static, Result<ComponentRef>> + Send + Sync>;

/// Custom match predicate over `(path, schema)`.
pub type RendererTest = Arc<dyn Fn(&str, &Schema) -> bool + Send + Sync>;

/// A registered renderer.
pub struct RendererDescriptor {
    type_name: String,
    name: String,
    component: OnceLock<ComponentRef>,
    get_component: Option<ComponentProvider>,
    is_form_item: bool,
    store_type: Option<String>,
    auto_var: bool,
    default_props: Option<DefaultProps>,
    test: Option<RendererTest>,
}

impl fmt::Debug for RendererDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererDescriptor")
            .field("type_name", &self.type_name)
            .field("name", &self.name)
            .field("component", &self.component.get())
            .field("async", &self.get_component.is_some())
            .field("is_form_item", &self.is_form_item)
            .field("store_type", &self.store_type)
            .field("auto_var", &self.auto_var)
            .finish_non_exhaustive()
    }
}

impl RendererDescriptor {
    fn base(type_name: String) -> Self {
        Self {
            name: type_name.clone(),
            type_name,
            component: OnceLock::new(),
            get_component: None,
            is_form_item: false,
            store_type: None,
            auto_var: false,
            default_props: None,
            test: None,
        }
    }

    /// A renderer with a concrete implementation.
    #[must_use]
    pub fn new(type_name: impl Into<String>, component: ComponentRef) -> Self {
        let descriptor = Self::base(type_name.into());
        let _ = descriptor.component.set(component);
        descriptor
    }

    /// A renderer whose implementation is fetched on first use.
    #[must_use]
    pub fn lazy(type_name: impl Into<String>, provider: ComponentProvider) -> Self {
        Self {
            get_component: Some(provider),
            ..Self::base(type_name.into())
        }
    }

    /// Overrides the registered name (defaults to the type).
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Marks the renderer as a form item.
    #[must_use]
    pub const fn form_item(mut self) -> Self {
        self.is_form_item = true;
        self
    }

    /// Declares that the renderer manages its own derived store.
    #[must_use]
    pub fn store_type(mut self, store_type: impl Into<String>) -> Self {
        self.store_type = Some(store_type.into());
        self
    }

    /// Resolves string expressions in literal properties automatically.
    #[must_use]
    pub const fn auto_var(mut self) -> Self {
        self.auto_var = true;
        self
    }

    /// Sets the default-properties function.
    #[must_use]
    pub fn default_props(
        mut self,
        f: impl Fn(&str, &Schema) -> Map<String, Value> + Send + Sync + 'static,
    ) -> Self {
        self.default_props = Some(Arc::new(f));
        self
    }

    /// Matches with a custom predicate in addition to the type name.
    #[must_use]
    pub fn test(mut self, f: impl Fn(&str, &Schema) -> bool + Send + Sync + 'static) -> Self {
        self.test = Some(Arc::new(f));
        self
    }

    /// Schema type this renderer is registered for.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Registered name, used for theme lookups.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The implementation, once available.
    #[must_use]
    pub fn component(&self) -> Option<&ComponentRef> {
        self.component.get()
    }

    /// Whether an async provider still has to run.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.get_component.is_some() && self.component.get().is_none()
    }

    /// Whether this is a form item.
    #[must_use]
    pub const fn is_form_item(&self) -> bool {
        self.is_form_item
    }

    /// Derived-store kind, if the renderer manages one.
    #[must_use]
    pub fn store(&self) -> Option<&str> {
        self.store_type.as_deref()
    }

    /// Whether literal expressions are resolved automatically.
    #[must_use]
    pub const fn is_auto_var(&self) -> bool {
        self.auto_var
    }

    /// Renderer-provided defaults for `schema`.
    #[must_use]
    pub fn defaults_for(&self, type_name: &str, schema: &Schema) -> Map<String, Value> {
        self.default_props
            .as_ref()
            .map(|f| f(type_name, schema))
            .unwrap_or_default()
    }

    fn matches(&self, path: &str, schema: &Schema) -> bool {
        self.test.as_ref().is_some_and(|test| test(path, schema))
            || schema.type_name() == Some(self.type_name.as_str())
    }
}

/// Runs the descriptor's async provider once and stores the result.
///
/// # Errors
///
/// Propagates the provider's failure as [`Error::AsyncRenderer`].
pub async fn load_async_renderer(descriptor: &RendererDescriptor) -> Result<()> {
    if descriptor.component.get().is_some() {
        return Ok(());
    }
    let Some(provider) = &descriptor.get_component else {
        return Ok(());
    };
    let component = provider()
        .await
        .map_err(|err| Error::AsyncRenderer(format!("{}: {err}", descriptor.type_name)))?;
    let _ = descriptor.component.set(component);
    debug!(renderer = descriptor.type_name, "async renderer loaded");
    Ok(())
}

/// The process-wide registry.
pub fn global() -> Arc<RendererRegistry> {
    static GLOBAL: OnceLock<Arc<RendererRegistry>> = OnceLock::new();
    GLOBAL.get_or_init(Arc::default).clone()
}

/// Registers `descriptor` in the process-wide registry.
pub fn register_renderer(descriptor: RendererDescriptor) -> Arc<RendererDescriptor> {
    global().register(descriptor)
}

/// Resolves a renderer for a schema at a path.
pub trait RendererResolver {
    /// Finds the renderer for `schema` at `path`.
    fn resolve(
        &self,
        path: &str,
        schema: &Schema,
        props: &Props,
    ) -> Option<Arc<RendererDescriptor>>;
}

/// Process-wide renderer table.
#[derive(Debug, Default)]
pub struct RendererRegistry {
    renderers: RwLock<Vec<Arc<RendererDescriptor>>>,
}

impl RendererRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a renderer; a later registration for the same type wins.
    pub fn register(&self, descriptor: RendererDescriptor) -> Arc<RendererDescriptor> {
        let descriptor = Arc::new(descriptor);
        let mut renderers = self
            .renderers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        renderers.retain(|existing| existing.type_name != descriptor.type_name);
        renderers.push(descriptor.clone());
        debug!(renderer = descriptor.type_name, "renderer registered");
        descriptor
    }

    /// Number of registered renderers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.renderers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RendererResolver for RendererRegistry {
    fn resolve(
        &self,
        path: &str,
        schema: &Schema,
        _props: &Props,
    ) -> Option<Arc<RendererDescriptor>> {
        self.renderers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|descriptor| descriptor.matches(path, schema))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{FutureExt, executor::block_on};
    use serde_json::json;
    use stencil_core::{Element, component};

    fn text() -> ComponentRef {
        component("text", |props| Element::widget("text", props.clone()))
    }

    #[test]
    fn resolves_by_type_then_test() {
        let registry = RendererRegistry::new();
        registry.register(RendererDescriptor::new("text", text()));
        registry.register(
            RendererDescriptor::new("cell", text()).test(|path, _| path.ends_with("/cell")),
        );

        let schema = Schema::from_value(json!({"type": "text"})).unwrap();
        let found = registry.resolve("page/body", &schema, &Props::new()).unwrap();
        assert_eq!(found.type_name(), "text");

        let found = registry.resolve("table/cell", &schema, &Props::new()).unwrap();
        assert_eq!(found.type_name(), "cell");

        let unknown = Schema::from_value(json!({"type": "unknown-widget"})).unwrap();
        assert!(registry.resolve("page", &unknown, &Props::new()).is_none());
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let registry = RendererRegistry::new();
        registry.register(RendererDescriptor::new("text", text()));
        let second = registry.register(RendererDescriptor::new("text", text()).named("plain"));
        assert_eq!(registry.len(), 1);
        let schema = Schema::from_value(json!({"type": "text"})).unwrap();
        let found = registry.resolve("p", &schema, &Props::new()).unwrap();
        assert!(Arc::ptr_eq(&found, &second));
    }

    #[test]
    fn async_provider_fills_component_once() {
        let descriptor =
            RendererDescriptor::lazy("chart", Arc::new(|| async { Ok(text()) }.boxed()));
        assert!(descriptor.is_pending());
        block_on(load_async_renderer(&descriptor)).unwrap();
        assert!(!descriptor.is_pending());
        assert!(descriptor.component().is_some());
    }

    #[test]
    fn async_provider_failure_is_reported() {
        let descriptor = RendererDescriptor::lazy(
            "chart",
            Arc::new(|| async { Err(Error::RendererLoad("offline".into())) }.boxed()),
        );
        let err = block_on(load_async_renderer(&descriptor)).unwrap_err();
        assert!(matches!(err, Error::AsyncRenderer(_)));
        assert!(descriptor.is_pending());
    }
}
