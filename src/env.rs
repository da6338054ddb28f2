//! The renderer environment.
//!
//! Everything a node needs from the outside world is reached through
//! [`RendererEnv`]: the registry, theme, evaluator, loaders, event system,
//! stylesheets, clipboard and the executor async work runs on. Optional
//! collaborators default to inert implementations so a host only wires up
//! what it uses.

use core::fmt;
use std::{rc::Rc, sync::Arc};

use futures::task::LocalSpawn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use stencil_core::{Error, Props, Result, Schema};

use crate::{
    action::Clipboard,
    cache::ComponentCache,
    events::{EventBinder, EventDispatcher, NoopBinder},
    expr::{DefaultEvaluator, Evaluator},
    node::lazy::RendererLoader,
    queue::{RenderQueue, RenderUpdates},
    registry::{self, RendererDescriptor, RendererRegistry, RendererResolver},
    style::{AnimationStyles, StyleRegistry},
    theme::{Theme, ThemeConfig},
};

/// Host switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvConfig {
    /// Attach test-id builders to rendered props.
    pub enable_testid: bool,
    /// Wrap rendered output with debug frames.
    pub enable_debug: bool,
    /// Render for a mobile layout.
    #[serde(rename = "mobileUI")]
    pub mobile_ui: bool,
}

impl EnvConfig {
    /// Parses a configuration document.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Config`] on malformed JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::Config)
    }
}

/// Resolves `$ref` pointers to shared definitions.
pub trait DefinitionResolver {
    /// The definition `pointer` refers to, if it exists.
    fn resolve(&self, pointer: &str) -> Option<Map<String, Value>>;
}

/// Definitions stored in a JSON document and addressed by `#/json/pointer`.
#[derive(Debug, Clone, Default)]
pub struct JsonDefinitions {
    root: Value,
}

impl JsonDefinitions {
    /// Wraps the document that holds the definitions.
    #[must_use]
    pub const fn new(root: Value) -> Self {
        Self { root }
    }
}

impl DefinitionResolver for JsonDefinitions {
    fn resolve(&self, pointer: &str) -> Option<Map<String, Value>> {
        let pointer = pointer.strip_prefix('#').unwrap_or(pointer);
        self.root.pointer(pointer)?.as_object().cloned()
    }
}

/// Shared collaborators of every node in a tree.
pub struct RendererEnv {
    config: EnvConfig,
    registry: Arc<RendererRegistry>,
    resolver: Option<Rc<dyn RendererResolver>>,
    theme: Rc<dyn Theme>,
    evaluator: Rc<dyn Evaluator>,
    loader: Option<Rc<dyn RendererLoader>>,
    binder: Rc<dyn EventBinder>,
    dispatcher: Option<Rc<dyn EventDispatcher>>,
    styles: Rc<dyn AnimationStyles>,
    definitions: Option<Rc<dyn DefinitionResolver>>,
    components: Arc<ComponentCache>,
    clipboard: Option<Rc<dyn Clipboard>>,
    spawner: Rc<dyn LocalSpawn>,
    queue: RenderQueue,
}

impl fmt::Debug for RendererEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererEnv")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("custom_resolver", &self.resolver.is_some())
            .field("loader", &self.loader.is_some())
            .field("dispatcher", &self.dispatcher.is_some())
            .field("definitions", &self.definitions.is_some())
            .field("clipboard", &self.clipboard.is_some())
            .finish_non_exhaustive()
    }
}

impl RendererEnv {
    /// Starts building an environment whose async work runs on `spawner`.
    pub fn builder(spawner: impl LocalSpawn + 'static) -> RendererEnvBuilder {
        RendererEnvBuilder {
            config: EnvConfig::default(),
            registry: None,
            resolver: None,
            theme: None,
            evaluator: None,
            loader: None,
            binder: None,
            dispatcher: None,
            styles: None,
            definitions: None,
            components: None,
            clipboard: None,
            spawner: Rc::new(spawner),
        }
    }

    /// Host switches.
    #[must_use]
    pub const fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// Renderer table.
    #[must_use]
    pub const fn registry(&self) -> &Arc<RendererRegistry> {
        &self.registry
    }

    /// Resolves a renderer, preferring the custom resolver when one is set.
    #[must_use]
    pub fn resolve_renderer(
        &self,
        path: &str,
        schema: &Schema,
        props: &Props,
    ) -> Option<Arc<RendererDescriptor>> {
        match &self.resolver {
            Some(resolver) => resolver.resolve(path, schema, props),
            None => self.registry.resolve(path, schema, props),
        }
    }

    /// Theme.
    #[must_use]
    pub fn theme(&self) -> &dyn Theme {
        &*self.theme
    }

    /// Expression evaluator.
    #[must_use]
    pub fn evaluator(&self) -> &dyn Evaluator {
        &*self.evaluator
    }

    /// Loader for renderers missing from the registry.
    #[must_use]
    pub const fn loader(&self) -> Option<&Rc<dyn RendererLoader>> {
        self.loader.as_ref()
    }

    /// Event binder.
    #[must_use]
    pub fn binder(&self) -> &dyn EventBinder {
        &*self.binder
    }

    /// Event dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> Option<&Rc<dyn EventDispatcher>> {
        self.dispatcher.as_ref()
    }

    /// Animation stylesheets.
    #[must_use]
    pub fn styles(&self) -> &dyn AnimationStyles {
        &*self.styles
    }

    /// Shared definitions for `$ref`.
    #[must_use]
    pub const fn definitions(&self) -> Option<&Rc<dyn DefinitionResolver>> {
        self.definitions.as_ref()
    }

    /// Derived-component cache.
    #[must_use]
    pub const fn components(&self) -> &Arc<ComponentCache> {
        &self.components
    }

    /// Clipboard, if the host provides one.
    #[must_use]
    pub const fn clipboard(&self) -> Option<&Rc<dyn Clipboard>> {
        self.clipboard.as_ref()
    }

    /// Executor for async loads.
    #[must_use]
    pub fn spawner(&self) -> &dyn LocalSpawn {
        &*self.spawner
    }

    /// Render queue.
    #[must_use]
    pub const fn queue(&self) -> &RenderQueue {
        &self.queue
    }
}

/// Builder for [`RendererEnv`].
#[must_use]
pub struct RendererEnvBuilder {
    config: EnvConfig,
    registry: Option<Arc<RendererRegistry>>,
    resolver: Option<Rc<dyn RendererResolver>>,
    theme: Option<Rc<dyn Theme>>,
    evaluator: Option<Rc<dyn Evaluator>>,
    loader: Option<Rc<dyn RendererLoader>>,
    binder: Option<Rc<dyn EventBinder>>,
    dispatcher: Option<Rc<dyn EventDispatcher>>,
    styles: Option<Rc<dyn AnimationStyles>>,
    definitions: Option<Rc<dyn DefinitionResolver>>,
    components: Option<Arc<ComponentCache>>,
    clipboard: Option<Rc<dyn Clipboard>>,
    spawner: Rc<dyn LocalSpawn>,
}

impl fmt::Debug for RendererEnvBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererEnvBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RendererEnvBuilder {
    /// Host switches.
    pub const fn config(mut self, config: EnvConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses `registry` instead of the process-wide one.
    pub fn registry(mut self, registry: Arc<RendererRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replaces registry lookup with a custom resolver.
    pub fn resolver(mut self, resolver: impl RendererResolver + 'static) -> Self {
        self.resolver = Some(Rc::new(resolver));
        self
    }

    /// Theme.
    pub fn theme(mut self, theme: impl Theme + 'static) -> Self {
        self.theme = Some(Rc::new(theme));
        self
    }

    /// Expression evaluator.
    pub fn evaluator(mut self, evaluator: impl Evaluator + 'static) -> Self {
        self.evaluator = Some(Rc::new(evaluator));
        self
    }

    /// Loader for renderers missing from the registry.
    pub fn loader(mut self, loader: impl RendererLoader + 'static) -> Self {
        self.loader = Some(Rc::new(loader));
        self
    }

    /// Event binder.
    pub fn binder(mut self, binder: impl EventBinder + 'static) -> Self {
        self.binder = Some(Rc::new(binder));
        self
    }

    /// Event dispatcher.
    pub fn dispatcher(mut self, dispatcher: impl EventDispatcher + 'static) -> Self {
        self.dispatcher = Some(Rc::new(dispatcher));
        self
    }

    /// Animation stylesheets.
    pub fn styles(mut self, styles: Rc<dyn AnimationStyles>) -> Self {
        self.styles = Some(styles);
        self
    }

    /// Shared definitions for `$ref`.
    pub fn definitions(mut self, definitions: impl DefinitionResolver + 'static) -> Self {
        self.definitions = Some(Rc::new(definitions));
        self
    }

    /// Uses `cache` instead of the process-wide component cache.
    pub fn components(mut self, cache: Arc<ComponentCache>) -> Self {
        self.components = Some(cache);
        self
    }

    /// Clipboard.
    pub fn clipboard(mut self, clipboard: impl Clipboard + 'static) -> Self {
        self.clipboard = Some(Rc::new(clipboard));
        self
    }

    /// Finishes the environment and returns it with the receiving end of its
    /// render queue.
    #[must_use]
    pub fn build(self) -> (Rc<RendererEnv>, RenderUpdates) {
        let (queue, updates) = RenderQueue::unbounded();
        let env = RendererEnv {
            config: self.config,
            registry: self.registry.unwrap_or_else(registry::global),
            resolver: self.resolver,
            theme: self.theme.unwrap_or_else(|| Rc::new(ThemeConfig::new())),
            evaluator: self.evaluator.unwrap_or_else(|| Rc::new(DefaultEvaluator)),
            loader: self.loader,
            binder: self.binder.unwrap_or_else(|| Rc::new(NoopBinder)),
            dispatcher: self.dispatcher,
            styles: self.styles.unwrap_or_else(|| Rc::new(StyleRegistry::new())),
            definitions: self.definitions,
            components: self.components.unwrap_or_else(crate::cache::global),
            clipboard: self.clipboard,
            spawner: self.spawner,
            queue,
        };
        (Rc::new(env), updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_reads_camel_case() {
        let config =
            EnvConfig::from_json(r#"{"enableTestid": true, "mobileUI": true}"#).unwrap();
        assert!(config.enable_testid);
        assert!(config.mobile_ui);
        assert!(!config.enable_debug);
        assert!(matches!(EnvConfig::from_json("{"), Err(Error::Config(_))));
    }

    #[test]
    fn json_pointer_definitions() {
        let defs = JsonDefinitions::new(json!({
            "definitions": {"card": {"type": "card", "title": "T"}}
        }));
        let card = defs.resolve("#/definitions/card").unwrap();
        assert_eq!(card["title"], "T");
        assert!(defs.resolve("#/definitions/missing").is_none());
    }
}
