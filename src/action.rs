//! Renderer actions.
//!
//! Actions are the side effects event handlers trigger (`actionType` plus
//! `args`). Only the built-ins the renderer core depends on live here; hosts
//! register the rest.

use std::{collections::HashMap, rc::Rc};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use stencil_core::{Error, RendererEvent, Result};
use tracing::{debug, warn};

use crate::env::RendererEnv;

/// Default MIME type of copied content.
pub const DEFAULT_COPY_FORMAT: &str = "text/html";

/// Options for [`Clipboard::copy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOptions {
    /// MIME type of the content.
    pub format: String,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            format: DEFAULT_COPY_FORMAT.to_owned(),
        }
    }
}

/// Host clipboard.
pub trait Clipboard {
    /// Copies `content`.
    ///
    /// # Errors
    ///
    /// Implementation-defined.
    fn copy(&self, content: &str, options: &CopyOptions) -> Result<()>;
}

/// An action as declared in a schema's event listeners.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenerAction {
    /// Registered action name, e.g. `copy`.
    pub action_type: String,
    /// Action arguments.
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl ListenerAction {
    /// An action with no arguments.
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            args: Map::new(),
        }
    }

    /// Adds an argument.
    #[must_use]
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }
}

/// An executable action.
pub trait RendererAction {
    /// Runs `action` in `env` on behalf of `event`.
    ///
    /// # Errors
    ///
    /// [`Error::MissingCollaborator`] when the environment lacks something the
    /// action cannot work without.
    fn run(&self, action: &ListenerAction, env: &RendererEnv, event: &mut RendererEvent)
    -> Result<()>;
}

/// Copies `args.content` to the host clipboard.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyAction;

impl RendererAction for CopyAction {
    fn run(
        &self,
        action: &ListenerAction,
        env: &RendererEnv,
        event: &mut RendererEvent,
    ) -> Result<()> {
        let Some(clipboard) = env.clipboard() else {
            return Err(Error::MissingCollaborator("env.copy"));
        };
        let content = match action.args.get("content") {
            Some(Value::String(template)) => env.evaluator().filter(template, event.data()),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        if content.is_empty() {
            debug!("copy action without content");
            return Ok(());
        }
        let format = action
            .args
            .get("copyFormat")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_COPY_FORMAT)
            .to_owned();
        clipboard.copy(&content, &CopyOptions { format })
    }
}

/// Actions by `actionType`.
#[derive(Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Rc<dyn RendererAction>>,
}

impl core::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.actions.keys()).finish()
    }
}

impl ActionRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in actions.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("copy", CopyAction);
        registry
    }

    /// Registers `action` under `name`; a later registration wins.
    pub fn register(&mut self, name: impl Into<String>, action: impl RendererAction + 'static) {
        self.actions.insert(name.into(), Rc::new(action));
    }

    /// Runs `action`. Unknown action types are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Whatever the action reports.
    pub fn run(
        &self,
        action: &ListenerAction,
        env: &RendererEnv,
        event: &mut RendererEvent,
    ) -> Result<()> {
        match self.actions.get(&action.action_type) {
            Some(handler) => handler.run(action, env, event),
            None => {
                warn!(action = action.action_type, "unknown action type");
                Ok(())
            }
        }
    }
}

/// The system clipboard, via `arboard`. Failures are logged, not returned.
#[cfg(feature = "clipboard")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClipboard;

#[cfg(feature = "clipboard")]
impl Clipboard for SystemClipboard {
    fn copy(&self, content: &str, options: &CopyOptions) -> Result<()> {
        match arboard::Clipboard::new() {
            Ok(mut clipboard) => {
                let result = if options.format == "text/plain" {
                    clipboard.set_text(content)
                } else {
                    clipboard.set_html(content, None::<&str>)
                };
                if let Err(err) = result {
                    tracing::error!("Failed to copy to clipboard: {err}");
                }
            }
            Err(err) => tracing::error!("Failed to access clipboard: {err}"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;

    use futures::executor::LocalPool;
    use serde_json::json;

    #[derive(Default)]
    struct Recorder(Rc<RefCell<Vec<(String, String)>>>);

    impl Clipboard for Recorder {
        fn copy(&self, content: &str, options: &CopyOptions) -> Result<()> {
            self.0
                .borrow_mut()
                .push((content.to_owned(), options.format.clone()));
            Ok(())
        }
    }

    #[test]
    fn copy_without_clipboard_fails_loudly() {
        let pool = LocalPool::new();
        let (env, _updates) = RendererEnv::builder(pool.spawner()).build();
        let action = ListenerAction::new("copy").arg("content", "hello");
        let mut event = RendererEvent::new("click", json!({}));
        let err = ActionRegistry::with_builtins()
            .run(&action, &env, &mut event)
            .unwrap_err();
        assert!(matches!(err, Error::MissingCollaborator("env.copy")));
        assert_eq!(err.to_string(), "env.copy is required!");
    }

    #[test]
    fn copy_interpolates_content() {
        let pool = LocalPool::new();
        let copied = Rc::new(RefCell::new(Vec::new()));
        let (env, _updates) = RendererEnv::builder(pool.spawner())
            .clipboard(Recorder(copied.clone()))
            .build();
        let action: ListenerAction = serde_json::from_value(json!({
            "actionType": "copy",
            "args": {"content": "order ${id}", "copyFormat": "text/plain"}
        }))
        .unwrap();
        let mut event = RendererEvent::new("click", json!({"id": 42}));
        ActionRegistry::with_builtins()
            .run(&action, &env, &mut event)
            .unwrap();
        assert_eq!(
            *copied.borrow(),
            [("order 42".to_owned(), "text/plain".to_owned())]
        );
    }

    #[test]
    fn unknown_actions_are_skipped() {
        let pool = LocalPool::new();
        let (env, _updates) = RendererEnv::builder(pool.spawner()).build();
        let mut event = RendererEvent::new("click", Value::Null);
        assert!(
            ActionRegistry::with_builtins()
                .run(&ListenerAction::new("toast"), &env, &mut event)
                .is_ok()
        );
    }
}
