//! Events flowing through the dispatch subsystem.

use serde_json::Value;

/// An event dispatched on behalf of a renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererEvent {
    name: String,
    data: Value,
    prevented: bool,
    stopped: bool,
}

impl RendererEvent {
    /// Creates an event carrying `data`.
    #[must_use]
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
            prevented: false,
            stopped: false,
        }
    }

    /// Event name, e.g. `click`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Event payload.
    #[must_use]
    pub const fn data(&self) -> &Value {
        &self.data
    }

    /// Suppresses the renderer's default behaviour.
    pub const fn prevent_default(&mut self) {
        self.prevented = true;
    }

    /// Stops further listeners from running.
    pub const fn stop_propagation(&mut self) {
        self.stopped = true;
    }

    /// Whether [`RendererEvent::prevent_default`] was called.
    #[must_use]
    pub const fn is_prevented(&self) -> bool {
        self.prevented
    }

    /// Whether [`RendererEvent::stop_propagation`] was called.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.stopped
    }
}
