//! Process-wide cache of derived components.
//!
//! Wrapping a component (for example in a form-item frame) must yield the same
//! wrapped handle every time for the same source, otherwise hosts that key on
//! component identity would remount the subtree on every render.

use std::{
    collections::HashMap,
    sync::{Arc, OnceLock, PoisonError, RwLock},
};

use stencil_core::{ComponentRef, component::component_key};
use tracing::trace;

/// Source component to derived component, keyed by source identity.
#[derive(Debug, Default)]
pub struct ComponentCache {
    // The source handle is kept so its address cannot be reused while cached.
    entries: RwLock<HashMap<usize, (ComponentRef, ComponentRef)>>,
}

impl ComponentCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derived component previously cached for `source`.
    #[must_use]
    pub fn get(&self, source: &ComponentRef) -> Option<ComponentRef> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&component_key(source))
            .map(|(_, derived)| derived.clone())
    }

    /// Returns the cached derivation of `source`, computing it on first use.
    pub fn get_or_insert_with(
        &self,
        source: &ComponentRef,
        derive: impl FnOnce() -> ComponentRef,
    ) -> ComponentRef {
        let key = component_key(source);
        if let Some(derived) = self.get(source) {
            trace!(component = source.name(), "component cache hit");
            return derived;
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry(key)
            .or_insert_with(|| (source.clone(), derive()))
            .1
            .clone()
    }

    /// Number of cached derivations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The process-wide cache.
pub fn global() -> Arc<ComponentCache> {
    static GLOBAL: OnceLock<Arc<ComponentCache>> = OnceLock::new();
    GLOBAL.get_or_init(Arc::default).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stencil_core::{Element, component};

    #[test]
    fn derivation_runs_once_per_source() {
        let cache = ComponentCache::new();
        let source = component("input", |_| Element::Empty);
        let mut calls = 0;
        let first = cache.get_or_insert_with(&source, || {
            calls += 1;
            component("wrapped", |_| Element::Empty)
        });
        let second = cache.get_or_insert_with(&source, || {
            calls += 1;
            component("wrapped", |_| Element::Empty)
        });
        assert_eq!(calls, 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }
}
