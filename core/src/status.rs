//! Overlay status store.
//!
//! Three keyed maps (`visible`, `disable`, `static`) that override what a
//! schema declares. Keys are a node's resolved `id`, falling back to its
//! `name`. The store is owned by the host; nodes only read it and subscribe to
//! the slice relevant to them.

use core::{cell::{Cell, RefCell}, fmt};
use std::{collections::HashMap, rc::Rc};

use nami::{Binding, Computed, Signal, SignalExt, binding, watcher::BoxWatcherGuard};

type OverlayMap = HashMap<String, bool>;

/// Overlay flags resolved for one node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayFlags {
    /// Forced visibility.
    pub visible: Option<bool>,
    /// Forced disabled state.
    pub disabled: Option<bool>,
    /// Forced static (read-only display) state.
    pub is_static: Option<bool>,
}

/// Which overlay map to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Overlay {
    /// `visibleState`.
    Visible,
    /// `disableState`.
    Disable,
    /// `staticState`.
    Static,
}

fn pick(map: &OverlayMap, id: Option<&str>, name: Option<&str>) -> Option<bool> {
    id.and_then(|id| map.get(id).copied())
        .or_else(|| name.and_then(|name| map.get(name).copied()))
}

/// Host-owned overlay state.
pub struct StatusStore {
    visible: Binding<OverlayMap>,
    disable: Binding<OverlayMap>,
    statics: Binding<OverlayMap>,
    destroyed: Rc<Cell<bool>>,
    watchers: Rc<Cell<usize>>,
}

impl Default for StatusStore {
    fn default() -> Self {
        Self {
            visible: binding(OverlayMap::new()),
            disable: binding(OverlayMap::new()),
            statics: binding(OverlayMap::new()),
            destroyed: Rc::default(),
            watchers: Rc::default(),
        }
    }
}

impl fmt::Debug for StatusStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusStore")
            .field("visible", &self.visible.get())
            .field("disable", &self.disable.get())
            .field("static", &self.statics.get())
            .field("alive", &self.is_alive())
            .field("watchers", &self.watchers.get())
            .finish()
    }
}

impl StatusStore {
    /// Creates an empty, live store.
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Whether the store may still be read.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.destroyed.get()
    }

    /// Tears the store down. Reads return nothing afterwards and watchers are
    /// no longer notified.
    pub fn destroy(&self) {
        self.destroyed.set(true);
    }

    const fn map(&self, overlay: Overlay) -> &Binding<OverlayMap> {
        match overlay {
            Overlay::Visible => &self.visible,
            Overlay::Disable => &self.disable,
            Overlay::Static => &self.statics,
        }
    }

    /// Reads one overlay entry.
    #[must_use]
    pub fn get(&self, overlay: Overlay, key: &str) -> Option<bool> {
        if !self.is_alive() {
            return None;
        }
        self.map(overlay).get().get(key).copied()
    }

    /// Writes (or clears, with `None`) one overlay entry. Watchers whose
    /// resolved flags changed are notified.
    pub fn set(&self, overlay: Overlay, key: impl Into<String>, value: Option<bool>) {
        if !self.is_alive() {
            return;
        }
        let entries = self.map(overlay);
        let mut map = entries.get();
        let key = key.into();
        let changed = match value {
            Some(value) => map.insert(key, value) != Some(value),
            None => map.remove(&key).is_some(),
        };
        if changed {
            entries.set(map);
        }
    }

    /// Shorthand for `set(Overlay::Visible, ..)`.
    pub fn set_visible(&self, key: impl Into<String>, value: Option<bool>) {
        self.set(Overlay::Visible, key, value);
    }

    /// Shorthand for `set(Overlay::Disable, ..)`.
    pub fn set_disabled(&self, key: impl Into<String>, value: Option<bool>) {
        self.set(Overlay::Disable, key, value);
    }

    /// Shorthand for `set(Overlay::Static, ..)`.
    pub fn set_static(&self, key: impl Into<String>, value: Option<bool>) {
        self.set(Overlay::Static, key, value);
    }

    /// Resolves all three flags for a node; the `id` entry wins over `name`.
    #[must_use]
    pub fn lookup(&self, id: Option<&str>, name: Option<&str>) -> OverlayFlags {
        if !self.is_alive() {
            return OverlayFlags::default();
        }
        OverlayFlags {
            visible: pick(&self.visible.get(), id, name),
            disabled: pick(&self.disable.get(), id, name),
            is_static: pick(&self.statics.get(), id, name),
        }
    }

    /// The flags for `(id, name)` as a signal over the three overlay maps.
    #[must_use]
    pub fn flags(&self, id: Option<String>, name: Option<String>) -> Computed<OverlayFlags> {
        self.visible
            .clone()
            .zip(self.disable.clone())
            .zip(self.statics.clone())
            .map(move |((visible, disable), statics)| OverlayFlags {
                visible: pick(&visible, id.as_deref(), name.as_deref()),
                disabled: pick(&disable, id.as_deref(), name.as_deref()),
                is_static: pick(&statics, id.as_deref(), name.as_deref()),
            })
            .computed()
    }

    /// Calls `notify` whenever the flags resolved for `(id, name)` change.
    pub fn watch(
        &self,
        id: Option<String>,
        name: Option<String>,
        notify: impl Fn() + 'static,
    ) -> Subscription {
        let flags = self.flags(id, name);
        let last = RefCell::new(flags.get());
        let destroyed = self.destroyed.clone();
        let guard = flags.watch(move |context| {
            let current = context.into_value();
            if destroyed.get() {
                return;
            }
            let changed = *last.borrow() != current;
            if changed {
                *last.borrow_mut() = current;
                notify();
            }
        });
        self.watchers.set(self.watchers.get() + 1);
        Subscription {
            _guard: guard,
            _flags: flags,
            watchers: self.watchers.clone(),
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn watcher_count(&self) -> usize {
        self.watchers.get()
    }
}

/// Interest in one node's overlay flags. Dropping it unsubscribes.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    _guard: BoxWatcherGuard,
    _flags: Computed<OverlayFlags>,
    watchers: Rc<Cell<usize>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

impl Subscription {
    /// Unsubscribes.
    pub fn dispose(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.watchers.set(self.watchers.get().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_entry_wins_over_name_entry() {
        let store = StatusStore::new();
        store.set_visible("field", Some(true));
        store.set_visible("f1", Some(false));
        let flags = store.lookup(Some("f1"), Some("field"));
        assert_eq!(flags.visible, Some(false));
        let flags = store.lookup(Some("other"), Some("field"));
        assert_eq!(flags.visible, Some(true));
    }

    #[test]
    fn watchers_fire_only_on_relevant_changes() {
        let store = StatusStore::new();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let sub = store.watch(Some("a".into()), None, move || counter.set(counter.get() + 1));

        store.set_disabled("b", Some(true));
        assert_eq!(hits.get(), 0);
        store.set_disabled("a", Some(true));
        assert_eq!(hits.get(), 1);
        store.set_disabled("a", Some(true));
        assert_eq!(hits.get(), 1);

        sub.dispose();
        assert_eq!(store.watcher_count(), 0);
        store.set_disabled("a", None);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn flag_signal_follows_writes() {
        let store = StatusStore::new();
        let flags = store.flags(Some("a".into()), Some("field".into()));
        assert_eq!(flags.get(), OverlayFlags::default());
        store.set_visible("field", Some(false));
        store.set_static("a", Some(true));
        assert_eq!(
            flags.get(),
            OverlayFlags {
                visible: Some(false),
                disabled: None,
                is_static: Some(true),
            }
        );
    }

    #[test]
    fn destroyed_store_stops_notifying() {
        let store = StatusStore::new();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let _sub = store.watch(Some("a".into()), None, move || counter.set(counter.get() + 1));
        store.destroy();
        store.set_visible("a", Some(false));
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn destroyed_store_reads_nothing() {
        let store = StatusStore::new();
        store.set_static("a", Some(true));
        store.destroy();
        assert_eq!(store.lookup(Some("a"), None), OverlayFlags::default());
    }
}
