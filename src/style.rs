//! Animation stylesheet management.
//!
//! Generating the actual CSS is a host concern; nodes only pair
//! `create_style` on mount with `remove_style` on unmount.

use core::cell::RefCell;
use std::collections::HashMap;

use stencil_core::animation::Animations;

/// Installs and removes per-node animation stylesheets.
pub trait AnimationStyles {
    /// Installs the stylesheet for `id`.
    fn create_style(&self, id: &str, animations: &Animations);
    /// Removes the stylesheet for `id`.
    fn remove_style(&self, id: &str);
}

/// In-memory stylesheet registry.
#[derive(Debug, Default)]
pub struct StyleRegistry {
    styles: RefCell<HashMap<String, Animations>>,
}

impl StyleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a stylesheet is installed for `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.styles.borrow().contains_key(id)
    }

    /// Number of installed stylesheets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.styles.borrow().len()
    }

    /// Whether no stylesheet is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.styles.borrow().is_empty()
    }
}

impl AnimationStyles for StyleRegistry {
    fn create_style(&self, id: &str, animations: &Animations) {
        self.styles
            .borrow_mut()
            .insert(id.to_owned(), animations.clone());
    }

    fn remove_style(&self, id: &str) {
        self.styles.borrow_mut().remove(id);
    }
}
