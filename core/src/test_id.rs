//! Test-id instrumentation.

use core::fmt;

/// Attribute name used for test ids.
pub const TEST_ID_ATTR: &str = "data-testid";

/// Builds hierarchical test ids (`parent-child`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestIdBuilder {
    test_id: Option<String>,
}

impl TestIdBuilder {
    /// Creates a builder rooted at `test_id`.
    #[must_use]
    pub const fn new(test_id: Option<String>) -> Self {
        Self { test_id }
    }

    /// The id this builder produces.
    #[must_use]
    pub fn test_id(&self) -> Option<&str> {
        self.test_id.as_deref()
    }

    /// Builder for a nested element.
    #[must_use]
    pub fn child(&self, suffix: impl fmt::Display) -> Self {
        Self {
            test_id: self.test_id.as_ref().map(|parent| format!("{parent}-{suffix}")),
        }
    }

    /// The `data-testid` attribute pair, if an id is set.
    #[must_use]
    pub fn attr(&self) -> Option<(&'static str, &str)> {
        self.test_id().map(|id| (TEST_ID_ATTR, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_extend_the_parent_id() {
        let table = TestIdBuilder::new(Some("orders".into()));
        let cell = table.child("row").child(3);
        assert_eq!(cell.attr(), Some((TEST_ID_ATTR, "orders-row-3")));
    }

    #[test]
    fn anonymous_builders_stay_anonymous() {
        let builder = TestIdBuilder::default().child("cell");
        assert_eq!(builder.attr(), None);
    }
}
