//! Update gate.
//!
//! A shallow check deciding whether new node inputs warrant a re-render. Only
//! reference identity (or literal equality) is compared, never nested
//! contents: callers signal a change by replacing the reference.

use tracing::trace;

use crate::node::NodeProps;

/// Whether moving from `prev` to `next` requires a render.
///
/// The ambient properties are compared first, ignoring the schema and scope.
/// When they match, the schema's own keys are compared.
#[must_use]
pub fn should_update(prev: &NodeProps, next: &NodeProps) -> bool {
    let ambient_changed = prev.path != next.path
        || prev.rest.len() != next.rest.len()
        || next.rest.keys().any(|key| !prev.rest.same_at(&next.rest, key));
    if ambient_changed {
        trace!(path = next.path, "update: ambient props changed");
        return true;
    }

    let schema_changed = match (&prev.schema, &next.schema) {
        (None, None) => false,
        (Some(prev), Some(next)) => {
            let keys = next.keys();
            prev.keys().len() != keys.len() || keys.iter().any(|key| !prev.same_at(next, key))
        }
        _ => true,
    };
    trace!(path = next.path, update = schema_changed, "update gate");
    schema_changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use serde_json::json;
    use stencil_core::{Prop, Schema, SchemaNode};

    fn node(schema: &Rc<Schema>) -> NodeProps {
        NodeProps::new(SchemaNode::Schema(schema.clone()), "page/body/0")
    }

    #[test]
    fn equal_values_do_not_update() {
        let schema = Rc::new(Schema::from_value(json!({"type": "text"})).unwrap());
        let data = Rc::new(json!({"a": 1}));
        let prev = node(&schema).with("data", data.clone()).with("label", "x");
        let next = node(&schema).with("data", data).with("label", "x");
        assert!(!should_update(&prev, &next));
    }

    #[test]
    fn changed_values_update() {
        let schema = Rc::new(Schema::from_value(json!({"type": "text"})).unwrap());
        let prev = node(&schema).with("label", "x");
        assert!(should_update(&prev, &node(&schema).with("label", "y")));
        assert!(should_update(&prev, &node(&schema).with("label", "x").with("extra", true)));
    }

    #[test]
    fn data_is_compared_by_identity() {
        let schema = Rc::new(Schema::from_value(json!({"type": "text"})).unwrap());
        let prev = node(&schema).with("data", Rc::new(json!({"a": 1})));
        let next = node(&schema).with("data", Rc::new(json!({"a": 1})));
        assert!(should_update(&prev, &next));
    }

    #[test]
    fn scope_is_ignored() {
        let schema = Rc::new(Schema::from_value(json!({"type": "text"})).unwrap());
        let prev = node(&schema).scope(Prop::Store(Rc::new(1_u8)));
        let next = node(&schema).scope(Prop::Store(Rc::new(2_u8)));
        assert!(!should_update(&prev, &next));
    }

    #[test]
    fn schema_members_are_compared_shallowly() {
        let a = Rc::new(Schema::from_value(json!({"type": "text", "label": "x"})).unwrap());
        let b = Rc::new(Schema::from_value(json!({"type": "text", "label": "x"})).unwrap());
        let c = Rc::new(Schema::from_value(json!({"type": "text", "label": "y"})).unwrap());
        let d = Rc::new(Schema::from_value(json!({"type": "text"})).unwrap());
        assert!(!should_update(&node(&a), &node(&b)));
        assert!(should_update(&node(&a), &node(&c)));
        assert!(should_update(&node(&a), &node(&d)));
    }
}
