//! Visibility resolution.
//!
//! Legacy `hidden: true` / `visible: false` flags keep a hidden form item
//! registered (value and validation stay active) while the `hiddenOn` /
//! `visibleOn` expressions remove it entirely. Both behaviours are kept.

use serde_json::{Map, Value};
use stencil_core::{Props, Schema, prop::is_truthy};

fn hidden_by(hidden: Option<&Value>, visible: Option<&Value>) -> bool {
    hidden.is_some_and(is_truthy) || visible == Some(&Value::Bool(false))
}

/// Whether a node is invisible.
///
/// An explicit overlay value decides on its own. Without one the node is
/// invisible when the computed expressions, the schema's legacy flags or the
/// inherited properties hide it.
#[must_use]
pub fn is_invisible(
    overlay: Option<bool>,
    expr: &Map<String, Value>,
    schema: &Schema,
    ambient: &Props,
) -> bool {
    match overlay {
        Some(visible) => !visible,
        None => {
            hidden_by(expr.get("hidden"), expr.get("visible"))
                || schema.is_hidden()
                || schema.is_visible_false()
                || hidden_by(ambient.value("hidden"), ambient.value("visible"))
                || ambient.is_truthy("invisible")
        }
    }
}

/// What an invisible node renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Rendered normally (possibly with `invisible: true`).
    Render,
    /// Rendered with exit-animation intent.
    AnimateOut,
    /// Not rendered at all.
    Absent,
}

/// Decides how a resolved renderer is presented.
///
/// A form item hidden only through legacy schema flags is still rendered so
/// that it stays registered; the component receives `invisible: true`.
#[must_use]
pub fn presence(
    invisible: bool,
    expr: &Map<String, Value>,
    schema: &Schema,
    is_form_item: bool,
    animated: bool,
) -> Presence {
    let removed = invisible
        && (hidden_by(expr.get("hidden"), expr.get("visible"))
            || !is_form_item
            || (!schema.is_visible_false() && !schema.is_hidden()));
    match (removed, animated) {
        (false, _) => Presence::Render,
        (true, true) => Presence::AnimateOut,
        (true, false) => Presence::Absent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(value: Value) -> Schema {
        Schema::from_value(value).unwrap()
    }

    fn expr(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn explicit_overlay_wins() {
        let hidden = expr(json!({"hidden": true}));
        let plain = schema(json!({"type": "text", "id": "A"}));
        assert!(is_invisible(Some(false), &Map::new(), &plain, &Props::new()));
        assert!(!is_invisible(Some(true), &hidden, &plain, &Props::new()));
        assert!(is_invisible(None, &hidden, &plain, &Props::new()));
    }

    #[test]
    fn legacy_flags_and_inherited_flags_hide() {
        let legacy = schema(json!({"type": "text", "visible": false}));
        assert!(is_invisible(None, &Map::new(), &legacy, &Props::new()));
        let plain = schema(json!({"type": "text"}));
        let inherited = Props::new().with("hidden", true);
        assert!(is_invisible(None, &Map::new(), &plain, &inherited));
        assert!(!is_invisible(None, &Map::new(), &plain, &Props::new()));
    }

    #[test]
    fn legacy_hidden_form_items_stay_present() {
        let legacy = schema(json!({"type": "input-text", "hidden": true}));
        assert_eq!(presence(true, &Map::new(), &legacy, true, false), Presence::Render);
        assert_eq!(presence(true, &Map::new(), &legacy, false, false), Presence::Absent);

        let by_expr = schema(json!({"type": "input-text", "hiddenOn": "${x}"}));
        let computed = expr(json!({"hidden": true}));
        assert_eq!(presence(true, &computed, &by_expr, true, false), Presence::Absent);
        assert_eq!(presence(true, &computed, &by_expr, true, true), Presence::AnimateOut);
    }
}
