//! Form-item wrapping of embedded components.

use std::sync::Arc;

use serde_json::{Map, Value};
use stencil_core::{Component, ComponentRef, Element, Props, Widget};

use crate::cache::ComponentCache;

/// Properties the frame itself reads from the wrapped component's props.
const FRAME_PROPS: &[&str] = &["label", "name", "required", "description", "remark"];

/// Frames another component as a form item.
#[derive(Debug)]
pub struct FormItemWrapper {
    inner: ComponentRef,
    config: Map<String, Value>,
}

impl FormItemWrapper {
    /// Wraps `inner`. `config` is the schema's `asFormItem` object, if any.
    #[must_use]
    pub const fn new(inner: ComponentRef, config: Map<String, Value>) -> Self {
        Self { inner, config }
    }

    /// The wrapped component.
    #[must_use]
    pub const fn inner(&self) -> &ComponentRef {
        &self.inner
    }
}

impl Component for FormItemWrapper {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn render(&self, props: &Props) -> Element {
        let mut frame = Props::from_map(&self.config);
        for key in FRAME_PROPS {
            if let Some(prop) = props.get(key) {
                frame.insert(*key, prop.clone());
            }
        }
        Element::Widget(Widget {
            kind: "form-item".to_owned(),
            props: frame,
            children: vec![self.inner.render(props)],
        })
    }

    fn props_list(&self) -> &[&'static str] {
        self.inner.props_list()
    }

    fn is_form_item_wrapper(&self) -> bool {
        true
    }
}

/// Wraps `component` as a form item, reusing the cached wrapper when the same
/// component was wrapped before. Already wrapped components are returned as is.
pub fn as_form_item(
    component: &ComponentRef,
    request: &Value,
    cache: &ComponentCache,
) -> ComponentRef {
    if component.is_form_item_wrapper() {
        return component.clone();
    }
    cache.get_or_insert_with(component, || {
        let config = request.as_object().cloned().unwrap_or_default();
        Arc::new(FormItemWrapper::new(component.clone(), config))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stencil_core::component;

    #[test]
    fn wraps_once_and_is_idempotent() {
        let cache = ComponentCache::new();
        let input = component("input", |props| Element::widget("input", props.clone()));

        let wrapped = as_form_item(&input, &json!(true), &cache);
        assert!(wrapped.is_form_item_wrapper());
        assert!(Arc::ptr_eq(&wrapped, &as_form_item(&input, &json!(true), &cache)));
        assert!(Arc::ptr_eq(&wrapped, &as_form_item(&wrapped, &json!(true), &cache)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn frame_carries_label_and_config() {
        let cache = ComponentCache::new();
        let input = component("input", |props| Element::widget("input", props.clone()));
        let wrapped = as_form_item(&input, &json!({"mode": "horizontal"}), &cache);

        let output = wrapped.render(&Props::new().with("label", "Name").with("value", "x"));
        let frame = output.as_widget().unwrap();
        assert_eq!(frame.kind, "form-item");
        assert_eq!(frame.props.str("label"), Some("Name"));
        assert_eq!(frame.props.str("mode"), Some("horizontal"));
        assert!(!frame.props.contains_key("value"));
        assert_eq!(frame.children[0].as_widget().unwrap().props.str("value"), Some("x"));
    }
}
