//! Placeholder that renders children moved aside by form-item wrapping.

use std::sync::{Arc, OnceLock};

use stencil_core::{Children, Component, ComponentRef, Element, Prop, Props};

/// Renders the `renderChildren` property with the remaining props.
#[derive(Debug, Default)]
pub struct PlaceholderComponent;

impl Component for PlaceholderComponent {
    fn name(&self) -> &'static str {
        "placeholder"
    }

    fn render(&self, props: &Props) -> Element {
        match props.get("renderChildren") {
            Some(Prop::Children(Children::Render(render))) => {
                render(&props.without(&["renderChildren"]))
            }
            Some(Prop::Children(Children::Element(element))) => (**element).clone(),
            _ => Element::Empty,
        }
    }
}

/// The shared placeholder handle. The handle is stable for the whole process,
/// so wrapping it goes through the component cache like any other component.
pub fn placeholder() -> ComponentRef {
    static PLACEHOLDER: OnceLock<ComponentRef> = OnceLock::new();
    PLACEHOLDER
        .get_or_init(|| Arc::new(PlaceholderComponent))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_function_children_without_itself() {
        let children = Children::render(|props| {
            assert!(!props.contains_key("renderChildren"));
            Element::Text(props.str("label").unwrap_or_default().to_owned())
        });
        let props = Props::new()
            .with("label", "hello")
            .with("renderChildren", children);
        let Element::Text(text) = placeholder().render(&props) else {
            panic!("expected text");
        };
        assert_eq!(text, "hello");
    }

    #[test]
    fn handle_is_stable() {
        assert!(Arc::ptr_eq(&placeholder(), &placeholder()));
    }
}
