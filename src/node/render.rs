//! Turning a resolved node into an [`Element`].

use serde_json::{Map, Value};
use stencil_core::{
    Children, Element, Props, SchemaNode,
    element::{DebugFrame, Transition},
    prop::is_truthy,
};
use tracing::error;

use super::{
    SchemaRenderer,
    lazy::{LazyOutput, LazySlot},
};
use crate::{
    merge::{MergeScope, detect_data},
    visibility::{Presence, is_invisible, presence},
};

/// Ambient properties that never propagate to child nodes.
pub const TRANSMISSION_OMIT_PROPS: &[&str] = &[
    "type",
    "name",
    "$ref",
    "className",
    "style",
    "data",
    "originData",
    "children",
    "ref",
    "visible",
    "loading",
    "visibleOn",
    "hidden",
    "hiddenOn",
    "disabled",
    "disabledOn",
    "static",
    "staticOn",
    "component",
    "detectField",
    "defaultValue",
    "defaultData",
    "required",
    "requiredOn",
    "syncSuperStore",
    "mode",
    "body",
    "id",
    "inputOnly",
    "label",
    "renderLabel",
    "trackExpression",
    "editorSetting",
    "updatePristineAfterStoreDataReInit",
    "source",
];

/// Renderers whose children never inherit a static state.
const NON_STATIC_CONTAINERS: &[&str] = &["drawer", "dialog"];

const STRUCTURAL_KEYS: &[&str] = &["rootStore", "statusStore", "render", "key"];

impl SchemaRenderer {
    /// Renders the node with its current inputs.
    ///
    /// Null and empty schemas render nothing. Lists go back to the host's
    /// `render` callback. Unknown types render a placeholder while the
    /// environment's loader runs.
    #[must_use]
    pub fn render(&self) -> Element {
        if !self.is_alive() {
            return Element::Empty;
        }
        let Some((path, node)) = self.resolve(false) else {
            return Element::Empty;
        };
        let rest = self.cell.state.borrow().props.rest.clone();

        let schema = match node {
            SchemaNode::Schema(schema) => schema,
            list @ SchemaNode::List(_) => {
                return rest
                    .render_child(&path, &list, rest.without(STRUCTURAL_KEYS))
                    .unwrap_or_else(|err| {
                        error!(path, "cannot render schema list: {err}");
                        Element::Empty
                    });
            }
        };

        let env = &self.cell.env;
        let evaluator = env.evaluator();
        let detected = detect_data(&schema, &rest);
        let expr = if is_truthy(&detected) {
            evaluator.expr_properties(&schema, &detected)
        } else {
            Map::new()
        };

        let data = rest.data().cloned().unwrap_or(Value::Null);
        let key = |raw: Option<&str>| {
            raw.map(|raw| evaluator.filter(raw, &data))
                .filter(|key| !key.is_empty())
        };
        let (id, name) = (key(schema.id()), key(schema.name()));
        let overlay = rest
            .status_store()
            .filter(|store| store.is_alive())
            .map(|store| store.lookup(id.as_deref(), name.as_deref()))
            .unwrap_or_default();
        self.cell.state.borrow_mut().is_static = overlay.is_static;

        let invisible = is_invisible(overlay.visible, &expr, &schema, &rest);
        let mut ambient = rest;
        if invisible {
            ambient.insert("invisible", true);
        }
        let callbacks = &self.cell.callbacks;
        let scope = MergeScope {
            path: &path,
            schema: &schema,
            ambient: &ambient,
            expr: &expr,
        };

        if let Some(children) = schema.children() {
            if invisible {
                return Element::Empty;
            }
            return match children {
                Children::Element(element) => (**element).clone(),
                Children::Render(render) => render(&scope.children_props(callbacks)),
            };
        }
        if let Some(component) = schema.component() {
            if invisible {
                return Element::Empty;
            }
            return component.render(&scope.component_props(callbacks));
        }
        if schema.is_empty() {
            return Element::Empty;
        }

        let (renderer, lazy, animation) = {
            let state = self.cell.state.borrow();
            (state.renderer.clone(), state.lazy.clone(), state.animation.clone())
        };

        let Some(descriptor) = renderer else {
            if invisible {
                return Element::Empty;
            }
            return match lazy {
                LazySlot::Idle => self.load_missing(&schema, &path),
                LazySlot::Pending => Element::Pending,
                LazySlot::Ready(LazyOutput::Component(component)) => {
                    component.render(&scope.component_props(callbacks))
                }
                LazySlot::Ready(LazyOutput::Element(element)) => element,
                LazySlot::Ready(LazyOutput::Failed(unresolved)) => Element::Unresolved(unresolved),
            };
        };

        if descriptor.is_pending() {
            if invisible {
                return Element::Empty;
            }
            return match lazy {
                LazySlot::Idle => self.load_async(descriptor, &schema, &path),
                LazySlot::Ready(LazyOutput::Failed(unresolved)) => Element::Unresolved(unresolved),
                _ => Element::Empty,
            };
        }
        let Some(component) = descriptor.component().cloned() else {
            return Element::Empty;
        };

        let shown = match presence(
            invisible,
            &expr,
            &schema,
            descriptor.is_form_item(),
            animation.is_some(),
        ) {
            Presence::Absent => return Element::Empty,
            Presence::AnimateOut => false,
            Presence::Render => true,
        };

        let props = scope.renderer_props(env, &descriptor, overlay, callbacks);
        let mut output = component.render(&props);

        if let Some(meta) = animation {
            output = Element::Transition(Box::new(Transition {
                visible: shown,
                timeout: meta.timeout,
                class_names: meta.class_names,
                attention_class: meta.attention_class,
                child: output,
            }));
        }
        if env.config().enable_debug {
            output = Element::Debug(Box::new(DebugFrame {
                renderer: descriptor.name().to_owned(),
                child: output,
            }));
        }
        output
    }

    /// Ambient props of this node and the props its child receives.
    pub(super) fn child_props(&self, sub_props: Props) -> (Props, Props) {
        let (ambient, schema, renderer, is_static) = {
            let state = self.cell.state.borrow();
            (
                state.props.rest.clone(),
                state.props.schema.as_ref().and_then(SchemaNode::as_schema).cloned(),
                state.renderer.clone(),
                state.is_static,
            )
        };

        let mut omit: Vec<&str> = TRANSMISSION_OMIT_PROPS.to_vec();
        omit.push("render");
        if let Some(component) = renderer.as_ref().and_then(|r| r.component()) {
            omit.extend_from_slice(component.props_list());
        }
        let mut props = ambient.without(&omit);

        let data = ambient.data().cloned().unwrap_or(Value::Null);
        let default_static = renderer
            .as_ref()
            .filter(|r| NON_STATIC_CONTAINERS.contains(&r.type_name()))
            .map(|_| Value::Bool(false))
            .or_else(|| is_static.map(Value::Bool))
            .or_else(|| {
                let schema = schema.as_ref()?;
                match schema.static_on() {
                    Some(expr) => Some(Value::Bool(
                        self.cell.env.evaluator().eval_expression(expr, &data),
                    )),
                    None => schema
                        .get("static")
                        .cloned()
                        .or_else(|| ambient.value("defaultStatic").cloned()),
                }
            });
        if let Some(default_static) = default_static {
            props.insert("defaultStatic", default_static);
        }

        let sub_data = sub_props.get("data").cloned();
        props.extend(sub_props);
        match sub_data.or_else(|| ambient.get("data").cloned()) {
            Some(data) => props.insert("data", data),
            None => props.remove("data"),
        };
        (ambient, props)
    }
}
