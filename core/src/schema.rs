//! Schema nodes.
//!
//! A [`Schema`] is the declarative description of one UI element: a JSON
//! object whose `type` selects the renderer, plus the few things JSON cannot
//! carry (inline children, an embedded component, event handlers).

use core::fmt;
use std::{collections::BTreeMap, rc::Rc, sync::Arc};

use serde_json::{Map, Value};
use tracing::warn;

use crate::{
    Element, Result,
    animation::Animations,
    component::ComponentRef,
    error::Error,
    prop::{EventHandler, Props, is_truthy},
};

/// Shared handle to a schema node.
pub type SchemaRef = Rc<Schema>;

/// Function-as-child renderer.
pub type ChildrenFn = Rc<dyn Fn(&Props) -> Element>;

/// `detectField` marker selecting the whole ambient property bag.
pub const DETECT_WHOLE_CONTEXT: &str = "&";

/// Key of the framework-assigned internal id.
pub const INTERNAL_ID_KEY: &str = "$$id";

/// Inline children of a schema node.
#[derive(Clone)]
pub enum Children {
    /// An already rendered element.
    Element(Rc<Element>),
    /// A function receiving the node's properties.
    Render(ChildrenFn),
}

impl Children {
    /// Wraps a closure as function-as-child.
    pub fn render(f: impl Fn(&Props) -> Element + 'static) -> Self {
        Self::Render(Rc::new(f))
    }

    /// Identity comparison.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Element(a), Self::Element(b)) => Rc::ptr_eq(a, b),
            (Self::Render(a), Self::Render(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Children {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(element) => f.debug_tuple("Element").field(element).finish(),
            Self::Render(_) => f.write_str("Render(..)"),
        }
    }
}

/// One declarative UI node.
#[derive(Clone, Default)]
pub struct Schema {
    props: Map<String, Value>,
    children: Option<Children>,
    render_children: Option<Children>,
    component: Option<ComponentRef>,
    handlers: BTreeMap<String, EventHandler>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a schema from literal properties.
    #[must_use]
    pub fn from_map(props: Map<String, Value>) -> Self {
        Self {
            props,
            ..Self::default()
        }
    }

    /// Parses a schema from a JSON value.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidSchema`] when `value` is not an object.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value::<Map<String, Value>>(value)
            .map(Self::from_map)
            .map_err(Error::InvalidSchema)
    }

    /// Sets a literal property.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Sets inline children.
    #[must_use]
    pub fn with_children(mut self, children: Children) -> Self {
        self.children = Some(children);
        self
    }

    /// Embeds a component directly, bypassing registry resolution.
    #[must_use]
    pub fn with_component(mut self, component: ComponentRef) -> Self {
        self.component = Some(component);
        self
    }

    /// Declares an event handler, e.g. `onClick`.
    #[must_use]
    pub fn on(mut self, event: impl Into<String>, handler: EventHandler) -> Self {
        self.handlers.insert(event.into(), handler);
        self
    }

    /// Assigns a fresh internal id unless one is already present.
    #[must_use]
    pub fn with_internal_id(mut self) -> Self {
        self.props
            .entry(INTERNAL_ID_KEY)
            .or_insert_with(|| Value::String(uuid::Uuid::new_v4().simple().to_string()));
        self
    }

    /// Literal properties.
    #[must_use]
    pub const fn props(&self) -> &Map<String, Value> {
        &self.props
    }

    /// Literal property lookup.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    fn str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(Value::as_str)
    }

    /// Type discriminator.
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        self.str("type")
    }

    /// `id` identity key (possibly a template).
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.str("id")
    }

    /// `name` identity key (possibly a template).
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.str("name")
    }

    /// Framework-assigned internal id.
    #[must_use]
    pub fn internal_id(&self) -> Option<&str> {
        self.str(INTERNAL_ID_KEY)
    }

    /// `$ref` pointer to a shared definition.
    #[must_use]
    pub fn ref_pointer(&self) -> Option<&str> {
        self.str("$ref")
    }

    /// Field of the ambient props used as detection data.
    #[must_use]
    pub fn detect_field(&self) -> Option<&str> {
        self.str("detectField")
    }

    /// `style` object, when declared and truthy.
    #[must_use]
    pub fn style(&self) -> Option<&Value> {
        self.props.get("style").filter(|style| is_truthy(style))
    }

    /// `asFormItem` request, when truthy.
    #[must_use]
    pub fn as_form_item(&self) -> Option<&Value> {
        self.props.get("asFormItem").filter(|value| is_truthy(value))
    }

    /// `staticOn` expression.
    #[must_use]
    pub fn static_on(&self) -> Option<&str> {
        self.str("staticOn").filter(|expr| !expr.is_empty())
    }

    /// Legacy `hidden: true` flag.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.props.get("hidden").is_some_and(is_truthy)
    }

    /// Legacy `visible: false` flag.
    #[must_use]
    pub fn is_visible_false(&self) -> bool {
        self.props.get("visible") == Some(&Value::Bool(false))
    }

    /// Parsed `animations` descriptor.
    #[must_use]
    pub fn animations(&self) -> Option<Animations> {
        let raw = self.props.get("animations").filter(|value| is_truthy(value))?;
        match serde_json::from_value(raw.clone()) {
            Ok(animations) => Some(animations),
            Err(err) => {
                warn!(id = self.id(), "ignoring malformed animations: {err}");
                None
            }
        }
    }

    /// Inline children.
    #[must_use]
    pub const fn children(&self) -> Option<&Children> {
        self.children.as_ref()
    }

    /// Children moved aside for a placeholder component.
    #[must_use]
    pub const fn render_children(&self) -> Option<&Children> {
        self.render_children.as_ref()
    }

    /// Embedded component.
    #[must_use]
    pub const fn component(&self) -> Option<&ComponentRef> {
        self.component.as_ref()
    }

    /// Declared event handlers.
    #[must_use]
    pub const fn handlers(&self) -> &BTreeMap<String, EventHandler> {
        &self.handlers
    }

    /// Whether the node carries nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
            && self.children.is_none()
            && self.render_children.is_none()
            && self.component.is_none()
            && self.handlers.is_empty()
    }

    /// Own keys, including the non-JSON members.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.props
            .keys()
            .map(String::as_str)
            .chain(self.children.as_ref().map(|_| "children"))
            .chain(self.render_children.as_ref().map(|_| "renderChildren"))
            .chain(self.component.as_ref().map(|_| "component"))
            .chain(self.handlers.keys().map(String::as_str))
    }

    /// Shallow comparison of a single key against another schema.
    #[must_use]
    pub fn same_at(&self, other: &Self, key: &str) -> bool {
        fn same_children(a: Option<&Children>, b: Option<&Children>) -> bool {
            match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => a.same(b),
                _ => false,
            }
        }

        match key {
            "children" => same_children(self.children.as_ref(), other.children.as_ref()),
            "renderChildren" => {
                same_children(self.render_children.as_ref(), other.render_children.as_ref())
            }
            "component" => match (&self.component, &other.component) {
                (None, None) => true,
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                _ => false,
            },
            _ => match (self.handlers.get(key), other.handlers.get(key)) {
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                (None, None) => self.props.get(key) == other.props.get(key),
                _ => false,
            },
        }
    }

    /// Layers this node over a shared definition; own properties win.
    #[must_use]
    pub fn merge_under(&self, definition: &Map<String, Value>) -> Self {
        let mut props = definition.clone();
        props.extend(self.props.clone());
        Self {
            props,
            ..self.clone()
        }
    }

    /// Moves inline children aside and renders them through `placeholder`.
    #[must_use]
    pub fn into_placeholder(mut self, placeholder: ComponentRef) -> Self {
        self.render_children = self.children.take();
        self.component = Some(placeholder);
        self
    }

    /// Replaces the embedded component.
    #[must_use]
    pub fn replace_component(mut self, component: ComponentRef) -> Self {
        self.component = Some(component);
        self
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("props", &self.props)
            .field("children", &self.children)
            .field("component", &self.component.as_ref().map(|c| c.name().to_owned()))
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl From<Map<String, Value>> for Schema {
    fn from(props: Map<String, Value>) -> Self {
        Self::from_map(props)
    }
}

/// What a node is asked to render: one schema or a list of them.
#[derive(Debug, Clone)]
pub enum SchemaNode {
    /// A single schema.
    Schema(SchemaRef),
    /// A list rendered by the host's `render` callback.
    List(Vec<SchemaRef>),
}

impl SchemaNode {
    /// The single schema, if this is not a list.
    #[must_use]
    pub const fn as_schema(&self) -> Option<&SchemaRef> {
        match self {
            Self::Schema(schema) => Some(schema),
            Self::List(_) => None,
        }
    }

    /// Own keys of the node.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        match self {
            Self::Schema(schema) => schema.keys().map(str::to_owned).collect(),
            Self::List(items) => (0..items.len()).map(|i| i.to_string()).collect(),
        }
    }

    /// Shallow comparison of one key.
    #[must_use]
    pub fn same_at(&self, other: &Self, key: &str) -> bool {
        match (self, other) {
            (Self::Schema(a), Self::Schema(b)) => a.same_at(b, key),
            (Self::List(a), Self::List(b)) => key.parse::<usize>().is_ok_and(|i| {
                match (a.get(i), b.get(i)) {
                    (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                    (None, None) => true,
                    _ => false,
                }
            }),
            _ => false,
        }
    }
}

impl From<Schema> for SchemaNode {
    fn from(schema: Schema) -> Self {
        Self::Schema(Rc::new(schema))
    }
}

impl From<SchemaRef> for SchemaNode {
    fn from(schema: SchemaRef) -> Self {
        Self::Schema(schema)
    }
}

impl From<Vec<SchemaRef>> for SchemaNode {
    fn from(items: Vec<SchemaRef>) -> Self {
        Self::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(value: Value) -> Schema {
        Schema::from_value(value).unwrap()
    }

    #[test]
    fn own_properties_win_over_definition() {
        let definition = json!({"type": "text", "label": "default"});
        let node = schema(json!({"$ref": "#/definitions/x", "label": "override"}));
        let merged = node.merge_under(definition.as_object().unwrap());
        assert_eq!(merged.type_name(), Some("text"));
        assert_eq!(merged.get("label"), Some(&json!("override")));
    }

    #[test]
    fn rejects_non_object_documents() {
        assert!(matches!(
            Schema::from_value(json!([1, 2])),
            Err(Error::InvalidSchema(_))
        ));
    }

    #[test]
    fn internal_id_is_assigned_once() {
        let node = Schema::new().with_internal_id();
        let id = node.internal_id().map(str::to_owned);
        let again = node.with_internal_id();
        assert_eq!(again.internal_id().map(str::to_owned), id);
    }

    #[test]
    fn keys_include_non_json_members() {
        let node = schema(json!({"type": "tpl"}))
            .with_children(Children::render(|_| Element::Empty))
            .on("onClick", Rc::new(|_: &Value| true));
        let keys: Vec<_> = node.keys().collect();
        assert_eq!(keys, ["type", "children", "onClick"]);
    }

    #[test]
    fn legacy_visibility_flags() {
        assert!(schema(json!({"hidden": true})).is_hidden());
        assert!(schema(json!({"visible": false})).is_visible_false());
        assert!(!schema(json!({"visible": 0})).is_visible_false());
    }
}
