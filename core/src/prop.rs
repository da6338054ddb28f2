//! Flat property bags.
//!
//! Every value that flows into a node or out of the merge engine is a [`Props`]
//! bag: an ordered map from property name to [`Prop`]. JSON literals, shared
//! data payloads, callbacks and store handles all live side by side, exactly
//! as a component sees them.
//!
//! Comparison is shallow. Literal JSON values compare by value; everything that
//! is reference counted compares by identity, so callers signal a change by
//! replacing the reference.

use core::fmt;
use std::{any::Any, collections::BTreeMap, rc::Rc};

use futures::future::LocalBoxFuture;
use serde_json::{Map, Value};

use crate::{
    Element, Result,
    error::Error,
    event::RendererEvent,
    schema::{Children, SchemaNode, SchemaRef},
    status::StatusStore,
    test_id::TestIdBuilder,
};

/// Event callback. Returning `false` stops a handler chain.
pub type EventHandler = Rc<dyn Fn(&Value) -> bool>;

/// Child-render callback: `(path or region, node, props) -> element`.
pub type ChildRenderer = Rc<dyn Fn(&str, &SchemaNode, Props) -> Result<Element>>;

/// Event-dispatch callback handed to components.
pub type Dispatcher = Rc<dyn Fn(&str, Value) -> LocalBoxFuture<'static, Option<RendererEvent>>>;

/// A single property value.
#[derive(Clone)]
#[non_exhaustive]
pub enum Prop {
    /// A JSON literal, compared by value.
    Value(Value),
    /// A shared JSON payload (typically `data`), compared by identity.
    Shared(Rc<Value>),
    /// An event handler.
    Handler(EventHandler),
    /// A schema reference.
    Schema(SchemaRef),
    /// A child-render callback.
    Render(ChildRenderer),
    /// Children forwarded as a property.
    Children(Children),
    /// An event-dispatch callback.
    Dispatch(Dispatcher),
    /// The overlay status store.
    Status(Rc<StatusStore>),
    /// An opaque host store, such as the root store.
    Store(Rc<dyn Any>),
    /// A test-id builder.
    TestId(TestIdBuilder),
}

impl Prop {
    /// Wraps a closure as an event handler.
    pub fn handler(f: impl Fn(&Value) -> bool + 'static) -> Self {
        Self::Handler(Rc::new(f))
    }

    /// Returns the JSON value carried by this property, if any.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Shared(value) => Some(&**value),
            _ => None,
        }
    }

    /// Shallow comparison used by the update gate.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => a == b,
            (Self::Shared(a), Self::Shared(b)) => Rc::ptr_eq(a, b),
            (Self::Handler(a), Self::Handler(b)) => Rc::ptr_eq(a, b),
            (Self::Schema(a), Self::Schema(b)) => Rc::ptr_eq(a, b),
            (Self::Render(a), Self::Render(b)) => Rc::ptr_eq(a, b),
            (Self::Children(a), Self::Children(b)) => a.same(b),
            (Self::Dispatch(a), Self::Dispatch(b)) => Rc::ptr_eq(a, b),
            (Self::Status(a), Self::Status(b)) => Rc::ptr_eq(a, b),
            (Self::Store(a), Self::Store(b)) => Rc::ptr_eq(a, b),
            (Self::TestId(a), Self::TestId(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Prop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => value.fmt(f),
            Self::Shared(value) => f.debug_tuple("Shared").field(value).finish(),
            Self::Handler(_) => f.write_str("Handler(..)"),
            Self::Schema(schema) => f.debug_tuple("Schema").field(schema).finish(),
            Self::Render(_) => f.write_str("Render(..)"),
            Self::Children(_) => f.write_str("Children(..)"),
            Self::Dispatch(_) => f.write_str("Dispatch(..)"),
            Self::Status(_) => f.write_str("Status(..)"),
            Self::Store(_) => f.write_str("Store(..)"),
            Self::TestId(builder) => builder.fmt(f),
        }
    }
}

impl From<Value> for Prop {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<bool> for Prop {
    fn from(value: bool) -> Self {
        Self::Value(Value::Bool(value))
    }
}

impl From<&str> for Prop {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_owned()))
    }
}

impl From<String> for Prop {
    fn from(value: String) -> Self {
        Self::Value(Value::String(value))
    }
}

impl From<Rc<Value>> for Prop {
    fn from(value: Rc<Value>) -> Self {
        Self::Shared(value)
    }
}

impl From<SchemaRef> for Prop {
    fn from(value: SchemaRef) -> Self {
        Self::Schema(value)
    }
}

impl From<Rc<StatusStore>> for Prop {
    fn from(value: Rc<StatusStore>) -> Self {
        Self::Status(value)
    }
}

impl From<TestIdBuilder> for Prop {
    fn from(value: TestIdBuilder) -> Self {
        Self::TestId(value)
    }
}

impl From<Children> for Prop {
    fn from(value: Children) -> Self {
        Self::Children(value)
    }
}

/// JavaScript-style truthiness for JSON values.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// An ordered property bag.
#[derive(Clone, Default)]
pub struct Props {
    entries: BTreeMap<String, Prop>,
}

impl Props {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a bag of literal values from a JSON object.
    #[must_use]
    pub fn from_map(map: &Map<String, Value>) -> Self {
        map.iter()
            .map(|(key, value)| (key.clone(), Prop::Value(value.clone())))
            .collect()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bag has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Looks up a property.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Prop> {
        self.entries.get(key)
    }

    /// Inserts a property, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Prop>) -> Option<Prop> {
        self.entries.insert(key.into(), value.into())
    }

    /// Builder-style [`Props::insert`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Prop>) -> Self {
        self.insert(key, value);
        self
    }

    /// Removes a property.
    pub fn remove(&mut self, key: &str) -> Option<Prop> {
        self.entries.remove(key)
    }

    /// Iterates over property names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates over entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Prop)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Merges `other` into `self`; entries of `other` win.
    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    /// Merges literal JSON values into `self`; incoming entries win.
    pub fn extend_values(&mut self, map: &Map<String, Value>) {
        for (key, value) in map {
            self.entries.insert(key.clone(), Prop::Value(value.clone()));
        }
    }

    /// Returns a copy without the listed keys.
    #[must_use]
    pub fn without(&self, keys: &[&str]) -> Self {
        self.entries
            .iter()
            .filter(|(key, _)| !keys.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// JSON value stored under `key`.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.get(key).and_then(Prop::as_value)
    }

    /// String value stored under `key`.
    #[must_use]
    pub fn str(&self, key: &str) -> Option<&str> {
        self.value(key).and_then(Value::as_str)
    }

    /// Boolean stored under `key`, if it is literally a boolean.
    #[must_use]
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.value(key).and_then(Value::as_bool)
    }

    /// Whether the value under `key` is truthy. Non-JSON entries count as truthy.
    #[must_use]
    pub fn is_truthy(&self, key: &str) -> bool {
        self.get(key)
            .is_some_and(|prop| prop.as_value().is_none_or(is_truthy))
    }

    /// The `data` payload, if present.
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.value("data")
    }

    /// Event handler stored under `key`.
    #[must_use]
    pub fn handler(&self, key: &str) -> Option<&EventHandler> {
        match self.get(key) {
            Some(Prop::Handler(handler)) => Some(handler),
            _ => None,
        }
    }

    /// The `$schema` the props were derived from.
    #[must_use]
    pub fn schema(&self) -> Option<&SchemaRef> {
        match self.get("$schema") {
            Some(Prop::Schema(schema)) => Some(schema),
            _ => None,
        }
    }

    /// The overlay status store.
    #[must_use]
    pub fn status_store(&self) -> Option<&Rc<StatusStore>> {
        match self.get("statusStore") {
            Some(Prop::Status(store)) => Some(store),
            _ => None,
        }
    }

    /// The test-id builder attached to these props.
    #[must_use]
    pub fn test_id(&self) -> Option<&TestIdBuilder> {
        match self.get("testIdBuilder") {
            Some(Prop::TestId(builder)) => Some(builder),
            _ => None,
        }
    }

    /// Whether `key` holds the same value in both bags (shallow).
    #[must_use]
    pub fn same_at(&self, other: &Self, key: &str) -> bool {
        match (self.get(key), other.get(key)) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same(b),
            _ => false,
        }
    }

    /// JSON object made of the literal entries.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .filter_map(|(key, prop)| prop.as_value().map(|v| (key.clone(), v.clone())))
                .collect(),
        )
    }

    /// Renders `node` through the `render` callback carried by these props.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCollaborator`] when no `render` callback is present.
    pub fn render_child(&self, region: &str, node: &SchemaNode, props: Self) -> Result<Element> {
        match self.get("render") {
            Some(Prop::Render(render)) => render(region, node, props),
            _ => Err(Error::MissingCollaborator("render")),
        }
    }

    /// Dispatches an event through the `dispatchEvent` callback, if any.
    #[must_use]
    pub fn dispatch_event(
        &self,
        event: &str,
        data: Value,
    ) -> Option<LocalBoxFuture<'static, Option<RendererEvent>>> {
        match self.get("dispatchEvent") {
            Some(Prop::Dispatch(dispatch)) => Some(dispatch(event, data)),
            _ => None,
        }
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl FromIterator<(String, Prop)> for Props {
    fn from_iter<I: IntoIterator<Item = (String, Prop)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Props {
    type Item = (String, Prop);
    type IntoIter = std::collections::btree_map::IntoIter<String, Prop>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn literal_values_compare_by_value() {
        let a = Props::new().with("label", "x").with("size", json!(3));
        let b = Props::new().with("label", "x").with("size", json!(3));
        assert!(a.same_at(&b, "label"));
        assert!(a.same_at(&b, "size"));
        assert!(a.same_at(&b, "missing"));
    }

    #[test]
    fn shared_values_compare_by_identity() {
        let data = Rc::new(json!({"a": 1}));
        let a = Props::new().with("data", data.clone());
        let b = Props::new().with("data", data);
        let c = Props::new().with("data", Rc::new(json!({"a": 1})));
        assert!(a.same_at(&b, "data"));
        assert!(!a.same_at(&c, "data"));
    }

    #[test]
    fn truthiness_follows_script_rules() {
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&Value::Null));
        assert!(is_truthy(&json!("0")));
        assert!(is_truthy(&json!({})));
    }

    #[test]
    fn render_child_requires_callback() {
        let props = Props::new();
        let node = SchemaNode::from(crate::Schema::new());
        let err = props.render_child("body", &node, Props::new()).unwrap_err();
        assert!(matches!(err, Error::MissingCollaborator("render")));
    }
}
