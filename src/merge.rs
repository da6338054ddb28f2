//! Property merge engine.
//!
//! Builds the exact property bag a component receives. Sources are layered in
//! a fixed order, later layers winning on key collisions:
//!
//! 1. renderer defaults
//! 2. theme defaults for the renderer's registered name
//! 3. the schema's own members (`data`, `value` and `activeKey` are renamed to
//!    `defaultData`, `defaultValue` and `defaultActiveKey`)
//! 4. the ambient properties, with shared `on*` handlers chained
//! 5. computed expression properties (skipped for store-backed renderers)
//! 6. structural properties (path, schema, callbacks, stores)
//!
//! followed by style formulas, overlay overrides, test ids and `autoVar`.

use serde_json::{Map, Value};
use stencil_core::{
    ChildRenderer, Dispatcher, OverlayFlags, Prop, Props, SchemaRef, TestIdBuilder,
    schema::DETECT_WHOLE_CONTEXT,
};

use crate::{env::RendererEnv, events::chain_events, registry::RendererDescriptor};

/// Ambient keys re-attached explicitly instead of being forwarded.
const STRUCTURAL_KEYS: &[&str] = &["rootStore", "statusStore", "render", "key"];

/// Schema members that never reach a component under their own name.
const RENAMED_KEYS: &[(&str, &str)] = &[
    ("data", "defaultData"),
    ("value", "defaultValue"),
    ("activeKey", "defaultActiveKey"),
];

/// Renamed keys whose schema may also spell the default out directly.
const EXPLICIT_DEFAULTS: &[&str] = &["defaultData", "defaultValue"];

/// Everything about one render pass the merge needs.
#[derive(Debug)]
pub struct MergeScope<'a> {
    /// Resolved path.
    pub path: &'a str,
    /// Resolved schema.
    pub schema: &'a SchemaRef,
    /// Ambient properties, including `invisible` when set.
    pub ambient: &'a Props,
    /// Computed expression properties.
    pub expr: &'a Map<String, Value>,
}

/// Node callbacks attached to every rendered component.
#[derive(Clone)]
pub struct NodeCallbacks {
    /// Child renderer bound to the node.
    pub render: ChildRenderer,
    /// Event dispatcher bound to the node.
    pub dispatch: Dispatcher,
}

impl core::fmt::Debug for NodeCallbacks {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NodeCallbacks").finish_non_exhaustive()
    }
}

/// Selects the data conditional properties are evaluated against.
///
/// `detectField: "&"` selects the whole ambient bag; otherwise the named
/// field, `data` by default.
#[must_use]
pub fn detect_data(schema: &SchemaRef, ambient: &Props) -> Value {
    match schema.detect_field() {
        Some(DETECT_WHOLE_CONTEXT) => ambient.to_value(),
        field => ambient
            .value(field.unwrap_or("data"))
            .cloned()
            .unwrap_or(Value::Null),
    }
}

impl MergeScope<'_> {
    fn rest(&self) -> Props {
        self.ambient.without(STRUCTURAL_KEYS)
    }

    fn attach_structural(&self, props: &mut Props, callbacks: &NodeCallbacks) {
        props.insert("$path", self.path);
        props.insert("$schema", self.schema.clone());
        props.insert("render", Prop::Render(callbacks.render.clone()));
        props.insert("dispatchEvent", Prop::Dispatch(callbacks.dispatch.clone()));
        for key in ["rootStore", "statusStore"] {
            if let Some(store) = self.ambient.get(key) {
                props.insert(key, store.clone());
            }
        }
    }

    fn attach_prop_key(&self, props: &mut Props) {
        if let Some(key) = self.ambient.get("key") {
            props.insert("propKey", key.clone());
        }
    }

    /// The schema's own members, minus the controlled values.
    fn schema_members(&self, props: &mut Props) {
        for (key, value) in self.schema.props() {
            if RENAMED_KEYS
                .iter()
                .any(|(from, to)| from == key || to == key)
            {
                continue;
            }
            props.insert(key.clone(), value.clone());
        }
        for (event, handler) in self.schema.handlers() {
            props.insert(event.clone(), Prop::Handler(handler.clone()));
        }
        if let Some(children) = self.schema.children() {
            props.insert("children", children.clone());
        }
        if let Some(children) = self.schema.render_children() {
            props.insert("renderChildren", children.clone());
        }
    }

    /// `defaultData` and `defaultValue`: an explicit `defaultX` on the schema
    /// wins over its `x`. `defaultActiveKey` only ever mirrors `activeKey`.
    fn attach_defaults(&self, props: &mut Props) {
        for (from, to) in RENAMED_KEYS {
            let explicit = EXPLICIT_DEFAULTS
                .contains(to)
                .then(|| self.schema.get(to))
                .flatten();
            match explicit.or_else(|| self.schema.get(from)) {
                Some(value) => props.insert(*to, value.clone()),
                None => props.remove(to),
            };
        }
    }

    /// Props for function-as-child schemas.
    #[must_use]
    pub fn children_props(&self, callbacks: &NodeCallbacks) -> Props {
        let mut props = self.rest();
        props.extend_values(self.expr);
        self.attach_structural(&mut props, callbacks);
        props
    }

    /// Props for schemas embedding a component directly.
    #[must_use]
    pub fn component_props(&self, callbacks: &NodeCallbacks) -> Props {
        let mut props = self.rest();
        self.schema_members(&mut props);
        props.extend_values(self.expr);
        self.attach_defaults(&mut props);
        self.attach_prop_key(&mut props);
        self.attach_structural(&mut props, callbacks);
        props
    }

    /// Props for a registry-resolved renderer.
    #[must_use]
    pub fn renderer_props(
        &self,
        env: &RendererEnv,
        descriptor: &RendererDescriptor,
        overlay: OverlayFlags,
        callbacks: &NodeCallbacks,
    ) -> Props {
        let schema = self.schema;
        let type_name = schema.type_name().unwrap_or(descriptor.type_name());

        let mut props = Props::from_map(&descriptor.defaults_for(type_name, schema));
        props.extend_values(&env.theme().renderer_config(descriptor.name()));
        self.schema_members(&mut props);
        props.extend(chain_events(&self.rest(), schema));
        if descriptor.store().is_none() {
            props.extend_values(self.expr);
        }
        self.attach_defaults(&mut props);
        self.attach_prop_key(&mut props);
        self.attach_structural(&mut props, callbacks);

        let mobile = if schema.get("useMobileUI") == Some(&Value::Bool(false)) {
            false
        } else {
            self.ambient
                .flag("mobileUI")
                .unwrap_or(env.config().mobile_ui)
        };
        props.insert("mobileUI", mobile);

        let evaluator = env.evaluator();
        if let Some(style) = schema.style() {
            let data = detect_data(schema, self.ambient);
            props.insert("style", evaluator.build_style(style, &data));
        }

        if let Some(disabled) = overlay.disabled {
            props.insert("disabled", disabled);
        }
        if let Some(is_static) = overlay.is_static {
            props.insert("static", is_static);
        }

        if env.config().enable_testid {
            attach_test_id(&mut props);
        }

        if descriptor.is_auto_var() {
            let data = props.data().cloned().unwrap_or(Value::Null);
            for key in schema.props().keys() {
                let Some(text) = props.str(key).filter(|text| evaluator.is_expression(text))
                else {
                    continue;
                };
                let resolved = evaluator.resolve_variable_and_filter(text, &data, "| raw");
                props.insert(key.clone(), resolved);
            }
        }

        props
    }
}

/// Attaches a test-id builder keyed by `testid` or `id`, unless the props
/// already carry an inherited builder and name no id of their own.
fn attach_test_id(props: &mut Props) {
    let own_id = props
        .str("testid")
        .or_else(|| props.str("id"))
        .filter(|id| !id.is_empty())
        .map(str::to_owned);
    if own_id.is_none() && props.contains_key("testIdBuilder") {
        return;
    }
    if props.test_id().is_none() {
        props.insert("testIdBuilder", TestIdBuilder::new(own_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use std::sync::Arc;

    use futures::{FutureExt, executor::LocalPool};
    use serde_json::json;
    use stencil_core::{Element, Schema, SchemaNode, StatusStore, component};

    use crate::{
        env::EnvConfig,
        registry::RendererRegistry,
        theme::ThemeConfig,
    };

    fn callbacks() -> NodeCallbacks {
        NodeCallbacks {
            render: Rc::new(|_: &str, _: &SchemaNode, _: Props| Ok(Element::Empty)),
            dispatch: Rc::new(|_: &str, _: Value| async { None }.boxed_local()),
        }
    }

    fn env(config: EnvConfig) -> Rc<RendererEnv> {
        let pool = LocalPool::new();
        let theme = ThemeConfig::new().with_renderer(
            "text",
            json!({"size": "md", "tone": "plain"}).as_object().cloned().unwrap(),
        );
        RendererEnv::builder(pool.spawner())
            .registry(Arc::new(RendererRegistry::new()))
            .theme(theme)
            .config(config)
            .build()
            .0
    }

    fn descriptor() -> RendererDescriptor {
        RendererDescriptor::new("text", component("text", |_| Element::Empty))
            .default_props(|_, _| json!({"size": "sm", "wrap": true}).as_object().cloned().unwrap())
    }

    #[test]
    fn layers_in_order() {
        let env = env(EnvConfig::default());
        let schema = Rc::new(
            Schema::from_value(json!({
                "type": "text", "tone": "loud", "value": 3, "data": {"x": 1}, "label": "schema"
            }))
            .unwrap(),
        );
        let store = StatusStore::new();
        let ambient = Props::new()
            .with("label", "ambient")
            .with("statusStore", store)
            .with("key", "k1");
        let expr = json!({"disabled": true}).as_object().cloned().unwrap();
        let scope = MergeScope { path: "page/text", schema: &schema, ambient: &ambient, expr: &expr };

        let props = scope.renderer_props(&env, &descriptor(), OverlayFlags::default(), &callbacks());
        assert_eq!(props.str("size"), Some("md"));
        assert_eq!(props.flag("wrap"), Some(true));
        assert_eq!(props.str("tone"), Some("loud"));
        assert_eq!(props.str("label"), Some("ambient"));
        assert_eq!(props.value("defaultValue"), Some(&json!(3)));
        assert_eq!(props.value("defaultData"), Some(&json!({"x": 1})));
        assert!(!props.contains_key("value"));
        assert!(!props.contains_key("key"));
        assert_eq!(props.str("propKey"), Some("k1"));
        assert_eq!(props.str("$path"), Some("page/text"));
        assert!(props.schema().is_some_and(|s| Rc::ptr_eq(s, &schema)));
        assert!(props.status_store().is_some());
        assert_eq!(props.flag("disabled"), Some(true));
        assert_eq!(props.flag("mobileUI"), Some(false));
    }

    #[test]
    fn default_active_key_mirrors_active_key() {
        let env = env(EnvConfig::default());
        let ambient = Props::new();
        let expr = serde_json::Map::new();
        let merged = |value: Value| {
            let schema = Rc::new(Schema::from_value(value).unwrap());
            let scope = MergeScope { path: "p", schema: &schema, ambient: &ambient, expr: &expr };
            scope.renderer_props(&env, &descriptor(), OverlayFlags::default(), &callbacks())
        };

        let props = merged(json!({"type": "text", "defaultActiveKey": 2}));
        assert!(!props.contains_key("defaultActiveKey"));

        let props = merged(json!({"type": "text", "activeKey": 1, "defaultActiveKey": 2}));
        assert_eq!(props.value("defaultActiveKey"), Some(&json!(1)));
        assert!(!props.contains_key("activeKey"));

        let props = merged(json!({"type": "text", "value": 3, "defaultValue": 4}));
        assert_eq!(props.value("defaultValue"), Some(&json!(4)));
    }

    #[test]
    fn overlay_overrides_expressions() {
        let env = env(EnvConfig::default());
        let schema = Rc::new(Schema::from_value(json!({"type": "text", "id": "t1"})).unwrap());
        let expr = json!({"disabled": false}).as_object().cloned().unwrap();
        let ambient = Props::new();
        let scope = MergeScope { path: "p", schema: &schema, ambient: &ambient, expr: &expr };
        let overlay = OverlayFlags { disabled: Some(true), is_static: Some(false), ..OverlayFlags::default() };

        let props = scope.renderer_props(&env, &descriptor(), overlay, &callbacks());
        assert_eq!(props.flag("disabled"), Some(true));
        assert_eq!(props.flag("static"), Some(false));
    }

    #[test]
    fn store_backed_renderers_skip_expressions() {
        let env = env(EnvConfig::default());
        let schema = Rc::new(Schema::from_value(json!({"type": "text"})).unwrap());
        let expr = json!({"hidden": true}).as_object().cloned().unwrap();
        let ambient = Props::new();
        let scope = MergeScope { path: "p", schema: &schema, ambient: &ambient, expr: &expr };
        let props = scope.renderer_props(&env, &descriptor().store_type("crud"), OverlayFlags::default(), &callbacks());
        assert!(!props.contains_key("hidden"));
    }

    #[test]
    fn test_ids_and_auto_var() {
        let env = env(EnvConfig { enable_testid: true, ..EnvConfig::default() });
        let schema = Rc::new(
            Schema::from_value(json!({"type": "text", "id": "greeting", "text": "${name}"})).unwrap(),
        );
        let ambient = Props::new().with("data", Rc::new(json!({"name": "Ada"})));
        let expr = Map::new();
        let scope = MergeScope { path: "p", schema: &schema, ambient: &ambient, expr: &expr };

        let props = scope.renderer_props(&env, &descriptor().auto_var(), OverlayFlags::default(), &callbacks());
        assert_eq!(props.test_id().and_then(TestIdBuilder::test_id), Some("greeting"));
        assert_eq!(props.str("text"), Some("Ada"));
    }

    #[test]
    fn style_and_mobile_switch() {
        let env = env(EnvConfig { mobile_ui: true, ..EnvConfig::default() });
        let schema = Rc::new(
            Schema::from_value(json!({"type": "text", "style": {"color": "${tone}"}})).unwrap(),
        );
        let ambient = Props::new().with("data", Rc::new(json!({"tone": "red"})));
        let expr = Map::new();
        let scope = MergeScope { path: "p", schema: &schema, ambient: &ambient, expr: &expr };
        let props = scope.renderer_props(&env, &descriptor(), OverlayFlags::default(), &callbacks());
        assert_eq!(props.value("style"), Some(&json!({"color": "red"})));
        assert_eq!(props.flag("mobileUI"), Some(true));

        let off = Rc::new(Schema::from_value(json!({"type": "text", "useMobileUI": false})).unwrap());
        let scope = MergeScope { path: "p", schema: &off, ambient: &ambient, expr: &expr };
        let props = scope.renderer_props(&env, &descriptor(), OverlayFlags::default(), &callbacks());
        assert_eq!(props.flag("mobileUI"), Some(false));
    }

    #[test]
    fn detection_data_selection() {
        let ambient = Props::new()
            .with("data", Rc::new(json!({"a": 1})))
            .with("row", json!({"b": 2}));
        let plain = Rc::new(Schema::new());
        assert_eq!(detect_data(&plain, &ambient), json!({"a": 1}));
        let field = Rc::new(Schema::new().with("detectField", "row"));
        assert_eq!(detect_data(&field, &ambient), json!({"b": 2}));
        let whole = Rc::new(Schema::new().with("detectField", "&"));
        assert_eq!(detect_data(&whole, &ambient)["row"], json!({"b": 2}));
    }
}
