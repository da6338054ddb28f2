//! Renderer resolution.

use std::rc::Rc;

use serde_json::Map;
use stencil_core::{Schema, SchemaNode, SchemaRef};
use tracing::{debug, warn};

use super::SchemaRenderer;
use crate::{
    cache::ComponentCache,
    component::{as_form_item, placeholder},
};

/// The schema a node actually renders, memoized per source schema.
pub(super) struct ResolvedSchema {
    source: SchemaNode,
    input_path: String,
    pub(super) path: String,
    pub(super) schema: SchemaNode,
}

fn same_node(a: &SchemaNode, b: &SchemaNode) -> bool {
    match (a, b) {
        (SchemaNode::Schema(a), SchemaNode::Schema(b)) => Rc::ptr_eq(a, b),
        (SchemaNode::List(a), SchemaNode::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| Rc::ptr_eq(a, b))
        }
        _ => false,
    }
}

/// Replaces the last segment of `path` with `type_name`.
fn rewrite_path(path: &str, type_name: &str) -> String {
    match path.rfind('/') {
        Some(slash) => format!("{}{type_name}", &path[..=slash]),
        None => type_name.to_owned(),
    }
}

/// Moves inline children behind the placeholder and wraps embedded
/// components as form items, when the schema asks for it.
fn patch_embedded(schema: &SchemaRef, cache: &ComponentCache) -> Option<SchemaRef> {
    let mut next: Option<Schema> = None;
    if schema.children().is_some()
        && schema.component().is_none()
        && schema.as_form_item().is_some()
    {
        next = Some(Schema::clone(schema).into_placeholder(placeholder()));
    }

    let view: &Schema = next.as_ref().unwrap_or(schema.as_ref());
    if let (Some(component), Some(request)) = (view.component(), view.as_form_item())
        && !component.is_form_item_wrapper()
    {
        let wrapped = as_form_item(component, request, cache);
        let replaced = view.clone().replace_component(wrapped);
        next = Some(replaced);
    }
    next.map(Rc::new)
}

impl SchemaRenderer {
    /// Expands `$ref`, then resolves the renderer unless it is cached under
    /// the same `type-internal id` key and `force` is unset.
    ///
    /// Returns the resolved path and schema, or `None` for a null schema.
    pub(super) fn resolve(&self, force: bool) -> Option<(String, SchemaNode)> {
        let env = &self.cell.env;
        let (source, input_path, rest) = {
            let state = self.cell.state.borrow();
            (
                state.props.schema.clone()?,
                state.props.path.clone(),
                state.props.rest.clone(),
            )
        };

        let cached = {
            let state = self.cell.state.borrow();
            state
                .resolved
                .as_ref()
                .filter(|r| r.input_path == input_path && same_node(&r.source, &source))
                .map(|r| (r.path.clone(), r.schema.clone()))
        };
        let (path, node) = cached.unwrap_or_else(|| expand_ref(self, &source, &input_path));

        let SchemaNode::Schema(schema) = &node else {
            self.remember(source, input_path, path.clone(), node.clone());
            return Some((path, node));
        };

        let mut schema = schema.clone();
        let re_resolve = schema.type_name().is_some_and(|type_name| {
            let key = format!("{type_name}-{}", schema.internal_id().unwrap_or("undefined"));
            let state = self.cell.state.borrow();
            force || state.renderer.is_none() || state.renderer_key != key
        });

        if re_resolve {
            let type_name = schema.type_name().unwrap_or_default();
            let key = format!("{type_name}-{}", schema.internal_id().unwrap_or("undefined"));
            let renderer = env.resolve_renderer(&path, &schema, &rest);
            debug!(
                path,
                renderer = renderer.as_ref().map(|r| r.type_name()),
                "renderer resolved"
            );
            let mut state = self.cell.state.borrow_mut();
            if state.renderer_key != key {
                state.discard_load();
            }
            state.renderer = renderer;
            state.renderer_key = key;
        } else if let Some(patched) = patch_embedded(&schema, env.components()) {
            schema = patched;
        }

        let node = SchemaNode::Schema(schema);
        self.remember(source, input_path, path.clone(), node.clone());
        Some((path, node))
    }

    fn remember(&self, source: SchemaNode, input_path: String, path: String, schema: SchemaNode) {
        self.cell.state.borrow_mut().resolved = Some(ResolvedSchema {
            source,
            input_path,
            path,
            schema,
        });
    }
}

/// Layers a `$ref` node over its definition and renames the path after the
/// resolved type.
fn expand_ref(node: &SchemaRenderer, source: &SchemaNode, path: &str) -> (String, SchemaNode) {
    let SchemaNode::Schema(schema) = source else {
        return (path.to_owned(), source.clone());
    };
    let Some(pointer) = schema.ref_pointer() else {
        return (path.to_owned(), source.clone());
    };

    let definition = node
        .cell
        .env
        .definitions()
        .and_then(|definitions| definitions.resolve(pointer))
        .unwrap_or_else(|| {
            warn!(pointer, "unresolved $ref");
            Map::new()
        });
    let merged = schema.merge_under(&definition);
    let path = merged
        .type_name()
        .map_or_else(|| path.to_owned(), |type_name| rewrite_path(path, type_name));
    (path, SchemaNode::Schema(Rc::new(merged)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_rewrite_replaces_last_segment() {
        assert_eq!(rewrite_path("page/body/0", "text"), "page/body/text");
        assert_eq!(rewrite_path("root", "text"), "text");
        assert_eq!(rewrite_path("page/", "text"), "page/text");
    }
}
