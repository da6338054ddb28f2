//! Event plumbing between nodes and the host event system.

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use serde_json::Value;
use stencil_core::{Prop, Props, RendererEvent, Schema};

use crate::node::ChildRef;

/// Undoes a binding.
pub type Unbind = Box<dyn FnOnce()>;

/// Binds a node's mounted child to the host's event system.
pub trait EventBinder {
    /// Binds listeners scoped to the child.
    fn bind(&self, child: &ChildRef) -> Unbind;

    /// Binds global listeners for the child.
    fn bind_global(&self, child: &ChildRef) -> Unbind;
}

/// An [`EventBinder`] that binds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBinder;

impl EventBinder for NoopBinder {
    fn bind(&self, _child: &ChildRef) -> Unbind {
        Box::new(|| {})
    }

    fn bind_global(&self, _child: &ChildRef) -> Unbind {
        Box::new(|| {})
    }
}

/// Dispatches renderer events to the host.
pub trait EventDispatcher {
    /// Dispatches `event` on behalf of `child` with `data`.
    fn dispatch(
        &self,
        event: &str,
        child: Option<ChildRef>,
        data: Value,
    ) -> LocalBoxFuture<'static, Option<RendererEvent>>;
}

fn is_event_key(key: &str) -> bool {
    key.strip_prefix("on")
        .and_then(|rest| rest.chars().next())
        .is_some_and(char::is_uppercase)
}

/// Combines ambient properties with the schema's handlers.
///
/// Every ambient property is kept. An `on*` handler present both in the
/// ambient props and on the schema becomes a chain that calls the schema's
/// handler first; a `false` return stops the chain.
#[must_use]
pub fn chain_events(ambient: &Props, schema: &Schema) -> Props {
    let mut out = ambient.clone();
    for (key, own) in schema.handlers() {
        if !is_event_key(key) {
            continue;
        }
        if let Some(outer) = ambient.handler(key) {
            let own = own.clone();
            let outer = outer.clone();
            out.insert(
                key.clone(),
                Prop::Handler(Rc::new(move |event: &Value| own(event) && outer(event))),
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use serde_json::json;

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, tag: &'static str, result: bool) -> Prop {
        let log = log.clone();
        Prop::handler(move |_| {
            log.borrow_mut().push(tag);
            result
        })
    }

    #[test]
    fn schema_handler_runs_first() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let Prop::Handler(own) = recorder(&log, "schema", true) else {
            unreachable!()
        };
        let schema = Schema::new().on("onClick", own);
        let ambient = Props::new()
            .with("onClick", recorder(&log, "ambient", true))
            .with("label", "x");

        let chained = chain_events(&ambient, &schema);
        assert_eq!(chained.str("label"), Some("x"));
        assert!(chained.handler("onClick").unwrap()(&json!({})));
        assert_eq!(*log.borrow(), ["schema", "ambient"]);
    }

    #[test]
    fn false_stops_the_chain() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let Prop::Handler(own) = recorder(&log, "schema", false) else {
            unreachable!()
        };
        let schema = Schema::new().on("onChange", own);
        let ambient = Props::new().with("onChange", recorder(&log, "ambient", true));

        assert!(!chain_events(&ambient, &schema).handler("onChange").unwrap()(&json!(1)));
        assert_eq!(*log.borrow(), ["schema"]);
    }

    #[test]
    fn schema_only_handlers_are_left_to_the_schema() {
        let schema = Schema::new().on("onClick", Rc::new(|_: &Value| true));
        assert!(!chain_events(&Props::new(), &schema).contains_key("onClick"));
    }
}
