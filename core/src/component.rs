//! Component and instance capabilities.
//!
//! A [`Component`] is a concrete implementation that turns a property bag into
//! an [`Element`]. Components are shared across the process and must be
//! `Send + Sync`. An [`Instance`] is what a mounted component hands back to
//! its owning node; instances live on the rendering thread only.

use core::fmt;
use std::{any::Any, rc::Rc, sync::Arc};

use crate::{Element, prop::Props};

/// A renderable implementation.
pub trait Component: Send + Sync + 'static {
    /// Display name.
    fn name(&self) -> &str;

    /// Renders the component with the final merged properties.
    fn render(&self, props: &Props) -> Element;

    /// Property names this component consumes itself and that must not be
    /// forwarded to its children.
    fn props_list(&self) -> &[&'static str] {
        &[]
    }

    /// Whether this is already a form-item wrapper.
    fn is_form_item_wrapper(&self) -> bool {
        false
    }
}

impl fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Component").field(&self.name()).finish()
    }
}

/// Shared component handle.
pub type ComponentRef = Arc<dyn Component>;

/// Identity of a component handle, stable while the handle is alive.
#[must_use]
pub fn component_key(component: &ComponentRef) -> usize {
    Arc::as_ptr(component).cast::<()>().addr()
}

/// A component backed by a closure.
pub struct FnComponent<F> {
    name: String,
    render: F,
}

impl<F> fmt::Debug for FnComponent<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnComponent")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<F> Component for FnComponent<F>
where
    F: Fn(&Props) -> Element + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, props: &Props) -> Element {
        (self.render)(props)
    }
}

/// Wraps a closure as a shared component.
pub fn component<F>(name: impl Into<String>, render: F) -> ComponentRef
where
    F: Fn(&Props) -> Element + Send + Sync + 'static,
{
    Arc::new(FnComponent {
        name: name.into(),
        render,
    })
}

/// A mounted component instance.
///
/// Wrapper instances delegate to the instance they wrap through
/// [`Instance::wrapped_instance`]; the owning node follows that chain to the
/// innermost instance.
pub trait Instance: Any {
    /// The wrapped instance, for transparent wrappers.
    fn wrapped_instance(&self) -> Option<InstanceRef> {
        None
    }

    /// Properties tracked by the instance itself, if it tracks any.
    fn props(&self) -> Option<Props> {
        None
    }
}

/// Shared instance handle.
pub type InstanceRef = Rc<dyn Instance>;
