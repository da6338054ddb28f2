//! Render output.

use core::fmt;

use crate::{
    animation::{AnimationClassNames, AnimationTimeout},
    prop::Props,
};

/// What a node renders into.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub enum Element {
    /// Nothing.
    #[default]
    Empty,
    /// Plain text.
    Text(String),
    /// Output of a concrete component.
    Widget(Widget),
    /// Several siblings.
    Fragment(Vec<Element>),
    /// Placeholder shown while a renderer is being loaded.
    Pending,
    /// Placeholder for a schema no renderer could be found for.
    Unresolved(Unresolved),
    /// Output wrapped in an enter/exit transition.
    Transition(Box<Transition>),
    /// Output wrapped with debugging information.
    Debug(Box<DebugFrame>),
}

impl Element {
    /// Creates a widget element with no children.
    #[must_use]
    pub fn widget(kind: impl Into<String>, props: Props) -> Self {
        Self::Widget(Widget {
            kind: kind.into(),
            props,
            children: Vec::new(),
        })
    }

    /// Whether nothing is rendered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The widget, if this is one.
    #[must_use]
    pub const fn as_widget(&self) -> Option<&Widget> {
        match self {
            Self::Widget(widget) => Some(widget),
            _ => None,
        }
    }

    /// The unresolved placeholder, if this is one.
    #[must_use]
    pub const fn as_unresolved(&self) -> Option<&Unresolved> {
        match self {
            Self::Unresolved(unresolved) => Some(unresolved),
            _ => None,
        }
    }

    /// The transition wrapper, if this is one.
    #[must_use]
    pub fn as_transition(&self) -> Option<&Transition> {
        match self {
            Self::Transition(transition) => Some(&**transition),
            _ => None,
        }
    }
}

/// Output of a concrete component.
#[derive(Debug, Clone)]
pub struct Widget {
    /// Component kind.
    pub kind: String,
    /// Properties the component rendered with.
    pub props: Props,
    /// Rendered children.
    pub children: Vec<Element>,
}

/// Error placeholder describing a schema that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    /// The schema's `type`, if it had one.
    pub type_name: Option<String>,
    /// Path of the node.
    pub path: String,
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.type_name {
            Some(type_name) => write!(
                f,
                "Error: Renderer not found for type `{type_name}` at path `{}`",
                self.path
            ),
            None => write!(f, "Error: Renderer not found at path `{}`", self.path),
        }
    }
}

/// A transition around rendered output.
#[derive(Debug, Clone)]
pub struct Transition {
    /// `true` while the node should be shown; `false` plays the exit animation.
    pub visible: bool,
    /// Timeouts in milliseconds.
    pub timeout: AnimationTimeout,
    /// Transition classes.
    pub class_names: AnimationClassNames,
    /// Class to add after entering and remove before exiting.
    pub attention_class: Option<String>,
    /// Wrapped output.
    pub child: Element,
}

/// Debug wrapper naming the renderer that produced the output.
#[derive(Debug, Clone)]
pub struct DebugFrame {
    /// Registered renderer name.
    pub renderer: String,
    /// Wrapped output.
    pub child: Element,
}
