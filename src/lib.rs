#![doc = include_str!("../README.md")]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::future_not_send)]

pub mod action;
pub mod cache;
pub mod component;
pub mod env;
pub mod events;
pub mod expr;
pub mod gate;
pub mod logging;
pub mod merge;
pub mod node;
pub mod queue;
pub mod registry;
pub mod style;
pub mod theme;
pub mod visibility;


#[doc(inline)]
pub use env::{EnvConfig, RendererEnv};
#[doc(inline)]
pub use node::{ChildRef, NodeId, NodeProps, Phase, SchemaRenderer};
#[doc(inline)]
pub use registry::{RendererDescriptor, RendererRegistry, register_renderer};
#[doc(inline)]
pub use stencil_core::*;

pub mod prelude {
    //! Commonly used types in one import.
    //!
    //! ```text
    //! use stencil::prelude::*;
    //! ```
    pub use crate::{
        EnvConfig, NodeProps, RendererDescriptor, RendererEnv, SchemaRenderer,
        action::{ActionRegistry, Clipboard, ListenerAction},
        expr::Evaluator,
        node::lazy::{Loaded, RendererLoader},
        theme::{Theme, ThemeConfig},
    };
    pub use stencil_core::{
        Children, Component, Element, Prop, Props, Schema, SchemaNode, StatusStore, component,
    };
}
