//! # stencil-core
//!
//! The collaborator-free vocabulary of the stencil renderer:
//!
//! - [`Schema`] / [`SchemaNode`]: declarative node descriptions.
//! - [`Props`] / [`Prop`]: the flat property bags passed to components.
//! - [`Element`]: what rendering produces.
//! - [`Component`] / [`Instance`]: implementation and mounted-instance capabilities.
//! - [`StatusStore`]: the host-owned visibility/disable/static overlay.
//! - [`animation`]: animation descriptors and derived transition metadata.
//!
//! Nothing in here resolves or renders anything; that lives in the `stencil`
//! crate.

pub mod animation;
pub mod component;
pub mod element;
/// Error type shared across the workspace.
pub mod error;
pub mod event;
pub mod prop;
pub mod schema;
pub mod status;
pub mod test_id;

#[doc(inline)]
pub use component::{Component, ComponentRef, Instance, InstanceRef, component};
#[doc(inline)]
pub use element::{Element, Unresolved, Widget};
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use event::RendererEvent;
#[doc(inline)]
pub use prop::{ChildRenderer, Dispatcher, EventHandler, Prop, Props};
#[doc(inline)]
pub use schema::{Children, Schema, SchemaNode, SchemaRef};
#[doc(inline)]
pub use status::{OverlayFlags, StatusStore, Subscription};
#[doc(inline)]
pub use test_id::TestIdBuilder;
