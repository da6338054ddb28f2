//! Built-in components the node machinery relies on.
//!
//! - [`FormItemWrapper`]: the frame an embedded component gets when its schema
//!   asks for `asFormItem`.
//! - [`PlaceholderComponent`]: renders a schema's inline children when they
//!   were moved aside for form-item wrapping.

pub mod form_item;
pub mod placeholder;

#[doc(inline)]
pub use form_item::{FormItemWrapper, as_form_item};
#[doc(inline)]
pub use placeholder::{PlaceholderComponent, placeholder};
