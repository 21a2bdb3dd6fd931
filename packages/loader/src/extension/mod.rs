//! Extension system for foreign configuration namespaces.
//!
//! Top-level elements outside the services namespace are handed to an
//! [`Extension`] registered for their namespace. Extensions return plain
//! [`Configuration`](crate::Configuration) values that the loader merges.

mod handler;
mod registry;
mod tag;

pub use handler::Extension;
pub use registry::ExtensionRegistry;
pub use tag::{TagExtension, TagLoadFn};
