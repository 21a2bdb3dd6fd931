//! Servicewire Loader - Load declarative service container configuration.
//!
//! This crate reads service container configuration from XML, YAML and INI
//! files and turns it into a [`Configuration`]: typed parameters, service
//! [`Definition`]s and aliases. Imports are followed, anonymous inline
//! services are hoisted under generated ids and elements of foreign XML
//! namespaces are handed to registered [`Extension`]s.
//!
//! # Example
//!
//! ```no_run
//! use servicewire_loader::{Loader, ParameterResolver};
//!
//! let loader = Loader::builder().path("config").build();
//! let configuration = loader.load("services.xml")?;
//!
//! for (id, definition) in configuration.definitions() {
//!     println!("{id}: {}", definition.class());
//! }
//!
//! let resolved = ParameterResolver::new(&configuration).resolve_parameters()?;
//! # Ok::<(), servicewire_loader::LoaderError>(())
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Configuration constants and limits
//! - [`value`]: Typed values, keys and ordered collections
//! - [`definition`]: Service definitions
//! - [`configuration`]: The load result and its merge rules
//! - [`error`]: Error types and Result alias
//! - [`xml`]: XML utilities, element conversion and schema validation
//! - [`loader`]: File location, per-format loaders and import handling
//! - [`extension`]: Extension trait and registry
//! - [`resolver`]: `%parameter%` placeholder expansion
//! - [`dump`]: YAML output
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod config;
pub mod configuration;
pub mod definition;
pub mod dump;
pub mod error;
pub mod extension;
pub mod loader;
pub mod resolver;
pub mod value;
pub mod xml;

// Re-export commonly used items
pub use configuration::Configuration;
pub use definition::{AnnotationAttributes, Configurator, Definition, MethodCall};
pub use dump::{save_yaml, to_yaml};
pub use error::{LoaderError, Result};
pub use extension::{Extension, ExtensionRegistry, TagExtension};
pub use loader::{FileLoader, LoadContext, Loader, LoaderBuilder};
pub use resolver::ParameterResolver;
pub use value::{coerce_scalar, Collection, Key, Reference, Value};
