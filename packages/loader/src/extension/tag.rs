//! Extension built from per-tag closures.

use std::collections::HashMap;
use std::fmt;

use super::handler::Extension;
use crate::configuration::Configuration;
use crate::error::{LoaderError, Result};
use crate::value::Collection;

/// Function type for loading one extension tag.
pub type TagLoadFn = dyn Fn(&Collection) -> Result<Configuration> + Send + Sync;

/// An [`Extension`] that dispatches each tag to a registered closure.
///
/// # Example
///
/// ```
/// use servicewire_loader::{Configuration, Definition, TagExtension};
///
/// let extension = TagExtension::new("project", "http://example.com/schema/project")
///     .with_tag("bar", |config| {
///         let mut configuration = Configuration::new();
///         configuration.set_parameter("project.parameter.bar", config.len() as i64);
///         configuration.set_definition("project.service.bar", Definition::new("FooClass"));
///         Ok(configuration)
///     });
///
/// assert!(extension.has_tag("bar"));
/// ```
pub struct TagExtension {
    alias: String,
    namespace: String,
    tags: HashMap<String, Box<TagLoadFn>>,
}

impl TagExtension {
    /// Create an extension without tags.
    #[must_use]
    pub fn new(alias: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            namespace: namespace.into(),
            tags: HashMap::new(),
        }
    }

    /// Register a loader for a tag.
    pub fn register<F>(&mut self, tag: impl Into<String>, load: F)
    where
        F: Fn(&Collection) -> Result<Configuration> + Send + Sync + 'static,
    {
        self.tags.insert(tag.into(), Box::new(load));
    }

    /// Register a loader for a tag, builder style.
    #[must_use]
    pub fn with_tag<F>(mut self, tag: impl Into<String>, load: F) -> Self
    where
        F: Fn(&Collection) -> Result<Configuration> + Send + Sync + 'static,
    {
        self.register(tag, load);
        self
    }

    /// Check if a loader is registered for a tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }
}

impl Extension for TagExtension {
    fn alias(&self) -> &str {
        &self.alias
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn load(&self, tag: &str, config: &Collection) -> Result<Configuration> {
        let load = self
            .tags
            .get(tag)
            .ok_or_else(|| LoaderError::UnknownExtensionTag {
                tag: tag.to_string(),
                extension: self.alias.clone(),
            })?;

        tracing::trace!(extension = %self.alias, tag, "Loading extension tag");
        load(config)
    }
}

impl fmt::Debug for TagExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&str> = self.tags.keys().map(String::as_str).collect();
        tags.sort_unstable();
        f.debug_struct("TagExtension")
            .field("alias", &self.alias)
            .field("namespace", &self.namespace)
            .field("tags", &tags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn project_extension() -> TagExtension {
        TagExtension::new("project", "http://example.com/schema/project").with_tag(
            "bar",
            |config| {
                let mut configuration = Configuration::new();
                let value = config.get("foo").cloned().unwrap_or(Value::from("foobar"));
                configuration.set_parameter("project.parameter.bar", value);
                Ok(configuration)
            },
        )
    }

    #[test]
    fn test_dispatches_to_registered_tag() {
        let extension = project_extension();
        let mut config = Collection::new();
        config.insert("foo", "custom");

        let configuration = extension.load("bar", &config).unwrap();
        assert_eq!(
            configuration.parameter("project.parameter.bar"),
            Some(&Value::from("custom"))
        );
    }

    #[test]
    fn test_unknown_tag_is_an_error() {
        let extension = project_extension();
        let err = extension.load("foobar", &Collection::new()).unwrap_err();
        assert!(matches!(
            err,
            LoaderError::UnknownExtensionTag { ref tag, ref extension }
                if tag == "foobar" && extension == "project"
        ));
    }

    #[test]
    fn test_register_after_construction() {
        let mut extension = TagExtension::new("p", "urn:p");
        assert!(!extension.has_tag("baz"));
        extension.register("baz", |_| Ok(Configuration::new()));
        assert!(extension.has_tag("baz"));
        assert_eq!(
            format!("{extension:?}"),
            r#"TagExtension { alias: "p", namespace: "urn:p", tags: ["baz"] }"#
        );
    }
}
