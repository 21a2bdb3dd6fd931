//! The loaded configuration: parameters, service definitions and aliases.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::definition::Definition;
use crate::error::{LoaderError, Result};
use crate::value::{Collection, Key, Value};

/// Parameters, definitions and aliases gathered from one or more files.
///
/// Parameter names are case-insensitive: named keys are lower-cased on
/// insertion and lookup. Every map keeps insertion order, and replacing an
/// existing key keeps its original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configuration {
    parameters: Collection,
    definitions: IndexMap<String, Definition>,
    aliases: IndexMap<String, String>,
    resources: Vec<PathBuf>,
}

impl Configuration {
    /// Create an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All parameters.
    #[must_use]
    pub fn parameters(&self) -> &Collection {
        &self.parameters
    }

    /// All service definitions by id.
    #[must_use]
    pub fn definitions(&self) -> &IndexMap<String, Definition> {
        &self.definitions
    }

    /// All aliases (alias → target id).
    #[must_use]
    pub fn aliases(&self) -> &IndexMap<String, String> {
        &self.aliases
    }

    /// Files that contributed to this configuration, in load order.
    #[must_use]
    pub fn resources(&self) -> &[PathBuf] {
        &self.resources
    }

    /// Look up a parameter (case-insensitive).
    pub fn parameter(&self, name: impl Into<Key>) -> Option<&Value> {
        self.parameters.get(name.into().to_lowercase())
    }

    /// Check whether a parameter exists (case-insensitive).
    pub fn has_parameter(&self, name: impl Into<Key>) -> bool {
        self.parameter(name).is_some()
    }

    /// Set a parameter, overriding any previous value.
    pub fn set_parameter(&mut self, name: impl Into<Key>, value: impl Into<Value>) {
        self.parameters.insert(name.into().to_lowercase(), value);
    }

    /// Add every parameter of a collection, overriding on key collision.
    pub fn add_parameters(&mut self, parameters: Collection) {
        for (key, value) in parameters {
            self.set_parameter(key, value);
        }
    }

    /// Look up a definition, following an alias if needed.
    #[must_use]
    pub fn definition(&self, id: &str) -> Option<&Definition> {
        let id = self.aliases.get(id).map_or(id, String::as_str);
        self.definitions.get(id)
    }

    /// Check whether a definition or alias exists for the id.
    #[must_use]
    pub fn has_definition(&self, id: &str) -> bool {
        self.definitions.contains_key(id) || self.aliases.contains_key(id)
    }

    /// Store a definition; an alias with the same id is removed.
    pub fn set_definition(&mut self, id: impl Into<String>, definition: Definition) {
        let id = id.into();
        self.aliases.shift_remove(&id);
        self.definitions.insert(id, definition);
    }

    /// Register an alias; a definition with the same id is removed.
    pub fn set_alias(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        let alias = alias.into();
        self.definitions.shift_remove(&alias);
        self.aliases.insert(alias, target.into());
    }

    /// Record a file that contributed to this configuration.
    pub fn add_resource(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        if !self.resources.contains(&path) {
            self.resources.push(path);
        }
    }

    /// Merge another configuration into this one; `other` wins on collision.
    pub fn merge(&mut self, other: Configuration) {
        self.add_parameters(other.parameters);
        for (id, definition) in other.definitions {
            self.set_definition(id, definition);
        }
        for (alias, target) in other.aliases {
            self.set_alias(alias, target);
        }
        for resource in other.resources {
            self.add_resource(resource);
        }
    }

    /// Check that every alias points to an existing definition.
    ///
    /// # Errors
    /// Returns `UnknownAliasTarget` for the first dangling alias.
    pub fn validate(&self) -> Result<()> {
        for (alias, target) in &self.aliases {
            if !self.definitions.contains_key(target) {
                return Err(LoaderError::UnknownAliasTarget {
                    alias: alias.clone(),
                    target: target.clone(),
                });
            }
        }
        Ok(())
    }

    /// Check whether nothing has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.definitions.is_empty() && self.aliases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Reference;

    #[test]
    fn test_parameters_are_case_insensitive() {
        let mut configuration = Configuration::new();
        configuration.set_parameter("Foo", "bar");

        assert_eq!(configuration.parameter("foo"), Some(&Value::from("bar")));
        assert_eq!(configuration.parameter("FOO"), Some(&Value::from("bar")));
        assert_eq!(configuration.parameters().get("foo"), Some(&Value::from("bar")));
    }

    #[test]
    fn test_merge_overrides_and_keeps_order() {
        let mut base = Configuration::new();
        base.set_parameter("foo", "foo");
        base.set_parameter("values", Value::list([1, 2]));
        base.set_definition("a", Definition::new("A"));

        let mut other = Configuration::new();
        other.set_parameter("bar", "bar");
        other.set_parameter("foo", "overridden");
        other.set_definition("a", Definition::new("A2"));
        other.set_alias("alias_for_a", "a");

        base.merge(other);

        let keys: Vec<String> = base.parameters().keys().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["foo", "values", "bar"]);
        assert_eq!(base.parameter("foo"), Some(&Value::from("overridden")));
        assert_eq!(base.definitions()["a"].class(), "A2");
        assert_eq!(base.aliases()["alias_for_a"], "a");
    }

    #[test]
    fn test_definition_follows_alias() {
        let mut configuration = Configuration::new();
        configuration.set_definition("foo", Definition::new("FooClass"));
        configuration.set_alias("bar", "foo");

        assert_eq!(configuration.definition("bar").map(Definition::class), Some("FooClass"));
        assert!(configuration.has_definition("bar"));
        assert!(!configuration.has_definition("baz"));
    }

    #[test]
    fn test_definition_and_alias_replace_each_other() {
        let mut configuration = Configuration::new();
        configuration.set_alias("foo", "bar");
        configuration.set_definition("foo", Definition::new("FooClass"));
        assert!(configuration.aliases().is_empty());

        configuration.set_alias("foo", "baz");
        assert!(configuration.definitions().is_empty());
    }

    #[test]
    fn test_validate_rejects_dangling_alias() {
        let mut configuration = Configuration::new();
        configuration.set_definition("foo", Definition::new("FooClass"));
        configuration.set_alias("ok", "foo");
        assert!(configuration.validate().is_ok());

        configuration.set_alias("broken", "missing");
        let err = configuration.validate().unwrap_err();
        assert!(matches!(
            err,
            LoaderError::UnknownAliasTarget { ref alias, ref target }
                if alias == "broken" && target == "missing"
        ));
    }

    #[test]
    fn test_resources_are_deduplicated() {
        let mut configuration = Configuration::new();
        configuration.add_resource("a.xml");
        configuration.add_resource("a.xml");
        configuration.add_resource("b.xml");
        assert_eq!(configuration.resources().len(), 2);
    }

    #[test]
    fn test_is_empty() {
        let mut configuration = Configuration::new();
        configuration.add_resource("a.xml");
        assert!(configuration.is_empty());

        configuration.set_parameter("foo_bar", Reference::new("foo_bar"));
        assert!(!configuration.is_empty());
    }
}
