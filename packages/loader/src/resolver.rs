//! Parameter placeholder expansion.
//!
//! Loaded values keep `%name%` placeholders verbatim. [`ParameterResolver`]
//! expands them on demand against a configuration's parameters:
//!
//! - a string that is exactly `%name%` resolves to the parameter's typed value
//! - placeholders embedded in a longer string are replaced by the parameter's
//!   text, which must be a string, number or boolean
//! - `%%` is a literal `%`
//! - collections are resolved entry by entry
//!
//! # Security
//!
//! Nested lookups are bounded by [`crate::config::MAX_RESOLUTION_DEPTH`] and
//! self-referencing parameters are reported instead of recursing forever.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::config;
use crate::configuration::Configuration;
use crate::definition::{Definition, MethodCall};
use crate::error::{LoaderError, Result};
use crate::value::{Collection, Value};

/// A string consisting of a single placeholder.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static WHOLE_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^%([^%\s]+)%$").expect("valid regex"));

/// An escaped percent sign or a placeholder.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%%|%([^%\s]+)%").expect("valid regex"));

/// Expands `%name%` placeholders against a configuration's parameters.
///
/// # Example
///
/// ```
/// use servicewire_loader::{Configuration, ParameterResolver, Value};
///
/// let mut configuration = Configuration::new();
/// configuration.set_parameter("host", "localhost");
/// configuration.set_parameter("port", 8080);
///
/// let resolver = ParameterResolver::new(&configuration);
/// assert_eq!(
///     resolver.resolve_string("http://%host%:%port%/")?,
///     Value::from("http://localhost:8080/")
/// );
/// assert_eq!(resolver.resolve_string("%port%")?, Value::Int(8080));
/// # Ok::<(), servicewire_loader::LoaderError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ParameterResolver<'a> {
    configuration: &'a Configuration,
}

impl<'a> ParameterResolver<'a> {
    pub fn new(configuration: &'a Configuration) -> Self {
        Self { configuration }
    }

    /// Resolve every placeholder inside a value.
    pub fn resolve_value(&self, value: &Value) -> Result<Value> {
        self.resolve(value, &mut Vec::new())
    }

    /// Resolve the placeholders of a single string.
    pub fn resolve_string(&self, value: &str) -> Result<Value> {
        self.resolve_str(value, &mut Vec::new())
    }

    /// Resolve all parameters of the configuration.
    pub fn resolve_parameters(&self) -> Result<Collection> {
        let mut resolved = Collection::new();
        for (key, value) in self.configuration.parameters() {
            resolved.insert(key.clone(), self.resolve_value(value)?);
        }
        Ok(resolved)
    }

    /// Resolve a definition's class, file and argument lists.
    pub fn resolve_definition(&self, definition: &Definition) -> Result<Definition> {
        let class = self.resolve_text(definition.class())?;
        let mut resolved = definition
            .clone()
            .with_class(class)
            .with_arguments(self.resolve_collection(definition.arguments())?);

        if let Some(file) = definition.file() {
            resolved = resolved.with_file(self.resolve_text(file)?);
        }

        let calls = definition
            .method_calls()
            .iter()
            .map(|call| {
                Ok(MethodCall::new(
                    call.method.clone(),
                    self.resolve_collection(&call.arguments)?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(resolved.with_method_calls(calls))
    }

    /// Produce a copy of the configuration with parameters and definitions
    /// resolved.
    pub fn resolve_configuration(&self) -> Result<Configuration> {
        let mut resolved = Configuration::new();
        resolved.add_parameters(self.resolve_parameters()?);
        for (id, definition) in self.configuration.definitions() {
            resolved.set_definition(id.clone(), self.resolve_definition(definition)?);
        }
        for (alias, target) in self.configuration.aliases() {
            resolved.set_alias(alias.clone(), target.clone());
        }
        for resource in self.configuration.resources() {
            resolved.add_resource(resource);
        }
        Ok(resolved)
    }

    fn resolve_collection(&self, collection: &Collection) -> Result<Collection> {
        self.resolve_entries(collection, &mut Vec::new())
    }

    /// Resolve a string that must stay a string (class names, file paths).
    fn resolve_text(&self, value: &str) -> Result<String> {
        let mut stack = Vec::new();
        self.interpolate(value, &mut stack)
    }

    fn resolve(&self, value: &Value, stack: &mut Vec<String>) -> Result<Value> {
        match value {
            Value::String(s) => self.resolve_str(s, stack),
            Value::Collection(items) => self.resolve_entries(items, stack).map(Value::Collection),
            other => Ok(other.clone()),
        }
    }

    fn resolve_entries(&self, items: &Collection, stack: &mut Vec<String>) -> Result<Collection> {
        let mut resolved = Collection::new();
        for (key, item) in items {
            resolved.insert(key.clone(), self.resolve(item, stack)?);
        }
        Ok(resolved)
    }

    fn resolve_str(&self, value: &str, stack: &mut Vec<String>) -> Result<Value> {
        if let Some(name) = WHOLE_PLACEHOLDER.captures(value).and_then(|c| c.get(1)) {
            return self.lookup(name.as_str(), stack);
        }
        self.interpolate(value, stack).map(Value::String)
    }

    fn interpolate(&self, value: &str, stack: &mut Vec<String>) -> Result<String> {
        let mut output = String::with_capacity(value.len());
        let mut last = 0;

        for captures in PLACEHOLDER.captures_iter(value) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            output.push_str(&value[last..whole.start()]);
            output.push_str(&self.expand(value, &captures, stack)?);
            last = whole.end();
        }

        output.push_str(&value[last..]);
        Ok(output)
    }

    fn expand(
        &self,
        value: &str,
        captures: &Captures<'_>,
        stack: &mut Vec<String>,
    ) -> Result<String> {
        let Some(name) = captures.get(1) else {
            return Ok("%".to_string());
        };

        match self.lookup(name.as_str(), stack)? {
            Value::String(s) => Ok(s),
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(LoaderError::NonScalarInterpolation {
                name: name.as_str().to_string(),
                value: value.to_string(),
                kind: other.kind(),
            }),
        }
    }

    fn lookup(&self, name: &str, stack: &mut Vec<String>) -> Result<Value> {
        let key = name.to_lowercase();

        if stack.contains(&key) {
            let chain = stack
                .iter()
                .chain(std::iter::once(&key))
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(LoaderError::CircularParameter(chain));
        }
        if stack.len() >= config::MAX_RESOLUTION_DEPTH {
            return Err(LoaderError::ResolutionDepthExceeded(
                config::MAX_RESOLUTION_DEPTH,
            ));
        }

        let value = self
            .configuration
            .parameter(name)
            .ok_or_else(|| LoaderError::ParameterNotFound(name.to_string()))?;

        stack.push(key);
        let resolved = self.resolve(value, stack);
        stack.pop();
        resolved
    }
}
