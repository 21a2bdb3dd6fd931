//! Service definitions: how to construct one service instance.

use indexmap::IndexMap;

use crate::value::{Collection, Reference, Value};

/// Callable run on a freshly constructed service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Configurator {
    /// A plain function, by name.
    Function(String),
    /// A method on another service.
    Service(Reference, String),
    /// A static method on a class.
    Static(String, String),
}

impl Configurator {
    /// The method or function name that will be invoked.
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Configurator::Function(name) => name,
            Configurator::Service(_, method) | Configurator::Static(_, method) => method,
        }
    }
}

/// A method invoked on the service after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    /// Method name.
    pub method: String,
    /// Arguments, in declaration order.
    pub arguments: Collection,
}

impl MethodCall {
    /// Create a method call.
    #[must_use]
    pub fn new(method: impl Into<String>, arguments: Collection) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// Attributes of one annotation, in declaration order.
pub type AnnotationAttributes = IndexMap<String, Value>;

/// Declarative description of how to construct a service.
///
/// Built with the `with_*` methods and treated as immutable once it is
/// stored in a [`Configuration`](crate::Configuration).
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    class: String,
    arguments: Collection,
    shared: bool,
    constructor: Option<String>,
    file: Option<String>,
    configurator: Option<Configurator>,
    method_calls: Vec<MethodCall>,
    annotations: IndexMap<String, Vec<AnnotationAttributes>>,
}

impl Definition {
    /// Create a shared definition for the given class with no arguments.
    #[must_use]
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            arguments: Collection::new(),
            shared: true,
            constructor: None,
            file: None,
            configurator: None,
            method_calls: Vec::new(),
            annotations: IndexMap::new(),
        }
    }

    /// Replace the class name.
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    /// Replace the constructor arguments.
    #[must_use]
    pub fn with_arguments(mut self, arguments: Collection) -> Self {
        self.arguments = arguments;
        self
    }

    /// Append one constructor argument.
    ///
    /// The argument is dropped when the list already uses index `i64::MAX`;
    /// use [`Definition::with_arguments`] for explicit keys.
    #[must_use]
    pub fn with_argument(mut self, argument: impl Into<Value>) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Set whether one instance is shared by every consumer.
    #[must_use]
    pub fn with_shared(mut self, shared: bool) -> Self {
        self.shared = shared;
        self
    }

    /// Set a static constructor method.
    #[must_use]
    pub fn with_constructor(mut self, constructor: impl Into<String>) -> Self {
        self.constructor = Some(constructor.into());
        self
    }

    /// Set the file to include before constructing the service.
    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Set the configurator.
    #[must_use]
    pub fn with_configurator(mut self, configurator: Configurator) -> Self {
        self.configurator = Some(configurator);
        self
    }

    /// Append a method call.
    #[must_use]
    pub fn with_method_call(mut self, call: MethodCall) -> Self {
        self.method_calls.push(call);
        self
    }

    /// Replace all method calls.
    #[must_use]
    pub fn with_method_calls(mut self, calls: Vec<MethodCall>) -> Self {
        self.method_calls = calls;
        self
    }

    /// Add an annotation; the same name may be added several times.
    #[must_use]
    pub fn with_annotation(mut self, name: impl Into<String>, attributes: AnnotationAttributes) -> Self {
        self.annotations.entry(name.into()).or_default().push(attributes);
        self
    }

    /// Class name.
    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Constructor arguments.
    #[must_use]
    pub fn arguments(&self) -> &Collection {
        &self.arguments
    }

    /// Whether one instance is shared.
    #[must_use]
    pub fn is_shared(&self) -> bool {
        self.shared
    }

    /// Static constructor method.
    #[must_use]
    pub fn constructor(&self) -> Option<&str> {
        self.constructor.as_deref()
    }

    /// File to include before construction.
    #[must_use]
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Configurator.
    #[must_use]
    pub fn configurator(&self) -> Option<&Configurator> {
        self.configurator.as_ref()
    }

    /// Method calls, in declaration order.
    #[must_use]
    pub fn method_calls(&self) -> &[MethodCall] {
        &self.method_calls
    }

    /// Annotations by name.
    #[must_use]
    pub fn annotations(&self) -> &IndexMap<String, Vec<AnnotationAttributes>> {
        &self.annotations
    }

    /// Check whether an annotation with the given name exists.
    #[must_use]
    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.contains_key(name)
    }
}
