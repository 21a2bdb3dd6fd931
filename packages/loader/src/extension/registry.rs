//! Extension registry mapping namespaces and aliases to extensions.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use super::handler::Extension;

/// Registry of configuration extensions.
///
/// Extensions are looked up by XML namespace URI (XML loader) or by alias
/// (YAML loader). The registry is an explicit object owned by the
/// [`Loader`](crate::Loader); registration happens while building the loader,
/// before any file is loaded.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    by_namespace: HashMap<String, Arc<dyn Extension>>,
    by_alias: HashMap<String, Arc<dyn Extension>>,
}

impl ExtensionRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extension under its namespace and alias.
    ///
    /// A later registration for the same namespace or alias replaces the
    /// earlier one.
    pub fn register(&mut self, extension: impl Extension + 'static) {
        let extension: Arc<dyn Extension> = Arc::new(extension);
        tracing::debug!(
            namespace = extension.namespace(),
            alias = extension.alias(),
            "Registering extension"
        );
        self.by_namespace
            .insert(extension.namespace().to_string(), Arc::clone(&extension));
        self.by_alias
            .insert(extension.alias().to_string(), extension);
    }

    /// Get the extension handling a namespace.
    #[must_use]
    pub fn get(&self, namespace: &str) -> Option<&dyn Extension> {
        self.by_namespace.get(namespace).map(|e| e.as_ref())
    }

    /// Get the extension registered under an alias.
    #[must_use]
    pub fn get_by_alias(&self, alias: &str) -> Option<&dyn Extension> {
        self.by_alias.get(alias).map(|e| e.as_ref())
    }

    /// Check if an extension handles a namespace.
    #[must_use]
    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.by_namespace.contains_key(namespace)
    }

    /// Return set of all registered namespaces.
    #[must_use]
    pub fn registered_namespaces(&self) -> HashSet<&str> {
        self.by_namespace.keys().map(|s| s.as_str()).collect()
    }

    /// Number of registered namespaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_namespace.len()
    }

    /// Check whether no extension is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_namespace.is_empty()
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut namespaces: Vec<&str> = self.registered_namespaces().into_iter().collect();
        namespaces.sort_unstable();
        f.debug_struct("ExtensionRegistry")
            .field("namespaces", &namespaces)
            .finish()
    }
}
