//! Extension trait definition.

use crate::configuration::Configuration;
use crate::error::Result;
use crate::value::Collection;

/// Trait for configuration extensions.
///
/// An extension owns one XML namespace (and a short alias used by the YAML
/// loader). Every top-level element in that namespace is converted into a
/// [`Collection`] and handed to [`Extension::load`] together with its local
/// tag name; the returned configuration is merged into the one being loaded.
pub trait Extension: Send + Sync {
    /// Short name, used as the `alias.tag` prefix in YAML files.
    fn alias(&self) -> &str;

    /// XML namespace URI handled by this extension.
    fn namespace(&self) -> &str;

    /// Build the configuration contributed by one tag.
    ///
    /// # Arguments
    /// * `tag` - Local name of the element (or YAML key suffix)
    /// * `config` - Converted element content
    ///
    /// # Errors
    /// Returns `UnknownExtensionTag` when the extension does not define `tag`.
    fn load(&self, tag: &str, config: &Collection) -> Result<Configuration>;
}
