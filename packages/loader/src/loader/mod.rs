//! Loading orchestration.
//!
//! A [`Loader`] locates configuration files, picks a [`FileLoader`] per file
//! format and tracks the import chain of one load call in a [`LoadContext`].
//!
//! Loading runs in passes: imports first, then local parameters and
//! services, then extension elements. The result is checked with
//! [`Configuration::validate`] before it is returned.

mod ini;
mod xml;
mod yaml;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{MAX_FILE_SIZE, MAX_IMPORT_DEPTH};
use crate::configuration::Configuration;
use crate::error::{LoaderError, Result};
use crate::extension::{Extension, ExtensionRegistry};
use crate::xml::{SchemaValidator, ServicesSchema};

pub use ini::IniFileLoader;
pub use xml::{parse_document, XmlFileLoader};
pub use yaml::YamlFileLoader;

/// Trait for per-format file loaders.
pub trait FileLoader: Send + Sync {
    /// Format name, matched against the `type` of an import.
    fn name(&self) -> &'static str;

    /// Check whether this loader handles the file, judging by its name.
    fn supports(&self, path: &Path) -> bool;

    /// Load one file.
    ///
    /// Imports are loaded through `context`, which resolves their paths and
    /// guards against cycles.
    fn load(&self, path: &Path, context: &mut LoadContext<'_>) -> Result<Configuration>;
}

/// Check a path's extension against a list, ignoring case.
pub(crate) fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

/// Read a configuration file, enforcing [`MAX_FILE_SIZE`].
///
/// # Errors
/// Returns `FileNotFound` if the file does not exist, `FileTooLarge` if it
/// exceeds the limit and `Io` for any other read failure.
pub fn read_file(path: &Path) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|source| io_error(path, source))?;
    if metadata.len() > MAX_FILE_SIZE {
        return Err(LoaderError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            limit: MAX_FILE_SIZE,
        });
    }
    fs::read_to_string(path).map_err(|source| io_error(path, source))
}

fn io_error(path: &Path, source: std::io::Error) -> LoaderError {
    if source.kind() == std::io::ErrorKind::NotFound {
        LoaderError::FileNotFound {
            resource: path.display().to_string(),
            searched: path
                .parent()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    } else {
        LoaderError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Entry point for loading configuration files.
///
/// # Example
///
/// ```no_run
/// use servicewire_loader::Loader;
///
/// let loader = Loader::new("config");
/// let configuration = loader.load("services.xml")?;
/// println!("{} services", configuration.definitions().len());
/// # Ok::<(), servicewire_loader::LoaderError>(())
/// ```
pub struct Loader {
    paths: Vec<PathBuf>,
    extensions: ExtensionRegistry,
    validator: Box<dyn SchemaValidator>,
    file_loaders: Vec<Box<dyn FileLoader>>,
}

impl Loader {
    /// Create a loader searching one directory, with default collaborators.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::builder().path(path).build()
    }

    /// Start building a loader.
    #[must_use]
    pub fn builder() -> LoaderBuilder {
        LoaderBuilder::default()
    }

    /// Directories searched for relative resources.
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Registered extensions.
    #[must_use]
    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    /// Schema validator applied to XML documents.
    #[must_use]
    pub fn validator(&self) -> &dyn SchemaValidator {
        self.validator.as_ref()
    }

    /// Resolve a resource name to an existing file.
    ///
    /// Absolute paths are used as-is. Relative paths are tried against
    /// `current_dir` (the directory of the importing file), then against
    /// each search path in order, then relative to the working directory.
    ///
    /// # Errors
    /// Returns `FileNotFound` listing the searched locations.
    pub fn locate(&self, resource: &str, current_dir: Option<&Path>) -> Result<PathBuf> {
        let candidate = Path::new(resource);
        let mut searched: Vec<String> = Vec::new();

        if candidate.is_absolute() {
            if candidate.is_file() {
                return Ok(candidate.to_path_buf());
            }
        } else {
            let bases = current_dir.into_iter().chain(self.paths.iter().map(PathBuf::as_path));
            for base in bases {
                let path = base.join(candidate);
                if path.is_file() {
                    return Ok(path);
                }
                searched.push(base.display().to_string());
            }
            if candidate.is_file() {
                return Ok(candidate.to_path_buf());
            }
        }

        Err(LoaderError::FileNotFound {
            resource: resource.to_string(),
            searched: searched.join(", "),
        })
    }

    /// Pick the file loader for a path.
    ///
    /// An explicit `format` selects the loader by [`FileLoader::name`];
    /// otherwise the first loader that [`supports`](FileLoader::supports)
    /// the path wins.
    ///
    /// # Errors
    /// Returns `UnsupportedFormat` when no loader matches.
    pub fn file_loader_for(&self, path: &Path, format: Option<&str>) -> Result<&dyn FileLoader> {
        let found = match format {
            Some(format) => self
                .file_loaders
                .iter()
                .find(|l| l.name().eq_ignore_ascii_case(format)),
            None => self.file_loaders.iter().find(|l| l.supports(path)),
        };

        found
            .map(|l| l.as_ref())
            .ok_or_else(|| LoaderError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: format.map(str::to_string),
            })
    }

    /// Load a configuration file and everything it imports.
    ///
    /// # Errors
    /// Any invalid input aborts the load; no partial configuration is
    /// returned. Dangling aliases are reported as `UnknownAliasTarget`.
    pub fn load(&self, resource: &str) -> Result<Configuration> {
        let path = self.locate(resource, None)?;
        tracing::debug!(resource, path = %path.display(), "Loading configuration");

        let mut context = LoadContext::new(self);
        let configuration = context.load_file(&path, None)?;
        configuration.validate()?;

        tracing::debug!(
            parameters = configuration.parameters().len(),
            definitions = configuration.definitions().len(),
            aliases = configuration.aliases().len(),
            "Configuration loaded"
        );
        Ok(configuration)
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let loaders: Vec<&str> = self.file_loaders.iter().map(|l| l.name()).collect();
        f.debug_struct("Loader")
            .field("paths", &self.paths)
            .field("extensions", &self.extensions)
            .field("file_loaders", &loaders)
            .finish()
    }
}

/// Builder for [`Loader`].
#[derive(Default)]
pub struct LoaderBuilder {
    paths: Vec<PathBuf>,
    extensions: ExtensionRegistry,
    validator: Option<Box<dyn SchemaValidator>>,
    file_loaders: Vec<Box<dyn FileLoader>>,
}

impl LoaderBuilder {
    /// Add a search path.
    #[must_use]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// Add several search paths.
    #[must_use]
    pub fn paths<P: Into<PathBuf>>(mut self, paths: impl IntoIterator<Item = P>) -> Self {
        self.paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Register an extension.
    #[must_use]
    pub fn extension(mut self, extension: impl Extension + 'static) -> Self {
        self.extensions.register(extension);
        self
    }

    /// Replace the extension registry.
    #[must_use]
    pub fn extensions(mut self, extensions: ExtensionRegistry) -> Self {
        self.extensions = extensions;
        self
    }

    /// Replace the default [`ServicesSchema`] validator.
    #[must_use]
    pub fn validator(mut self, validator: impl SchemaValidator + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Add a file loader; it takes precedence over the built-in ones.
    #[must_use]
    pub fn file_loader(mut self, loader: impl FileLoader + 'static) -> Self {
        self.file_loaders.push(Box::new(loader));
        self
    }

    /// Build the loader, appending the XML, YAML and INI loaders.
    #[must_use]
    pub fn build(self) -> Loader {
        let mut file_loaders = self.file_loaders;
        file_loaders.push(Box::new(XmlFileLoader));
        file_loaders.push(Box::new(YamlFileLoader));
        file_loaders.push(Box::new(IniFileLoader));

        Loader {
            paths: self.paths,
            extensions: self.extensions,
            validator: self
                .validator
                .unwrap_or_else(|| Box::new(ServicesSchema)),
            file_loaders,
        }
    }
}

/// State of one [`Loader::load`] call.
///
/// Holds the chain of files currently being loaded, used to detect circular
/// imports and to bound import depth.
pub struct LoadContext<'a> {
    loader: &'a Loader,
    stack: Vec<PathBuf>,
}

impl<'a> LoadContext<'a> {
    /// Create a context with an empty import chain.
    #[must_use]
    pub fn new(loader: &'a Loader) -> Self {
        Self {
            loader,
            stack: Vec::new(),
        }
    }

    /// The loader driving this context.
    #[must_use]
    pub fn loader(&self) -> &'a Loader {
        self.loader
    }

    /// Registered extensions.
    #[must_use]
    pub fn extensions(&self) -> &'a ExtensionRegistry {
        &self.loader.extensions
    }

    /// Schema validator for XML documents.
    #[must_use]
    pub fn validator(&self) -> &'a dyn SchemaValidator {
        self.loader.validator.as_ref()
    }

    /// Number of files currently being loaded.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Load a resource imported by `from`.
    ///
    /// The resource is resolved relative to the importing file first.
    pub fn import(
        &mut self,
        resource: &str,
        from: &Path,
        format: Option<&str>,
    ) -> Result<Configuration> {
        let path = self.loader.locate(resource, from.parent())?;
        tracing::debug!(
            resource,
            from = %from.display(),
            format = format.unwrap_or("auto"),
            "Importing"
        );
        self.load_file(&path, format)
    }

    /// Load a located file with the matching file loader.
    ///
    /// # Errors
    /// Returns `CircularImport` if the file is already being loaded and
    /// `ImportDepthExceeded` past [`MAX_IMPORT_DEPTH`].
    pub fn load_file(&mut self, path: &Path, format: Option<&str>) -> Result<Configuration> {
        let canonical = fs::canonicalize(path).map_err(|source| io_error(path, source))?;

        if self.stack.contains(&canonical) {
            let chain = self
                .stack
                .iter()
                .chain(std::iter::once(&canonical))
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(LoaderError::CircularImport { chain });
        }
        if self.stack.len() >= MAX_IMPORT_DEPTH {
            return Err(LoaderError::ImportDepthExceeded {
                path: canonical,
                limit: MAX_IMPORT_DEPTH,
            });
        }

        let file_loader = self.loader.file_loader_for(&canonical, format)?;
        tracing::debug!(
            path = %canonical.display(),
            loader = file_loader.name(),
            depth = self.stack.len(),
            "Loading file"
        );

        self.stack.push(canonical.clone());
        let result = file_loader.load(&canonical, self);
        self.stack.pop();
        result
    }
}

impl fmt::Debug for LoadContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadContext")
            .field("stack", &self.stack)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::PermissiveSchema;
    use std::fs;

    struct JsonLoader;

    impl FileLoader for JsonLoader {
        fn name(&self) -> &'static str {
            "json"
        }

        fn supports(&self, path: &Path) -> bool {
            has_extension(path, &["json"])
        }

        fn load(&self, path: &Path, _context: &mut LoadContext<'_>) -> Result<Configuration> {
            let mut configuration = Configuration::new();
            configuration.add_resource(path);
            configuration.set_parameter("loaded_by", "json");
            Ok(configuration)
        }
    }

    #[test]
    fn test_has_extension() {
        assert!(has_extension(Path::new("a/services.XML"), &["xml"]));
        assert!(has_extension(Path::new("a.yml"), &["yml", "yaml"]));
        assert!(!has_extension(Path::new("a.ini.bak"), &["ini"]));
        assert!(!has_extension(Path::new("noext"), &["xml"]));
    }

    #[test]
    fn test_locate_searches_paths_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(second.path().join("services.xml"), "<container/>").unwrap();

        let loader = Loader::builder()
            .path(first.path())
            .path(second.path())
            .build();

        let located = loader.locate("services.xml", None).unwrap();
        assert_eq!(located, second.path().join("services.xml"));
    }

    #[test]
    fn test_locate_prefers_current_dir() {
        let base = tempfile::tempdir().unwrap();
        let nested = base.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(base.path().join("a.xml"), "<container/>").unwrap();
        fs::write(nested.join("a.xml"), "<container/>").unwrap();

        let loader = Loader::new(base.path());
        let located = loader.locate("a.xml", Some(&nested)).unwrap();
        assert_eq!(located, nested.join("a.xml"));
    }

    #[test]
    fn test_locate_missing_file_lists_searched_paths() {
        let dir = tempfile::tempdir().unwrap();
        let loader = Loader::new(dir.path());

        let err = loader.locate("foo.xml", None).unwrap_err();
        match err {
            LoaderError::FileNotFound { resource, searched } => {
                assert_eq!(resource, "foo.xml");
                assert_eq!(searched, dir.path().display().to_string());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_file_loader_selection() {
        let loader = Loader::builder().file_loader(JsonLoader).build();

        let by_extension = loader.file_loader_for(Path::new("a.json"), None).unwrap();
        assert_eq!(by_extension.name(), "json");

        let by_format = loader
            .file_loader_for(Path::new("a.conf"), Some("YAML"))
            .unwrap();
        assert_eq!(by_format.name(), "yaml");

        let default_xml = loader.file_loader_for(Path::new("a.xml"), None).unwrap();
        assert_eq!(default_xml.name(), "xml");

        assert!(matches!(
            loader.file_loader_for(Path::new("a.toml"), None),
            Err(LoaderError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_custom_file_loader_is_used_by_load() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("services.json"), "{}").unwrap();

        let loader = Loader::builder()
            .path(dir.path())
            .file_loader(JsonLoader)
            .build();
        let configuration = loader.load("services.json").unwrap();

        assert_eq!(configuration.parameter("loaded_by"), Some(&"json".into()));
    }

    #[test]
    fn test_read_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_file(&dir.path().join("missing.xml")).unwrap_err();
        assert!(matches!(err, LoaderError::FileNotFound { .. }));
    }

    #[test]
    fn test_builder_keeps_custom_validator() {
        let loader = Loader::builder().validator(PermissiveSchema).build();
        let doc = roxmltree::Document::parse("<anything/>").unwrap();
        assert!(loader.validator().validate(&doc).is_empty());
        assert!(format!("{loader:?}").contains(r#"file_loaders: ["xml", "yaml", "ini"]"#));
    }
}
