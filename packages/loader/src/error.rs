//! Error types for the loader.
//!
//! Every failure is an invalid-input error: the configuration on disk must be
//! fixed. Errors are raised where they are detected and returned unmodified;
//! no partial configuration is ever handed back.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the loader library.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The resource could not be found in any search path.
    #[error("The file \"{resource}\" does not exist (in: {searched})")]
    FileNotFound { resource: String, searched: String },

    /// Reading a file failed.
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is larger than the configured limit.
    #[error("{} is {size} bytes, exceeding the {limit} byte limit", .path.display())]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    /// The file is not well-formed XML.
    #[error("{} is not a valid XML file: {source}", .path.display())]
    XmlParse {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    /// The document does not validate against the services schema.
    #[error("{} does not validate against the services schema:\n{message}", .path.display())]
    SchemaViolation { path: PathBuf, message: String },

    /// A top-level tag in the services namespace is not part of the vocabulary.
    #[error("The <{tag}> tag is not valid (in {})", .path.display())]
    InvalidTag { tag: String, path: PathBuf },

    /// A foreign namespace has no registered extension.
    #[error("There is no extension able to load the configuration for <{tag}> (namespace \"{namespace}\", in {})", .path.display())]
    MissingExtension {
        tag: String,
        namespace: String,
        path: PathBuf,
    },

    /// An extension does not define the requested tag.
    #[error("The <{tag}> tag is not defined in the \"{extension}\" extension")]
    UnknownExtensionTag { tag: String, extension: String },

    /// An extension rejected the configuration it was given.
    #[error("Invalid configuration for <{tag}>: {message}")]
    InvalidExtensionConfig { tag: String, message: String },

    /// The file is not valid YAML.
    #[error("{} is not a valid YAML file: {source}", .path.display())]
    YamlParse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    /// The YAML is well-formed but does not describe a configuration.
    #[error("Invalid configuration in {}: {message}", .path.display())]
    InvalidYaml { path: PathBuf, message: String },

    /// YAML serialization failed.
    #[error("YAML serialization failed: {0}")]
    YamlSerialization(#[from] serde_yaml_ng::Error),

    /// An unkeyed value was added after the largest possible index.
    #[error("Cannot append another <{tag}> in {}: index {} is already used", .path.display(), i64::MAX)]
    IndexOverflow { tag: String, path: PathBuf },

    /// An INI line could not be parsed.
    #[error("Syntax error in {} at line {line}: {message}", .path.display())]
    IniSyntax {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// No file loader accepts the resource.
    #[error("No loader is able to load {}{}", .path.display(), .format.as_ref().map(|f| format!(" as \"{f}\"")).unwrap_or_default())]
    UnsupportedFormat {
        path: PathBuf,
        format: Option<String>,
    },

    /// A file imports itself, directly or indirectly.
    #[error("Circular import detected: {chain}")]
    CircularImport { chain: String },

    /// Imports nest deeper than allowed.
    #[error("Import depth exceeds {limit} at {}", .path.display())]
    ImportDepthExceeded { path: PathBuf, limit: usize },

    /// An alias points to a service that is not defined.
    #[error("Alias \"{alias}\" points to undefined service \"{target}\"")]
    UnknownAliasTarget { alias: String, target: String },

    /// A `%name%` placeholder names an unknown parameter.
    #[error("Parameter \"{0}\" is not defined")]
    ParameterNotFound(String),

    /// Parameters refer to each other in a cycle.
    #[error("Circular parameter reference: {0}")]
    CircularParameter(String),

    /// A placeholder embedded in a longer string resolved to a non-scalar.
    #[error("Parameter \"{name}\" cannot be embedded in \"{value}\": {kind} values are not strings or numbers")]
    NonScalarInterpolation {
        name: String,
        value: String,
        kind: &'static str,
    },

    /// Parameter resolution nests deeper than allowed.
    #[error("Parameter resolution exceeds depth {0}")]
    ResolutionDepthExceeded(usize),
}

/// Result type alias for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;
