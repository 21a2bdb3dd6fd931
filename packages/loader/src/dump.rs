//! YAML output for loaded configurations.
//!
//! The output uses the layout read by the YAML file loader, so a dump can be
//! loaded again.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_yaml_ng::{Mapping, Number, Value as YamlValue};

use crate::configuration::Configuration;
use crate::definition::{Configurator, Definition};
use crate::error::{LoaderError, Result};
use crate::value::{Collection, Key, Value};

/// Service representation for YAML serialization.
#[derive(Debug, Serialize)]
struct YamlService {
    class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    shared: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    constructor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    arguments: Option<YamlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    configurator: Option<YamlValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    calls: Vec<(String, YamlValue)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    annotations: Vec<Mapping>,
}

impl From<&Definition> for YamlService {
    fn from(definition: &Definition) -> Self {
        let configurator = definition.configurator().map(|c| match c {
            Configurator::Function(function) => YamlValue::String(function.clone()),
            Configurator::Service(service, method) => YamlValue::Sequence(vec![
                YamlValue::String(format!("@{}", service.id())),
                YamlValue::String(method.clone()),
            ]),
            Configurator::Static(class, method) => YamlValue::Sequence(vec![
                YamlValue::String(class.clone()),
                YamlValue::String(method.clone()),
            ]),
        });

        let annotations = definition
            .annotations()
            .iter()
            .flat_map(|(name, entries)| {
                entries.iter().map(move |attributes| {
                    let mut mapping = Mapping::new();
                    mapping.insert("name".into(), YamlValue::String(name.clone()));
                    for (key, value) in attributes {
                        mapping.insert(YamlValue::String(key.clone()), to_yaml_value(value));
                    }
                    mapping
                })
            })
            .collect();

        Self {
            class: definition.class().to_string(),
            shared: (!definition.is_shared()).then_some(false),
            constructor: definition.constructor().map(str::to_string),
            file: definition.file().map(str::to_string),
            arguments: (!definition.arguments().is_empty())
                .then(|| collection_to_yaml(definition.arguments())),
            configurator,
            calls: definition
                .method_calls()
                .iter()
                .map(|call| (call.method.clone(), collection_to_yaml(&call.arguments)))
                .collect(),
            annotations,
        }
    }
}

fn key_to_yaml(key: &Key) -> YamlValue {
    match key {
        Key::Index(i) => YamlValue::Number(Number::from(*i)),
        Key::Name(name) => YamlValue::String(name.clone()),
    }
}

/// Lists become sequences; keyed collections become mappings.
fn collection_to_yaml(collection: &Collection) -> YamlValue {
    if collection.is_list() {
        YamlValue::Sequence(collection.values().map(to_yaml_value).collect())
    } else {
        YamlValue::Mapping(
            collection
                .iter()
                .map(|(key, value)| (key_to_yaml(key), to_yaml_value(value)))
                .collect(),
        )
    }
}

/// Convert a [`Value`] into YAML; references are written as `@id` and
/// strings starting with `@` are escaped.
fn to_yaml_value(value: &Value) -> YamlValue {
    match value {
        Value::Null => YamlValue::Null,
        Value::Bool(b) => YamlValue::Bool(*b),
        Value::Int(i) => YamlValue::Number(Number::from(*i)),
        Value::Float(f) => YamlValue::Number(Number::from(*f)),
        Value::String(s) if s.starts_with('@') => YamlValue::String(format!("@{s}")),
        Value::String(s) => YamlValue::String(s.clone()),
        Value::Reference(reference) => YamlValue::String(format!("@{}", reference.id())),
        Value::Collection(collection) => collection_to_yaml(collection),
    }
}

/// Generate a YAML document from a configuration.
pub fn to_yaml(configuration: &Configuration) -> Result<String> {
    let mut root = Mapping::new();

    if !configuration.parameters().is_empty() {
        root.insert(
            "parameters".into(),
            collection_to_yaml(configuration.parameters()),
        );
    }

    let mut services = Mapping::new();
    for (id, definition) in configuration.definitions() {
        services.insert(
            YamlValue::String(id.clone()),
            serde_yaml_ng::to_value(YamlService::from(definition))?,
        );
    }
    for (alias, target) in configuration.aliases() {
        services.insert(
            YamlValue::String(alias.clone()),
            YamlValue::String(format!("@{target}")),
        );
    }
    if !services.is_empty() {
        root.insert("services".into(), YamlValue::Mapping(services));
    }

    let yaml = serde_yaml_ng::to_string(&YamlValue::Mapping(root))?;

    // Add document start marker and clean up trailing whitespace
    let lines: Vec<&str> = yaml.lines().map(str::trim_end).collect();
    Ok(format!("---\n{}\n", lines.join("\n")))
}

/// Save a configuration as a YAML file.
///
/// Writes to a temporary file next to the target, syncs it and renames it
/// into place, so an existing file is never left half-written.
pub fn save_yaml(configuration: &Configuration, output: &Path) -> Result<()> {
    let content = to_yaml(configuration)?;
    let io_error = |source| LoaderError::Io {
        path: output.to_path_buf(),
        source,
    };

    let file_name = output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_file = output.with_file_name(format!(".{file_name}.tmp"));

    let written = File::create(&temp_file).and_then(|mut file| {
        file.write_all(content.as_bytes())?;
        file.sync_all()
    });
    if let Err(source) = written {
        let _ = fs::remove_file(&temp_file);
        return Err(io_error(source));
    }

    // On Windows, rename fails if the destination already exists
    #[cfg(target_os = "windows")]
    if output.exists() {
        if let Err(source) = fs::remove_file(output) {
            let _ = fs::remove_file(&temp_file);
            return Err(io_error(source));
        }
    }

    if let Err(source) = fs::rename(&temp_file, output) {
        let _ = fs::remove_file(&temp_file);
        return Err(io_error(source));
    }
    tracing::debug!(path = %output.display(), "Saved configuration");
    Ok(())
}
