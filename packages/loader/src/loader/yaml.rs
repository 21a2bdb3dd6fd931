//! YAML configuration files.
//!
//! ```yaml
//! imports:
//!   - { resource: parameters.ini }
//! parameters:
//!   mailer.class: Mailer
//! services:
//!   mailer:
//!     class: "%mailer.class%"
//!     arguments: ["@transport", true]
//!   default_mailer: "@mailer"
//! project.bar:
//!   foo: bar
//! ```

use std::path::Path;

use serde_yaml_ng::{Mapping, Value as YamlValue};

use super::{has_extension, read_file, FileLoader, LoadContext};
use crate::configuration::Configuration;
use crate::definition::{AnnotationAttributes, Configurator, Definition, MethodCall};
use crate::error::{LoaderError, Result};
use crate::value::{Collection, Key, Reference, Value};

const SECTIONS: [&str; 3] = ["imports", "parameters", "services"];

const DEFINITION_KEYS: [&str; 8] = [
    "class",
    "shared",
    "constructor",
    "file",
    "arguments",
    "configurator",
    "calls",
    "annotations",
];

/// Loads `.yml` and `.yaml` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlFileLoader;

impl FileLoader for YamlFileLoader {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn supports(&self, path: &Path) -> bool {
        has_extension(path, &["yml", "yaml"])
    }

    fn load(&self, path: &Path, context: &mut LoadContext<'_>) -> Result<Configuration> {
        let content = read_file(path)?;
        let document: YamlValue =
            serde_yaml_ng::from_str(&content).map_err(|source| LoaderError::YamlParse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut configuration = Configuration::new();
        configuration.add_resource(path);

        let root = match document {
            YamlValue::Null => return Ok(configuration),
            YamlValue::Mapping(root) => root,
            _ => return Err(invalid(path, "the document must be a mapping")),
        };

        let mut extension_keys = Vec::new();
        for key in root.keys() {
            let key = key
                .as_str()
                .ok_or_else(|| invalid(path, "top-level keys must be strings"))?;
            if SECTIONS.contains(&key) {
                continue;
            }
            let Some((alias, tag)) = key.split_once('.') else {
                return Err(invalid(path, format!("\"{key}\" is not a valid top-level key")));
            };
            if context.extensions().get_by_alias(alias).is_none() {
                return Err(LoaderError::MissingExtension {
                    tag: tag.to_string(),
                    namespace: alias.to_string(),
                    path: path.to_path_buf(),
                });
            }
            extension_keys.push(key);
        }

        if let Some(imports) = root.get("imports") {
            parse_imports(&mut configuration, imports, path, context)?;
        }

        if let Some(parameters) = root.get("parameters") {
            match convert(path, parameters)? {
                Value::Null => {}
                Value::Collection(parameters) => configuration.add_parameters(parameters),
                _ => return Err(invalid(path, "\"parameters\" must be a mapping")),
            }
        }

        if let Some(services) = root.get("services") {
            parse_services(&mut configuration, services, path)?;
        }

        for key in extension_keys {
            let Some((alias, tag)) = key.split_once('.') else {
                continue;
            };
            let Some(extension) = context.extensions().get_by_alias(alias) else {
                continue;
            };
            let config = match root.get(key).map(|v| convert(path, v)).transpose()? {
                Some(Value::Collection(config)) => config,
                Some(other) => std::iter::once(other).collect(),
                None => Collection::new(),
            };

            tracing::debug!(extension = alias, tag, "Loading extension configuration");
            configuration.merge(extension.load(tag, &config)?);
        }

        Ok(configuration)
    }
}

fn invalid(path: &Path, message: impl Into<String>) -> LoaderError {
    LoaderError::InvalidYaml {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn parse_imports(
    configuration: &mut Configuration,
    imports: &YamlValue,
    path: &Path,
    context: &mut LoadContext<'_>,
) -> Result<()> {
    let imports = match imports {
        YamlValue::Null => return Ok(()),
        YamlValue::Sequence(imports) => imports,
        _ => return Err(invalid(path, "\"imports\" must be a list")),
    };

    for import in imports {
        let (resource, format) = match import {
            YamlValue::String(resource) => (resource.as_str(), None),
            YamlValue::Mapping(import) => {
                let resource = import
                    .get("resource")
                    .and_then(YamlValue::as_str)
                    .ok_or_else(|| invalid(path, "an import needs a \"resource\""))?;
                (resource, import.get("type").and_then(YamlValue::as_str))
            }
            _ => return Err(invalid(path, "an import must be a string or a mapping")),
        };
        configuration.merge(context.import(resource, path, format)?);
    }
    Ok(())
}

fn parse_services(
    configuration: &mut Configuration,
    services: &YamlValue,
    path: &Path,
) -> Result<()> {
    let services = match services {
        YamlValue::Null => return Ok(()),
        YamlValue::Mapping(services) => services,
        _ => return Err(invalid(path, "\"services\" must be a mapping")),
    };

    for (id, service) in services {
        let id = scalar_string(id).ok_or_else(|| invalid(path, "service ids must be scalars"))?;

        match service {
            YamlValue::String(target) => {
                let target = target.strip_prefix('@').ok_or_else(|| {
                    invalid(path, format!("service \"{id}\": an alias must start with \"@\""))
                })?;
                configuration.set_alias(id, target);
            }
            YamlValue::Mapping(service) => {
                if let Some(target) = service.get("alias") {
                    let target = target.as_str().ok_or_else(|| {
                        invalid(path, format!("service \"{id}\": \"alias\" must be a string"))
                    })?;
                    configuration.set_alias(id, target);
                } else {
                    let definition = parse_definition(path, &id, service)?;
                    configuration.set_definition(id, definition);
                }
            }
            _ => {
                return Err(invalid(
                    path,
                    format!("service \"{id}\" must be a mapping or an alias"),
                ))
            }
        }
    }
    Ok(())
}

fn parse_definition(path: &Path, id: &str, service: &Mapping) -> Result<Definition> {
    let error = |message: &str| invalid(path, format!("service \"{id}\": {message}"));

    for key in service.keys() {
        let key = key.as_str().unwrap_or_default();
        if !DEFINITION_KEYS.contains(&key) {
            return Err(error(&format!("unknown key \"{key}\"")));
        }
    }

    let string = |key: &str| -> Result<Option<String>> {
        match service.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_str()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| error(&format!("\"{key}\" must be a string"))),
        }
    };

    let class = string("class")?.ok_or_else(|| error("\"class\" is required"))?;
    let mut definition = Definition::new(class);

    if let Some(shared) = service.get("shared") {
        let shared = shared
            .as_bool()
            .ok_or_else(|| error("\"shared\" must be a boolean"))?;
        definition = definition.with_shared(shared);
    }
    if let Some(constructor) = string("constructor")? {
        definition = definition.with_constructor(constructor);
    }
    if let Some(file) = string("file")? {
        definition = definition.with_file(file);
    }
    if let Some(arguments) = service.get("arguments") {
        definition = definition.with_arguments(
            list(path, arguments).ok_or_else(|| error("\"arguments\" must be a list"))??,
        );
    }
    if let Some(configurator) = service.get("configurator") {
        definition = definition.with_configurator(
            parse_configurator(configurator).ok_or_else(|| {
                error("\"configurator\" must be a function name or a [class or @service, method] pair")
            })?,
        );
    }
    if let Some(calls) = service.get("calls") {
        let calls = calls
            .as_sequence()
            .ok_or_else(|| error("\"calls\" must be a list"))?;
        for call in calls {
            let (method, arguments) = match call.as_sequence().map(Vec::as_slice) {
                Some([method]) => (method, None),
                Some([method, arguments]) => (method, Some(arguments)),
                _ => return Err(error("a call must be [method] or [method, [arguments]]")),
            };
            let method = method
                .as_str()
                .ok_or_else(|| error("a call method must be a string"))?;
            let arguments = match arguments {
                None => Collection::new(),
                Some(arguments) => list(path, arguments)
                    .ok_or_else(|| error("call arguments must be a list"))??,
            };
            definition = definition.with_method_call(MethodCall::new(method, arguments));
        }
    }
    if let Some(annotations) = service.get("annotations") {
        let annotations = annotations
            .as_sequence()
            .ok_or_else(|| error("\"annotations\" must be a list"))?;
        for annotation in annotations {
            let annotation = annotation
                .as_mapping()
                .ok_or_else(|| error("an annotation must be a mapping"))?;
            let name = annotation
                .get("name")
                .and_then(YamlValue::as_str)
                .ok_or_else(|| error("an annotation needs a \"name\""))?;
            let mut attributes = AnnotationAttributes::new();
            for (key, value) in annotation {
                let key = scalar_string(key).unwrap_or_default();
                if key != "name" {
                    attributes.insert(key, convert(path, value)?);
                }
            }
            definition = definition.with_annotation(name, attributes);
        }
    }

    Ok(definition)
}

/// Convert an argument list, given as a sequence or as a keyed mapping;
/// `None` for any other value.
fn list(path: &Path, value: &YamlValue) -> Option<Result<Collection>> {
    match value {
        YamlValue::Sequence(items) => Some(convert_sequence(path, items)),
        YamlValue::Mapping(entries) => Some(convert_mapping(path, entries)),
        YamlValue::Null => Some(Ok(Collection::new())),
        _ => None,
    }
}

fn parse_configurator(value: &YamlValue) -> Option<Configurator> {
    match value {
        YamlValue::String(function) => Some(Configurator::Function(function.clone())),
        YamlValue::Sequence(pair) => match pair.as_slice() {
            [target, method] => {
                let target = target.as_str()?;
                let method = method.as_str()?.to_string();
                Some(match target.strip_prefix('@') {
                    Some(service) => Configurator::Service(Reference::new(service), method),
                    None => Configurator::Static(target.to_string(), method),
                })
            }
            _ => None,
        },
        _ => None,
    }
}

fn scalar_string(value: &YamlValue) -> Option<String> {
    match value {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Number(n) => Some(n.to_string()),
        YamlValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Convert a YAML value into a [`Value`].
///
/// Strings starting with `@` become references; `@@` escapes a literal `@`.
fn convert(path: &Path, value: &YamlValue) -> Result<Value> {
    Ok(match value {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(*b),
        YamlValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map_or(Value::Null, Value::Float),
        },
        YamlValue::String(s) => {
            if let Some(rest) = s.strip_prefix("@@") {
                Value::String(format!("@{rest}"))
            } else if let Some(id) = s.strip_prefix('@') {
                Value::reference(id)
            } else {
                Value::String(s.clone())
            }
        }
        YamlValue::Sequence(items) => Value::Collection(convert_sequence(path, items)?),
        YamlValue::Mapping(entries) => Value::Collection(convert_mapping(path, entries)?),
        YamlValue::Tagged(tagged) => convert(path, &tagged.value)?,
    })
}

fn convert_sequence(path: &Path, items: &[YamlValue]) -> Result<Collection> {
    items.iter().map(|item| convert(path, item)).collect()
}

fn convert_mapping(path: &Path, entries: &Mapping) -> Result<Collection> {
    let mut collection = Collection::new();
    for (key, item) in entries {
        let key = match key {
            YamlValue::Number(n) => match n.as_i64() {
                Some(i) => Key::Index(i),
                None => Key::Name(n.to_string()),
            },
            other => Key::parse(
                &scalar_string(other)
                    .ok_or_else(|| invalid(path, "mapping keys must be scalars"))?,
            ),
        };
        collection.insert(key, convert(path, item)?);
    }
    Ok(collection)
}
