//! XML configuration files.

use std::path::Path;

use roxmltree::{Document, Node};
use sha2::{Digest, Sha256};

use super::{has_extension, read_file, FileLoader, LoadContext};
use crate::config::{ANONYMOUS_ID_HASH_LEN, ROOT_ELEMENT};
use crate::configuration::Configuration;
use crate::definition::{AnnotationAttributes, Configurator, Definition, MethodCall};
use crate::error::{LoaderError, Result};
use crate::extension::ExtensionRegistry;
use crate::value::{coerce_scalar, Collection, Key, Reference, Value};
use crate::xml::{
    convert_element, direct_text, element_children, find_child, find_children, get_attribute,
    get_tag_name, get_text, is_services_element, position, SchemaValidator,
};

const SECTIONS: [&str; 3] = ["imports", "parameters", "services"];

/// Parse XML text and validate it.
///
/// # Errors
/// Returns `XmlParse` for malformed XML (DTDs are rejected) and
/// `SchemaViolation` with every violation the validator reports.
pub fn parse_document<'input>(
    path: &Path,
    content: &'input str,
    validator: &dyn SchemaValidator,
) -> Result<Document<'input>> {
    let document = Document::parse(content).map_err(|source| LoaderError::XmlParse {
        path: path.to_path_buf(),
        source,
    })?;

    let violations = validator.validate(&document);
    if !violations.is_empty() {
        return Err(LoaderError::SchemaViolation {
            path: path.to_path_buf(),
            message: violations.join("\n"),
        });
    }

    Ok(document)
}

/// Loads `.xml` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlFileLoader;

impl FileLoader for XmlFileLoader {
    fn name(&self) -> &'static str {
        "xml"
    }

    fn supports(&self, path: &Path) -> bool {
        has_extension(path, &["xml"])
    }

    fn load(&self, path: &Path, context: &mut LoadContext<'_>) -> Result<Configuration> {
        let content = read_file(path)?;
        let document = parse_document(path, &content, context.validator())?;
        let root = document.root_element();

        if get_tag_name(root) != ROOT_ELEMENT {
            return Err(violation(
                path,
                root,
                format!("the root element must be <{ROOT_ELEMENT}>"),
            ));
        }
        check_top_level_tags(path, root, context.extensions())?;

        let mut configuration = Configuration::new();
        configuration.add_resource(path);

        parse_imports(&mut configuration, root, path, context)?;

        let mut parser = ServiceParser::new(path);
        if let Some(parameters) = section(root, "parameters") {
            let values = parser.parse_values(&mut configuration, parameters, "parameter")?;
            configuration.add_parameters(values);
        }
        if let Some(services) = section(root, "services") {
            parser.parse_services(&mut configuration, services)?;
        }

        load_from_extensions(&mut configuration, root, path, context.extensions())?;

        tracing::debug!(
            path = %path.display(),
            definitions = configuration.definitions().len(),
            "Parsed XML file"
        );
        Ok(configuration)
    }
}

fn violation(path: &Path, node: Node<'_, '_>, message: impl AsRef<str>) -> LoaderError {
    LoaderError::SchemaViolation {
        path: path.to_path_buf(),
        message: format!("[{}] {}", position(node), message.as_ref()),
    }
}

fn required_attribute<'a>(path: &Path, node: Node<'a, '_>, name: &str) -> Result<&'a str> {
    get_attribute(node, name).ok_or_else(|| {
        violation(
            path,
            node,
            format!("<{}> requires the \"{name}\" attribute", get_tag_name(node)),
        )
    })
}

fn section<'a, 'input>(root: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    element_children(root).find(|node| is_services_element(*node) && get_tag_name(*node) == name)
}

/// Reject top-level tags nothing can handle before any pass runs.
fn check_top_level_tags(
    path: &Path,
    root: Node<'_, '_>,
    extensions: &ExtensionRegistry,
) -> Result<()> {
    for node in element_children(root) {
        let tag = get_tag_name(node);

        if is_services_element(node) {
            if !SECTIONS.contains(&tag) {
                return Err(LoaderError::InvalidTag {
                    tag: tag.to_string(),
                    path: path.to_path_buf(),
                });
            }
            continue;
        }

        let namespace = node.tag_name().namespace().unwrap_or_default();
        if !extensions.has_namespace(namespace) {
            return Err(LoaderError::MissingExtension {
                tag: tag.to_string(),
                namespace: namespace.to_string(),
                path: path.to_path_buf(),
            });
        }
    }
    Ok(())
}

fn parse_imports(
    configuration: &mut Configuration,
    root: Node<'_, '_>,
    path: &Path,
    context: &mut LoadContext<'_>,
) -> Result<()> {
    let Some(imports) = section(root, "imports") else {
        return Ok(());
    };

    for import in find_children(imports, "import") {
        let resource = required_attribute(path, import, "resource")?;
        let imported = context.import(resource, path, get_attribute(import, "type"))?;
        configuration.merge(imported);
    }
    Ok(())
}

fn load_from_extensions(
    configuration: &mut Configuration,
    root: Node<'_, '_>,
    path: &Path,
    extensions: &ExtensionRegistry,
) -> Result<()> {
    for node in element_children(root).filter(|node| !is_services_element(*node)) {
        let tag = get_tag_name(node);
        let namespace = node.tag_name().namespace().unwrap_or_default();
        let extension = extensions
            .get(namespace)
            .ok_or_else(|| LoaderError::MissingExtension {
                tag: tag.to_string(),
                namespace: namespace.to_string(),
                path: path.to_path_buf(),
            })?;

        let config = match convert_element(node) {
            Value::Collection(config) => config,
            other => std::iter::once(other).collect(),
        };

        tracing::debug!(extension = extension.alias(), tag, "Loading extension configuration");
        configuration.merge(extension.load(tag, &config)?);
    }
    Ok(())
}

/// Per-file state for building definitions: the anonymous id prefix and
/// counter.
struct ServiceParser<'p> {
    path: &'p Path,
    prefix: String,
    counter: usize,
}

impl<'p> ServiceParser<'p> {
    fn new(path: &'p Path) -> Self {
        let digest = hex::encode(Sha256::digest(path.to_string_lossy().as_bytes()));
        Self {
            path,
            prefix: digest[..ANONYMOUS_ID_HASH_LEN].to_string(),
            counter: 0,
        }
    }

    fn next_anonymous_id(&mut self) -> String {
        self.counter += 1;
        format!("_{}_{}", self.prefix, self.counter)
    }

    fn parse_services(
        &mut self,
        configuration: &mut Configuration,
        services: Node<'_, '_>,
    ) -> Result<()> {
        for service in find_children(services, "service") {
            let id = required_attribute(self.path, service, "id")?;

            if let Some(target) = get_attribute(service, "alias") {
                tracing::trace!(alias = id, target, "Registering alias");
                configuration.set_alias(id, target);
                continue;
            }

            let definition = self.parse_definition(configuration, service)?;
            configuration.set_definition(id, definition);
        }
        Ok(())
    }

    fn parse_definition(
        &mut self,
        configuration: &mut Configuration,
        service: Node<'_, '_>,
    ) -> Result<Definition> {
        let class = required_attribute(self.path, service, "class")?;
        let mut definition = Definition::new(class);

        if let Some(shared) = get_attribute(service, "shared") {
            let shared = parse_bool(shared).ok_or_else(|| {
                violation(self.path, service, format!("\"{shared}\" is not a boolean"))
            })?;
            definition = definition.with_shared(shared);
        }
        if let Some(constructor) = get_attribute(service, "constructor") {
            definition = definition.with_constructor(constructor);
        }
        if let Some(file) = get_attribute(service, "file") {
            definition = definition.with_file(file);
        }
        if let Some(file) = find_child(service, "file") {
            definition = definition.with_file(get_text(file));
        }

        let arguments = self.parse_values(configuration, service, "argument")?;
        definition = definition.with_arguments(arguments);

        if let Some(node) = find_child(service, "configurator") {
            definition = definition.with_configurator(self.parse_configurator(node)?);
        }

        for call in find_children(service, "method_call") {
            let method = required_attribute(self.path, call, "method")?;
            let arguments = self.parse_values(configuration, call, "argument")?;
            definition = definition.with_method_call(MethodCall::new(method, arguments));
        }

        for annotation in find_children(service, "annotation") {
            let name = required_attribute(self.path, annotation, "name")?;
            let attributes: AnnotationAttributes = annotation
                .attributes()
                .filter(|attribute| attribute.namespace().is_none() && attribute.name() != "name")
                .map(|attribute| (attribute.name().to_string(), coerce_scalar(attribute.value())))
                .collect();
            definition = definition.with_annotation(name, attributes);
        }

        Ok(definition)
    }

    fn parse_configurator(&self, node: Node<'_, '_>) -> Result<Configurator> {
        if let Some(function) = get_attribute(node, "function") {
            return Ok(Configurator::Function(function.to_string()));
        }

        let method = required_attribute(self.path, node, "method")?;
        if let Some(service) = get_attribute(node, "service") {
            Ok(Configurator::Service(Reference::new(service), method.to_string()))
        } else if let Some(class) = get_attribute(node, "class") {
            Ok(Configurator::Static(class.to_string(), method.to_string()))
        } else {
            Err(violation(
                self.path,
                node,
                "<configurator> needs \"function\", \"service\" or \"class\"",
            ))
        }
    }

    /// Collect the `tag` children of `node` into a collection.
    ///
    /// Parameter keys are lower-cased; argument keys are kept as written.
    fn parse_values(
        &mut self,
        configuration: &mut Configuration,
        node: Node<'_, '_>,
        tag: &str,
    ) -> Result<Collection> {
        let mut values = Collection::new();

        for child in find_children(node, tag) {
            let value = match get_attribute(child, "type") {
                Some("service") => self.parse_service_value(configuration, child)?,
                Some("collection") => Value::Collection(self.parse_values(configuration, child, tag)?),
                Some("string") => Value::String(direct_text(child)),
                _ => coerce_scalar(&get_text(child)),
            };

            match get_attribute(child, "key") {
                Some(key) if tag == "parameter" => {
                    values.insert(Key::parse(key).to_lowercase(), value);
                }
                Some(key) => {
                    values.insert(Key::parse(key), value);
                }
                None => {
                    values.push(value).ok_or_else(|| LoaderError::IndexOverflow {
                        tag: tag.to_string(),
                        path: self.path.to_path_buf(),
                    })?;
                }
            }
        }

        Ok(values)
    }

    /// Resolve a `type="service"` value, hoisting an inline service.
    fn parse_service_value(
        &mut self,
        configuration: &mut Configuration,
        node: Node<'_, '_>,
    ) -> Result<Value> {
        if let Some(id) = get_attribute(node, "id") {
            return Ok(Value::reference(id));
        }

        let inline = find_child(node, "service").ok_or_else(|| {
            violation(
                self.path,
                node,
                "a service value needs an \"id\" or an inline <service>",
            )
        })?;

        let id = self.next_anonymous_id();
        let definition = self.parse_definition(configuration, inline)?;
        tracing::debug!(id = %id, class = definition.class(), "Hoisting anonymous service");
        configuration.set_definition(id.clone(), definition);

        Ok(Value::reference(id))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match coerce_scalar(raw) {
        Value::Bool(value) => Some(value),
        Value::Int(1) => Some(true),
        Value::Int(0) => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SERVICES_NAMESPACE;
    use crate::extension::TagExtension;
    use crate::loader::{Loader, LoaderBuilder};
    use crate::xml::PermissiveSchema;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn load_xml(xml: &str) -> Result<Configuration> {
        load_with(Loader::builder(), xml)
    }

    fn load_with(builder: LoaderBuilder, xml: &str) -> Result<Configuration> {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("services.xml"), xml).unwrap();
        builder.path(dir.path()).build().load("services.xml")
    }

    fn container(body: &str) -> String {
        format!(r#"<?xml version="1.0"?><container xmlns="{SERVICES_NAMESPACE}">{body}</container>"#)
    }

    #[test]
    fn test_parse_document_rejects_malformed_xml() {
        let err = parse_document(Path::new("x.xml"), "<container>", &PermissiveSchema).unwrap_err();
        assert!(matches!(err, LoaderError::XmlParse { .. }));
    }

    #[test]
    fn test_parse_document_rejects_dtd() {
        let xml = r#"<!DOCTYPE container [<!ENTITY x "y">]><container>&x;</container>"#;
        let err = parse_document(Path::new("x.xml"), xml, &PermissiveSchema).unwrap_err();
        assert!(matches!(err, LoaderError::XmlParse { .. }));
    }

    #[test]
    fn test_parameter_keys_are_lowercased() {
        let configuration = load_xml(&container(
            r#"<parameters>
                <parameter key="FOO">bar</parameter>
                <parameter type="collection" key="Nested"><parameter key="Inner">1</parameter></parameter>
            </parameters>"#,
        ))
        .unwrap();

        assert_eq!(configuration.parameter("foo"), Some(&Value::from("bar")));
        let nested = configuration.parameter("nested").unwrap().as_collection().unwrap();
        assert_eq!(nested.get("inner"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_argument_keys_keep_case_and_continue_indexes() {
        let configuration = load_xml(&container(
            r#"<services>
                <service id="foo" class="Foo">
                    <argument key="Name">x</argument>
                    <argument key="5">five</argument>
                    <argument>six</argument>
                </service>
            </services>"#,
        ))
        .unwrap();

        let arguments = configuration.definition("foo").unwrap().arguments();
        assert_eq!(arguments.get("Name"), Some(&Value::from("x")));
        assert_eq!(arguments.get(6), Some(&Value::from("six")));
    }

    #[test]
    fn test_string_type_keeps_raw_text() {
        let configuration = load_xml(&container(
            r#"<parameters><parameter key="raw" type="string"> true </parameter></parameters>"#,
        ))
        .unwrap();

        assert_eq!(configuration.parameter("raw"), Some(&Value::from(" true ")));
    }

    #[test]
    fn test_anonymous_ids_are_stable_and_ordered() {
        let xml = container(
            r#"<services>
                <service id="foo" class="FooClass">
                    <argument type="service">
                        <service class="BarClass">
                            <argument type="service"><service class="BazClass"/></argument>
                        </service>
                    </argument>
                </service>
            </services>"#,
        );
        let first = load_xml(&xml).unwrap();
        let ids: Vec<&String> = first.definitions().keys().collect();

        assert_eq!(ids.len(), 3);
        assert!(ids[0].ends_with("_2"));
        assert!(ids[1].ends_with("_1"));
        assert_eq!(ids[2], "foo");
        assert_eq!(ids[0].len(), 1 + ANONYMOUS_ID_HASH_LEN + 2);

        let outer = first.definition(ids[1]).unwrap();
        assert_eq!(outer.class(), "BarClass");
        assert_eq!(outer.arguments().get(0), Some(&Value::Reference(Reference::new(ids[0].clone()))));
    }

    #[test]
    fn test_shared_accepts_boolean_like_values() {
        let configuration = load_xml(&container(
            r#"<services>
                <service id="a" class="A" shared="off"/>
                <service id="b" class="B" shared="0"/>
                <service id="c" class="C" shared="TRUE"/>
            </services>"#,
        ))
        .unwrap();

        assert!(!configuration.definition("a").unwrap().is_shared());
        assert!(!configuration.definition("b").unwrap().is_shared());
        assert!(configuration.definition("c").unwrap().is_shared());
    }

    #[test]
    fn test_annotations_are_collected() {
        let configuration = load_xml(&container(
            r#"<services>
                <service id="foo" class="Foo">
                    <annotation name="listener" event="boot" priority="10"/>
                    <annotation name="listener" event="shutdown"/>
                </service>
            </services>"#,
        ))
        .unwrap();

        let definition = configuration.definition("foo").unwrap();
        let listeners = &definition.annotations()["listener"];
        assert_eq!(listeners.len(), 2);
        assert_eq!(listeners[0]["priority"], Value::Int(10));
        assert_eq!(listeners[1]["event"], Value::from("shutdown"));
    }

    #[test]
    fn test_missing_class_is_rejected_without_schema() {
        let err = load_with(
            Loader::builder().validator(PermissiveSchema),
            &container(r#"<services><service id="foo"/></services>"#),
        )
        .unwrap_err();

        assert!(err.to_string().contains("requires the \"class\" attribute"));
    }

    #[test]
    fn test_wrong_root_is_rejected_without_schema() {
        let err = load_with(Loader::builder().validator(PermissiveSchema), "<config/>").unwrap_err();
        assert!(matches!(err, LoaderError::SchemaViolation { .. }));
    }

    #[test]
    fn test_extension_receives_scalar_wrapped_in_list() {
        let extension = TagExtension::new("project", "http://example.com/project").with_tag(
            "flag",
            |config: &Collection| {
                let mut configuration = Configuration::new();
                configuration.set_parameter("flag", config.get(0).cloned().unwrap_or_default());
                Ok(configuration)
            },
        );

        let xml = format!(
            r#"<container xmlns="{SERVICES_NAMESPACE}" xmlns:project="http://example.com/project">
                <project:flag>on</project:flag>
            </container>"#
        );
        let configuration = load_with(Loader::builder().extension(extension), &xml).unwrap();

        assert_eq!(configuration.parameter("flag"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_invalid_tag_fails_before_imports_are_loaded() {
        let xml = container(
            r#"<imports><import resource="missing.xml"/></imports><foobar/>"#,
        );
        let err = load_with(Loader::builder().validator(PermissiveSchema), &xml).unwrap_err();
        assert!(matches!(err, LoaderError::InvalidTag { ref tag, .. } if tag == "foobar"));
    }
}
