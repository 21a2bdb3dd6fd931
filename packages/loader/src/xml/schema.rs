//! Structural validation of XML configuration documents.
//!
//! Validation is a pluggable collaborator of the loader: anything
//! implementing [`SchemaValidator`] can be handed to the
//! [`LoaderBuilder`](crate::LoaderBuilder). The default [`ServicesSchema`]
//! encodes the container vocabulary rules directly.

use roxmltree::{Document, Node};

use super::utils::{
    element_children, find_children, get_attribute, get_tag_name, has_text, is_services_element,
    position,
};
use crate::config::ROOT_ELEMENT;

/// Validator for parsed configuration documents.
pub trait SchemaValidator: Send + Sync {
    /// Validate a document and return every violation found.
    ///
    /// An empty list means the document is valid.
    fn validate(&self, document: &Document<'_>) -> Vec<String>;
}

/// Validator that accepts every well-formed document.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveSchema;

impl SchemaValidator for PermissiveSchema {
    fn validate(&self, _document: &Document<'_>) -> Vec<String> {
        Vec::new()
    }
}

/// Validator for the services vocabulary.
///
/// Top-level elements the vocabulary does not define are left alone: the
/// loader reports them separately as invalid tags or extension elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServicesSchema;

/// Values accepted by boolean attributes.
const BOOLEAN_VALUES: [&str; 6] = ["true", "false", "on", "off", "1", "0"];

/// Values accepted by the `type` attribute of parameters and arguments.
const VALUE_TYPES: [&str; 3] = ["collection", "service", "string"];

impl SchemaValidator for ServicesSchema {
    fn validate(&self, document: &Document<'_>) -> Vec<String> {
        let mut violations = Violations::default();
        let root = document.root_element();

        if !is_services_element(root) || get_tag_name(root) != ROOT_ELEMENT {
            violations.add(
                root,
                format!("root element must be <{ROOT_ELEMENT}>, found <{}>", get_tag_name(root)),
            );
            return violations.into_messages();
        }

        check_attributes(root, &[], &mut violations);
        check_no_text(root, &mut violations);

        let order = ["imports", "parameters", "services"];
        let mut last_stage: Option<usize> = None;

        for child in element_children(root).filter(|c| is_services_element(*c)) {
            let tag = get_tag_name(child);
            let Some(stage) = order.iter().position(|t| *t == tag) else {
                continue;
            };
            if last_stage.is_some_and(|last| last >= stage) {
                violations.add(
                    child,
                    format!(
                        "<{tag}> must appear at most once and in the order {}",
                        order.join(", ")
                    ),
                );
            }
            last_stage = Some(stage);

            match tag {
                "imports" => check_imports(child, &mut violations),
                "parameters" => check_parameters(child, &mut violations),
                _ => check_services(child, &mut violations),
            }
        }

        violations.into_messages()
    }
}

/// Accumulates violation messages with source positions.
#[derive(Default)]
struct Violations {
    messages: Vec<String>,
}

impl Violations {
    fn add(&mut self, node: Node<'_, '_>, message: impl AsRef<str>) {
        self.messages
            .push(format!("[{}] {}", position(node), message.as_ref()));
    }

    fn into_messages(self) -> Vec<String> {
        self.messages
    }
}

/// Allow only the listed unqualified attributes; namespaced ones are ignored.
fn check_attributes(node: Node<'_, '_>, allowed: &[&str], violations: &mut Violations) {
    for attribute in node.attributes() {
        if attribute.namespace().is_some() {
            continue;
        }
        if !allowed.contains(&attribute.name()) {
            violations.add(
                node,
                format!(
                    "attribute \"{}\" is not allowed on <{}>",
                    attribute.name(),
                    get_tag_name(node)
                ),
            );
        }
    }
}

fn check_required(node: Node<'_, '_>, name: &str, violations: &mut Violations) {
    if get_attribute(node, name).is_none_or(|v| v.trim().is_empty()) {
        violations.add(
            node,
            format!("<{}> requires a non-empty \"{name}\" attribute", get_tag_name(node)),
        );
    }
}

fn check_no_text(node: Node<'_, '_>, violations: &mut Violations) {
    if has_text(node) {
        violations.add(node, format!("<{}> must not contain text", get_tag_name(node)));
    }
}

/// Allow only the listed child elements, each from the services vocabulary.
fn check_children(node: Node<'_, '_>, allowed: &[&str], violations: &mut Violations) {
    for child in element_children(node) {
        if !is_services_element(child) || !allowed.contains(&get_tag_name(child)) {
            violations.add(
                child,
                format!(
                    "element <{}> is not allowed in <{}>",
                    get_tag_name(child),
                    get_tag_name(node)
                ),
            );
        }
    }
}

fn check_at_most_once(node: Node<'_, '_>, tag: &str, violations: &mut Violations) {
    if find_children(node, tag).count() > 1 {
        violations.add(
            node,
            format!("<{}> may contain at most one <{tag}>", get_tag_name(node)),
        );
    }
}

fn check_boolean(node: Node<'_, '_>, name: &str, violations: &mut Violations) {
    if let Some(value) = get_attribute(node, name) {
        if !BOOLEAN_VALUES.contains(&value.to_ascii_lowercase().as_str()) {
            violations.add(
                node,
                format!("attribute \"{name}\" must be a boolean, found \"{value}\""),
            );
        }
    }
}

fn check_imports(node: Node<'_, '_>, violations: &mut Violations) {
    check_attributes(node, &[], violations);
    check_no_text(node, violations);
    check_children(node, &["import"], violations);

    for import in find_children(node, "import") {
        check_attributes(import, &["resource", "type"], violations);
        check_required(import, "resource", violations);
        check_no_text(import, violations);
        check_children(import, &[], violations);
    }
}

fn check_parameters(node: Node<'_, '_>, violations: &mut Violations) {
    check_attributes(node, &[], violations);
    check_no_text(node, violations);
    check_children(node, &["parameter"], violations);

    for parameter in find_children(node, "parameter") {
        check_value(parameter, violations);
    }
}

/// Validate a `<parameter>` or `<argument>` element and its nested values.
fn check_value(node: Node<'_, '_>, violations: &mut Violations) {
    let tag = get_tag_name(node);
    check_attributes(node, &["key", "type", "id"], violations);

    let value_type = get_attribute(node, "type");
    if let Some(value_type) = value_type {
        if !VALUE_TYPES.contains(&value_type) {
            violations.add(
                node,
                format!(
                    "attribute \"type\" must be one of {}, found \"{value_type}\"",
                    VALUE_TYPES.join(", ")
                ),
            );
            return;
        }
    }

    let has_id = get_attribute(node, "id").is_some();
    match value_type {
        Some("collection") => {
            if has_id {
                violations.add(node, "attribute \"id\" is only allowed on service values");
            }
            check_no_text(node, violations);
            check_children(node, &[tag], violations);
            for child in find_children(node, tag) {
                check_value(child, violations);
            }
        }
        Some("service") => {
            check_no_text(node, violations);
            let inline: Vec<_> = element_children(node).collect();
            if has_id {
                check_required(node, "id", violations);
                check_children(node, &[], violations);
            } else if tag == "argument" && inline.len() == 1 {
                check_children(node, &["service"], violations);
                if is_services_element(inline[0]) && get_tag_name(inline[0]) == "service" {
                    check_service(inline[0], true, violations);
                }
            } else if tag == "argument" {
                violations.add(
                    node,
                    "a service argument needs an \"id\" or exactly one inline <service>",
                );
            } else {
                check_required(node, "id", violations);
            }
        }
        _ => {
            if has_id {
                violations.add(node, "attribute \"id\" is only allowed on service values");
            }
            check_children(node, &[], violations);
        }
    }
}

fn check_services(node: Node<'_, '_>, violations: &mut Violations) {
    check_attributes(node, &[], violations);
    check_no_text(node, violations);
    check_children(node, &["service"], violations);

    for service in find_children(node, "service") {
        check_service(service, false, violations);
    }
}

fn check_service(node: Node<'_, '_>, anonymous: bool, violations: &mut Violations) {
    check_no_text(node, violations);

    if !anonymous && get_attribute(node, "alias").is_some() {
        check_attributes(node, &["id", "alias"], violations);
        check_required(node, "id", violations);
        check_required(node, "alias", violations);
        check_children(node, &[], violations);
        return;
    }

    if anonymous {
        check_attributes(node, &["class", "shared", "constructor", "file"], violations);
    } else {
        check_attributes(
            node,
            &["id", "class", "shared", "constructor", "file"],
            violations,
        );
        check_required(node, "id", violations);
    }

    check_required(node, "class", violations);
    check_boolean(node, "shared", violations);
    check_children(
        node,
        &["file", "argument", "configurator", "method_call", "annotation"],
        violations,
    );
    check_at_most_once(node, "file", violations);
    check_at_most_once(node, "configurator", violations);

    let files: Vec<_> = find_children(node, "file").collect();
    if !files.is_empty() && get_attribute(node, "file").is_some() {
        violations.add(node, "file may be given as attribute or element, not both");
    }
    for file in files {
        check_attributes(file, &[], violations);
        check_children(file, &[], violations);
        if !has_text(file) {
            violations.add(file, "<file> must not be empty");
        }
    }

    for argument in find_children(node, "argument") {
        check_value(argument, violations);
    }
    for configurator in find_children(node, "configurator") {
        check_configurator(configurator, violations);
    }
    for call in find_children(node, "method_call") {
        check_attributes(call, &["method"], violations);
        check_required(call, "method", violations);
        check_no_text(call, violations);
        check_children(call, &["argument"], violations);
        for argument in find_children(call, "argument") {
            check_value(argument, violations);
        }
    }
    for annotation in find_children(node, "annotation") {
        check_required(annotation, "name", violations);
        check_no_text(annotation, violations);
        check_children(annotation, &[], violations);
    }
}

fn check_configurator(node: Node<'_, '_>, violations: &mut Violations) {
    check_attributes(node, &["function", "service", "class", "method"], violations);
    check_no_text(node, violations);
    check_children(node, &[], violations);

    let has = |name: &str| get_attribute(node, name).is_some();
    let valid = if has("function") {
        !has("service") && !has("class") && !has("method")
    } else {
        has("method") && (has("service") != has("class"))
    };

    if !valid {
        violations.add(
            node,
            "<configurator> needs either \"function\", or \"method\" with exactly one of \"service\" and \"class\"",
        );
    }
}
