//! XML utility functions for navigating and extracting data from DOM trees.

use roxmltree::Node;

use crate::config::SERVICES_NAMESPACE;

/// Get the tag name without namespace prefix.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use servicewire_loader::xml::get_tag_name;
///
/// let xml = r#"<container><services/></container>"#;
/// let doc = Document::parse(xml).unwrap();
/// let services = doc.root_element().first_element_child().unwrap();
/// assert_eq!(get_tag_name(services), "services");
/// ```
pub fn get_tag_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

/// Check whether an element belongs to the services vocabulary.
///
/// Elements without a namespace are treated as part of the vocabulary so
/// that hand-written files may omit the `xmlns` declaration.
pub fn is_services_element(node: Node<'_, '_>) -> bool {
    node.is_element()
        && matches!(node.tag_name().namespace(), None | Some(SERVICES_NAMESPACE))
}

/// Find the first child element with the given tag name.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use servicewire_loader::xml::find_child;
///
/// let xml = r#"<service><file>foo.php</file><argument/></service>"#;
/// let doc = Document::parse(xml).unwrap();
/// let root = doc.root_element();
///
/// assert!(find_child(root, "file").is_some());
/// assert!(find_child(root, "configurator").is_none());
/// ```
pub fn find_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && get_tag_name(*child) == tag)
}

/// Find all child elements with the given tag name.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use servicewire_loader::xml::find_children;
///
/// let xml = r#"<service><argument>1</argument><file/><argument>2</argument></service>"#;
/// let doc = Document::parse(xml).unwrap();
/// let root = doc.root_element();
///
/// let arguments: Vec<_> = find_children(root, "argument").collect();
/// assert_eq!(arguments.len(), 2);
/// ```
pub fn find_children<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |child| child.is_element() && get_tag_name(*child) == tag)
}

/// Get all element children of a node.
///
/// Excludes text nodes, comments and processing instructions.
pub fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|child| child.is_element())
}

/// Get an attribute value from a node.
///
/// Only attributes without a namespace are considered.
pub fn get_attribute<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute(name)
}

/// Concatenate the direct text children of an element, untrimmed.
///
/// Text inside child elements is not included.
pub fn direct_text(node: Node<'_, '_>) -> String {
    node.children()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .collect()
}

/// Get the direct text content of a node, trimmed.
pub fn get_text(node: Node<'_, '_>) -> String {
    direct_text(node).trim().to_string()
}

/// Check whether the element carries non-whitespace direct text.
pub fn has_text(node: Node<'_, '_>) -> bool {
    node.children()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .any(|text| !text.trim().is_empty())
}

/// Human-readable `line:column` position of a node in its document.
pub fn position(node: Node<'_, '_>) -> String {
    let pos = node.document().text_pos_at(node.range().start);
    format!("{}:{}", pos.row, pos.col)
}
