//! Generic element-to-value conversion, used to hand extension elements to
//! their extensions.

use roxmltree::Node;

use super::utils::get_tag_name;
use crate::value::{coerce_scalar, Collection, Key, Value};

/// Convert an element into a [`Value`].
///
/// - attributes become entries, with their values coerced to scalars
/// - child elements become entries keyed by local name; a repeated name
///   collects its values into an indexed collection
/// - non-empty direct text is returned as a scalar when it is the only
///   content, and stored under `"value"` otherwise
/// - an element with nothing but whitespace or comments becomes `Null`
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use servicewire_loader::xml::convert_element;
/// use servicewire_loader::Value;
///
/// let doc = Document::parse("<foo>bar</foo>").unwrap();
/// assert_eq!(convert_element(doc.root_element()), Value::from("bar"));
///
/// let doc = Document::parse("<foo><!-- nothing --></foo>").unwrap();
/// assert_eq!(convert_element(doc.root_element()), Value::Null);
/// ```
pub fn convert_element(node: Node<'_, '_>) -> Value {
    let mut empty = true;
    let mut config = Collection::new();

    for attribute in node.attributes() {
        config.insert(
            Key::Name(attribute.name().to_string()),
            coerce_scalar(attribute.value()),
        );
        empty = false;
    }

    let mut node_value: Option<&str> = None;
    for child in node.children() {
        if child.is_text() {
            let text = child.text().unwrap_or_default().trim();
            if !text.is_empty() {
                node_value = Some(text);
                empty = false;
            }
        } else if child.is_element() {
            let key = Key::Name(get_tag_name(child).to_string());
            let value = convert_element(child);

            let merged = match config.get(key.clone()) {
                None => value,
                Some(existing) => {
                    let mut items = match existing {
                        Value::Collection(items) if starts_with_index(items) => items.clone(),
                        other => std::iter::once(other.clone()).collect(),
                    };
                    // repeated children are always keyed 0..n
                    items.push(value);
                    Value::Collection(items)
                }
            };
            config.insert(key, merged);
            empty = false;
        }
    }

    if let Some(text) = node_value {
        let value = coerce_scalar(text);
        if config.is_empty() {
            return value;
        }
        config.insert("value", value);
    }

    if empty {
        Value::Null
    } else {
        Value::Collection(config)
    }
}

/// An already-collected repetition is recognised by its positional first key.
fn starts_with_index(items: &Collection) -> bool {
    items.keys().next().is_some_and(|key| key.as_index().is_some())
}
