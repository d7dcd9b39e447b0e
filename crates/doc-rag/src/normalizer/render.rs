//! Serializers for normalized output

use serde::Serialize;
use serde_json::{Map, Value};

use super::tree::{XmlElement, XmlNode, XmlTree};
use crate::error::{Error, Result};

/// Element list as JSON with 2-space indentation
pub fn cleaned_json(records: &[Value]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Element list as XML under `<root>`, one `<item>` per element, tab-indented
pub fn cleaned_xml(records: &[Value]) -> Result<String> {
    let mut root = XmlElement::new("root");
    for record in records {
        root.children
            .push(XmlNode::Element(value_to_element("item", record)));
    }
    XmlTree { root }.to_pretty_string(b'\t', 1)
}

/// Direct XML-to-JSON conversion with 4-space indentation
///
/// Attributes become `@name` keys, mixed text becomes `#text` and repeated
/// children collapse into arrays. Elements without attributes or children map
/// to their text, or `null` when empty.
pub fn direct_json(tree: &XmlTree) -> Result<String> {
    let mut document = Map::new();
    document.insert(tree.root.name.clone(), element_to_value(&tree.root));

    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    Value::Object(document).serialize(&mut serializer)?;
    String::from_utf8(out).map_err(|e| Error::internal(format!("Non UTF-8 JSON output: {}", e)))
}

fn value_to_element(name: &str, value: &Value) -> XmlElement {
    let mut element = if is_xml_name(name) {
        XmlElement::new(name)
    } else {
        let mut e = XmlElement::new("key");
        e.attributes.push(("name".to_string(), name.to_string()));
        e
    };

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                element
                    .children
                    .push(XmlNode::Element(value_to_element(key, child)));
            }
        }
        Value::Array(items) => {
            for item in items {
                element
                    .children
                    .push(XmlNode::Element(value_to_element("item", item)));
            }
        }
        Value::String(s) if s.is_empty() => {}
        Value::String(s) => element.children.push(XmlNode::Text(s.clone())),
        Value::Null => {}
        other => element.children.push(XmlNode::Text(other.to_string())),
    }
    element
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn element_to_value(element: &XmlElement) -> Value {
    let mut map = Map::new();
    for (key, value) in &element.attributes {
        map.insert(format!("@{}", key), Value::from(value.clone()));
    }

    for child in element.child_elements() {
        let value = element_to_value(child);
        match map.get_mut(&child.name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(child.name.clone(), value);
            }
        }
    }

    let text = element.direct_text();
    let text = text.trim();
    if map.is_empty() {
        return if text.is_empty() {
            Value::Null
        } else {
            Value::from(text)
        };
    }
    if !text.is_empty() {
        map.insert("#text".to_string(), Value::from(text));
    }
    Value::Object(map)
}
