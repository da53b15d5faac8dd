//! Decoding of XML configuration into a generic tree.
//!
//! The tree follows the usual "XML as dictionary" conventions:
//!
//! - attributes become plain string keys of the element's object,
//! - child elements become keys too; a repeated child name becomes an array
//!   in document order,
//! - an element with only text becomes a string, an empty element `null`,
//! - text next to attributes or children is stored under `#text`.
//!
//! Only the *number* of sibling elements decides between object and array,
//! so code reading the tree should accept both (see [`as_records`]).

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

use crate::types::*;

/// Key holding text content of elements that also have attributes or children.
pub const TEXT_KEY: &str = "#text";

struct Element {
    name: String,
    children: Map<String, Value>,
    text: String,
}

impl Element {
    fn start(e: &BytesStart) -> Result<Self> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let mut children = Map::new();
        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            children.insert(key, Value::String(value));
        }
        Ok(Element {
            name,
            children,
            text: String::new(),
        })
    }

    fn finish(mut self) -> (String, Value) {
        let text = self.text.trim().to_string();
        let value = if self.children.is_empty() {
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text)
            }
        } else {
            if !text.is_empty() {
                self.children.insert(TEXT_KEY.to_string(), Value::String(text));
            }
            Value::Object(self.children)
        };
        (self.name, value)
    }
}

fn insert_child(map: &mut Map<String, Value>, name: String, value: Value) {
    match map.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(name, value);
        }
    }
}

/// Decodes an XML document into a tree rooted at an object with a single key,
/// the root element's name.
pub fn decode(text: &str) -> Result<Value> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut root = Map::new();
    let mut stack: Vec<Element> = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(Element::start(&e)?),
            Event::Empty(e) => {
                let (name, value) = Element::start(&e)?.finish();
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.children, name, value),
                    None => insert_child(&mut root, name, value),
                }
            }
            Event::End(_) => {
                if let Some(element) = stack.pop() {
                    let (name, value) = element.finish();
                    match stack.last_mut() {
                        Some(parent) => insert_child(&mut parent.children, name, value),
                        None => insert_child(&mut root, name, value),
                    }
                }
            }
            Event::Text(t) => {
                if let Some(element) = stack.last_mut() {
                    element.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(element) = stack.last_mut() {
                    element.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(quick_xml::Error::UnexpectedEof(format!("unclosed <{}>", open.name)).into());
    }
    Ok(Value::Object(root))
}

/// Follows a path of object keys.
pub fn lookup<'a>(tree: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(tree, |node, key| node.get(*key))
}

/// Views a node as a list of records: an array yields its elements, a single
/// object yields itself, anything else yields nothing.
pub fn as_records(node: &Value) -> Vec<&Value> {
    match node {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![node],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn attributes_and_repeated_children() {
        let tree = decode(
            r#"<?xml version="1.0"?>
            <Configuration>
              <SpikeConfiguration categories="">
                <SpikeNTrode id="1"><SpikeChannel hwChan="3"/><SpikeChannel hwChan="7"/></SpikeNTrode>
                <SpikeNTrode id="2"><SpikeChannel hwChan="5"/></SpikeNTrode>
              </SpikeConfiguration>
            </Configuration>"#,
        )
        .unwrap();

        assert_eq!(
            tree,
            json!({
                "Configuration": {
                    "SpikeConfiguration": {
                        "categories": "",
                        "SpikeNTrode": [
                            {"id": "1", "SpikeChannel": [{"hwChan": "3"}, {"hwChan": "7"}]},
                            {"id": "2", "SpikeChannel": {"hwChan": "5"}}
                        ]
                    }
                }
            })
        );
    }

    #[test]
    fn text_and_empty_elements() {
        let tree = decode("<a><b>hello</b><c/><d x=\"1\">text &amp; more</d></a>").unwrap();
        assert_eq!(
            tree,
            json!({"a": {"b": "hello", "c": null, "d": {"x": "1", "#text": "text & more"}}})
        );
    }

    #[test]
    fn unclosed_document_is_an_error() {
        assert!(decode("<a><b>").is_err());
    }

    #[test]
    fn lookup_and_records() {
        let tree = json!({"a": {"b": {"c": [1, 2]}, "d": {"k": "v"}}});
        assert_eq!(lookup(&tree, &["a", "b", "c"]), Some(&json!([1, 2])));
        assert_eq!(lookup(&tree, &["a", "x"]), None);
        assert_eq!(as_records(&tree["a"]["b"]["c"]).len(), 2);
        assert_eq!(as_records(&tree["a"]["d"]).len(), 1);
        assert!(as_records(&Value::Null).is_empty());
    }
}
