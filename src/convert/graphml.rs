//! GraphML to node-link JSON
//!
//! Produces the node-link layout consumed by d3-style graph viewers:
//! `{directed, multigraph, graph, nodes: [{id, ..}], links: [{source, target, ..}]}`.
//! Attribute values are typed from their `<key attr.type>` declaration and
//! key defaults are applied to elements that omit them.

use roxmltree::{Document, Node};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

use super::ConvertError;

/// Graph in node-link form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeLinkGraph {
    pub directed: bool,
    pub multigraph: bool,
    pub graph: Map<String, Value>,
    pub nodes: Vec<Map<String, Value>>,
    pub links: Vec<Map<String, Value>>,
}

/// A `<key>` declaration
struct Key {
    name: String,
    kind: String,
    domain: String,
    default: Option<String>,
}

impl Key {
    fn applies_to(&self, element: &str) -> bool {
        self.domain == element || self.domain == "all"
    }

    fn value(&self, raw: &str) -> Value {
        let raw = raw.trim();
        match self.kind.as_str() {
            "boolean" => match raw.to_lowercase().as_str() {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => Value::String(raw.to_string()),
            },
            "int" | "long" => raw
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(raw.to_string())),
            "float" | "double" => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(raw.to_string())),
            _ => Value::String(raw.to_string()),
        }
    }
}

/// Read a GraphML file
pub fn read_graphml(path: &Path) -> Result<NodeLinkGraph, ConvertError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConvertError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_graphml(&content)
}

/// Parse GraphML text; only the first `<graph>` is read
pub fn parse_graphml(xml: &str) -> Result<NodeLinkGraph, ConvertError> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();
    if root.tag_name().name() != "graphml" {
        return Err(ConvertError::NotGraphml(format!(
            "root element is <{}>",
            root.tag_name().name()
        )));
    }

    let keys: HashMap<&str, Key> = root
        .children()
        .filter(|n| n.has_tag_name("key"))
        .filter_map(|n| {
            let id = n.attribute("id")?;
            let key = Key {
                name: n.attribute("attr.name").unwrap_or(id).to_string(),
                kind: n.attribute("attr.type").unwrap_or("string").to_string(),
                domain: n.attribute("for").unwrap_or("all").to_string(),
                default: n
                    .children()
                    .find(|c| c.has_tag_name("default"))
                    .and_then(|c| c.text())
                    .map(str::to_string),
            };
            Some((id, key))
        })
        .collect();

    let graph = root
        .children()
        .find(|n| n.has_tag_name("graph"))
        .ok_or_else(|| ConvertError::NotGraphml("no <graph> element".to_string()))?;
    let directed = graph.attribute("edgedefault") == Some("directed");

    let mut nodes = Vec::new();
    let mut links = Vec::new();

    for child in graph.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "node" => {
                let Some(id) = child.attribute("id") else {
                    continue;
                };
                let mut node = Map::new();
                node.insert("id".to_string(), Value::from(id));
                node.extend(attributes(&child, "node", &keys));
                nodes.push(node);
            }
            "edge" => {
                let (Some(source), Some(target)) =
                    (child.attribute("source"), child.attribute("target"))
                else {
                    continue;
                };
                let mut link = Map::new();
                link.insert("source".to_string(), Value::from(source));
                link.insert("target".to_string(), Value::from(target));
                if let Some(id) = child.attribute("id") {
                    link.insert("id".to_string(), Value::from(id));
                }
                link.extend(attributes(&child, "edge", &keys));
                links.push(link);
            }
            _ => {}
        }
    }

    Ok(NodeLinkGraph {
        directed,
        multigraph: false,
        graph: attributes(&graph, "graph", &keys),
        nodes,
        links,
    })
}

/// `<data>` children of an element, with key defaults filled in
fn attributes(element: &Node, domain: &str, keys: &HashMap<&str, Key>) -> Map<String, Value> {
    let mut values = Map::new();

    let mut declared: Vec<_> = keys.iter().filter(|(_, k)| k.applies_to(domain)).collect();
    declared.sort_by_key(|(id, _)| *id);
    for (_, key) in declared {
        if let Some(default) = &key.default {
            values.insert(key.name.clone(), key.value(default));
        }
    }

    for data in element.children().filter(|n| n.has_tag_name("data")) {
        let Some(key_id) = data.attribute("key") else {
            continue;
        };
        let raw = data.text().unwrap_or_default();
        match keys.get(key_id) {
            Some(key) => values.insert(key.name.clone(), key.value(raw)),
            None => values.insert(key_id.to_string(), Value::from(raw.trim())),
        };
    }

    values
}
