//! Generic XML tree shared by every response normalizer.
//!
//! `parse_document` turns a response body into an owned `XmlNode` tree:
//! element name, attributes in document order, concatenated text (CDATA
//! included) and child elements in order. Lookups never fail on absent
//! containers: a missing child simply yields an empty iterator, which is how
//! "absent", "empty" and "singleton" collections all normalize the same way.

use crate::error::{AdminError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Attribute value, or an `UnexpectedResponse` naming what is missing.
    pub fn required_attr(&self, name: &str) -> Result<&str> {
        self.attr(name).ok_or_else(|| {
            AdminError::UnexpectedResponse(format!("<{}> has no `{name}` attribute", self.name))
        })
    }

    /// Attribute value, empty when absent.
    pub fn attr_or_empty(&self, name: &str) -> String {
        self.attr(name).unwrap_or_default().to_string()
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn required_child(&self, name: &str) -> Result<&XmlNode> {
        self.child(name).ok_or_else(|| {
            AdminError::UnexpectedResponse(format!("<{}> has no <{name}> element", self.name))
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Every element reached by following `path` from this node, fanning out
    /// over repeated elements at each step.
    pub fn descend<'a>(&'a self, path: &[&str]) -> Vec<&'a XmlNode> {
        let mut current = vec![self];
        for step in path {
            current = current
                .into_iter()
                .flat_map(|node| node.children.iter().filter(move |child| child.name == *step))
                .collect();
        }
        current
    }

    /// Trimmed text content.
    pub fn text(&self) -> &str {
        self.text.trim()
    }
}

/// Parse a response body into an owned tree rooted at the document element.
pub fn parse_document(body: &str) -> Result<XmlNode> {
    let doc = roxmltree::Document::parse(body).map_err(|e| AdminError::MalformedXml(e.to_string()))?;
    Ok(convert(doc.root_element()))
}

fn convert(node: roxmltree::Node<'_, '_>) -> XmlNode {
    let mut text = String::new();
    let mut children = Vec::new();
    for child in node.children() {
        if child.is_element() {
            children.push(convert(child));
        } else if child.is_text() {
            text.push_str(child.text().unwrap_or_default());
        }
    }
    XmlNode {
        name: node.tag_name().name().to_string(),
        attributes: node
            .attributes()
            .map(|attr| (attr.name().to_string(), attr.value().to_string()))
            .collect(),
        text,
        children,
    }
}

/// Escape a value for use inside a double-quoted attribute.
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
