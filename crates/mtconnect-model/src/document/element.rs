//! Generic named-node tree.

use std::fmt::Write as _;

use crate::model::content_hash;

/// Attribute holding a node's change-detection hash. Never part of the
/// hashed content.
pub const HASH_ATTRIBUTE: &str = "hash";

/// An XML element: name, ordered attributes, child elements and text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: Option<String>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Name without a namespace prefix.
    pub fn local_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Sets an attribute, replacing an existing value in place.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(k, _)| k == key)?;
        Some(self.attributes.remove(pos).1)
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Sets the attribute only when `value` is present.
    pub fn with_opt_attr<V: ToString>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.set_attr(key, value.to_string());
        }
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Hash of the element's content: name, attributes (sorted, `hash`
    /// excluded), text and children, recursively.
    pub fn content_hash(&self) -> String {
        let mut canonical = String::new();
        self.write_canonical(&mut canonical);
        content_hash(canonical.as_bytes())
    }

    fn write_canonical(&self, out: &mut String) {
        let mut attributes: Vec<&(String, String)> = self
            .attributes
            .iter()
            .filter(|(k, _)| k != HASH_ATTRIBUTE)
            .collect();
        attributes.sort();
        let _ = write!(out, "<{}", self.name);
        for (k, v) in attributes {
            let _ = write!(out, " {}={:?}", k, v);
        }
        out.push('>');
        if let Some(text) = &self.text {
            let _ = write!(out, "{:?}", text);
        }
        for child in &self.children {
            child.write_canonical(out);
        }
        let _ = write!(out, "</{}>", self.name);
    }
}
