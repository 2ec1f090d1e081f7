//! XML element tree.

use std::fmt;

use indexmap::IndexMap;

/// XML declaration emitted by [`XmlNode::to_document`].
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

/// An XML element.
///
/// Attributes keep insertion order and may be valueless. Children are
/// owned by their parent. A node created as self-closing is rendered as
/// `<tag/>` until it receives children or text.
///
/// # Example
///
/// ```
/// use davgit_core::xml::XmlNode;
///
/// let mut prop = XmlNode::element("D:prop");
/// prop.set_attribute("xmlns:D", "DAV:");
/// prop.create_if_not_exists(&["D:lockdiscovery", "D:activelock", "D:locktype"])
///     .add_node(XmlNode::empty("D:write"));
///
/// assert_eq!(
///     prop.serialize(false),
///     r#"<D:prop xmlns:D="DAV:"><D:lockdiscovery><D:activelock><D:locktype><D:write/></D:locktype></D:activelock></D:lockdiscovery></D:prop>"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNode {
    tag: String,
    attributes: IndexMap<String, Option<String>>,
    content: String,
    children: Vec<XmlNode>,
    self_closing: bool,
}

impl XmlNode {
    /// Creates a node; `self_closing` applies while it has no children or text.
    pub fn new(tag: impl Into<String>, self_closing: bool) -> Self {
        Self {
            tag: tag.into(),
            attributes: IndexMap::new(),
            content: String::new(),
            children: Vec::new(),
            self_closing,
        }
    }

    /// Creates a node that always renders an explicit closing tag.
    pub fn element(tag: impl Into<String>) -> Self {
        Self::new(tag, false)
    }

    /// Creates a self-closing node.
    pub fn empty(tag: impl Into<String>) -> Self {
        Self::new(tag, true)
    }

    /// Creates a node holding `content` as text.
    pub fn with_content(tag: impl Into<String>, content: impl Into<String>) -> Self {
        let mut node = Self::new(tag, false);
        node.set_content(content);
        node
    }

    /// Full tag name, including any namespace prefix.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Tag name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        self.tag
            .split_once(':')
            .map(|(_, local)| local)
            .unwrap_or(&self.tag)
    }

    /// Namespace prefix of the tag, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.tag.split_once(':').map(|(prefix, _)| prefix)
    }

    pub(crate) fn set_self_closing(&mut self, self_closing: bool) {
        self.self_closing = self_closing;
    }

    pub fn is_self_closing(&self) -> bool {
        self.self_closing && self.children.is_empty() && self.content.is_empty()
    }

    // ============================================
    // Attributes
    // ============================================

    /// Adds an attribute unless one with the same name exists.
    ///
    /// Returns false if the attribute was already present.
    pub fn add_attribute(&mut self, name: impl Into<String>, value: Option<String>) -> bool {
        let name = name.into();
        if self.attributes.contains_key(&name) {
            return false;
        }
        self.attributes.insert(name, value);
        true
    }

    /// Sets an attribute, replacing any existing value in place.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), Some(value.into()));
    }

    /// Builder form of [`set_attribute`](Self::set_attribute).
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Value of an attribute; valueless attributes yield `Some("")`.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(|value| value.as_deref().unwrap_or_default())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Removes an attribute, keeping the order of the others.
    pub fn remove_attribute(&mut self, name: &str) -> Option<Option<String>> {
        self.attributes.shift_remove(name)
    }

    /// Attributes in insertion order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    // ============================================
    // Content and children
    // ============================================

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Replaces the text content.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        if !self.content.is_empty() {
            self.self_closing = false;
        }
    }

    /// Appends to the text content.
    pub fn add_content(&mut self, content: &str) {
        self.content.push_str(content);
        if !self.content.is_empty() {
            self.self_closing = false;
        }
    }

    /// Appends a child and returns a reference to it.
    pub fn add_node(&mut self, child: XmlNode) -> &mut XmlNode {
        self.self_closing = false;
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Builder form of [`add_node`](Self::add_node).
    pub fn with_child(mut self, child: XmlNode) -> Self {
        self.add_node(child);
        self
    }

    /// Children in insertion order.
    pub fn nodes(&self) -> &[XmlNode] {
        &self.children
    }

    /// Walks `path` from this node, taking the first child whose tag
    /// matches at each level.
    pub fn node(&self, path: &[&str]) -> Option<&XmlNode> {
        path.iter().try_fold(self, |current, tag| {
            current.children.iter().find(|child| child.tag == *tag)
        })
    }

    /// Mutable variant of [`node`](Self::node).
    pub fn node_mut(&mut self, path: &[&str]) -> Option<&mut XmlNode> {
        let mut current = self;
        for tag in path {
            current = current.children.iter_mut().find(|child| child.tag == *tag)?;
        }
        Some(current)
    }

    /// Like [`node`](Self::node), but creates missing levels as
    /// self-closing nodes.
    pub fn create_if_not_exists(&mut self, path: &[&str]) -> &mut XmlNode {
        let mut current = self;
        for tag in path {
            let index = match current.children.iter().position(|child| child.tag == *tag) {
                Some(index) => index,
                None => {
                    current.add_node(XmlNode::empty(*tag));
                    current.children.len() - 1
                },
            };
            current = &mut current.children[index];
        }
        current
    }

    /// First child whose local name matches, ignoring namespace prefixes.
    pub fn child_by_local_name(&self, local: &str) -> Option<&XmlNode> {
        self.children.iter().find(|child| child.local_name() == local)
    }

    // ============================================
    // Serialization
    // ============================================

    /// Renders the node and its subtree.
    ///
    /// With `pretty`, every element starts on its own line.
    pub fn serialize(&self, pretty: bool) -> String {
        let mut out = String::new();
        self.write_to(&mut out, pretty);
        out
    }

    /// Renders the node as a complete document with an XML declaration.
    pub fn to_document(&self, pretty: bool) -> String {
        let mut out = String::from(XML_DECLARATION);
        out.push('\n');
        self.write_to(&mut out, pretty);
        out
    }

    fn write_to(&self, out: &mut String, pretty: bool) {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            if let Some(value) = value {
                out.push_str("=\"");
                escape_into(out, value, true);
                out.push('"');
            }
        }

        if self.is_self_closing() {
            out.push_str("/>");
        } else {
            out.push('>');
            if pretty && !self.children.is_empty() {
                out.push('\n');
            }
            escape_into(out, &self.content, false);
            for child in &self.children {
                child.write_to(out, pretty);
            }
            out.push_str("</");
            out.push_str(&self.tag);
            out.push('>');
        }

        if pretty {
            out.push('\n');
        }
    }
}

impl fmt::Display for XmlNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize(false))
    }
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
}
