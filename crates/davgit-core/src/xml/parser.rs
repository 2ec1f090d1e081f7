//! Builds [`XmlNode`] trees from WebDAV request bodies.
//!
//! Tokenizing is done by `quick-xml`; this module only assembles the tree
//! with an explicit stack, so nesting depth never grows the call stack.
//! Whitespace-only text is dropped; other text is trimmed. Comments,
//! processing instructions and the prolog are skipped.

use quick_xml::errors::{Error as QuickXmlError, IllFormedError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::node::XmlNode;
use crate::error::XmlError;

/// Deepest element nesting accepted. PROPFIND and LOCK bodies stay
/// below five levels.
pub const MAX_DEPTH: usize = 64;

/// An element still waiting for its closing tag.
struct Open {
    node: XmlNode,
    text: String,
}

impl Open {
    fn close(mut self) -> XmlNode {
        let trimmed = self.text.trim();
        if !trimmed.is_empty() {
            self.node.set_content(trimmed);
        }
        self.node
    }
}

/// Parses `input` into its root element.
///
/// # Example
///
/// ```
/// use davgit_core::xml::parse;
///
/// let root = parse(r#"<?xml version="1.0"?><D:propfind xmlns:D="DAV:"><D:allprop/></D:propfind>"#).unwrap();
/// assert_eq!(root.local_name(), "propfind");
/// assert!(root.child_by_local_name("allprop").is_some());
/// ```
pub fn parse(input: &str) -> Result<XmlNode, XmlError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Open> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        let offset = reader.buffer_position() as usize;
        let event = reader
            .read_event()
            .map_err(|e| convert_error(e, offset, input.len()))?;

        if root.is_some() && matches!(event, Event::Start(_) | Event::Empty(_)) {
            return Err(XmlError::syntax(offset, "content after root element"));
        }

        match event {
            Event::Start(start) => {
                if stack.len() >= MAX_DEPTH {
                    return Err(XmlError::TooDeep(MAX_DEPTH));
                }
                stack.push(Open {
                    node: element(&start, offset)?,
                    text: String::new(),
                });
            },
            Event::Empty(start) => {
                let mut node = element(&start, offset)?;
                node.set_self_closing(true);
                attach(&mut stack, &mut root, node);
            },
            Event::End(_) => {
                // Name matching is checked by the reader.
                let open = stack
                    .pop()
                    .ok_or_else(|| XmlError::syntax(offset, "closing tag without element"))?;
                attach(&mut stack, &mut root, open.close());
            },
            Event::Text(text) => {
                let decoded = text
                    .unescape()
                    .map_err(|e| XmlError::syntax(offset, e.to_string()))?;
                match stack.last_mut() {
                    Some(open) => open.text.push_str(&decoded),
                    None => return Err(XmlError::syntax(offset, "text outside of an element")),
                }
            },
            Event::CData(data) => {
                let raw = std::str::from_utf8(&data)
                    .map_err(|_| XmlError::syntax(offset, "CDATA is not valid UTF-8"))?;
                match stack.last_mut() {
                    Some(open) => open.text.push_str(raw),
                    None => return Err(XmlError::syntax(offset, "CDATA outside of an element")),
                }
            },
            Event::Eof => {
                return match (root, stack.is_empty()) {
                    (Some(root), true) => Ok(root),
                    (None, true) => Err(XmlError::Empty),
                    (_, false) => Err(XmlError::UnexpectedEof(input.len())),
                };
            },
            // Declaration, comments, processing instructions, doctype.
            _ => {},
        }
    }
}

/// Creates the node for a start tag with its attributes in document order.
fn element(start: &BytesStart<'_>, offset: usize) -> Result<XmlNode, XmlError> {
    let tag = std::str::from_utf8(start.name().as_ref())
        .map_err(|_| XmlError::syntax(offset, "tag name is not valid UTF-8"))?
        .to_string();
    let mut node = XmlNode::element(tag);

    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| XmlError::syntax(offset, e.to_string()))?;
        let name = std::str::from_utf8(attribute.key.as_ref())
            .map_err(|_| XmlError::syntax(offset, "attribute name is not valid UTF-8"))?
            .to_string();
        let value = attribute
            .unescape_value()
            .map_err(|e| XmlError::syntax(offset, e.to_string()))?
            .into_owned();
        if !node.add_attribute(name, Some(value)) {
            return Err(XmlError::syntax(offset, "duplicate attribute"));
        }
    }
    Ok(node)
}

/// Adds a finished node to its parent, or makes it the root.
fn attach(stack: &mut [Open], root: &mut Option<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => {
            parent.node.add_node(node);
        },
        None => *root = Some(node),
    }
}

fn convert_error(error: QuickXmlError, offset: usize, len: usize) -> XmlError {
    match error {
        QuickXmlError::IllFormed(IllFormedError::MismatchedEndTag { expected, found }) => {
            XmlError::MismatchedTag { expected, found }
        },
        QuickXmlError::IllFormed(IllFormedError::MissingEndTag(_)) => XmlError::UnexpectedEof(len),
        other => XmlError::syntax(offset, other.to_string()),
    }
}
