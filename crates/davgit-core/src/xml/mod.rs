//! XML model for WebDAV request and response bodies.
//!
//! A small element tree ([`XmlNode`]) with ordered attributes, a
//! serializer and a [`parse`] function that builds the tree from
//! `quick-xml` events with a bounded nesting depth.

mod node;
mod parser;

pub use node::{XML_DECLARATION, XmlNode};
pub use parser::{MAX_DEPTH, parse};
