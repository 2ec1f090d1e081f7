//! DavGit Core - Domain types
//!
//! This crate provides the foundational pieces shared by the DavGit
//! server and its Git bridge:
//!
//! - [`error`]: the error taxonomy and its HTTP status mapping
//! - [`path`]: link/path conversion, root containment and the Git URL grammar
//! - [`xml`]: the XML tree used for WebDAV bodies

pub mod error;
pub mod path;
pub mod xml;

pub use error::{DavGitError, PathError, Result, XmlError};
pub use path::{LinkContext, LinkConverter, PathResolver, clean_path};
pub use xml::XmlNode;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
