//! Minimal WebDAV support for browsing and editing repository files.
//!
//! Implements PROPFIND, MKCOL, LOCK, UNLOCK, PUT, MOVE and OPTIONS. Locks
//! are advisory marker files and no dead properties are stored.

mod engine;
mod error;
pub mod lock;
mod method;
pub mod props;

pub use engine::{MAX_XML_BODY, WebDavEngine};
pub use error::{WebDavError, WebDavErrorCode};
pub use method::WebDavMethod;
