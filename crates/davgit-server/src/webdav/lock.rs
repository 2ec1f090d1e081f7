//! Advisory lock markers.
//!
//! A lock is a `<resource>.lock` file next to the resource holding an
//! opaque token. Locks are not enforced by other methods.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use axum::http::StatusCode;
use davgit_core::XmlNode;
use uuid::Uuid;

use super::error::WebDavError;

/// Timeout advertised for every lock.
pub const LOCK_TIMEOUT: &str = "Second-600";

/// Path of the marker file guarding `resource`.
pub fn marker_path(resource: &Path) -> PathBuf {
    let mut name = OsString::from(resource.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

/// Generates a fresh lock token.
pub fn new_token() -> String {
    format!("opaquelocktoken:{}", Uuid::new_v4())
}

/// Checks that a LOCK body is a `lockinfo` document.
pub fn parse_lockinfo(body: &[u8]) -> Result<(), WebDavError> {
    let text = std::str::from_utf8(body)
        .map_err(|_| WebDavError::parsing_input("body is not valid UTF-8"))?;
    let root = davgit_core::xml::parse(text)
        .map_err(|e| WebDavError::parsing_input(e.to_string()))?;

    if root.local_name() != "lockinfo" {
        return Err(WebDavError::not_matching(
            StatusCode::FORBIDDEN,
            format!("expected lockinfo, found {}", root.tag()),
        ));
    }
    Ok(())
}

/// Builds the `D:prop/D:lockdiscovery` body; empty without a token.
pub fn lock_discovery(token: Option<&str>) -> XmlNode {
    let mut prop = XmlNode::element("D:prop").with_attribute("xmlns:D", "DAV:");
    let discovery = prop.add_node(XmlNode::empty("D:lockdiscovery"));

    let Some(token) = token else {
        return prop;
    };

    let active = discovery.add_node(XmlNode::element("D:activelock"));
    active
        .create_if_not_exists(&["D:locktype"])
        .add_node(XmlNode::empty("D:write"));
    active
        .create_if_not_exists(&["D:lockscope"])
        .add_node(XmlNode::empty("D:exclusive"));
    active.add_node(XmlNode::with_content("D:depth", "infinity"));
    active.add_node(XmlNode::with_content("D:timeout", LOCK_TIMEOUT));
    active
        .create_if_not_exists(&["D:locktoken"])
        .add_node(XmlNode::with_content("D:href", token));
    prop
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_path() {
        assert_eq!(
            marker_path(Path::new("/srv/git/demo.git/a.txt")),
            PathBuf::from("/srv/git/demo.git/a.txt.lock")
        );
    }

    #[test]
    fn test_token_format() {
        let token = new_token();
        let uuid = token.strip_prefix("opaquelocktoken:").unwrap();
        assert_eq!(Uuid::parse_str(uuid).unwrap().get_version_num(), 4);
        assert_ne!(new_token(), token);
    }

    #[test]
    fn test_parse_lockinfo() {
        assert!(parse_lockinfo(br#"<D:lockinfo xmlns:D="DAV:"><D:lockscope><D:exclusive/></D:lockscope></D:lockinfo>"#).is_ok());
        assert_eq!(
            parse_lockinfo(b"<D:propfind/>").unwrap_err().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            parse_lockinfo(b"not xml").unwrap_err().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_lock_discovery() {
        assert_eq!(
            lock_discovery(Some("opaquelocktoken:abc")).serialize(false),
            "<D:prop xmlns:D=\"DAV:\"><D:lockdiscovery><D:activelock>\
             <D:locktype><D:write/></D:locktype>\
             <D:lockscope><D:exclusive/></D:lockscope>\
             <D:depth>infinity</D:depth>\
             <D:timeout>Second-600</D:timeout>\
             <D:locktoken><D:href>opaquelocktoken:abc</D:href></D:locktoken>\
             </D:activelock></D:lockdiscovery></D:prop>"
        );
    }

    #[test]
    fn test_empty_lock_discovery() {
        assert_eq!(
            lock_discovery(None).serialize(false),
            "<D:prop xmlns:D=\"DAV:\"><D:lockdiscovery/></D:prop>"
        );
    }
}
