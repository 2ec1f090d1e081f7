//! PROPFIND request parsing and multistatus rendering.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use davgit_core::{LinkConverter, XmlNode};

use super::error::WebDavError;

/// Content type reported for collections.
pub const DIRECTORY_CONTENT_TYPE: &str = "httpd/unix-directory";

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const STATUS_OK: &str = "HTTP/1.1 200 OK";

/// Properties returned for `allprop`.
const ALL_PROPERTIES: &[&str] = &[
    "supportedlock",
    "resourcetype",
    "creationdate",
    "getlastmodified",
    "getcontentlength",
];

/// Properties named in a PROPFIND body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requested {
    All,
    Named(Vec<String>),
}

impl Requested {
    fn names(&self) -> Vec<&str> {
        match self {
            Requested::All => ALL_PROPERTIES.to_vec(),
            Requested::Named(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// Parses a PROPFIND body.
pub fn parse_propfind(body: &[u8]) -> Result<Requested, WebDavError> {
    let text = std::str::from_utf8(body)
        .map_err(|_| WebDavError::parsing_input("body is not valid UTF-8"))?;
    let root = davgit_core::xml::parse(text)
        .map_err(|e| WebDavError::parsing_input(e.to_string()))?;

    if root.local_name() != "propfind" {
        return Err(WebDavError::not_matching(
            axum::http::StatusCode::BAD_REQUEST,
            format!("expected propfind, found {}", root.tag()),
        ));
    }

    if let Some(prop) = root.child_by_local_name("prop") {
        let names = prop
            .nodes()
            .iter()
            .map(|node| node.local_name().to_string())
            .collect();
        return Ok(Requested::Named(names));
    }
    if root.child_by_local_name("allprop").is_some() {
        return Ok(Requested::All);
    }
    Err(WebDavError::unknown_input(
        "propfind without prop or allprop",
    ))
}

/// A file or directory listed in a multistatus response.
#[derive(Debug, Clone)]
pub struct Entry {
    pub path: PathBuf,
    pub is_dir: bool,
    pub len: u64,
    pub created: Option<SystemTime>,
    pub modified: Option<SystemTime>,
}

impl Entry {
    fn read(path: &Path) -> io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let modified = metadata.modified().ok();
        Ok(Self {
            path: path.to_path_buf(),
            is_dir: metadata.is_dir(),
            len: metadata.len(),
            created: metadata.created().ok().or(modified),
            modified,
        })
    }
}

/// Lists `path` and its descendants down to `depth` levels.
///
/// A negative depth is unlimited. Children are sorted by name and
/// symlinked directories are not descended into.
pub fn collect_entries(path: &Path, depth: i32) -> io::Result<Vec<Entry>> {
    let mut entries = Vec::new();
    collect_into(path, depth, &mut entries)?;
    Ok(entries)
}

fn collect_into(path: &Path, depth: i32, entries: &mut Vec<Entry>) -> io::Result<()> {
    let entry = Entry::read(path)?;
    let descend = entry.is_dir && depth != 0;
    entries.push(entry);
    if !descend {
        return Ok(());
    }

    let mut children = Vec::new();
    for child in std::fs::read_dir(path)? {
        let child = child?;
        children.push((child.file_name(), child.path(), child.file_type()?));
    }
    children.sort_by(|a, b| a.0.cmp(&b.0));

    let next = if depth < 0 { depth } else { depth - 1 };
    for (_, child, file_type) in children {
        if file_type.is_dir() {
            collect_into(&child, next, entries)?;
        } else {
            // Symlinked directories end up here and are not descended into.
            match Entry::read(&child) {
                Ok(entry) => entries.push(entry),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {},
                Err(e) => return Err(e),
            }
        }
    }
    Ok(())
}

fn format_date(time: Option<SystemTime>) -> String {
    let time: DateTime<Utc> = time.unwrap_or(SystemTime::UNIX_EPOCH).into();
    time.format(DATE_FORMAT).to_string()
}

fn supported_lock() -> XmlNode {
    let mut node = XmlNode::element("D:supportedlock");
    for scope in ["D:exclusive", "D:shared"] {
        let entry = node.add_node(XmlNode::element("D:lockentry"));
        entry
            .create_if_not_exists(&["D:lockscope"])
            .add_node(XmlNode::empty(scope));
        entry
            .create_if_not_exists(&["D:locktype"])
            .add_node(XmlNode::empty("D:write"));
    }
    node
}

/// Adds property `name` of `entry` to `prop`. Unknown names are skipped.
fn add_property(prop: &mut XmlNode, name: &str, entry: &Entry) {
    match name {
        "supportedlock" => {
            prop.add_node(supported_lock());
        },
        "resourcetype" => {
            let node = prop.add_node(XmlNode::empty("lp1:resourcetype"));
            if entry.is_dir {
                node.add_node(XmlNode::empty("D:collection"));
                prop.create_if_not_exists(&["D:getcontenttype"])
                    .set_content(DIRECTORY_CONTENT_TYPE);
            }
        },
        "getcontenttype" if entry.is_dir => {
            prop.create_if_not_exists(&["D:getcontenttype"])
                .set_content(DIRECTORY_CONTENT_TYPE);
        },
        "creationdate" => {
            prop.add_node(XmlNode::with_content(
                "lp1:creationdate",
                format_date(entry.created),
            ));
        },
        "getlastmodified" => {
            prop.add_node(XmlNode::with_content(
                "lp1:getlastmodified",
                format_date(entry.modified),
            ));
        },
        "getcontentlength" if !entry.is_dir => {
            prop.add_node(XmlNode::with_content(
                "lp1:getcontentlength",
                entry.len.to_string(),
            ));
        },
        _ => {},
    }
}

fn href(converter: &dyn LinkConverter, entry: &Entry) -> String {
    let mut link = converter.path_to_link(&entry.path.to_string_lossy());
    if entry.is_dir && !link.ends_with('/') {
        link.push('/');
    }
    link
}

/// Builds the `D:multistatus` document for `entries`.
pub fn multistatus(
    converter: &dyn LinkConverter,
    entries: &[Entry],
    requested: &Requested,
) -> XmlNode {
    let names = requested.names();
    let mut root = XmlNode::element("D:multistatus")
        .with_attribute("xmlns:D", "DAV:")
        .with_attribute("xmlns:lp1", "DAV:");

    for entry in entries {
        let response = root.add_node(XmlNode::element("D:response"));
        response.add_node(XmlNode::with_content("D:href", href(converter, entry)));

        let propstat = response.add_node(XmlNode::element("D:propstat"));
        let prop = propstat.add_node(XmlNode::element("D:prop"));
        for name in &names {
            add_property(prop, name, entry);
        }
        propstat.add_node(XmlNode::with_content("D:status", STATUS_OK));
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_allprop() {
        let body = br#"<?xml version="1.0"?><D:propfind xmlns:D="DAV:"><D:allprop/></D:propfind>"#;
        assert_eq!(parse_propfind(body).unwrap(), Requested::All);
    }

    #[test]
    fn test_parse_named_properties() {
        let body = br#"<propfind xmlns="DAV:"><prop><getlastmodified/><resourcetype/></prop></propfind>"#;
        assert_eq!(
            parse_propfind(body).unwrap(),
            Requested::Named(vec!["getlastmodified".into(), "resourcetype".into()])
        );
    }

    #[test]
    fn test_parse_errors() {
        use crate::webdav::WebDavErrorCode;

        assert_eq!(
            parse_propfind(b"").unwrap_err().code(),
            WebDavErrorCode::ParsingInput
        );
        assert_eq!(
            parse_propfind(b"<D:propfind><D:prop>").unwrap_err().code(),
            WebDavErrorCode::ParsingInput
        );
        assert_eq!(
            parse_propfind(b"<D:lockinfo/>").unwrap_err().code(),
            WebDavErrorCode::MethodNotMatchingInputData
        );
        assert_eq!(
            parse_propfind(b"<D:propfind><D:propname/></D:propfind>")
                .unwrap_err()
                .code(),
            WebDavErrorCode::UnknownInputData
        );
    }

    #[test]
    fn test_format_date() {
        let time = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        assert_eq!(format_date(Some(time)), "2023-11-14T22:13:20Z");
    }

    #[test]
    fn test_collect_entries_depth() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("sub/c.txt"), "c").unwrap();

        let names = |entries: Vec<Entry>| -> Vec<PathBuf> {
            entries
                .into_iter()
                .map(|e| e.path.strip_prefix(dir.path()).unwrap().to_path_buf())
                .collect()
        };

        assert_eq!(names(collect_entries(dir.path(), 0).unwrap()), vec![PathBuf::new()]);
        assert_eq!(
            names(collect_entries(dir.path(), 1).unwrap()),
            vec![PathBuf::new(), PathBuf::from("b.txt"), PathBuf::from("sub")]
        );
        assert_eq!(
            names(collect_entries(dir.path(), -1).unwrap()),
            vec![
                PathBuf::new(),
                PathBuf::from("b.txt"),
                PathBuf::from("sub"),
                PathBuf::from("sub/c.txt"),
            ]
        );
    }

    #[test]
    fn test_supported_lock() {
        assert_eq!(
            supported_lock().serialize(false),
            "<D:supportedlock>\
             <D:lockentry><D:lockscope><D:exclusive/></D:lockscope><D:locktype><D:write/></D:locktype></D:lockentry>\
             <D:lockentry><D:lockscope><D:shared/></D:lockscope><D:locktype><D:write/></D:locktype></D:lockentry>\
             </D:supportedlock>"
        );
    }

    #[test]
    fn test_directory_properties() {
        let entry = Entry {
            path: PathBuf::from("/srv/git/demo.git/docs"),
            is_dir: true,
            len: 0,
            created: None,
            modified: None,
        };
        let mut prop = XmlNode::element("D:prop");
        add_property(&mut prop, "resourcetype", &entry);
        add_property(&mut prop, "getcontenttype", &entry);
        add_property(&mut prop, "getcontentlength", &entry);

        assert_eq!(
            prop.serialize(false),
            "<D:prop><lp1:resourcetype><D:collection/></lp1:resourcetype>\
             <D:getcontenttype>httpd/unix-directory</D:getcontenttype></D:prop>"
        );
    }
}
