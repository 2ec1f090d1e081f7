//! Custom assertions para tests.

use davgit_core::XmlNode;

/// Parsea un body XML y verifica la declaracion.
pub fn parse_xml(text: &str) -> XmlNode {
    assert!(
        text.starts_with("<?xml"),
        "XML body should start with a declaration: {}",
        text
    );
    davgit_core::xml::parse(text).unwrap_or_else(|e| panic!("Invalid XML ({e}): {text}"))
}

/// Verifica que un documento sea un multistatus WebDAV y retorna sus respuestas.
pub fn assert_multistatus(text: &str) -> Vec<XmlNode> {
    let root = parse_xml(text);

    assert_eq!(root.tag(), "D:multistatus");
    assert_eq!(root.attribute("xmlns:D"), Some("DAV:"));
    assert_eq!(root.attribute("xmlns:lp1"), Some("DAV:"));

    for response in root.nodes() {
        assert_eq!(response.tag(), "D:response");
        assert!(response.node(&["D:href"]).is_some(), "Response missing D:href");
        let status = response
            .node(&["D:propstat", "D:status"])
            .expect("Response missing D:propstat/D:status");
        assert_eq!(status.content(), "HTTP/1.1 200 OK");
    }
    root.nodes().to_vec()
}

/// Retorna el href de una respuesta multistatus.
pub fn href(response: &XmlNode) -> &str {
    response
        .node(&["D:href"])
        .map(XmlNode::content)
        .unwrap_or_default()
}

/// Retorna el `D:prop` de una respuesta multistatus.
pub fn prop(response: &XmlNode) -> &XmlNode {
    response
        .node(&["D:propstat", "D:prop"])
        .expect("Response missing D:propstat/D:prop")
}

/// Verifica el formato `YYYY-MM-DDTHH:MM:SSZ`.
pub fn assert_iso_date(value: &str) {
    let bytes = value.as_bytes();
    assert_eq!(bytes.len(), 20, "Unexpected date format: {}", value);
    for (i, b) in bytes.iter().enumerate() {
        match i {
            4 | 7 => assert_eq!(*b, b'-', "{}", value),
            10 => assert_eq!(*b, b'T', "{}", value),
            13 | 16 => assert_eq!(*b, b':', "{}", value),
            19 => assert_eq!(*b, b'Z', "{}", value),
            _ => assert!(b.is_ascii_digit(), "{}", value),
        }
    }
}
