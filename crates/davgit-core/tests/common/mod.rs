#![allow(dead_code)]
use davgit_core::PathResolver;
use tempfile::TempDir;

/// Resolver rooted at `/srv/git`, served at `http://localhost:8080`.
pub fn resolver() -> PathResolver {
    PathResolver::new("http://localhost:8080", "/srv/git")
}

/// Creates a root directory with one bare-looking repository inside.
pub fn repository_tree() -> (TempDir, PathResolver) {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    std::fs::create_dir_all(root.path().join("demo.git/objects/info")).unwrap();
    std::fs::write(root.path().join("demo.git/HEAD"), "ref: refs/heads/master\n").unwrap();

    let resolver = PathResolver::new("http://localhost:8080", root.path().to_str().unwrap());
    (root, resolver)
}

/// PROPFIND body as sent by cadaver.
pub const PROPFIND_ALLPROP: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<propfind xmlns="DAV:"><allprop/></propfind>"#;

/// PROPFIND body as sent by Windows Explorer.
pub const PROPFIND_EXPLORER: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<D:propfind xmlns:D="DAV:">
  <D:prop>
    <D:creationdate/>
    <D:getlastmodified/>
    <D:resourcetype/>
  </D:prop>
</D:propfind>"#;

/// LOCK body with an owner.
pub const LOCKINFO: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<D:lockinfo xmlns:D="DAV:">
  <D:lockscope><D:exclusive/></D:lockscope>
  <D:locktype><D:write/></D:locktype>
  <D:owner><D:href>mailto:dev@example.org</D:href></D:owner>
</D:lockinfo>"#;
