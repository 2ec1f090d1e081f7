//! Conversion between external links and filesystem paths.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::clean::{clean_path, is_within, strip_root};
use crate::error::PathError;

/// Strategy for mapping request links onto the repository tree.
///
/// The server holds one converter and builds a
/// [`LinkContext`](super::LinkContext) from it for every request.
/// Implementations must be thread-safe.
pub trait LinkConverter: Send + Sync {
    /// External base URL, without trailing slash.
    fn root_link(&self) -> &str;

    /// Filesystem root that contains the repositories.
    fn root_path(&self) -> &str;

    /// Resolves a link (absolute URL or request target) to a validated path.
    fn link_to_path(&self, link: &str) -> Result<String, PathError>;

    /// Maps a filesystem path back to its external link.
    fn path_to_link(&self, path: &str) -> String;

    /// Returns true if `path` lies below the root and inside a repository.
    fn is_path_valid(&self, path: &str) -> bool {
        validate(path, self.root_path()).is_ok()
    }
}

/// Default [`LinkConverter`].
///
/// Links are resolved relative to `root_path`, optionally below a mount
/// prefix such as `/git/repositories` when the server is not mounted at
/// the URL root.
///
/// # Example
///
/// ```
/// use davgit_core::path::{LinkConverter, PathResolver};
///
/// let resolver = PathResolver::new("http://localhost:8080", "/srv/git");
/// let path = resolver.link_to_path("http://localhost:8080/demo.git/info/refs").unwrap();
/// assert_eq!(path, "/srv/git/demo.git/info/refs");
/// assert_eq!(resolver.path_to_link(&path), "http://localhost:8080/demo.git/info/refs");
///
/// assert!(resolver.link_to_path("/../etc/passwd").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct PathResolver {
    root_link: String,
    root_path: String,
    mount_prefix: String,
}

impl PathResolver {
    /// Creates a resolver serving `root_path` at `root_link`.
    pub fn new(root_link: impl Into<String>, root_path: impl AsRef<str>) -> Self {
        let root_link = root_link.into().trim_end_matches('/').to_string();
        Self {
            root_link,
            root_path: clean_path(root_path.as_ref()),
            mount_prefix: String::new(),
        }
    }

    /// Sets the URL prefix under which repositories are mounted.
    pub fn with_mount_prefix(mut self, prefix: impl AsRef<str>) -> Self {
        let prefix = clean_path(prefix.as_ref());
        self.mount_prefix = match prefix.as_str() {
            "" | "/" => String::new(),
            p if p.starts_with('/') => prefix,
            p => format!("/{p}"),
        };
        self
    }

    /// Returns the mount prefix (empty when mounted at the root).
    pub fn mount_prefix(&self) -> &str {
        &self.mount_prefix
    }

    fn request_path(&self, link: &str) -> Result<String, PathError> {
        let raw = link_path(link);
        let decoded =
            urlencoding::decode(raw).map_err(|_| PathError::MalformedLink(link.to_string()))?;
        let cleaned = clean_path(&format!("/{decoded}"));

        if self.mount_prefix.is_empty() {
            return Ok(cleaned);
        }
        strip_root(&cleaned, &self.mount_prefix)
            .map(str::to_string)
            .ok_or(PathError::OutsideRoot(cleaned))
    }
}

impl LinkConverter for PathResolver {
    fn root_link(&self) -> &str {
        &self.root_link
    }

    fn root_path(&self) -> &str {
        &self.root_path
    }

    fn link_to_path(&self, link: &str) -> Result<String, PathError> {
        let relative = self.request_path(link)?;
        let path = clean_path(&format!("{}/{}", self.root_path, relative));

        validate(&path, &self.root_path)?;
        debug!(link = %link, path = %path, "Resolved link");
        Ok(path)
    }

    fn path_to_link(&self, path: &str) -> String {
        let cleaned = clean_path(path);
        let relative = strip_root(&cleaned, &self.root_path)
            .unwrap_or(&cleaned)
            .trim_start_matches('/');

        let mut link = format!("{}{}", self.root_link, self.mount_prefix);
        if !relative.is_empty() {
            let encoded: Vec<String> = relative
                .split('/')
                .map(|segment| urlencoding::encode(segment).into_owned())
                .collect();
            link.push('/');
            link.push_str(&encoded.join("/"));
        }
        link
    }
}

/// Extracts the path component of an absolute URL or request target.
fn link_path(link: &str) -> &str {
    let without_fragment = link.split('#').next().unwrap_or_default();
    let without_query = without_fragment.split('?').next().unwrap_or_default();

    match without_query.find("://") {
        Some(scheme_end) => {
            let after_scheme = &without_query[scheme_end + 3..];
            after_scheme
                .find('/')
                .map(|slash| &after_scheme[slash..])
                .unwrap_or("/")
        },
        None => without_query,
    }
}

/// Checks containment, repository grammar and symlink escapes.
fn validate(path: &str, root: &str) -> Result<(), PathError> {
    let relative = match strip_root(path, root) {
        Some(rest) if !rest.is_empty() => rest,
        _ => return Err(PathError::OutsideRoot(path.to_string())),
    };

    if !relative.split('/').any(|segment| segment.ends_with(".git")) {
        return Err(PathError::NotARepository(path.to_string()));
    }

    if !canonical_within(Path::new(path), Path::new(root)) {
        return Err(PathError::OutsideRoot(path.to_string()));
    }
    Ok(())
}

/// Verifies that the nearest existing ancestor of `path` still resolves
/// below the canonical root after following symlinks.
fn canonical_within(path: &Path, root: &Path) -> bool {
    let Ok(canonical_root) = root.canonicalize() else {
        // Nothing below a missing root exists, so there is nothing to follow.
        return true;
    };

    let mut probe: Option<PathBuf> = Some(path.to_path_buf());
    while let Some(candidate) = probe {
        if candidate.exists() {
            return match candidate.canonicalize() {
                Ok(resolved) => resolved.starts_with(&canonical_root),
                Err(_) => false,
            };
        }
        probe = candidate.parent().map(Path::to_path_buf);
    }
    false
}
