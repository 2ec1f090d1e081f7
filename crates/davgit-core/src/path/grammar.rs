//! Git HTTP URL grammar.
//!
//! Matches the resources the Git dumb and smart HTTP protocols request
//! inside a repository, and locates the repository itself in a path.

/// Git service requested through the `service` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GitService {
    /// `git-upload-pack` (clone, fetch)
    UploadPack,
    /// `git-receive-pack` (push)
    ReceivePack,
}

impl GitService {
    /// Parses a service name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "git-upload-pack" => Some(Self::UploadPack),
            "git-receive-pack" => Some(Self::ReceivePack),
            _ => None,
        }
    }

    /// Extracts the service from a raw query string (`service=git-upload-pack&...`).
    pub fn from_query(query: Option<&str>) -> Option<Self> {
        query?
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "service")
            .and_then(|(_, value)| Self::parse(value))
    }

    /// Returns the service name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UploadPack => "git-upload-pack",
            Self::ReceivePack => "git-receive-pack",
        }
    }
}

impl std::fmt::Display for GitService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the repository part of `path`: everything up to and including
/// the last segment that ends in `.git`.
///
/// ```
/// use davgit_core::path::repository_path;
///
/// assert_eq!(repository_path("/srv/git/a.git/info/refs"), Some("/srv/git/a.git"));
/// assert_eq!(repository_path("/srv/git/a.git/sub/b.git"), Some("/srv/git/a.git/sub/b.git"));
/// assert_eq!(repository_path("/srv/git/readme.md"), None);
/// ```
pub fn repository_path(path: &str) -> Option<&str> {
    let mut end = None;
    let mut start = 0;

    for (idx, ch) in path.char_indices().chain(std::iter::once((path.len(), '/'))) {
        if ch != '/' {
            continue;
        }
        let segment = &path[start..idx];
        if start > 0 && segment.ends_with(".git") {
            end = Some(idx);
        }
        start = idx + 1;
    }

    end.map(|end| &path[..end])
}

/// Returns true if `path` ends with one of the resources of the Git HTTP
/// protocol:
///
/// - `HEAD`
/// - `info/refs`
/// - `objects/info/<name>`
/// - `objects/<2 hex>/<38 hex>`
/// - `objects/pack/pack-<40 hex>.pack` or `.idx`
/// - `git-upload-pack`, `git-receive-pack`
///
/// ```
/// use davgit_core::path::is_git_protocol_path;
///
/// assert!(is_git_protocol_path("/repo.git/info/refs"));
/// assert!(!is_git_protocol_path("/repo.git/refs/heads/master"));
/// ```
pub fn is_git_protocol_path(path: &str) -> bool {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        return false;
    }

    match segments.as_slice() {
        [.., "HEAD"] => true,
        [.., "info", "refs"] => true,
        [.., "git-upload-pack"] | [.., "git-receive-pack"] => true,
        [.., "objects", "info", _] => true,
        [.., "objects", "pack", file] => is_pack_file(file),
        [.., "objects", dir, file] => is_hex(dir, 2) && is_hex(file, 38),
        _ => false,
    }
}

/// Returns true for the endpoints only the smart backend can answer.
pub fn is_smart_only_path(path: &str) -> bool {
    let last = path.rsplit('/').find(|s| !s.is_empty());
    matches!(last, Some("git-upload-pack") | Some("git-receive-pack"))
}

fn is_pack_file(file: &str) -> bool {
    let Some(rest) = file.strip_prefix("pack-") else {
        return false;
    };
    let hash = rest
        .strip_suffix(".pack")
        .or_else(|| rest.strip_suffix(".idx"));
    matches!(hash, Some(hash) if is_hex(hash, 40))
}

fn is_hex(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA40: &str = "0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn test_dumb_protocol_paths_match() {
        assert!(is_git_protocol_path("/repo.git/HEAD"));
        assert!(is_git_protocol_path("/repo.git/info/refs"));
        assert!(is_git_protocol_path("/repo.git/objects/info/packs"));
        assert!(is_git_protocol_path("/repo.git/objects/info/alternates"));
        assert!(is_git_protocol_path(&format!(
            "/repo.git/objects/ab/{}",
            &SHA40[..38]
        )));
        assert!(is_git_protocol_path(&format!(
            "/repo.git/objects/pack/pack-{SHA40}.pack"
        )));
        assert!(is_git_protocol_path(&format!(
            "/repo.git/objects/pack/pack-{SHA40}.idx"
        )));
    }

    #[test]
    fn test_smart_endpoints_match() {
        assert!(is_git_protocol_path("/repo.git/git-upload-pack"));
        assert!(is_git_protocol_path("/repo.git/git-receive-pack"));
        assert!(is_smart_only_path("/repo.git/git-receive-pack"));
        assert!(!is_smart_only_path("/repo.git/info/refs"));
    }

    #[test]
    fn test_other_paths_do_not_match() {
        assert!(!is_git_protocol_path("/repo.git/refs/heads/master"));
        assert!(!is_git_protocol_path("/repo.git/README.md"));
        assert!(!is_git_protocol_path("/repo.git/info/refs/extra"));
        assert!(!is_git_protocol_path("/repo.git/objects/AB/cdef"));
        assert!(!is_git_protocol_path(&format!(
            "/repo.git/objects/pack/pack-{SHA40}.keep"
        )));
        assert!(!is_git_protocol_path("/repo.git/objects/pack/pack-123.pack"));
        assert!(!is_git_protocol_path("HEAD"));
    }

    #[test]
    fn test_repository_path_takes_last_git_segment() {
        assert_eq!(repository_path("/a.git"), Some("/a.git"));
        assert_eq!(repository_path("/r/a.git/b.git/HEAD"), Some("/r/a.git/b.git"));
        assert_eq!(repository_path("/r/a.gitx/HEAD"), None);
        assert_eq!(repository_path("/r/a.git/"), Some("/r/a.git"));
    }

    #[test]
    fn test_service_from_query() {
        assert_eq!(
            GitService::from_query(Some("service=git-upload-pack")),
            Some(GitService::UploadPack)
        );
        assert_eq!(
            GitService::from_query(Some("foo=1&service=git-receive-pack")),
            Some(GitService::ReceivePack)
        );
        assert_eq!(GitService::from_query(Some("service=git-archive")), None);
        assert_eq!(GitService::from_query(None), None);
        assert_eq!(GitService::ReceivePack.to_string(), "git-receive-pack");
    }
}
