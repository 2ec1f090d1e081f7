//! Lexical path normalization.

/// Normalizes a `/`-separated path.
///
/// Empty and `.` segments are dropped, `..` pops the previously kept
/// segment and is ignored when nothing is left to pop. An absolute input
/// keeps exactly one leading `/`. The result is idempotent:
/// `clean_path(&clean_path(p)) == clean_path(p)`.
///
/// This does not clamp to any root; containment is checked by
/// [`LinkConverter::is_path_valid`](super::LinkConverter::is_path_valid).
///
/// # Example
///
/// ```
/// use davgit_core::path::clean_path;
///
/// assert_eq!(clean_path("/a/b/../c//./d"), "/a/c/d");
/// assert_eq!(clean_path("/../../etc"), "/etc");
/// assert_eq!(clean_path("a/./b/"), "a/b");
/// ```
pub fn clean_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut stack: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                stack.pop();
            },
            other => stack.push(other),
        }
    }

    let joined = stack.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Returns true if `path` equals `root` or lies below it, compared by
/// whole segments so that `/srv/git-evil` is not under `/srv/git`.
pub fn is_within(path: &str, root: &str) -> bool {
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        return path.starts_with('/');
    }
    match path.strip_prefix(root) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Strips `root` from `path`, returning the remainder with its leading `/`.
///
/// Returns `None` when `path` is not within `root`.
pub fn strip_root<'a>(path: &'a str, root: &str) -> Option<&'a str> {
    if !is_within(path, root) {
        return None;
    }
    let root = root.trim_end_matches('/');
    Some(&path[root.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_path_example() {
        assert_eq!(clean_path("/a/b/../c//./d"), "/a/c/d");
    }

    #[test]
    fn test_clean_path_idempotent() {
        let inputs = [
            "/a/b/../c//./d",
            "//x///y/",
            "../../a",
            "/",
            "",
            "./",
            "/srv/git/repo.git/../other.git/./HEAD",
        ];
        for input in inputs {
            let once = clean_path(input);
            assert_eq!(clean_path(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_clean_path_never_escapes_empty_stack() {
        assert_eq!(clean_path("/.."), "/");
        assert_eq!(clean_path("/../a/../../b"), "/b");
        assert_eq!(clean_path("../a"), "a");
    }

    #[test]
    fn test_clean_path_collapses_slashes() {
        assert_eq!(clean_path("///a////b"), "/a/b");
        assert_eq!(clean_path("a//b/"), "a/b");
    }

    #[test]
    fn test_clean_path_root_and_empty() {
        assert_eq!(clean_path("/"), "/");
        assert_eq!(clean_path(""), "");
        assert_eq!(clean_path("."), "");
    }

    #[test]
    fn test_is_within_is_segment_aware() {
        assert!(is_within("/srv/git", "/srv/git"));
        assert!(is_within("/srv/git/a.git", "/srv/git"));
        assert!(is_within("/srv/git/a.git", "/srv/git/"));
        assert!(!is_within("/srv/git-evil/a.git", "/srv/git"));
        assert!(!is_within("/srv", "/srv/git"));
        assert!(is_within("/anything", "/"));
    }

    #[test]
    fn test_strip_root() {
        assert_eq!(strip_root("/srv/git/a.git/HEAD", "/srv/git"), Some("/a.git/HEAD"));
        assert_eq!(strip_root("/srv/git", "/srv/git"), Some(""));
        assert_eq!(strip_root("/srv/gitx", "/srv/git"), None);
    }
}
