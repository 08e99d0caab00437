//! POSIX path normalization.
//!
//! Two variants are needed because the index uses paths two different ways:
//! [`normpath`] clamps `..` at the root (used for any path an index row is
//! actually stored or looked up under), while [`query_normpath`] preserves
//! `..` segments that climb past the root (used to detect queries that
//! reach outside the mounted namespace before they are rejected).

/// Normalize a path, collapsing `.`/`..`/redundant slashes, clamping any
/// `..` that would climb above the root.
pub fn normpath(path: &str) -> String {
    build(path, false)
}

/// Like [`normpath`] but preserves excess `..` segments above the root
/// instead of discarding them.
pub fn query_normpath(path: &str) -> String {
    build(path, true)
}

fn build(path: &str, preserve_excess_dotdot: bool) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if preserve_excess_dotdot {
                    if stack.last() == Some(&"..") || stack.is_empty() {
                        stack.push("..");
                    } else {
                        stack.pop();
                    }
                } else {
                    stack.pop();
                }
            }
            other => stack.push(other),
        }
    }
    if stack.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", stack.join("/"))
    }
}

/// Split a normalized absolute path into `(parent, name)`. The root path
/// has no valid split and returns `None`.
pub fn split_parent(path: &str) -> Option<(&str, &str)> {
    let normalized = path.trim_end_matches('/');
    if normalized.is_empty() {
        return None;
    }
    match normalized.rfind('/') {
        Some(0) => Some(("/", &normalized[1..])),
        Some(idx) => Some((&normalized[..idx], &normalized[idx + 1..])),
        None => Some(("/", normalized)),
    }
}

/// Join a parent path and a name into a normalized child path.
pub fn join(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normpath_collapses_and_clamps() {
        assert_eq!(normpath("/"), "/");
        assert_eq!(normpath("//"), "/");
        assert_eq!(normpath("///"), "/");

        assert_eq!(normpath("a"), "/a");
        assert_eq!(normpath("/a"), "/a");
        assert_eq!(normpath("a/"), "/a");
        assert_eq!(normpath("/a/"), "/a");
        assert_eq!(normpath("//a//"), "/a");

        assert_eq!(normpath("."), "/");
        assert_eq!(normpath("/."), "/");
        assert_eq!(normpath("./"), "/");
        assert_eq!(normpath("/./"), "/");
        assert_eq!(normpath("//.//"), "/");

        assert_eq!(normpath("./././a/.././"), "/");
        assert_eq!(normpath("../"), "/");
        assert_eq!(normpath("../.././.."), "/");
    }

    #[test]
    fn query_normpath_preserves_excess_dotdot() {
        assert_eq!(query_normpath("/"), "/");
        assert_eq!(query_normpath("//"), "/");
        assert_eq!(query_normpath("///"), "/");

        assert_eq!(query_normpath("a"), "/a");
        assert_eq!(query_normpath("/a"), "/a");
        assert_eq!(query_normpath("a/"), "/a");
        assert_eq!(query_normpath("/a/"), "/a");
        assert_eq!(query_normpath("//a//"), "/a");

        assert_eq!(query_normpath("."), "/");
        assert_eq!(query_normpath("/."), "/");
        assert_eq!(query_normpath("./"), "/");
        assert_eq!(query_normpath("/./"), "/");
        assert_eq!(query_normpath("//.//"), "/");

        assert_eq!(query_normpath("./././a/.././"), "/");
        assert_eq!(query_normpath("../"), "/..");
        assert_eq!(query_normpath("../.././.."), "/../../..");
    }

    #[test]
    fn split_parent_basics() {
        assert_eq!(split_parent("/a"), Some(("/", "a")));
        assert_eq!(split_parent("/a/b"), Some(("/a", "b")));
        assert_eq!(split_parent("/"), None);
    }

    #[test]
    fn join_roundtrips_with_split_parent() {
        assert_eq!(join("/", "a"), "/a");
        assert_eq!(join("/a", "b"), "/a/b");
        let p = join("/a", "b");
        assert_eq!(split_parent(&p), Some(("/a", "b")));
    }
}
