//! Import paths - WHAT the caller asked for.
//!
//! An import path is a host name followed by `/`-separated segments, e.g.
//! `github.com/org/repo/subdir`. It is untrusted input: it ends up in
//! directory names and, through resolution, in subprocess arguments.

use std::fmt;

use crate::resolver::GetError;

/// Characters never allowed anywhere in an import path.
const FORBIDDEN: &[char] = &['\\', '"', '\'', '*', '<', '>', '?', '`', '|', '#'];

/// A validated import path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportPath(String);

impl ImportPath {
    /// Validate and wrap an import path.
    ///
    /// Segments may contain any Unicode letters, but no whitespace, control
    /// characters or shell/URL metacharacters, and may not be `.` or `..`.
    pub fn parse(path: &str) -> Result<Self, GetError> {
        let invalid = |reason: &str| GetError::InvalidImportPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        if path.is_empty() {
            return Err(invalid("empty path"));
        }
        if path.starts_with('/') || path.ends_with('/') {
            return Err(invalid("leading or trailing slash"));
        }
        if path.starts_with('-') {
            return Err(invalid("leading dash"));
        }
        if let Some(c) = path
            .chars()
            .find(|c| c.is_whitespace() || c.is_control() || FORBIDDEN.contains(c))
        {
            return Err(invalid(&format!("invalid character {:?}", c)));
        }
        for segment in path.split('/') {
            match segment {
                "" => return Err(invalid("empty path segment")),
                "." | ".." => return Err(invalid("relative path segment")),
                _ => {}
            }
        }

        Ok(ImportPath(path.to_string()))
    }

    /// The path as given.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first segment (normally a host name).
    pub fn host(&self) -> &str {
        self.segments().next().unwrap_or_default()
    }

    /// Whether the first segment looks like a DNS name.
    pub fn has_dotted_host(&self) -> bool {
        self.host().contains('.')
    }

    /// Iterate over the `/`-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Candidate root prefixes, longest first, down to the host alone.
    pub fn prefixes(&self) -> Vec<&str> {
        let mut out = vec![self.as_str()];
        let mut rest = self.as_str();
        while let Some(idx) = rest.rfind('/') {
            rest = &rest[..idx];
            out.push(rest);
        }
        out
    }

    /// Whether `root` is this path or a whole-segment prefix of it.
    pub fn has_prefix(&self, root: &str) -> bool {
        is_path_prefix(self.as_str(), root)
    }

    /// Segments of this path that extend beyond `root`, if `root` is a prefix.
    pub fn strip_root(&self, root: &str) -> Option<&str> {
        if !self.has_prefix(root) {
            return None;
        }
        Some(self.0[root.len()..].trim_start_matches('/'))
    }
}

impl fmt::Display for ImportPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ImportPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Whether `prefix` equals `path` or ends exactly at a segment boundary of it.
pub fn is_path_prefix(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() || !path.starts_with(prefix) {
        return false;
    }
    path.len() == prefix.len() || path.as_bytes()[prefix.len()] == b'/'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_paths() {
        for path in [
            "github.com/golang/groupcache",
            "github.com/user/unicode/испытание",
            "hub.jazz.net/git/user1/pkgname",
            "example.com:8080/repo.git/sub",
            "localhost",
        ] {
            assert!(ImportPath::parse(path).is_ok(), "{} should be valid", path);
        }
    }

    #[test]
    fn test_parse_rejects_malformed_paths() {
        for path in [
            "",
            "/github.com/a/b",
            "github.com/a/b/",
            "github.com//b",
            "github.com/../etc",
            "github.com/./b",
            "hub.jazz.net/git/User 1/pkgname",
            "github.com/a/b\\c",
            "-oProxyCommand=evil",
            "github.com/a\tb",
        ] {
            let err = ImportPath::parse(path).unwrap_err();
            assert!(
                matches!(err, GetError::InvalidImportPath { .. }),
                "{} should be rejected",
                path
            );
        }
    }

    #[test]
    fn test_prefixes_longest_first() {
        let path = ImportPath::parse("example.com/a/b/c").unwrap();
        assert_eq!(
            path.prefixes(),
            vec![
                "example.com/a/b/c",
                "example.com/a/b",
                "example.com/a",
                "example.com"
            ]
        );
        assert_eq!(path.host(), "example.com");
    }

    #[test]
    fn test_has_prefix_respects_segments() {
        let path = ImportPath::parse("example.com/org/repo/sub").unwrap();
        assert!(path.has_prefix("example.com/org/repo"));
        assert!(path.has_prefix("example.com/org/repo/sub"));
        assert!(!path.has_prefix("example.com/org/re"));
        assert!(!path.has_prefix("example.com/org/repo/sub/deeper"));
        assert!(!path.has_prefix(""));
    }

    #[test]
    fn test_strip_root() {
        let path = ImportPath::parse("github.com/tilt-dev/tilt-extensions/hello_world").unwrap();
        assert_eq!(
            path.strip_root("github.com/tilt-dev/tilt-extensions"),
            Some("hello_world")
        );
        assert_eq!(path.strip_root(path.as_str()), Some(""));
        assert_eq!(path.strip_root("gitlab.com/x"), None);
    }
}
