//! Test fixtures for common test scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use crate::vcs::VcsKind;

/// An HTML discovery page declaring `records` as `(prefix, vcs, repo)`.
pub fn meta_page(records: &[(&str, &str, &str)]) -> String {
    let mut html = String::from("<!DOCTYPE html>\n<html>\n<head>\n");
    for (prefix, vcs, repo) in records {
        html.push_str(&format!(
            "<meta name=\"go-import\" content=\"{} {} {}\">\n",
            prefix, vcs, repo
        ));
    }
    html.push_str("</head>\n<body>\nNothing to see here.\n</body>\n</html>\n");
    html
}

/// Lay out a fake checkout of `kind` for `root` under `cache`, with `files`
/// relative to the checkout. Returns the checkout directory.
pub fn fake_checkout(cache: &Path, root: &str, kind: VcsKind, files: &[(&str, &str)]) -> PathBuf {
    let dir = root.split('/').fold(cache.to_path_buf(), |p, s| p.join(s));
    fs::create_dir_all(dir.join(kind.local_marker())).expect("failed to create marker");
    for (rel, content) in files {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        fs::write(&path, content).expect("failed to write fixture file");
    }
    dir
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::discovery::parse_meta_imports;
    use tempfile::TempDir;

    #[test]
    fn test_meta_page_parses() {
        let html = meta_page(&[("example.org/a", "git", "https://example.org/a.git")]);
        let imports = parse_meta_imports(&html);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].repo, "https://example.org/a.git");
    }

    #[test]
    fn test_fake_checkout() {
        let tmp = TempDir::new().unwrap();
        let dir = fake_checkout(
            tmp.path(),
            "github.com/org/repo",
            VcsKind::Git,
            &[("hello_world/Tiltfile", "print(\"Hello world!\")\n")],
        );

        assert!(dir.join(".git").is_dir());
        assert!(dir.join("hello_world").join("Tiltfile").is_file());
    }
}
