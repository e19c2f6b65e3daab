//! Resolution results - WHERE an import path lives.

use std::fmt;

use serde::Serialize;

use crate::vcs::VcsKind;

/// The repository that owns an import path.
///
/// `root` is always a whole-segment prefix of the import path that produced
/// it; `repo` is the URL handed to the VCS client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoRoot {
    /// Version control system of the repository
    pub kind: VcsKind,

    /// Repository URL passed to clone
    pub repo: String,

    /// Import path prefix identifying the whole repository
    pub root: String,
}

impl RepoRoot {
    pub fn new(kind: VcsKind, repo: impl Into<String>, root: impl Into<String>) -> Self {
        RepoRoot {
            kind,
            repo: repo.into(),
            root: root.into(),
        }
    }

    /// Root served over https, the shape every known-host pattern produces.
    pub fn https(kind: VcsKind, root: impl Into<String>) -> Self {
        let root = root.into();
        RepoRoot {
            kind,
            repo: format!("https://{}", root),
            root,
        }
    }
}

impl fmt::Display for RepoRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {})", self.root, self.kind.cmd(), self.repo)
    }
}
