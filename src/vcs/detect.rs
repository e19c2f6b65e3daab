//! Local checkout detection.
//!
//! Decides from filesystem evidence alone which VCS owns a directory, so a
//! checkout that already exists in the cache never needs resolving again.

use std::path::{Path, PathBuf};

use crate::resolver::GetError;
use crate::util::fs::to_slash;
use crate::vcs::VcsKind;

/// A working copy found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedCheckout {
    pub kind: VcsKind,
    /// Checkout directory relative to the boundary, `/`-separated
    pub root: String,
    /// Absolute checkout directory
    pub dir: PathBuf,
}

/// Walk up from `start` towards `boundary` looking for a VCS marker.
///
/// `start` must lie strictly inside `boundary`; the boundary itself is never
/// treated as a checkout. The first marker found wins, but the walk carries
/// on so that one VCS nested inside a different one is reported as an
/// error. Git inside git (submodules) is allowed.
pub fn detect_from_directory(start: &Path, boundary: &Path) -> Result<DetectedCheckout, GetError> {
    let outside = || GetError::NotACheckout {
        dir: start.to_path_buf(),
        reason: format!("outside of {}", boundary.display()),
    };

    let relative = start.strip_prefix(boundary).map_err(|_| outside())?;
    if relative.as_os_str().is_empty() {
        return Err(outside());
    }

    let mut found: Option<DetectedCheckout> = None;
    let mut dir = start.to_path_buf();

    while dir.starts_with(boundary) && dir != boundary {
        for kind in VcsKind::ALL {
            if !dir.join(kind.local_marker()).exists() {
                continue;
            }

            let root = dir
                .strip_prefix(boundary)
                .map(to_slash)
                .map_err(|_| outside())?;

            match &found {
                None => {
                    tracing::debug!("Found {} checkout at {}", kind, dir.display());
                    found = Some(DetectedCheckout {
                        kind,
                        root,
                        dir: dir.clone(),
                    });
                }
                Some(inner) if inner.kind == kind && kind == VcsKind::Git => {}
                Some(inner) => {
                    return Err(GetError::NotACheckout {
                        dir: inner.dir.clone(),
                        reason: format!(
                            "uses {}, but parent {} uses {}",
                            inner.kind.cmd(),
                            root,
                            kind.cmd()
                        ),
                    });
                }
            }
        }

        if !dir.pop() {
            break;
        }
    }

    found.ok_or_else(|| GetError::NotACheckout {
        dir: start.to_path_buf(),
        reason: "not using a known version control system".to_string(),
    })
}
