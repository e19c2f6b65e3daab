//! Wharf - resolve import paths to repositories and cache their checkouts
//!
//! This crate maps an import path such as `github.com/org/repo/subdir` to a
//! version-control repository, clones it with the matching external client
//! (git, hg, bzr, svn or fossil) and keeps the checkout in a local cache.
//! Repeated downloads of the same repository are served from that cache.

pub mod core;
pub mod resolver;
pub mod sources;
pub mod util;
pub mod vcs;

/// Test utilities and mocks for Wharf unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides mock implementations for process execution
/// and HTTP metadata fetching.
#[cfg(test)]
pub mod test_support;

pub use core::{import_path::ImportPath, repo_root::RepoRoot};
pub use resolver::{GetError, Resolver};
pub use sources::Downloader;
pub use vcs::{security::SecurityPolicy, VcsKind};
