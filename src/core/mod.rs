//! Core data model.

pub mod import_path;
pub mod repo_root;

pub use import_path::ImportPath;
pub use repo_root::RepoRoot;
