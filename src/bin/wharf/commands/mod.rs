//! Command implementations

pub mod completions;
pub mod get;
pub mod head;
pub mod path;
pub mod root;
pub mod sync;
pub mod tags;
