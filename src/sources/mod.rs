//! Repository sources.
//!
//! The [`Downloader`] fetches repositories into the local cache and works
//! on the checkouts it finds there.

pub mod downloader;

pub use downloader::Downloader;
