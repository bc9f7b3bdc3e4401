//! Node configuration.
//!
//! A [`SideloadConfig`] is built either through [`SideloadConfig::builder`]
//! or from a YAML/JSON file via [`NodeConfig`]. Files are discovered by
//! [`ConfigLoader`].
//!
//! ## Environment Variables
//! - `SIDELOAD_CONFIG` - Config file path
//! - `SIDELOAD_SOURCE` - Source URI, overrides the file

mod loader;
mod types;
pub mod watcher;

pub use loader::{ConfigLoader, ConfigPaths};
pub use types::*;
