//! Sideload node library.
//!
//! Enriches points with fields and tags looked up in a hierarchy of
//! documents. The hierarchy is an ordered list of path templates expanded
//! with the point's own tags; the first document holding a key wins.
//!
//! ```ignore
//! let config = SideloadConfig::builder()
//!     .source("file:///etc/sideload")
//!     .order(["host/{host}.yml", "hostgroup/{hostgroup}.yml", "default.yml"])
//!     .field("cpu_threshold", 80)
//!     .tag("region", "unknown")
//!     .build()?;
//! let node = SideloadNode::new(config)?;
//! let enriched = node.process(&point);
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod paths;
pub mod point;
pub mod resolver;
pub mod source;
pub mod template;
pub mod value;

pub use config::{SideloadConfig, TagPolicy};
pub use error::{ConfigError, ErrorKind, LoadError, NodeError, PathError, SideloadError};
pub use node::{Enrich, Enriched, SideloadNode};
pub use point::{Batch, Point, Record};
pub use value::{Scalar, ScalarKind};
