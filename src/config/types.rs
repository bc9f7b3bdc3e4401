//! Configuration types.
//!
//! [`NodeConfig`] is the serde model read from YAML/JSON files and CLI
//! flags. [`SideloadConfig`] is the validated, immutable form a node is built
//! from; obtain one with [`SideloadConfig::builder`] or
//! [`NodeConfig::validate`].

use crate::error::ConfigError;
use crate::paths::parse_file_uri;
use crate::template::PathTemplate;
use crate::value::Scalar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// What to do when a point already carries a configured tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagPolicy {
    /// Sideload value replaces the point's value (default)
    #[default]
    Override,
    /// Only set tags the point does not already have
    FillMissing,
}

/// Node configuration as written in a config file.
///
/// ```yaml
/// source: file:///etc/sideload
/// order:
///   - host/{host}.yml
///   - hostgroup/{hostgroup}.yml
///   - default.yml
/// fields:
///   cpu_threshold: 80
/// tags:
///   region: unknown
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Location of the documents, `file://` only.
    #[serde(default)]
    pub source: Option<String>,

    /// Path templates, highest precedence first.
    #[serde(default)]
    pub order: Vec<String>,

    /// Field name to default value. The default's kind is enforced.
    #[serde(default)]
    pub fields: BTreeMap<String, serde_yaml::Value>,

    /// Tag name to default value.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    #[serde(default)]
    pub tag_policy: TagPolicy,

    /// Minimum seconds between repeated warnings for the same path and key.
    #[serde(default = "default_log_throttle_secs")]
    pub log_throttle_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            source: None,
            order: Vec::new(),
            fields: BTreeMap::new(),
            tags: BTreeMap::new(),
            tag_policy: TagPolicy::default(),
            log_throttle_secs: default_log_throttle_secs(),
        }
    }
}

fn default_log_throttle_secs() -> u64 {
    60
}

impl NodeConfig {
    /// Load a config file. YAML is a superset of JSON so both are accepted.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: NodeConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Validate into an immutable [`SideloadConfig`].
    pub fn validate(&self) -> Result<SideloadConfig, ConfigError> {
        let mut builder = SideloadConfig::builder()
            .order(self.order.iter().cloned())
            .tag_policy(self.tag_policy)
            .log_throttle(Duration::from_secs(self.log_throttle_secs));

        if let Some(ref source) = self.source {
            builder = builder.source(source.clone());
        }

        for (name, value) in &self.fields {
            let default = Scalar::from_yaml(value)
                .map_err(|source| ConfigError::DefaultOutOfRange {
                    field: name.clone(),
                    source,
                })?
                .ok_or_else(|| ConfigError::NonScalarDefault {
                    field: name.clone(),
                })?;
            builder = builder.field(name.clone(), default);
        }

        for (name, value) in &self.tags {
            builder = builder.tag(name.clone(), value.clone());
        }

        builder.build()
    }
}

/// Validated node configuration. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct SideloadConfig {
    source: String,
    order: Vec<PathTemplate>,
    fields: BTreeMap<String, Scalar>,
    tags: BTreeMap<String, String>,
    tag_policy: TagPolicy,
    log_throttle: Duration,
}

impl SideloadConfig {
    pub fn builder() -> SideloadConfigBuilder {
        SideloadConfigBuilder::default()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn order(&self) -> &[PathTemplate] {
        &self.order
    }

    pub fn fields(&self) -> &BTreeMap<String, Scalar> {
        &self.fields
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn tag_policy(&self) -> TagPolicy {
        self.tag_policy
    }

    pub fn log_throttle(&self) -> Duration {
        self.log_throttle
    }
}

/// Builder mirroring the node's property chain:
/// `source(..).order(..).field(..).tag(..)`.
///
/// Enrolling the same field or tag twice keeps the last default.
#[derive(Debug, Clone)]
pub struct SideloadConfigBuilder {
    source: Option<String>,
    order: Vec<String>,
    fields: BTreeMap<String, Scalar>,
    tags: BTreeMap<String, String>,
    tag_policy: TagPolicy,
    log_throttle: Duration,
}

impl Default for SideloadConfigBuilder {
    fn default() -> Self {
        Self {
            source: None,
            order: Vec::new(),
            fields: BTreeMap::new(),
            tags: BTreeMap::new(),
            tag_policy: TagPolicy::default(),
            log_throttle: Duration::from_secs(default_log_throttle_secs()),
        }
    }
}

impl SideloadConfigBuilder {
    pub fn source(mut self, uri: impl Into<String>) -> Self {
        self.source = Some(uri.into());
        self
    }

    /// Replace the precedence list.
    pub fn order<I, S>(mut self, templates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order = templates.into_iter().map(Into::into).collect();
        self
    }

    pub fn field(mut self, name: impl Into<String>, default: impl Into<Scalar>) -> Self {
        self.fields.insert(name.into(), default.into());
        self
    }

    pub fn tag(mut self, name: impl Into<String>, default: impl Into<String>) -> Self {
        self.tags.insert(name.into(), default.into());
        self
    }

    pub fn tag_policy(mut self, policy: TagPolicy) -> Self {
        self.tag_policy = policy;
        self
    }

    pub fn log_throttle(mut self, interval: Duration) -> Self {
        self.log_throttle = interval;
        self
    }

    /// Validate everything that can be checked without touching the source.
    pub fn build(self) -> Result<SideloadConfig, ConfigError> {
        let source = self.source.ok_or(ConfigError::MissingSource)?;
        parse_file_uri(&source)?;

        if self.order.is_empty() {
            return Err(ConfigError::EmptyOrder);
        }
        let order = self
            .order
            .iter()
            .map(|t| PathTemplate::parse(t))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SideloadConfig {
            source,
            order,
            fields: self.fields,
            tags: self.tags,
            tag_policy: self.tag_policy,
            log_throttle: self.log_throttle,
        })
    }
}
