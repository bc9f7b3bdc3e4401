//! Points and batches flowing through the node.

use crate::value::Scalar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single record: measurement, tags, fields and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub name: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub fields: BTreeMap<String, Scalar>,
    pub time: DateTime<Utc>,
}

impl Point {
    pub fn new(name: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            time,
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// A group of points sharing a name and group tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub name: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    pub points: Vec<Point>,
}

impl Batch {
    /// Tags a member point is matched with: group tags overlaid by the
    /// point's own tags.
    pub fn effective_tags(&self, point: &Point) -> BTreeMap<String, String> {
        let mut tags = self.tags.clone();
        tags.extend(point.tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        tags
    }
}

/// One line of the JSON-lines stream: a batch or a single point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Record {
    Batch(Batch),
    Point(Point),
}
