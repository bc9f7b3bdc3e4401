//! Document parsers selected by file extension.

use super::Document;
use crate::value::Scalar;
use std::collections::BTreeMap;

/// Parses raw file contents into a flat document.
///
/// Only top-level keys with scalar values are kept. Nested mappings and
/// sequences are skipped without error; an integer that does not fit in
/// `i64` fails the whole document.
pub trait DocumentParser: Send + Sync {
    /// Extensions (without the dot) this parser handles.
    fn extensions(&self) -> &[&'static str];

    fn parse(&self, content: &str) -> Result<Document, String>;
}

/// YAML documents (`.yml`, `.yaml`).
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlParser;

impl DocumentParser for YamlParser {
    fn extensions(&self) -> &[&'static str] {
        &["yml", "yaml"]
    }

    fn parse(&self, content: &str) -> Result<Document, String> {
        let value: serde_yaml::Value = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
        match value {
            // An empty file parses as null
            serde_yaml::Value::Null => Ok(Document::default()),
            serde_yaml::Value::Mapping(map) => {
                let mut values = BTreeMap::new();
                for (k, v) in &map {
                    let Some(key) = k.as_str() else { continue };
                    let scalar = Scalar::from_yaml(v).map_err(|e| format!("key '{key}': {e}"))?;
                    if let Some(scalar) = scalar {
                        values.insert(key.to_string(), scalar);
                    }
                }
                Ok(Document::new(values))
            }
            _ => Err("top level of a sideload document must be a mapping".to_string()),
        }
    }
}

/// JSON documents (`.json`).
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonParser;

impl DocumentParser for JsonParser {
    fn extensions(&self) -> &[&'static str] {
        &["json"]
    }

    fn parse(&self, content: &str) -> Result<Document, String> {
        let value: serde_json::Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
        match value {
            serde_json::Value::Object(map) => {
                let mut values = BTreeMap::new();
                for (key, v) in &map {
                    let scalar = Scalar::from_json(v).map_err(|e| format!("key '{key}': {e}"))?;
                    if let Some(scalar) = scalar {
                        values.insert(key.clone(), scalar);
                    }
                }
                Ok(Document::new(values))
            }
            _ => Err("top level of a sideload document must be an object".to_string()),
        }
    }
}
