//! Integration tests for building a node from a config file.

use chrono::Utc;
use sideload_node::config::{ConfigLoader, ConfigPaths};
use sideload_node::paths::uri_for_dir;
use sideload_node::{ConfigError, Point, Scalar, SideloadNode, TagPolicy};
use std::fs;
use tempfile::TempDir;

/// Lay out a source dir and a config file pointing at it.
fn setup(config_body: &str) -> (TempDir, ConfigLoader) {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    fs::create_dir_all(source.join("host")).unwrap();
    fs::write(source.join("host/h1.yml"), "cpu_threshold: 90\nregion: eu\n").unwrap();
    fs::write(source.join("default.json"), r#"{"cpu_threshold": 50}"#).unwrap();

    let config_file = temp.path().join("sideload.yaml");
    let content = format!("source: {}\n{}", uri_for_dir(&source), config_body);
    fs::write(&config_file, content).unwrap();

    let loader = ConfigLoader::load_with_paths(ConfigPaths::with_files(Some(config_file), None))
        .expect("Failed to load config");
    (temp, loader)
}

#[test]
fn test_node_from_config_file() {
    let (_temp, loader) = setup(
        r#"
order:
  - host/{host}.yml
  - default.json
fields:
  cpu_threshold: 80
tags:
  region: unknown
tag_policy: fill_missing
log_throttle_secs: 5
"#,
    );

    let config = loader.config().validate().unwrap();
    assert_eq!(config.tag_policy(), TagPolicy::FillMissing);
    assert_eq!(config.log_throttle().as_secs(), 5);

    let node = SideloadNode::new(config).unwrap();
    let point = Point::new("cpu", Utc::now())
        .with_tag("host", "h1")
        .with_tag("region", "us");
    let enriched = node.process(&point);
    assert_eq!(enriched.data.fields["cpu_threshold"], Scalar::Int(90));
    assert_eq!(enriched.data.tags["region"], "us");

    let other = Point::new("cpu", Utc::now()).with_tag("host", "h2");
    let enriched = node.process(&other);
    assert_eq!(enriched.data.fields["cpu_threshold"], Scalar::Int(50));
    assert_eq!(enriched.data.tags["region"], "unknown");
}

#[test]
fn test_empty_order_in_file_rejected() {
    let (_temp, loader) = setup("order: []\n");
    assert_eq!(loader.config().validate().unwrap_err(), ConfigError::EmptyOrder);
}

#[test]
fn test_malformed_template_in_file_rejected() {
    let (_temp, loader) = setup("order: ['host/{host']\n");
    assert!(matches!(
        loader.config().validate(),
        Err(ConfigError::MalformedTemplate { .. })
    ));
}

#[test]
fn test_unknown_tag_policy_rejected() {
    let temp = TempDir::new().unwrap();
    let config_file = temp.path().join("sideload.yaml");
    fs::write(&config_file, "tag_policy: sometimes\n").unwrap();
    assert!(
        ConfigLoader::load_with_paths(ConfigPaths::with_files(Some(config_file), None)).is_err()
    );
}
