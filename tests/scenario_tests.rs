//! End-to-end enrichment over a real source directory.
//!
//! Each test lays out a small document hierarchy in a temp dir and runs
//! points through a node built from a `file://` URI.

use chrono::{TimeZone, Utc};
use sideload_node::paths::uri_for_dir;
use sideload_node::{
    ConfigError, ErrorKind, NodeError, Point, Scalar, ScalarKind, SideloadConfig, SideloadError,
    SideloadNode, TagPolicy,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const ORDER: [&str; 3] = ["host/{host}.yml", "hostgroup/{hostgroup}.yml", "default.yml"];

/// Write `content` at `rel` under `root`, creating parent directories.
fn write_doc(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// The three-level hierarchy used by most tests.
fn hierarchy() -> TempDir {
    let temp = TempDir::new().unwrap();
    write_doc(temp.path(), "default.yml", "cpu_threshold: 50\nregion: us-east\n");
    write_doc(temp.path(), "hostgroup/web.yml", "cpu_threshold: 70\n");
    write_doc(temp.path(), "host/h1.yml", "cpu_threshold: 90\n");
    temp
}

fn node_for(root: &Path) -> SideloadNode {
    let config = SideloadConfig::builder()
        .source(uri_for_dir(root))
        .order(ORDER)
        .field("cpu_threshold", 80)
        .tag("region", "unknown")
        .build()
        .expect("valid config");
    SideloadNode::new(config).expect("node")
}

fn point(tags: &[(&str, &str)]) -> Point {
    let time = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    tags.iter()
        .fold(Point::new("cpu", time), |p, (k, v)| p.with_tag(*k, *v))
}

mod hierarchy_tests {
    use super::*;

    #[test]
    fn test_most_specific_document_wins() {
        let temp = hierarchy();
        let node = node_for(temp.path());

        let enriched = node.process(&point(&[("host", "h1"), ("hostgroup", "web")]));
        assert_eq!(enriched.data.fields["cpu_threshold"], Scalar::Int(90));
        assert!(enriched.errors.is_empty());
    }

    #[test]
    fn test_falls_back_to_hostgroup() {
        let temp = hierarchy();
        let node = node_for(temp.path());

        let enriched = node.process(&point(&[("host", "h2"), ("hostgroup", "web")]));
        assert_eq!(enriched.data.fields["cpu_threshold"], Scalar::Int(70));
    }

    #[test]
    fn test_falls_back_to_default_document() {
        let temp = hierarchy();
        let node = node_for(temp.path());

        let enriched = node.process(&point(&[("host", "h3"), ("hostgroup", "db")]));
        assert_eq!(enriched.data.fields["cpu_threshold"], Scalar::Int(50));
        assert!(enriched.errors.is_empty());
    }

    #[test]
    fn test_missing_tag_skips_template() {
        let temp = hierarchy();
        let node = node_for(temp.path());

        let enriched = node.process(&point(&[("hostgroup", "web")]));
        assert_eq!(enriched.data.fields["cpu_threshold"], Scalar::Int(70));
        assert!(enriched.errors.is_empty());
    }

    #[test]
    fn test_no_documents_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let node = node_for(temp.path());

        let enriched = node.process(&point(&[("host", "h1")]));
        assert_eq!(enriched.data.fields["cpu_threshold"], Scalar::Int(80));
        assert_eq!(enriched.data.tags["region"], "unknown");
        assert!(enriched.errors.is_empty());
    }

    #[test]
    fn test_json_documents() {
        let temp = TempDir::new().unwrap();
        write_doc(temp.path(), "default.json", r#"{"cpu_threshold": 65, "nested": {"x": 1}}"#);
        let config = SideloadConfig::builder()
            .source(uri_for_dir(temp.path()))
            .order(["default.json"])
            .field("cpu_threshold", 80)
            .field("nested", 0)
            .build()
            .unwrap();
        let node = SideloadNode::new(config).unwrap();

        let enriched = node.process(&point(&[]));
        assert_eq!(enriched.data.fields["cpu_threshold"], Scalar::Int(65));
        // Nested values are ignored, not errors
        assert_eq!(enriched.data.fields["nested"], Scalar::Int(0));
        assert!(enriched.errors.is_empty());
    }
}

mod type_tests {
    use super::*;

    #[test]
    fn test_mismatch_falls_through_to_default() {
        let temp = TempDir::new().unwrap();
        write_doc(temp.path(), "host/h1.yml", "cpu_threshold: high\n");
        let node = node_for(temp.path());

        let enriched = node.process(&point(&[("host", "h1")]));
        assert_eq!(enriched.data.fields["cpu_threshold"], Scalar::Int(80));
        assert_eq!(
            enriched.errors,
            vec![SideloadError::TypeMismatch {
                key: "cpu_threshold".to_string(),
                path: "host/h1.yml".to_string(),
                expected: ScalarKind::Int,
                found: ScalarKind::String,
            }]
        );
        assert_eq!(node.metrics().error_count(ErrorKind::TypeMismatch), 1);
    }

    #[test]
    fn test_mismatch_continues_to_later_document() {
        let temp = hierarchy();
        write_doc(temp.path(), "host/h1.yml", "cpu_threshold: 90.5\n");
        let node = node_for(temp.path());

        let enriched = node.process(&point(&[("host", "h1"), ("hostgroup", "web")]));
        assert_eq!(enriched.data.fields["cpu_threshold"], Scalar::Int(70));
        assert_eq!(enriched.errors.len(), 1);
    }

    #[test]
    fn test_float_field() {
        let temp = TempDir::new().unwrap();
        write_doc(temp.path(), "default.yml", "ratio: 0.25\nenabled: false\n");
        let config = SideloadConfig::builder()
            .source(uri_for_dir(temp.path()))
            .order(["default.yml"])
            .field("ratio", 1.0)
            .field("enabled", true)
            .build()
            .unwrap();
        let node = SideloadNode::new(config).unwrap();

        let enriched = node.process(&point(&[]));
        assert_eq!(enriched.data.fields["ratio"], Scalar::Float(0.25));
        assert_eq!(enriched.data.fields["enabled"], Scalar::Bool(false));
    }

    #[test]
    fn test_malformed_document_is_load_error() {
        let temp = hierarchy();
        write_doc(temp.path(), "host/h1.yml", "cpu_threshold: [unclosed\n");
        let node = node_for(temp.path());

        let enriched = node.process(&point(&[("host", "h1"), ("hostgroup", "web")]));
        assert_eq!(enriched.data.fields["cpu_threshold"], Scalar::Int(70));
        assert_eq!(enriched.errors.len(), 1);
        assert_eq!(enriched.errors[0].kind(), ErrorKind::Load);
    }

    #[test]
    fn test_integer_overflow_is_load_error_not_float() {
        let temp = hierarchy();
        write_doc(temp.path(), "host/h1.yml", "cpu_threshold: 18446744073709551615\n");
        let node = node_for(temp.path());

        let enriched = node.process(&point(&[("host", "h1"), ("hostgroup", "web")]));
        assert_eq!(enriched.data.fields["cpu_threshold"], Scalar::Int(70));
        assert_eq!(enriched.errors.len(), 1);
        assert_eq!(enriched.errors[0].kind(), ErrorKind::Load);
    }
}

mod tag_tests {
    use super::*;

    #[test]
    fn test_tag_added_from_document() {
        let temp = hierarchy();
        let node = node_for(temp.path());

        let enriched = node.process(&point(&[("host", "h1")]));
        assert_eq!(enriched.data.tags["region"], "us-east");
        assert_eq!(enriched.data.tags["host"], "h1");
    }

    #[test]
    fn test_existing_tag_overridden() {
        let temp = hierarchy();
        let node = node_for(temp.path());

        let enriched = node.process(&point(&[("region", "eu")]));
        assert_eq!(enriched.data.tags["region"], "us-east");
    }

    #[test]
    fn test_fill_missing_keeps_existing_tag() {
        let temp = hierarchy();
        let config = SideloadConfig::builder()
            .source(uri_for_dir(temp.path()))
            .order(ORDER)
            .tag("region", "unknown")
            .tag_policy(TagPolicy::FillMissing)
            .build()
            .unwrap();
        let node = SideloadNode::new(config).unwrap();

        assert_eq!(node.process(&point(&[("region", "eu")])).data.tags["region"], "eu");
        assert_eq!(node.process(&point(&[])).data.tags["region"], "us-east");
    }

    #[test]
    fn test_numeric_tag_value_rejected() {
        let temp = TempDir::new().unwrap();
        write_doc(temp.path(), "default.yml", "rack: 12\n");
        let config = SideloadConfig::builder()
            .source(uri_for_dir(temp.path()))
            .order(["default.yml"])
            .tag("rack", "none")
            .build()
            .unwrap();
        let node = SideloadNode::new(config).unwrap();

        let enriched = node.process(&point(&[]));
        assert_eq!(enriched.data.tags["rack"], "none");
        assert_eq!(enriched.errors[0].kind(), ErrorKind::TypeMismatch);
    }
}

mod reload_tests {
    use super::*;

    #[test]
    fn test_cached_until_reload() {
        let temp = hierarchy();
        let node = node_for(temp.path());
        let p = point(&[("host", "h3")]);

        assert_eq!(node.process(&p).data.fields["cpu_threshold"], Scalar::Int(50));

        write_doc(temp.path(), "default.yml", "cpu_threshold: 55\n");
        assert_eq!(node.process(&p).data.fields["cpu_threshold"], Scalar::Int(50));

        node.reload();
        assert_eq!(node.process(&p).data.fields["cpu_threshold"], Scalar::Int(55));
    }

    #[test]
    fn test_not_found_cached_until_reload() {
        let temp = hierarchy();
        let node = node_for(temp.path());
        let p = point(&[("host", "h9")]);

        assert_eq!(node.process(&p).data.fields["cpu_threshold"], Scalar::Int(50));

        write_doc(temp.path(), "host/h9.yml", "cpu_threshold: 99\n");
        assert_eq!(node.process(&p).data.fields["cpu_threshold"], Scalar::Int(50));

        node.reload();
        assert_eq!(node.process(&p).data.fields["cpu_threshold"], Scalar::Int(99));
    }

    #[test]
    fn test_load_error_retried_without_reload() {
        let temp = hierarchy();
        write_doc(temp.path(), "default.yml", "cpu_threshold: [broken\n");
        let node = node_for(temp.path());
        let p = point(&[]);

        assert_eq!(node.process(&p).errors.len(), 1);

        write_doc(temp.path(), "default.yml", "cpu_threshold: 42\n");
        let enriched = node.process(&p);
        assert!(enriched.errors.is_empty());
        assert_eq!(enriched.data.fields["cpu_threshold"], Scalar::Int(42));
    }
}

mod traversal_tests {
    use super::*;

    #[test]
    fn test_escaping_template_rejected_at_construction() {
        let temp = TempDir::new().unwrap();
        let err = SideloadConfig::builder()
            .source(uri_for_dir(temp.path()))
            .order(["../{host}.yml"])
            .field("cpu_threshold", 80)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::TemplateEscapesRoot { .. }));
    }

    #[test]
    fn test_absolute_template_rejected_at_construction() {
        let err = SideloadConfig::builder()
            .source("file:///tmp")
            .order(["/etc/{host}"])
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::TemplateEscapesRoot { .. }));
    }

    #[test]
    fn test_traversing_tag_value_never_reads_outside_root() {
        let outer = TempDir::new().unwrap();
        let root = outer.path().join("root");
        fs::create_dir(&root).unwrap();
        write_doc(outer.path(), "secret.yml", "cpu_threshold: 1\n");

        let config = SideloadConfig::builder()
            .source(uri_for_dir(&root))
            .order(["{host}.yml"])
            .field("cpu_threshold", 80)
            .build()
            .unwrap();
        let node = SideloadNode::new(config).unwrap();

        let enriched = node.process(&point(&[("host", "../secret")]));
        assert_eq!(enriched.data.fields["cpu_threshold"], Scalar::Int(80));
        assert_eq!(enriched.errors[0].kind(), ErrorKind::Path);
        assert!(node.cache().is_empty());
    }

    #[cfg(not(windows))]
    #[test]
    fn test_colon_in_names_is_plain_relative_path() {
        let temp = TempDir::new().unwrap();
        write_doc(temp.path(), "a:1.yml", "cpu_threshold: 1\n");
        write_doc(temp.path(), "east:r1.yml", "cpu_threshold: 7\n");

        let config = SideloadConfig::builder()
            .source(uri_for_dir(temp.path()))
            .order(["{id}.yml", "{dc}:{rack}.yml"])
            .field("cpu_threshold", 80)
            .build()
            .unwrap();
        let node = SideloadNode::new(config).unwrap();

        let enriched = node.process(&point(&[("id", "a:1")]));
        assert_eq!(enriched.data.fields["cpu_threshold"], Scalar::Int(1));
        assert!(enriched.errors.is_empty());

        let enriched = node.process(&point(&[("dc", "east"), ("rack", "r1")]));
        assert_eq!(enriched.data.fields["cpu_threshold"], Scalar::Int(7));
        assert!(enriched.errors.is_empty());
    }

    #[test]
    fn test_missing_source_root_rejected() {
        let temp = TempDir::new().unwrap();
        let config = SideloadConfig::builder()
            .source(uri_for_dir(&temp.path().join("absent")))
            .order(["default.yml"])
            .build()
            .unwrap();
        assert!(matches!(
            SideloadNode::new(config),
            Err(NodeError::Config(ConfigError::InvalidSource { .. }))
        ));
    }
}

mod invariant_tests {
    use super::*;

    fn samples() -> Vec<Point> {
        vec![
            point(&[]),
            point(&[("host", "h1")]),
            point(&[("host", "h1"), ("hostgroup", "web")]),
            point(&[("host", "h2"), ("hostgroup", "db"), ("region", "eu")]),
            point(&[("host", "../x"), ("hostgroup", "web")]),
        ]
        .into_iter()
        .map(|p| p.with_field("usage", 12.5).with_field("count", 3))
        .collect()
    }

    #[test]
    fn test_output_preserves_input() {
        let temp = hierarchy();
        let node = node_for(temp.path());

        for input in samples() {
            let output = node.process(&input).data;
            assert_eq!(output.name, input.name);
            assert_eq!(output.time, input.time);
            for (k, v) in &input.fields {
                assert_eq!(&output.fields[k], v);
            }
            for (k, v) in &input.tags {
                if k != "region" {
                    assert_eq!(&output.tags[k], v);
                }
            }
        }
    }

    #[test]
    fn test_defaults_complete_and_kinds_match() {
        let temp = hierarchy();
        write_doc(temp.path(), "hostgroup/db.yml", "cpu_threshold: lots\n");
        let node = node_for(temp.path());

        for input in samples() {
            let output = node.process(&input).data;
            for (name, default) in node.config().fields() {
                assert_eq!(output.fields[name].kind(), default.kind());
            }
            for name in node.config().tags().keys() {
                assert!(output.tags.contains_key(name));
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let temp = hierarchy();
        let node = node_for(temp.path());

        for input in samples() {
            let first = node.process(&input);
            let second = node.process(&input);
            assert_eq!(first, second);
        }
    }
}
