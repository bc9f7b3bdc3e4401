//! Check subcommand: validate configuration and preview path expansion.

use super::parse_key_value;
use crate::config::SideloadConfig;
use crate::node::SideloadNode;
use crate::point::Point;
use crate::template::expand;
use chrono::Utc;
use clap::Args;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Arguments for the check subcommand
#[derive(Args, Debug, Default)]
pub struct CheckArgs {
    /// Point tag to expand the templates with, e.g. `host=h1`
    #[arg(short = 't', long = "with-tag", value_name = "NAME=VALUE", value_parser = parse_key_value)]
    pub with_tags: Vec<(String, String)>,

    /// Also read the documents and show the resolved values
    #[arg(short, long)]
    pub resolve: bool,
}

impl CheckArgs {
    pub fn point_tags(&self) -> BTreeMap<String, String> {
        self.with_tags.iter().cloned().collect()
    }
}

/// Render a human readable report of the config and the expansion for the
/// requested tags. With `node` given, resolved values are included.
pub fn report(config: &SideloadConfig, args: &CheckArgs, node: Option<&SideloadNode>) -> String {
    let mut out = String::new();
    let tags = args.point_tags();

    let _ = writeln!(out, "source: {}", config.source());
    let _ = writeln!(out, "tag_policy: {:?}", config.tag_policy());
    let _ = writeln!(out, "order:");
    for template in config.order() {
        let _ = writeln!(out, "  - {template}");
    }

    let expansion = expand(config.order(), &tags);
    let _ = writeln!(out, "paths:");
    for path in &expansion.paths {
        let _ = writeln!(out, "  - {path}");
    }
    for rejected in &expansion.rejected {
        let _ = writeln!(out, "  ! {}: {}", rejected.template, rejected.error);
    }

    if let Some(node) = node {
        let mut point = Point::new("check", Utc::now());
        point.tags = tags;
        let enriched = node.process(&point);

        let _ = writeln!(out, "fields:");
        for name in config.fields().keys() {
            if let Some(value) = enriched.data.fields.get(name) {
                let _ = writeln!(out, "  {name}: {value}");
            }
        }
        let _ = writeln!(out, "tags:");
        for name in config.tags().keys() {
            if let Some(value) = enriched.data.tags.get(name) {
                let _ = writeln!(out, "  {name}: {value}");
            }
        }
        if !enriched.errors.is_empty() {
            let _ = writeln!(out, "errors:");
            for error in &enriched.errors {
                let _ = writeln!(out, "  - [{}] {}", error.kind(), error);
            }
        }
    }

    out
}
