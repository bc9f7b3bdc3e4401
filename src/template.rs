//! Path templates and their expansion against a point's tags.
//!
//! A template such as `host/{host}.yml` is a sequence of literal text and
//! `{tag}` variables. Parsing happens once at construction; expansion runs per
//! point and produces the ordered list of document paths to consult.

use crate::error::{ConfigError, PathError};
use crate::paths::RelPath;
use regex_lite::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

static TAG_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+$").expect("tag name pattern is valid")
});

/// One piece of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Var(String),
}

/// A parsed `order` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse and validate a template.
    ///
    /// Fails on stray or nested braces, empty or invalid variable names, and
    /// on templates whose literal text already escapes the source root.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let malformed = |offset: usize, reason: &str| ConfigError::MalformedTemplate {
            template: raw.to_string(),
            offset,
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.char_indices();

        while let Some((i, c)) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (j, c) in chars.by_ref() {
                        match c {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => return Err(malformed(j, "nested '{'")),
                            c => name.push(c),
                        }
                    }
                    if !closed {
                        return Err(malformed(i, "unclosed '{'"));
                    }
                    if name.is_empty() {
                        return Err(malformed(i, "empty variable name"));
                    }
                    if !TAG_NAME.is_match(&name) {
                        return Err(malformed(
                            i,
                            "variable names may only contain letters, digits, '_' and '-'",
                        ));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Var(name));
                }
                '}' => return Err(malformed(i, "unmatched '}'")),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        let template = Self {
            raw: raw.to_string(),
            segments,
        };
        template.check_static_path()?;
        Ok(template)
    }

    /// Canonicalize the template with every variable replaced by a harmless
    /// placeholder. Anything that fails here would fail for every point.
    fn check_static_path(&self) -> Result<(), ConfigError> {
        let placeholder_path: String = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Literal(text) => text.as_str(),
                Segment::Var(_) => "v",
            })
            .collect();

        RelPath::parse(&placeholder_path)
            .map(|_| ())
            .map_err(|e| ConfigError::TemplateEscapesRoot {
                template: self.raw.clone(),
                reason: e.to_string(),
            })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of the tags this template references, in order of appearance.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Var(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute tag values.
    ///
    /// Returns `None` when a referenced tag is absent from the point, which
    /// drops the template for that point without raising an error.
    pub fn render(&self, tags: &BTreeMap<String, String>) -> Option<Result<RelPath, PathError>> {
        let mut out = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Var(name) => out.push_str(tags.get(name)?),
            }
        }
        Some(RelPath::parse(&out))
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A template that expanded to an unusable path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    /// Index of the template in `order`.
    pub index: usize,
    pub template: String,
    /// The substituted text that failed canonicalization.
    pub rendered: Vec<(String, String)>,
    pub error: PathError,
}

/// The result of expanding every template for one point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Concrete paths in precedence order. Duplicates are kept.
    pub paths: Vec<RelPath>,
    pub rejected: Vec<Rejected>,
}

/// Expand `templates` in declared order against `tags`.
pub fn expand(templates: &[PathTemplate], tags: &BTreeMap<String, String>) -> Expansion {
    let mut expansion = Expansion::default();
    for (index, template) in templates.iter().enumerate() {
        match template.render(tags) {
            None => {}
            Some(Ok(path)) => expansion.paths.push(path),
            Some(Err(error)) => expansion.rejected.push(Rejected {
                index,
                template: template.raw.clone(),
                rendered: template
                    .variables()
                    .filter_map(|v| tags.get(v).map(|t| (v.to_string(), t.clone())))
                    .collect(),
                error,
            }),
        }
    }
    expansion
}
