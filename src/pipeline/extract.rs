//! Resource discovery in the entry document.
//!
//! Script `src` and stylesheet `href` references are collected in document
//! order; that order is the concatenation order of the bundles. The
//! normalized markup gains `ng-strict-di` on the application root.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use thiserror::Error;

use crate::asset::strip_query;
use crate::lint::structure_errors;

static NG_APP_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<([A-Za-z][A-Za-z0-9:_-]*)(\s(?:[^>"']|"[^"]*"|'[^']*')*?\bng-app\b(?:[^>"']|"[^"]*"|'[^']*')*?)(\s*/?)>"#)
        .unwrap()
});
static STRICT_DI: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bng-strict-di\b").unwrap());

const STRICT_DI_ATTR: &str = "ng-strict-di";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("{line}:{column} {message}")]
    Malformed {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("cannot parse markup: {0}")]
    Parse(String),
}

/// Script and stylesheet references in markup order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceList {
    pub scripts: Vec<String>,
    pub links: Vec<String>,
}

impl ResourceList {
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty() && self.links.is_empty()
    }
}

/// Result of extracting the entry document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEntry {
    pub resources: ResourceList,
    pub markup: String,
}

/// Parse the entry document and collect its references.
///
/// Unbalanced markup fails the whole extraction.
pub fn extract_resources(markup: &str) -> Result<ExtractedEntry, ExtractError> {
    if let Some(first) = structure_errors(markup).into_iter().next() {
        return Err(ExtractError::Malformed {
            line: first.line,
            column: first.column,
            message: first.text,
        });
    }

    Ok(ExtractedEntry {
        resources: scan_references(markup)?,
        markup: add_strict_di(markup),
    })
}

/// Collect `<script src>` and stylesheet `<link href>` values in order.
pub fn scan_references(markup: &str) -> Result<ResourceList, ExtractError> {
    let dom = tl::parse(markup, tl::ParserOptions::default())
        .map_err(|e| ExtractError::Parse(format!("{e:?}")))?;
    let parser = dom.parser();

    let mut list = ResourceList::default();
    for handle in dom.children() {
        collect(*handle, parser, &mut list);
    }
    Ok(list)
}

fn collect(handle: tl::NodeHandle, parser: &tl::Parser, list: &mut ResourceList) {
    let Some(tl::Node::Tag(tag)) = handle.get(parser) else {
        return;
    };

    let name = tag.name().as_utf8_str().to_ascii_lowercase();
    match name.as_str() {
        "script" => {
            if let Some(src) = attribute(tag, "src").filter(|s| !s.trim().is_empty()) {
                list.scripts.push(src);
            }
        }
        "link" => {
            if let Some(href) = attribute(tag, "href").filter(|h| is_stylesheet(h)) {
                list.links.push(href);
            }
        }
        _ => {}
    }

    for child in tag.children().top().iter() {
        collect(*child, parser, list);
    }
}

fn attribute(tag: &tl::HTMLTag, name: &str) -> Option<String> {
    tag.attributes()
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, value)| value.map(|v| v.trim().to_string()))
}

fn is_stylesheet(href: &str) -> bool {
    strip_query(href).to_ascii_lowercase().ends_with(".css")
}

/// Add `ng-strict-di` to the first element carrying `ng-app`.
fn add_strict_di(markup: &str) -> String {
    NG_APP_TAG
        .replacen(markup, 1, |caps: &Captures| {
            if STRICT_DI.is_match(&caps[2]) {
                caps[0].to_string()
            } else {
                format!("<{}{} {STRICT_DI_ATTR}{}>", &caps[1], &caps[2], &caps[3])
            }
        })
        .into_owned()
}
