//! Markup linting for templates and the entry document.
//!
//! Rules:
//! - `tag-pair`: every opened element is closed, every close has an opener
//! - `comment-close`: comments are terminated
//! - `attr-no-duplication`: an attribute appears at most once per element
//! - `id-unique`: static `id` values are unique within the document
//! - `tagname-lowercase`: element names are lowercase

use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashSet;

use super::{LintMessage, Linter};
use crate::utils::html::{
    has_optional_end_tag, is_raw_text_element, is_void_element, parse_attributes,
};
use crate::utils::offset_to_line_col;

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(/?)([A-Za-z][A-Za-z0-9:_-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#).unwrap()
});
static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

/// Rules whose violations mean the document cannot be parsed reliably.
const STRUCTURAL_RULES: &[&str] = &["tag-pair", "comment-close"];

/// Template and entry document linter.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkupLinter;

impl Linter for MarkupLinter {
    fn lint(&self, source: &str) -> Vec<LintMessage> {
        let mut messages = Walker::new(source).run();
        messages.sort_by_key(|m| (m.line, m.column));
        messages
    }
}

/// Only the structural findings (unbalanced tags, open comments).
pub fn structure_errors(source: &str) -> Vec<LintMessage> {
    MarkupLinter
        .lint(source)
        .into_iter()
        .filter(|m| STRUCTURAL_RULES.contains(&m.rule))
        .collect()
}

struct OpenTag {
    name: String,
    offset: usize,
}

struct Walker<'a> {
    source: &'a str,
    /// Source with comments blanked out (byte offsets preserved)
    text: String,
    stack: Vec<OpenTag>,
    ids: FxHashSet<String>,
    messages: Vec<LintMessage>,
}

impl<'a> Walker<'a> {
    fn new(source: &'a str) -> Self {
        let text = COMMENT
            .replace_all(source, |caps: &regex::Captures| blank(&caps[0]))
            .into_owned();
        Self {
            source,
            text,
            stack: Vec::new(),
            ids: FxHashSet::default(),
            messages: Vec::new(),
        }
    }

    fn pos(&self, offset: usize) -> (usize, usize) {
        offset_to_line_col(self.source, offset)
    }

    fn run(mut self) -> Vec<LintMessage> {
        if let Some(open) = self.text.find("<!--") {
            let pos = self.pos(open);
            self.messages.push(LintMessage::error(
                "comment-close",
                pos,
                "comment is not terminated",
            ));
        }

        let text = std::mem::take(&mut self.text);
        let mut raw_until: Option<String> = None;

        for caps in TAG.captures_iter(&text) {
            let Some(whole) = caps.get(0) else { continue };
            let closing = !caps[1].is_empty();
            let name = &caps[2];
            let lower = name.to_ascii_lowercase();

            if let Some(raw) = &raw_until {
                if !(closing && lower == *raw) {
                    continue;
                }
                raw_until = None;
            }

            if closing {
                self.close(&lower, whole.start());
            } else {
                let attrs = &caps[3];
                self.open(name, &lower, attrs, whole.start());
                let self_closing = attrs.trim_end().ends_with('/');
                if is_raw_text_element(&lower) && !self_closing {
                    raw_until = Some(lower);
                }
            }
        }

        let unclosed: Vec<_> = self.stack.drain(..).collect();
        for tag in unclosed {
            if !has_optional_end_tag(&tag.name) {
                let pos = self.pos(tag.offset);
                self.messages.push(LintMessage::error(
                    "tag-pair",
                    pos,
                    format!("tag <{}> is not closed", tag.name),
                ));
            }
        }

        self.messages
    }

    fn open(&mut self, name: &str, lower: &str, attrs: &str, offset: usize) {
        let pos = self.pos(offset);

        if name != lower {
            self.messages.push(LintMessage::warning(
                "tagname-lowercase",
                pos,
                format!("tag name <{name}> must be lowercase"),
            ));
        }

        self.check_attributes(attrs, pos);

        if is_void_element(lower) || attrs.trim_end().ends_with('/') {
            return;
        }

        // <li>a<li>b: the second opener implies the first one's close
        if self
            .stack
            .last()
            .is_some_and(|top| top.name == lower && has_optional_end_tag(lower))
        {
            self.stack.pop();
        }

        self.stack.push(OpenTag {
            name: lower.to_string(),
            offset,
        });
    }

    fn close(&mut self, lower: &str, offset: usize) {
        if is_void_element(lower) {
            return;
        }

        let Some(idx) = self.stack.iter().rposition(|t| t.name == lower) else {
            let pos = self.pos(offset);
            self.messages.push(LintMessage::error(
                "tag-pair",
                pos,
                format!("unexpected closing tag </{lower}>"),
            ));
            return;
        };

        let inner: Vec<_> = self.stack.drain(idx + 1..).collect();
        for tag in inner {
            if !has_optional_end_tag(&tag.name) {
                let pos = self.pos(tag.offset);
                self.messages.push(LintMessage::error(
                    "tag-pair",
                    pos,
                    format!("tag <{}> is not closed before </{lower}>", tag.name),
                ));
            }
        }
        self.stack.pop();
    }

    fn check_attributes(&mut self, attrs: &str, pos: (usize, usize)) {
        let mut seen = FxHashSet::default();
        for (name, value) in parse_attributes(attrs) {
            let key = name.to_ascii_lowercase();
            if !seen.insert(key.clone()) {
                self.messages.push(LintMessage::error(
                    "attr-no-duplication",
                    pos,
                    format!("duplicate attribute '{name}'"),
                ));
            }
            let is_static_id = key == "id" && !value.is_empty() && !value.contains("{{");
            if is_static_id && !self.ids.insert(value.clone()) {
                self.messages.push(LintMessage::warning(
                    "id-unique",
                    pos,
                    format!("id '{value}' is used more than once"),
                ));
            }
        }
    }
}

/// Replace every character with spaces of the same byte length, keeping newlines.
fn blank(s: &str) -> String {
    s.chars()
        .map(|c| if c == '\n' { "\n".to_string() } else { " ".repeat(c.len_utf8()) })
        .collect()
}
