//! Lint messages, per-run reports, and the linters behind them.
//!
//! - [`ScriptLinter`]: syntax diagnostics from oxc plus a few line rules
//! - [`MarkupLinter`]: tag pairing, attribute and id checks for templates
//! - [`report`]: extended HTML report written under `logs/`

mod markup;
pub mod report;
mod script;

pub use markup::{MarkupLinter, structure_errors};
pub use script::ScriptLinter;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::log;

/// Severity of a lint message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// A single finding, positioned at a 1-based line and column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintMessage {
    pub severity: Severity,
    pub line: usize,
    pub column: usize,
    pub text: String,
    pub rule: &'static str,
}

impl LintMessage {
    pub fn error(rule: &'static str, (line, column): (usize, usize), text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            line,
            column,
            text: text.into(),
            rule,
        }
    }

    pub fn warning(
        rule: &'static str,
        (line, column): (usize, usize),
        text: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(rule, (line, column), text)
        }
    }
}

impl fmt::Display for LintMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} {} {} ({})",
            self.line,
            self.column,
            self.severity.label(),
            self.text,
            self.rule
        )
    }
}

/// A lint capability: checks one source text.
pub trait Linter: Send + Sync {
    fn lint(&self, source: &str) -> Vec<LintMessage>;
}

/// All lint findings for one pipeline run, in file order.
#[derive(Debug, Clone, Default)]
pub struct LintReport {
    entries: Vec<(PathBuf, Vec<LintMessage>)>,
}

impl LintReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file's messages. Files without messages are not kept.
    pub fn push(&mut self, path: impl Into<PathBuf>, messages: Vec<LintMessage>) {
        if !messages.is_empty() {
            self.entries.push((path.into(), messages));
        }
    }

    /// No messages across all files.
    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, m)| m.len()).sum()
    }

    /// Number of files with at least one message.
    pub fn file_count(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[(PathBuf, Vec<LintMessage>)] {
        &self.entries
    }
}

/// Print a file's messages to the console.
pub fn log_messages(path: &Path, messages: &[LintMessage]) {
    for msg in messages {
        let module = match msg.severity {
            Severity::Error => "error",
            Severity::Warning => "warn",
        };
        log!(module; "{}:{}", path.display(), msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_clean() {
        let mut report = LintReport::new();
        report.push("a.js", vec![]);
        assert!(report.is_clean());
        assert_eq!(report.file_count(), 0);
    }

    #[test]
    fn test_report_totals() {
        let mut report = LintReport::new();
        report.push(
            "a.js",
            vec![
                LintMessage::error("syntax", (1, 2), "unexpected token"),
                LintMessage::warning("no-debugger", (3, 1), "debugger statement"),
            ],
        );
        report.push("b.js", vec![LintMessage::warning("no-debugger", (1, 1), "x")]);
        assert!(!report.is_clean());
        assert_eq!(report.total(), 3);
        assert_eq!(report.file_count(), 2);
        assert_eq!(report.entries()[0].0, PathBuf::from("a.js"));
    }

    #[test]
    fn test_message_display() {
        let msg = LintMessage::error("tag-pair", (4, 7), "tag <div> is not closed");
        assert_eq!(msg.to_string(), "4:7 error tag <div> is not closed (tag-pair)");
    }
}
