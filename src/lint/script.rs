//! Script linting backed by the oxc parser.

use std::sync::LazyLock;

use oxc::allocator::Allocator;
use oxc::parser::{Parser, ParserReturn};
use oxc::span::SourceType;
use regex::Regex;

use super::{LintMessage, Linter};
use crate::utils::offset_to_line_col;

static DEBUGGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*debugger\s*;?\s*$").unwrap());
static WITH_STATEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*with\s*\(").unwrap());

/// Reports syntax errors, `debugger` statements and `with` blocks.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptLinter;

impl Linter for ScriptLinter {
    fn lint(&self, source: &str) -> Vec<LintMessage> {
        let mut messages = syntax_errors(source);

        for (idx, line) in source.lines().enumerate() {
            if DEBUGGER.is_match(line) {
                let column = line.len() - line.trim_start().len() + 1;
                messages.push(LintMessage::warning(
                    "no-debugger",
                    (idx + 1, column),
                    "unexpected 'debugger' statement",
                ));
            }
            if WITH_STATEMENT.is_match(line) {
                let column = line.len() - line.trim_start().len() + 1;
                messages.push(LintMessage::error(
                    "no-with",
                    (idx + 1, column),
                    "unexpected use of 'with' statement",
                ));
            }
        }

        messages.sort_by_key(|m| (m.line, m.column));
        messages
    }
}

fn syntax_errors(source: &str) -> Vec<LintMessage> {
    let allocator = Allocator::default();
    // Bundles run as classic scripts, not modules
    let ParserReturn { errors, .. } =
        Parser::new(&allocator, source, SourceType::default().with_module(false)).parse();

    errors
        .iter()
        .map(|error| {
            let position = error
                .labels
                .as_ref()
                .and_then(|labels| labels.first())
                .map(|label| offset_to_line_col(source, label.offset()))
                .unwrap_or((1, 1));
            LintMessage::error("syntax", position, error.message.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::Severity;

    #[test]
    fn test_clean_script() {
        let msgs = ScriptLinter.lint("var a = 1;\nfunction f(b) { return a + b; }\n");
        assert!(msgs.is_empty());
    }

    #[test]
    fn test_syntax_error_position() {
        let msgs = ScriptLinter.lint("var a = 1;\nvar b = ;\n");
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].rule, "syntax");
        assert_eq!(msgs[0].severity, Severity::Error);
        assert_eq!(msgs[0].line, 2);
    }

    #[test]
    fn test_debugger_warning() {
        let msgs = ScriptLinter.lint("function f() {\n  debugger;\n}\n");
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].rule, "no-debugger");
        assert_eq!(msgs[0].severity, Severity::Warning);
        assert_eq!((msgs[0].line, msgs[0].column), (2, 3));
    }

    #[test]
    fn test_with_statement() {
        let msgs = ScriptLinter.lint("with (obj) {\n  a = 1;\n}\n");
        assert!(msgs.iter().any(|m| m.rule == "no-with"));
    }
}
