//! Directive preprocessor.
//!
//! Block directives sit alone on a line, in any of the three comment forms:
//!
//! ```text
//! // @if NODE_ENV == 'production'
//! /* @ifdef DEBUG */
//! <!-- @ifndef ANGULAR_DEBUG -->
//! ... // @endif
//! ```
//!
//! `@exclude` / `@endexclude` always drop their content. `@echo NAME` is
//! replaced inline by the symbol's value (empty when undefined).

use std::sync::LazyLock;

use regex::{Captures, Regex};
use thiserror::Error;

use crate::config::PreprocessContext;

static BLOCK_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?://|/\*|<!--)\s*@(ifdef|ifndef|if|endif|exclude|endexclude)\b\s*(.*?)\s*(?:\*/|-->)?\s*$",
    )
    .unwrap()
});
static ECHO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?://|/\*|<!--)\s*@echo\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?:\*/|-->)?").unwrap()
});
static SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(!)?\s*([A-Za-z_][A-Za-z0-9_]*)$").unwrap());
static COMPARISON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^([A-Za-z_][A-Za-z0-9_]*)\s*(==|!=)\s*(?:'([^']*)'|"([^"]*)")$"#).unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreprocessError {
    #[error("line {line}: `@{directive}` has no matching opening directive")]
    Unmatched { line: usize, directive: &'static str },

    #[error("line {line}: `@{directive}` block is never closed")]
    Unterminated { line: usize, directive: String },

    #[error("line {line}: cannot evaluate `@if {expr}`")]
    BadExpression { line: usize, expr: String },
}

#[derive(Debug)]
enum Frame {
    Condition { line: usize, directive: String, active: bool },
    Exclude { line: usize },
}

impl Frame {
    fn active(&self) -> bool {
        match self {
            Self::Condition { active, .. } => *active,
            Self::Exclude { .. } => false,
        }
    }
}

/// Evaluate every directive in `source` against `ctx`.
pub fn preprocess(source: &str, ctx: &PreprocessContext) -> Result<String, PreprocessError> {
    let mut out = String::with_capacity(source.len());
    let mut stack: Vec<Frame> = Vec::new();

    for (idx, line) in source.split_inclusive('\n').enumerate() {
        let line_no = idx + 1;
        let including = stack.iter().all(Frame::active);

        let Some(caps) = BLOCK_DIRECTIVE.captures(line) else {
            if including {
                out.push_str(&echo(line, ctx));
            }
            continue;
        };

        let directive = &caps[1];
        let argument = caps[2].trim();
        match directive {
            "if" => {
                let active = evaluate(argument, ctx).ok_or_else(|| {
                    PreprocessError::BadExpression {
                        line: line_no,
                        expr: argument.to_string(),
                    }
                })?;
                stack.push(condition(line_no, directive, active));
            }
            "ifdef" => stack.push(condition(line_no, directive, ctx.is_defined(argument))),
            "ifndef" => stack.push(condition(line_no, directive, !ctx.is_defined(argument))),
            "exclude" => stack.push(Frame::Exclude { line: line_no }),
            "endif" => match stack.pop() {
                Some(Frame::Condition { .. }) => {}
                _ => {
                    return Err(PreprocessError::Unmatched {
                        line: line_no,
                        directive: "endif",
                    });
                }
            },
            _ => match stack.pop() {
                Some(Frame::Exclude { .. }) => {}
                _ => {
                    return Err(PreprocessError::Unmatched {
                        line: line_no,
                        directive: "endexclude",
                    });
                }
            },
        }
    }

    match stack.pop() {
        None => Ok(out),
        Some(Frame::Condition { line, directive, .. }) => {
            Err(PreprocessError::Unterminated { line, directive })
        }
        Some(Frame::Exclude { line }) => Err(PreprocessError::Unterminated {
            line,
            directive: "exclude".to_string(),
        }),
    }
}

fn condition(line: usize, directive: &str, active: bool) -> Frame {
    Frame::Condition {
        line,
        directive: directive.to_string(),
        active,
    }
}

/// `NAME`, `!NAME`, `NAME == 'v'`, `NAME != 'v'`.
fn evaluate(expr: &str, ctx: &PreprocessContext) -> Option<bool> {
    if let Some(caps) = SYMBOL.captures(expr) {
        let truthy = is_truthy(ctx.get(&caps[2]));
        return Some(truthy != caps.get(1).is_some());
    }

    let caps = COMPARISON.captures(expr)?;
    let expected = caps.get(3).or_else(|| caps.get(4))?.as_str();
    let equal = ctx.get(&caps[1]) == Some(expected);
    Some(if &caps[2] == "==" { equal } else { !equal })
}

#[inline]
fn is_truthy(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty() && v != "false")
}

fn echo(line: &str, ctx: &PreprocessContext) -> String {
    ECHO.replace_all(line, |caps: &Captures| {
        ctx.get(&caps[1]).unwrap_or_default().to_string()
    })
    .into_owned()
}
