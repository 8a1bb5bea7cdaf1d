//! Minification for scripts, stylesheets and markup.
//!
//! Uses oxc for JavaScript, lightningcss for CSS and minify-html for
//! templates and the entry document.

use std::path::Path;

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

/// Minify a classic (non-module) script.
///
/// Returns `None` when the source does not parse.
pub fn minify_js(source: &str) -> Option<String> {
    let allocator = Allocator::default();
    let source_type = SourceType::default().with_module(false);
    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        return None;
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Some(code)
}

/// Minify a stylesheet.
pub fn minify_css(source: &str) -> Option<String> {
    let stylesheet = StyleSheet::parse(source, ParserOptions::default()).ok()?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .ok()?;
    Some(result.code)
}

/// Minify markup, keeping `{{ }}` expressions and closing tags intact.
pub fn minify_html(source: &str) -> String {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = false;
    cfg.preserve_brace_template_syntax = true;
    cfg.remove_bangs = true;
    cfg.remove_processing_instructions = true;
    let out = minify_html::minify(source.as_bytes(), &cfg);
    String::from_utf8_lossy(&out).into_owned()
}

/// Whether a file name says its content is already minified (`x.min.js`).
pub fn is_minified(path: &Path) -> bool {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| stem.ends_with(".min") || stem.contains(".min."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_js() {
        let out = minify_js("var answer = 40 + 2;\nfunction hello ( name ) {\n  return 'hi ' + name;\n}\n").unwrap();
        assert!(out.len() < 60);
        assert!(!out.contains('\n'));
    }

    #[test]
    fn test_minify_js_invalid() {
        assert!(minify_js("var = ;").is_none());
    }

    #[test]
    fn test_minify_css() {
        let out = minify_css(".a {\n  color: #ff0000;\n  margin: 0px;\n}\n").unwrap();
        assert_eq!(out, ".a{color:red;margin:0}");
    }

    #[test]
    fn test_minify_html_keeps_bindings() {
        let out = minify_html("<div class=\"x\">\n  <!-- note -->\n  <p>{{ user.name }}</p>\n</div>\n");
        assert!(out.contains("{{ user.name }}"));
        assert!(!out.contains("note"));
        assert!(out.contains("</p>"));
    }

    #[test]
    fn test_is_minified() {
        assert!(is_minified(Path::new("lib/angular/angular.min.js")));
        assert!(is_minified(Path::new("css/ionic.min.css")));
        assert!(!is_minified(Path::new("js/app.js")));
        assert!(!is_minified(Path::new("js/admin.js")));
    }
}
