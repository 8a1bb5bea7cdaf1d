//! Symbols exposed to `@if`/`@ifdef`/`@echo` directives.

use std::collections::BTreeMap;

use super::BuildOptions;

/// Symbol table for the directive preprocessor.
///
/// A symbol mapped to `None` is undefined: `@ifdef` blocks guarded by it
/// are removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprocessContext {
    symbols: BTreeMap<String, Option<String>>,
}

impl PreprocessContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the standard `NODE_ENV` / `DEBUG` / `ANGULAR_DEBUG` table.
    ///
    /// Debug symbols flip with the environment: they are on in development
    /// unless the flag is given, and off in production unless it is.
    pub fn from_options(options: &BuildOptions) -> Self {
        let mut ctx = Self::new();
        ctx.set("NODE_ENV", Some(options.environment.as_str()));
        ctx.set("DEBUG", debug_symbol(options.debug, options.production));
        ctx.set(
            "ANGULAR_DEBUG",
            debug_symbol(options.angular_debug, options.production),
        );
        ctx
    }

    pub fn set(&mut self, name: &str, value: Option<&str>) {
        self.symbols
            .insert(name.to_string(), value.map(str::to_string));
    }

    /// Value of a defined symbol.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.symbols.get(name).and_then(|v| v.as_deref())
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

#[inline]
fn debug_symbol(flag: bool, production: bool) -> Option<&'static str> {
    (flag == production).then_some("true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawFlags;

    fn ctx(production: bool, debug: bool) -> PreprocessContext {
        BuildOptions::from_flags(&RawFlags {
            production: Some(production),
            debug: Some(debug),
            ..RawFlags::default()
        })
        .preprocess_context()
    }

    #[test]
    fn test_node_env() {
        assert_eq!(ctx(true, false).get("NODE_ENV"), Some("production"));
        assert_eq!(ctx(false, false).get("NODE_ENV"), Some("development"));
    }

    #[test]
    fn test_debug_xor_rule() {
        assert!(ctx(true, true).is_defined("DEBUG"));
        assert!(!ctx(true, false).is_defined("DEBUG"));
        assert!(ctx(false, false).is_defined("DEBUG"));
        assert!(!ctx(false, true).is_defined("DEBUG"));
    }

    #[test]
    fn test_angular_debug_follows_own_flag() {
        let opts = BuildOptions::from_flags(&RawFlags {
            production: Some(true),
            angular_debug: Some(true),
            ..RawFlags::default()
        });
        let ctx = opts.preprocess_context();
        assert!(ctx.is_defined("ANGULAR_DEBUG"));
        assert!(!ctx.is_defined("DEBUG"));
    }

    #[test]
    fn test_unknown_symbol_undefined() {
        assert_eq!(PreprocessContext::new().get("MISSING"), None);
    }
}
