//! Dependency-injection annotation for AngularJS registrations.
//!
//! ```text
//! angular.module('app').controller('Home', function ($scope, api) { ... })
//!   -> .controller('Home', ['$scope', 'api', function ($scope, api) { ... }])
//! app.config(function ($stateProvider) { ... })
//!   -> app.config(['$stateProvider', function ($stateProvider) { ... }])
//! ```
//!
//! Only calls whose receiver chain starts at `angular.module(...)`, or at a
//! variable bound to such a chain in the same file, are registrations.
//! `[].filter(fn)` and other look-alikes are left alone, as are functions
//! that are already array-annotated, take no parameters or destructure them.

use oxc::allocator::Allocator;
use oxc::ast::ast::{
    Argument, BindingPattern, CallExpression, Expression, FormalParameters, Program,
    VariableDeclarator,
};
use oxc::ast_visit::{Visit, walk};
use oxc::parser::Parser;
use oxc::span::SourceType;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::utils::offset_to_line_col;

/// Registration methods that take an injectable function.
const REGISTRATION_KINDS: &[&str] = &[
    "controller",
    "factory",
    "service",
    "directive",
    "filter",
    "provider",
    "component",
    "animation",
    "decorator",
    "config",
    "run",
];

/// Kinds whose function is the first argument.
const UNNAMED_KINDS: &[&str] = &["config", "run"];

/// Module methods that return the module without taking a function.
const CHAIN_ONLY: &[&str] = &["constant", "value"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotateError {
    #[error("{line}:{column} {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
}

/// Rewrite inline DI functions into array-annotated form.
pub fn annotate(source: &str) -> Result<String, AnnotateError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::default().with_module(false)).parse();

    if let Some(error) = ret.errors.first() {
        let (line, column) = error
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map(|label| offset_to_line_col(source, label.offset()))
            .unwrap_or((1, 1));
        return Err(AnnotateError::Syntax {
            line,
            column,
            message: error.message.to_string(),
        });
    }

    let inserts = registration_inserts(&ret.program);
    if inserts.is_empty() {
        return Ok(source.to_string());
    }

    let mut out = String::with_capacity(source.len() + inserts.len() * 8);
    let mut last = 0;
    for (offset, text) in inserts {
        out.push_str(&source[last..offset]);
        out.push_str(&text);
        last = offset;
    }
    out.push_str(&source[last..]);
    Ok(out)
}

/// Text insertions (byte offset, text) that annotate every registration.
fn registration_inserts(program: &Program<'_>) -> Vec<(usize, String)> {
    let mut bindings = ModuleBindings::default();
    bindings.visit_program(program);

    let mut registrations = Registrations {
        modules: bindings.names,
        inserts: Vec::new(),
    };
    registrations.visit_program(program);

    let mut inserts = registrations.inserts;
    inserts.sort_by_key(|(offset, _)| *offset);
    inserts
}

/// Variables bound to a module chain: `var app = angular.module('app', [])`.
#[derive(Default)]
struct ModuleBindings {
    names: FxHashSet<String>,
}

impl<'a> Visit<'a> for ModuleBindings {
    fn visit_variable_declarator(&mut self, it: &VariableDeclarator<'a>) {
        if let (BindingPattern::BindingIdentifier(id), Some(init)) = (&it.id, &it.init)
            && is_module_chain(init, &self.names)
        {
            self.names.insert(id.name.as_str().to_string());
        }
        walk::walk_variable_declarator(self, it);
    }
}

struct Registrations {
    modules: FxHashSet<String>,
    inserts: Vec<(usize, String)>,
}

impl<'a> Visit<'a> for Registrations {
    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        self.annotate_call(it);
        walk::walk_call_expression(self, it);
    }
}

impl Registrations {
    fn annotate_call(&mut self, call: &CallExpression<'_>) {
        let Expression::StaticMemberExpression(member) = &call.callee else {
            return;
        };
        let kind = member.property.name.as_str();
        if !REGISTRATION_KINDS.contains(&kind) || !is_module_chain(&member.object, &self.modules)
        {
            return;
        }

        let index = usize::from(!UNNAMED_KINDS.contains(&kind));
        let (start, end, params) = match call.arguments.get(index) {
            Some(Argument::FunctionExpression(func)) => {
                (func.span.start, func.span.end, &*func.params)
            }
            Some(Argument::ArrowFunctionExpression(arrow)) => {
                (arrow.span.start, arrow.span.end, &*arrow.params)
            }
            _ => return,
        };

        let Some(names) = parameter_names(params) else {
            return;
        };
        if names.is_empty() {
            return;
        }

        let names: String = names.iter().map(|name| format!("'{name}', ")).collect();
        self.inserts.push((start as usize, format!("[{names}")));
        self.inserts.push((end as usize, "]".to_string()));
    }
}

/// `angular.module(...)`, a bound module variable, or a registration on either.
fn is_module_chain(expr: &Expression<'_>, modules: &FxHashSet<String>) -> bool {
    match expr {
        Expression::ParenthesizedExpression(paren) => is_module_chain(&paren.expression, modules),
        Expression::Identifier(ident) => modules.contains(ident.name.as_str()),
        Expression::CallExpression(call) => {
            let Expression::StaticMemberExpression(member) = &call.callee else {
                return false;
            };
            match member.property.name.as_str() {
                "module" => matches!(
                    &member.object,
                    Expression::Identifier(ident) if ident.name.as_str() == "angular"
                ),
                name if REGISTRATION_KINDS.contains(&name) || CHAIN_ONLY.contains(&name) => {
                    is_module_chain(&member.object, modules)
                }
                _ => false,
            }
        }
        _ => false,
    }
}

/// Plain identifier parameters; `None` when one cannot be injected by name.
fn parameter_names<'p>(params: &'p FormalParameters<'_>) -> Option<Vec<&'p str>> {
    if params.rest.is_some() {
        return None;
    }
    params
        .items
        .iter()
        .map(|param| match &param.pattern {
            BindingPattern::BindingIdentifier(id) => Some(id.name.as_str()),
            _ => None,
        })
        .collect()
}
