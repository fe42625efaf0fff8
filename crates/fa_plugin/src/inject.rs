//! Injection policy for the runtime fragment.
//!
//! The mode is chosen once per unit at exit, from the options and the usage
//! flag, and then dispatched exhaustively:
//!
//! | mode            | trigger                                   |
//! |-----------------|-------------------------------------------|
//! | `ModuleImport`  | `useModule` truthy                        |
//! | `DirectiveGated`| `runtimePattern == "directive"`           |
//! | `PatternGated`  | any other non-empty `runtimePattern`      |
//! | `Unconditional` | neither option set                        |
//! | `None`          | no function was rewritten                 |

use regex::Regex;
use swc_ecma_ast as ast;

use crate::{
    error::PassError,
    options::{PluginOptions, DIRECTIVE_PATTERN},
};

/// Directive that requests the runtime in directive-gated mode.
pub const RUNTIME_DIRECTIVE: &str = "use runtime-nodent";

#[derive(Debug, Clone)]
pub enum InjectionMode {
    ModuleImport(String),
    Unconditional,
    DirectiveGated,
    PatternGated(Regex),
    None,
}

impl InjectionMode {
    /// Select the mode for a unit. The pattern is only compiled when it is
    /// the selected mode.
    pub fn select(options: &PluginOptions, runtime_used: bool) -> Result<Self, PassError> {
        if !runtime_used {
            return Ok(InjectionMode::None);
        }
        if let Some(module) = options.runtime_module() {
            return Ok(InjectionMode::ModuleImport(module.to_string()));
        }
        match options.runtime_pattern() {
            None => Ok(InjectionMode::Unconditional),
            Some(DIRECTIVE_PATTERN) => Ok(InjectionMode::DirectiveGated),
            Some(pattern) => Regex::new(pattern)
                .map(InjectionMode::PatternGated)
                .map_err(|source| PassError::Pattern {
                    pattern: pattern.to_string(),
                    source,
                }),
        }
    }
}

/// Statement-like items of a program body.
pub(crate) trait BodyItem {
    fn as_stmt(&self) -> Option<&ast::Stmt>;
    fn from_stmt(stmt: ast::Stmt) -> Self;
}

impl BodyItem for ast::Stmt {
    fn as_stmt(&self) -> Option<&ast::Stmt> {
        Some(self)
    }

    fn from_stmt(stmt: ast::Stmt) -> Self {
        stmt
    }
}

impl BodyItem for ast::ModuleItem {
    fn as_stmt(&self) -> Option<&ast::Stmt> {
        match self {
            ast::ModuleItem::Stmt(stmt) => Some(stmt),
            ast::ModuleItem::ModuleDecl(_) => None,
        }
    }

    fn from_stmt(stmt: ast::Stmt) -> Self {
        ast::ModuleItem::Stmt(stmt)
    }
}

/// The text of a directive statement (`"use strict";` → `use strict`).
///
/// Directives are matched on their source text, so only parsed string
/// literals (which keep `raw`) qualify.
pub fn directive_text(stmt: &ast::Stmt) -> Option<&str> {
    let ast::Stmt::Expr(expr_stmt) = stmt else {
        return None;
    };
    let ast::Expr::Lit(ast::Lit::Str(lit)) = &*expr_stmt.expr else {
        return None;
    };
    unquote(lit.raw.as_deref()?)
}

/// Strip the surrounding quotes from a string literal's source text.
pub(crate) fn unquote(raw: &str) -> Option<&str> {
    if raw.len() < 2 {
        return None;
    }
    raw.get(1..raw.len() - 1)
}

fn prologue_len<T: BodyItem>(body: &[T]) -> usize {
    body.iter()
        .take_while(|item| item.as_stmt().and_then(directive_text).is_some())
        .count()
}

fn remove_directive_from<T: BodyItem>(body: &mut Vec<T>, directive: &str) -> usize {
    let prologue = prologue_len(body);
    let before = body.len();
    let mut index = 0;
    body.retain(|item| {
        let in_prologue = index < prologue;
        index += 1;
        !(in_prologue && item.as_stmt().and_then(directive_text) == Some(directive))
    });
    before - body.len()
}

fn insert_after_prologue<T: BodyItem>(body: &mut Vec<T>, item: T) {
    let at = prologue_len(body);
    body.insert(at, item);
}

/// Remove every occurrence of `directive` from the program's directive
/// prologue. Returns how many were removed.
pub fn remove_directive(program: &mut ast::Program, directive: &str) -> usize {
    match program {
        ast::Program::Module(module) => remove_directive_from(&mut module.body, directive),
        ast::Program::Script(script) => remove_directive_from(&mut script.body, directive),
    }
}

/// Insert `stmt` as the first statement after the directive prologue.
pub fn prepend_stmt(program: &mut ast::Program, stmt: ast::Stmt) {
    match program {
        ast::Program::Module(module) => {
            insert_after_prologue(&mut module.body, ast::ModuleItem::from_stmt(stmt))
        }
        ast::Program::Script(script) => insert_after_prologue(&mut script.body, stmt),
    }
}

/// Insert a module item after the prologue of a module.
pub(crate) fn prepend_module_item(module: &mut ast::Module, item: ast::ModuleItem) {
    insert_after_prologue(&mut module.body, item);
}
