//! Lowering of async functions into `$asyncbind` continuation code.
//!
//! `async function f() { const x = await g(); return x; }` becomes, in
//! promise mode:
//!
//! ```js
//! function f() {
//!     return new Promise(function ($return, $error) {
//!         return g().then(function ($await_1) {
//!             const x = $await_1;
//!             return $return(x);
//!         }.$asyncbind(this, $error), $error);
//!     }.$asyncbind(this, true));
//! }
//! ```
//!
//! Functions are lowered innermost first. Every lowered function loses its
//! `async` flag and gains the engine's rewrite mark on its syntax context.

use std::mem;

use swc_common::{Mark, DUMMY_SP};
use swc_ecma_ast as ast;
use swc_ecma_visit::{Visit, VisitMut, VisitMutWith, VisitWith};

use crate::{
    build::{self, ERROR, RETURN},
    error::EngineError,
    options::{AsyncMode, LogSink},
};

pub(crate) struct Asynchronizer<'a> {
    mode: AsyncMode,
    wrap_await: bool,
    marker: Mark,
    log: &'a LogSink,
    names: Vec<String>,
    next_await: usize,
    pub rewritten: usize,
    pub error: Option<EngineError>,
}

impl<'a> Asynchronizer<'a> {
    pub fn new(mode: AsyncMode, wrap_await: bool, marker: Mark, log: &'a LogSink) -> Self {
        Self {
            mode,
            wrap_await,
            marker,
            log,
            names: Vec::new(),
            next_await: 0,
            rewritten: 0,
            error: None,
        }
    }

    fn current_name(&self) -> String {
        self.names
            .last()
            .cloned()
            .unwrap_or_else(|| "<anonymous>".to_string())
    }

    fn with_name(&mut self, name: Option<String>, f: impl FnOnce(&mut Self)) {
        let pushed = name.is_some();
        if let Some(name) = name {
            self.names.push(name);
        }
        f(self);
        if pushed {
            self.names.pop();
        }
    }

    fn lower_function(&mut self, node: &mut ast::Function) -> Result<(), EngineError> {
        let name = self.current_name();
        if node.is_generator {
            return Err(EngineError::AsyncGenerator { function: name });
        }
        let Some(body) = node.body.as_mut() else {
            return Ok(());
        };

        let stmts = mem::take(&mut body.stmts);
        body.stmts = vec![self.lower_body(stmts, &name)?];
        node.is_async = false;
        node.ctxt = node.ctxt.apply_mark(self.marker);
        self.rewritten += 1;
        Ok(())
    }

    fn lower_arrow(&mut self, node: &mut ast::ArrowExpr) -> Result<(), EngineError> {
        let name = self.current_name();
        if node.is_generator {
            return Err(EngineError::AsyncGenerator { function: name });
        }

        let body = mem::replace(
            &mut *node.body,
            ast::BlockStmtOrExpr::BlockStmt(ast::BlockStmt::default()),
        );
        let stmts = match body {
            ast::BlockStmtOrExpr::BlockStmt(block) => block.stmts,
            ast::BlockStmtOrExpr::Expr(expr) => vec![build::return_stmt(Some(expr))],
        };

        *node.body = ast::BlockStmtOrExpr::BlockStmt(ast::BlockStmt {
            stmts: vec![self.lower_body(stmts, &name)?],
            ..Default::default()
        });
        node.is_async = false;
        node.ctxt = node.ctxt.apply_mark(self.marker);
        self.rewritten += 1;
        Ok(())
    }

    /// Lower a whole async body into the single `return <executor>` statement.
    fn lower_body(&mut self, stmts: Vec<ast::Stmt>, name: &str) -> Result<ast::Stmt, EngineError> {
        ensure_no_meta_refs(&stmts, name)?;
        if references_arguments(&stmts) {
            self.log.log(&format!(
                "warning: `arguments` inside async function `{name}` refers to the rewritten executor, not the caller's arguments"
            ));
        }

        let (mut lowered, stmts) = hoist_declarations(stmts);
        lowered.extend(self.lower_stmts(stmts, name)?);
        let executor = build::asyncbind(
            build::fn_expr(&[build::ident(RETURN), build::ident(ERROR)], lowered),
            build::true_expr(),
        );

        Ok(match self.mode {
            AsyncMode::Promises => {
                build::return_stmt(Some(build::new_expr(build::ident_expr("Promise"), vec![executor])))
            }
            AsyncMode::LazyThenable => build::return_stmt(Some(executor)),
        })
    }

    /// Split `stmts` at the first statement-level `await`, chaining the rest
    /// into a continuation, and complete with `return $return();` when the
    /// code can fall off the end.
    fn lower_stmts(
        &mut self,
        stmts: Vec<ast::Stmt>,
        name: &str,
    ) -> Result<Vec<ast::Stmt>, EngineError> {
        let mut out = Vec::with_capacity(stmts.len() + 1);
        let mut rest = stmts.into_iter();

        while let Some(stmt) = rest.next() {
            match split(stmt) {
                Split::Plain(mut stmt) => {
                    ensure_no_await(&stmt, name)?;
                    stmt.visit_mut_with(&mut ReturnRewriter);
                    out.push(stmt);
                }
                Split::Site(AwaitSite {
                    awaited,
                    kind,
                    stmt,
                }) => {
                    ensure_no_await(&*awaited, name)?;
                    ensure_no_await(&stmt, name)?;
                    let tail: Vec<ast::Stmt> = rest.by_ref().collect();
                    // everything from here on moves into a continuation
                    ensure_no_var(&stmt, name)?;
                    ensure_no_var(&tail, name)?;

                    self.next_await += 1;
                    let param = build::ident(&format!("$await_{}", self.next_await));

                    let mut continuation: Vec<ast::Stmt> =
                        resume(kind, stmt, &param).into_iter().collect();
                    if kind != SiteKind::Return {
                        continuation.extend(self.lower_stmts(tail, name)?);
                    }

                    out.push(self.then_chain(awaited, param, continuation));
                    return Ok(out);
                }
            }
        }

        if !matches!(out.last(), Some(ast::Stmt::Return(_))) {
            out.push(build::resolve_stmt(None));
        }
        Ok(out)
    }

    /// `return <awaited>.then(function (<param>) { ... }.$asyncbind(this, $error), $error);`
    fn then_chain(
        &self,
        awaited: Box<ast::Expr>,
        param: ast::Ident,
        continuation: Vec<ast::Stmt>,
    ) -> ast::Stmt {
        let target = if self.wrap_await {
            build::call(build::member(build::ident_expr("Promise"), "resolve"), vec![awaited])
        } else {
            awaited
        };
        let on_resolve = build::asyncbind(
            build::fn_expr(&[param], continuation),
            build::ident_expr(ERROR),
        );
        build::return_stmt(Some(build::call(
            build::member(target, "then"),
            vec![on_resolve, build::ident_expr(ERROR)],
        )))
    }
}

impl VisitMut for Asynchronizer<'_> {
    fn visit_mut_fn_decl(&mut self, node: &mut ast::FnDecl) {
        let name = Some(node.ident.sym.to_string());
        self.with_name(name, |this| node.visit_mut_children_with(this));
    }

    fn visit_mut_fn_expr(&mut self, node: &mut ast::FnExpr) {
        let name = node.ident.as_ref().map(|id| id.sym.to_string());
        self.with_name(name, |this| node.visit_mut_children_with(this));
    }

    fn visit_mut_class_method(&mut self, node: &mut ast::ClassMethod) {
        let name = match &node.key {
            ast::PropName::Ident(id) => Some(id.sym.to_string()),
            _ => None,
        };
        self.with_name(name, |this| node.visit_mut_children_with(this));
    }

    fn visit_mut_var_declarator(&mut self, node: &mut ast::VarDeclarator) {
        let name = match &node.name {
            ast::Pat::Ident(binding) => Some(binding.id.sym.to_string()),
            _ => None,
        };
        self.with_name(name, |this| node.visit_mut_children_with(this));
    }

    fn visit_mut_function(&mut self, node: &mut ast::Function) {
        node.visit_mut_children_with(self);
        if self.error.is_some() || !node.is_async {
            return;
        }
        if let Err(err) = self.lower_function(node) {
            self.error = Some(err);
        }
    }

    fn visit_mut_arrow_expr(&mut self, node: &mut ast::ArrowExpr) {
        node.visit_mut_children_with(self);
        if self.error.is_some() || !node.is_async {
            return;
        }
        if let Err(err) = self.lower_arrow(node) {
            self.error = Some(err);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SiteKind {
    /// `await e;`
    Discard,
    /// `x = await e;`
    Assign,
    /// `let p = await e;`
    Declare,
    /// `return await e;`
    Return,
}

/// A statement whose top-level expression is an `await`.
///
/// The awaited operand has been taken out of `stmt` and an `Invalid`
/// placeholder left in its place.
struct AwaitSite {
    awaited: Box<ast::Expr>,
    kind: SiteKind,
    stmt: ast::Stmt,
}

/// The statement that resumes execution with the awaited value bound to `param`.
fn resume(kind: SiteKind, mut stmt: ast::Stmt, param: &ast::Ident) -> Option<ast::Stmt> {
    match kind {
        SiteKind::Discard => None,
        SiteKind::Return => Some(build::resolve_stmt(Some(Box::new(ast::Expr::Ident(
            param.clone(),
        ))))),
        SiteKind::Assign | SiteKind::Declare => {
            stmt.visit_mut_with(&mut FillPlaceholder(param));
            Some(stmt)
        }
    }
}

enum Split {
    Plain(ast::Stmt),
    Site(AwaitSite),
}

fn split(mut stmt: ast::Stmt) -> Split {
    let site = match &mut stmt {
        ast::Stmt::Expr(expr_stmt) => {
            if let Some(awaited) = take_awaited(&mut expr_stmt.expr) {
                Some((awaited, SiteKind::Discard))
            } else if let ast::Expr::Assign(assign) = &mut *expr_stmt.expr {
                take_awaited(&mut assign.right).map(|a| (a, SiteKind::Assign))
            } else {
                None
            }
        }
        ast::Stmt::Decl(ast::Decl::Var(var)) if var.decls.len() == 1 => var.decls[0]
            .init
            .as_deref_mut()
            .and_then(take_awaited)
            .map(|a| (a, SiteKind::Declare)),
        ast::Stmt::Return(ret) => ret
            .arg
            .as_deref_mut()
            .and_then(take_awaited)
            .map(|a| (a, SiteKind::Return)),
        _ => None,
    };

    match site {
        Some((awaited, kind)) => Split::Site(AwaitSite {
            awaited,
            kind,
            stmt,
        }),
        None => Split::Plain(stmt),
    }
}

fn take_awaited(expr: &mut ast::Expr) -> Option<Box<ast::Expr>> {
    if !matches!(expr, ast::Expr::Await(_)) {
        return None;
    }
    match mem::replace(expr, ast::Expr::Invalid(ast::Invalid { span: DUMMY_SP })) {
        ast::Expr::Await(await_expr) => Some(await_expr.arg),
        _ => None,
    }
}

struct FillPlaceholder<'a>(&'a ast::Ident);

impl VisitMut for FillPlaceholder<'_> {
    fn visit_mut_expr(&mut self, node: &mut ast::Expr) {
        if matches!(node, ast::Expr::Invalid(_)) {
            *node = ast::Expr::Ident(self.0.clone());
            return;
        }
        node.visit_mut_children_with(self);
    }
}

/// Rewrites `return x` to `return $return(x)` within one function body.
struct ReturnRewriter;

impl VisitMut for ReturnRewriter {
    fn visit_mut_return_stmt(&mut self, node: &mut ast::ReturnStmt) {
        node.arg = Some(build::call(
            build::ident_expr(RETURN),
            node.arg.take().into_iter().collect(),
        ));
    }

    fn visit_mut_function(&mut self, _: &mut ast::Function) {}
    fn visit_mut_arrow_expr(&mut self, _: &mut ast::ArrowExpr) {}
    fn visit_mut_constructor(&mut self, _: &mut ast::Constructor) {}
    fn visit_mut_getter_prop(&mut self, _: &mut ast::GetterProp) {}
    fn visit_mut_setter_prop(&mut self, _: &mut ast::SetterProp) {}
}

#[derive(Default)]
struct AwaitFinder {
    found_await: bool,
    found_for_await: bool,
}

impl Visit for AwaitFinder {
    fn visit_await_expr(&mut self, _: &ast::AwaitExpr) {
        self.found_await = true;
    }

    fn visit_for_of_stmt(&mut self, node: &ast::ForOfStmt) {
        if node.is_await {
            self.found_for_await = true;
        }
        node.visit_children_with(self);
    }

    fn visit_function(&mut self, _: &ast::Function) {}
    fn visit_arrow_expr(&mut self, _: &ast::ArrowExpr) {}
    fn visit_constructor(&mut self, _: &ast::Constructor) {}
    fn visit_getter_prop(&mut self, _: &ast::GetterProp) {}
    fn visit_setter_prop(&mut self, _: &ast::SetterProp) {}
}

fn ensure_no_await<N>(node: &N, name: &str) -> Result<(), EngineError>
where
    N: VisitWith<AwaitFinder> + ?Sized,
{
    let mut finder = AwaitFinder::default();
    node.visit_with(&mut finder);
    if finder.found_for_await {
        return Err(EngineError::ForAwait {
            function: name.to_string(),
        });
    }
    if finder.found_await {
        return Err(EngineError::UnsupportedAwait {
            function: name.to_string(),
        });
    }
    Ok(())
}

/// Split off the function declarations and `var` bindings of a body so they
/// can be declared ahead of the executor code.
///
/// `var x = e;` is left behind as `x = e;`. `var` statements with
/// destructuring patterns are not touched.
fn hoist_declarations(stmts: Vec<ast::Stmt>) -> (Vec<ast::Stmt>, Vec<ast::Stmt>) {
    let mut names: Vec<ast::BindingIdent> = Vec::new();
    let mut functions = Vec::new();
    let mut rest = Vec::with_capacity(stmts.len());

    for stmt in stmts {
        match stmt {
            ast::Stmt::Decl(ast::Decl::Fn(decl)) => functions.push(ast::Stmt::Decl(ast::Decl::Fn(decl))),
            ast::Stmt::Decl(ast::Decl::Var(var))
                if var.kind == ast::VarDeclKind::Var
                    && var.decls.iter().all(|d| matches!(d.name, ast::Pat::Ident(_))) =>
            {
                for decl in var.decls {
                    let ast::Pat::Ident(binding) = decl.name else {
                        continue;
                    };
                    if let Some(init) = decl.init {
                        rest.push(build::assign_stmt(binding.clone(), init));
                    }
                    if !names.iter().any(|n| n.id.sym == binding.id.sym) {
                        names.push(binding);
                    }
                }
            }
            other => rest.push(other),
        }
    }

    let mut hoisted = Vec::with_capacity(functions.len() + 1);
    if !names.is_empty() {
        hoisted.push(build::var_decl(names));
    }
    hoisted.extend(functions);
    (hoisted, rest)
}

#[derive(Default)]
struct VarFinder {
    found: bool,
}

impl Visit for VarFinder {
    fn visit_var_decl(&mut self, node: &ast::VarDecl) {
        if node.kind == ast::VarDeclKind::Var {
            self.found = true;
        }
        node.visit_children_with(self);
    }

    fn visit_function(&mut self, _: &ast::Function) {}
    fn visit_arrow_expr(&mut self, _: &ast::ArrowExpr) {}
    fn visit_constructor(&mut self, _: &ast::Constructor) {}
    fn visit_getter_prop(&mut self, _: &ast::GetterProp) {}
    fn visit_setter_prop(&mut self, _: &ast::SetterProp) {}
}

fn ensure_no_var<N>(node: &N, name: &str) -> Result<(), EngineError>
where
    N: VisitWith<VarFinder> + ?Sized,
{
    let mut finder = VarFinder::default();
    node.visit_with(&mut finder);
    if finder.found {
        return Err(EngineError::UnhoistableVar {
            function: name.to_string(),
        });
    }
    Ok(())
}

/// Finds `super` and `new.target`, which only resolve in the function that
/// wrote them.
#[derive(Default)]
struct MetaRefFinder {
    found: Option<&'static str>,
}

impl Visit for MetaRefFinder {
    fn visit_super(&mut self, _: &ast::Super) {
        self.found.get_or_insert("super");
    }

    fn visit_meta_prop_expr(&mut self, node: &ast::MetaPropExpr) {
        if node.kind == ast::MetaPropKind::NewTarget {
            self.found.get_or_insert("new.target");
        }
    }

    // arrows share both with their enclosing function
    fn visit_function(&mut self, _: &ast::Function) {}
    fn visit_class(&mut self, _: &ast::Class) {}
    fn visit_constructor(&mut self, _: &ast::Constructor) {}
    fn visit_getter_prop(&mut self, _: &ast::GetterProp) {}
    fn visit_setter_prop(&mut self, _: &ast::SetterProp) {}
}

fn ensure_no_meta_refs(stmts: &[ast::Stmt], name: &str) -> Result<(), EngineError> {
    let mut finder = MetaRefFinder::default();
    for stmt in stmts {
        stmt.visit_with(&mut finder);
    }
    match finder.found {
        Some(construct) => Err(EngineError::UnsupportedMetaRef {
            construct,
            function: name.to_string(),
        }),
        None => Ok(()),
    }
}

#[derive(Default)]
struct ArgumentsFinder {
    found: bool,
}

impl Visit for ArgumentsFinder {
    fn visit_ident(&mut self, node: &ast::Ident) {
        if node.sym == *"arguments" {
            self.found = true;
        }
    }

    // arrows share `arguments` with their enclosing function
    fn visit_function(&mut self, _: &ast::Function) {}
    fn visit_constructor(&mut self, _: &ast::Constructor) {}
    fn visit_getter_prop(&mut self, _: &ast::GetterProp) {}
    fn visit_setter_prop(&mut self, _: &ast::SetterProp) {}
}

fn references_arguments(stmts: &[ast::Stmt]) -> bool {
    let mut finder = ArgumentsFinder::default();
    for stmt in stmts {
        stmt.visit_with(&mut finder);
    }
    finder.found
}
