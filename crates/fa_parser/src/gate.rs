//! Rejection of syntax whose extension is not enabled.

use swc_common::Span;
use swc_ecma_ast as ast;
use swc_ecma_visit::{Visit, VisitWith};

/// Find the first async construct (async function or arrow, `await`, `for await`).
pub fn find_async_syntax(program: &ast::Program) -> Option<Span> {
    let mut finder = AsyncSyntaxFinder::default();
    program.visit_with(&mut finder);
    finder.found
}

#[derive(Default)]
struct AsyncSyntaxFinder {
    found: Option<Span>,
}

impl AsyncSyntaxFinder {
    fn record(&mut self, span: Span) {
        if self.found.is_none() {
            self.found = Some(span);
        }
    }
}

impl Visit for AsyncSyntaxFinder {
    fn visit_function(&mut self, node: &ast::Function) {
        if node.is_async {
            self.record(node.span);
        }
        node.visit_children_with(self);
    }

    fn visit_arrow_expr(&mut self, node: &ast::ArrowExpr) {
        if node.is_async {
            self.record(node.span);
        }
        node.visit_children_with(self);
    }

    fn visit_await_expr(&mut self, node: &ast::AwaitExpr) {
        self.record(node.span);
        node.visit_children_with(self);
    }

    fn visit_for_of_stmt(&mut self, node: &ast::ForOfStmt) {
        if node.is_await {
            self.record(node.span);
        }
        node.visit_children_with(self);
    }
}
