//! Detection of functions the engine actually rewrote.

use swc_common::Mark;
use swc_ecma_ast as ast;
use swc_ecma_visit::{Visit, VisitWith};

/// Visits every function and arrow, flagging the unit as needing runtime
/// support as soon as one carries the engine's rewrite mark.
pub struct UsageTracker<'a> {
    marker: Mark,
    runtime_used: &'a mut bool,
}

impl<'a> UsageTracker<'a> {
    pub fn new(marker: Mark, runtime_used: &'a mut bool) -> Self {
        Self {
            marker,
            runtime_used,
        }
    }

    /// Walk `program`; the flag is only ever set, never cleared.
    pub fn observe(program: &ast::Program, marker: Mark, runtime_used: &'a mut bool) {
        program.visit_with(&mut UsageTracker::new(marker, runtime_used));
    }

    fn check(&mut self, ctxt: swc_common::SyntaxContext) {
        if ctxt.outer() == self.marker {
            *self.runtime_used = true;
        }
    }
}

impl Visit for UsageTracker<'_> {
    fn visit_function(&mut self, node: &ast::Function) {
        self.check(node.ctxt);
        node.visit_children_with(self);
    }

    fn visit_arrow_expr(&mut self, node: &ast::ArrowExpr) {
        self.check(node.ctxt);
        node.visit_children_with(self);
    }
}
