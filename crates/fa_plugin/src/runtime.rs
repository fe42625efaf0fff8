//! The runtime-support fragment rewritten code depends on.
//!
//! Rewritten functions call `fn.$asyncbind(self, catcher)`:
//! - `catcher === true`: returns an executor `(resolve, reject)` that is also
//!   a thenable, usable both with `new Promise(..)` and as a lazy thenable;
//! - `catcher` a function: returns `fn` bound to `self`, routing exceptions
//!   to `catcher`;
//! - otherwise: returns `fn` bound to `self`.

use fa_engine::{CompilerOptions, TransformEngine};
use fa_parser::strip_locations;
use swc_ecma_ast as ast;

use crate::error::PassError;

/// Assignment target for the runtime function.
pub const RUNTIME_SYMBOL: &str = "Function.prototype.$asyncbind";

/// Canonical definition of `$asyncbind`.
pub const RUNTIME_SOURCE: &str = r#"
function $asyncbind(self, catcher) {
    var fn = this;
    if (catcher === true) {
        var executor = function (resolve, reject) {
            try {
                return fn.call(self, resolve, reject);
            } catch (ex) {
                return reject(ex);
            }
        };
        executor.then = executor;
        return executor;
    }
    if (typeof catcher === "function") {
        return function () {
            try {
                return fn.apply(self, arguments);
            } catch (ex) {
                return catcher(ex);
            }
        };
    }
    return function () {
        return fn.apply(self, arguments);
    };
}
"#;

/// `<symbol> = <function source>;` on one line, whitespace runs collapsed.
pub fn runtime_line(symbol: &str, function_source: &str) -> String {
    let compact = function_source.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("{symbol} = {compact};")
}

/// Parse the runtime definition into a single statement with no location data.
///
/// The parse runs with range and location tracking off, and the result is
/// additionally cloned with every span reset, so that no node of the fragment
/// can collide with a real source position.
pub fn synthesize_runtime<E: TransformEngine>(
    engine: &E,
    options: &CompilerOptions,
) -> Result<ast::Stmt, PassError> {
    synthesize(engine, options, RUNTIME_SYMBOL, RUNTIME_SOURCE)
}

pub(crate) fn synthesize<E: TransformEngine>(
    engine: &E,
    options: &CompilerOptions,
    symbol: &str,
    function_source: &str,
) -> Result<ast::Stmt, PassError> {
    let line = runtime_line(symbol, function_source);

    let mut options = options.clone();
    options.parser.ranges = false;
    options.parser.locations = false;

    let program = engine
        .parse(&line, "<runtime>", &options)
        .map_err(|err| PassError::FragmentSynthesis {
            reason: "runtime source did not parse".to_string(),
            source: Some(err),
        })?;

    let stmt = match program {
        ast::Program::Script(script) if script.body.len() == 1 => script.body.into_iter().next(),
        ast::Program::Module(module) if module.body.len() == 1 => module
            .body
            .into_iter()
            .next()
            .and_then(|item| match item {
                ast::ModuleItem::Stmt(stmt) => Some(stmt),
                ast::ModuleItem::ModuleDecl(_) => None,
            }),
        _ => None,
    };
    let stmt = stmt.ok_or_else(|| PassError::FragmentSynthesis {
        reason: "runtime source must be exactly one statement".to_string(),
        source: None,
    })?;

    Ok(strip_locations(&stmt))
}

#[cfg(test)]
mod tests {
    use fa_engine::{EngineFactory, EnvOptions, LogSink, NodentFactory};
    use fa_parser::has_locations;
    use swc_common::{Globals, GLOBALS};

    use super::*;

    fn with_engine<R>(f: impl FnOnce(&fa_engine::NodentEngine, &CompilerOptions) -> R) -> R {
        GLOBALS.set(&Globals::new(), || {
            let engine =
                NodentFactory.configure(EnvOptions::default().with_sink(LogSink::silent()));
            let options = engine
                .parse_compiler_options("\"use nodent-promises\";")
                .unwrap();
            f(&engine, &options)
        })
    }

    #[test]
    fn runtime_line_is_single_line() {
        let line = runtime_line(RUNTIME_SYMBOL, RUNTIME_SOURCE);
        assert!(!line.contains('\n'));
        assert!(!line.contains("  "));
        assert!(line.starts_with("Function.prototype.$asyncbind = function $asyncbind(self, catcher) {"));
        assert!(line.ends_with("};"));
    }

    #[test]
    fn fragment_is_an_assignment_without_locations() {
        let stmt = with_engine(|engine, options| synthesize_runtime(engine, options)).unwrap();
        assert!(!has_locations(&stmt));
        match stmt {
            ast::Stmt::Expr(ast::ExprStmt { expr, .. }) => {
                assert!(matches!(*expr, ast::Expr::Assign(_)))
            }
            other => panic!("unexpected fragment {other:?}"),
        }
    }

    #[test]
    fn caller_options_keep_location_tracking() {
        with_engine(|engine, options| {
            synthesize_runtime(engine, options).unwrap();
            assert!(options.parser.ranges);
            assert!(options.parser.locations);
        });
    }

    #[test]
    fn malformed_source_is_a_synthesis_error() {
        let err = with_engine(|engine, options| {
            synthesize(engine, options, RUNTIME_SYMBOL, "function (")
        })
        .unwrap_err();
        assert!(matches!(err, PassError::FragmentSynthesis { source: Some(_), .. }));
    }

    #[test]
    fn several_statements_are_rejected() {
        let err = with_engine(|engine, options| {
            synthesize(engine, options, "a", "1; b = 2")
        })
        .unwrap_err();
        assert!(matches!(err, PassError::FragmentSynthesis { source: None, .. }));
    }
}
