use fa_ast::{ParserConfig, SyntaxExtension};
use fa_engine::{CompilerOptions, EngineFactory, EngineUnit, NodentFactory, TransformEngine};
use fa_parser::{parse_program, ParseError};
use swc_common::{Globals, GLOBALS};
use swc_ecma_ast::Program;

use crate::{
    adapter,
    error::PassError,
    host::ImportAdder,
    inject::{prepend_stmt, remove_directive, InjectionMode, RUNTIME_DIRECTIVE},
    options::{PluginOptions, DIRECTIVE_PATTERN},
    runtime::synthesize_runtime,
    usage::UsageTracker,
};

/// One source program processed by a single pass.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    pub program: Program,
    pub source: String,
    pub filename: String,
}

impl CompilationUnit {
    pub fn parse(source: &str, filename: &str, parser: &ParserConfig) -> Result<Self, ParseError> {
        let parsed = parse_program(source, filename, parser)?;
        Ok(Self {
            program: parsed.program,
            source: source.to_string(),
            filename: filename.to_string(),
        })
    }
}

/// What the pass did to a unit's runtime support.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Injection {
    /// An import of the named runtime module was requested from the host.
    Imported(String),
    /// The runtime fragment was spliced into the program.
    Inlined,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOutcome {
    /// Whether any function was rewritten by the engine.
    pub runtime_used: bool,
    pub injection: Injection,
    /// `"use runtime-nodent"` directives removed in directive-gated mode.
    pub directives_removed: usize,
}

/// State owned by a single pass invocation.
struct UnitContext<E> {
    engine: E,
    options: CompilerOptions,
    runtime_used: bool,
}

/// The fast-async pass: rewrites async functions and injects runtime support.
pub struct FastAsync<F = NodentFactory> {
    options: PluginOptions,
    factory: F,
}

impl FastAsync<NodentFactory> {
    pub fn new(options: PluginOptions) -> Self {
        Self::with_engine(options, NodentFactory)
    }
}

impl<F: EngineFactory> FastAsync<F> {
    pub fn with_engine(options: PluginOptions, factory: F) -> Self {
        Self { options, factory }
    }

    /// Enable async-function syntax on the parser. Safe to call repeatedly.
    pub fn manipulate_options(&self, parser: &mut ParserConfig) {
        if parser.extensions.enable(SyntaxExtension::AsyncFunctions) {
            tracing::debug!("enabled `{}` parser extension", SyntaxExtension::AsyncFunctions);
        }
    }

    /// Run the pass over one unit.
    ///
    /// Works on a staged copy of the program; `unit.program` is replaced only
    /// when every step succeeded. Import requests go to `imports` and are the
    /// last action of a successful pass.
    pub fn transform(
        &self,
        unit: &mut CompilationUnit,
        imports: &mut dyn ImportAdder,
    ) -> Result<PassOutcome, PassError> {
        with_globals(|| {
            let mut staged = unit.program.clone();

            let mut ctx = self.enter(&mut staged, &unit.source, &unit.filename)?;
            UsageTracker::observe(&staged, ctx.engine.marker(), &mut ctx.runtime_used);
            let outcome = self.exit(&mut staged, &unit.filename, &ctx, imports)?;

            unit.program = staged;
            Ok(outcome)
        })
    }

    fn enter(
        &self,
        program: &mut Program,
        source: &str,
        filename: &str,
    ) -> Result<UnitContext<F::Engine>, PassError> {
        let (engine, options) = adapter::configure(&self.factory, &self.options)?;
        engine.asynchronize(
            EngineUnit {
                program,
                source,
                filename,
            },
            &options,
        )?;

        Ok(UnitContext {
            engine,
            options,
            runtime_used: false,
        })
    }

    fn exit(
        &self,
        program: &mut Program,
        filename: &str,
        ctx: &UnitContext<F::Engine>,
        imports: &mut dyn ImportAdder,
    ) -> Result<PassOutcome, PassError> {
        let mode = InjectionMode::select(&self.options, ctx.runtime_used)?;
        tracing::debug!(filename, ?mode, runtime_used = ctx.runtime_used, "runtime injection");

        let mut outcome = PassOutcome {
            runtime_used: ctx.runtime_used,
            injection: Injection::Skipped,
            directives_removed: 0,
        };

        match mode {
            InjectionMode::ModuleImport(module) => {
                imports.add_import(&module);
                outcome.injection = Injection::Imported(module);
            }
            InjectionMode::Unconditional => {
                inline_runtime(program, ctx)?;
                outcome.injection = Injection::Inlined;
            }
            InjectionMode::DirectiveGated => {
                outcome.directives_removed = remove_directive(program, RUNTIME_DIRECTIVE);
                if outcome.directives_removed > 0 {
                    inline_runtime(program, ctx)?;
                    outcome.injection = Injection::Inlined;
                }
            }
            InjectionMode::PatternGated(pattern) => {
                if pattern.is_match(filename) {
                    inline_runtime(program, ctx)?;
                    outcome.injection = Injection::Inlined;
                }
            }
            InjectionMode::None => {
                // sentinels never reach the output, injected or not
                if self.options.runtime_pattern() == Some(DIRECTIVE_PATTERN) {
                    outcome.directives_removed = remove_directive(program, RUNTIME_DIRECTIVE);
                }
            }
        }

        Ok(outcome)
    }
}

fn inline_runtime<E: TransformEngine>(
    program: &mut Program,
    ctx: &UnitContext<E>,
) -> Result<(), PassError> {
    let fragment = synthesize_runtime(&ctx.engine, &ctx.options)?;
    prepend_stmt(program, fragment);
    Ok(())
}

fn with_globals<R>(f: impl FnOnce() -> R) -> R {
    if GLOBALS.is_set() {
        f()
    } else {
        GLOBALS.set(&Globals::new(), f)
    }
}
