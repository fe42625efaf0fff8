//! The nodent-style engine: `$asyncbind` continuations over promises or lazy thenables.

use fa_ast::{ParserConfig, SyntaxExtension};
use fa_parser::parse_program;
use swc_common::Mark;
use swc_ecma_ast::Program;
use swc_ecma_visit::VisitMutWith;

use crate::{
    engine::{EngineFactory, EngineUnit, TransformEngine},
    error::EngineError,
    lower::Asynchronizer,
    options::{parse_directive, CompilerOptions, EnvOptions, LogSink},
};

/// Creates [`NodentEngine`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodentFactory;

impl EngineFactory for NodentFactory {
    type Engine = NodentEngine;

    fn configure(&self, env: EnvOptions) -> NodentEngine {
        NodentEngine::new(env)
    }
}

#[derive(Debug)]
pub struct NodentEngine {
    log: LogSink,
    marker: Mark,
}

impl NodentEngine {
    /// Must be called inside an SWC `GLOBALS` scope.
    pub fn new(env: EnvOptions) -> Self {
        let env = env.with_defaults();
        let log = env.log_sink();

        if env.dont_install_require_hook == Some(false) {
            tracing::warn!("this engine has no require hook to install; `dontInstallRequireHook: false` has no effect");
        }
        if !env.extra.is_empty() {
            let keys: Vec<&String> = env.extra.keys().collect();
            tracing::debug!(?keys, "ignoring unrecognised env options");
        }

        Self {
            log,
            marker: Mark::new(),
        }
    }
}

impl TransformEngine for NodentEngine {
    fn parse_compiler_options(&self, directive: &str) -> Result<CompilerOptions, EngineError> {
        parse_directive(directive)
    }

    fn parse(
        &self,
        source: &str,
        filename: &str,
        options: &CompilerOptions,
    ) -> Result<Program, EngineError> {
        let config = ParserConfig {
            extensions: [SyntaxExtension::AsyncFunctions].into_iter().collect(),
            options: options.parser,
        };
        Ok(parse_program(source, filename, &config)?.program)
    }

    fn asynchronize(
        &self,
        unit: EngineUnit<'_>,
        options: &CompilerOptions,
    ) -> Result<(), EngineError> {
        let mode = options.mode()?;
        let mut lowering = Asynchronizer::new(mode, options.wrap_await, self.marker, &self.log);
        unit.program.visit_mut_with(&mut lowering);

        if let Some(err) = lowering.error {
            return Err(err);
        }
        if lowering.rewritten > 0 {
            self.log.log(&format!(
                "rewrote {} async function(s) in {}",
                lowering.rewritten, unit.filename
            ));
        }
        tracing::debug!(
            filename = unit.filename,
            source_len = unit.source.len(),
            rewritten = lowering.rewritten,
            ?mode,
            "asynchronize finished"
        );
        Ok(())
    }

    fn marker(&self) -> Mark {
        self.marker
    }
}
