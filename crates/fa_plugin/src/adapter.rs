//! Engine configuration at pass entry.
//!
//! Precedence, lowest first: engine defaults, the promise-mode directive,
//! then the user's `compiler` overrides (known keys only).

use fa_engine::{CompilerOptions, EngineFactory, TransformEngine};

use crate::{error::PassError, options::PluginOptions};

/// Directive selecting promise-based output.
pub const PROMISE_DIRECTIVE: &str = "\"use nodent-promises\";";

pub(crate) fn configure<F: EngineFactory>(
    factory: &F,
    options: &PluginOptions,
) -> Result<(F::Engine, CompilerOptions), PassError> {
    let env = options.env.clone().unwrap_or_default().with_defaults();
    let engine = factory.configure(env);

    let mut compiler = engine.parse_compiler_options(PROMISE_DIRECTIVE)?;
    if let Some(overrides) = &options.compiler {
        let (merged, ignored) = compiler.overlay(overrides)?;
        if !ignored.is_empty() {
            tracing::debug!(?ignored, "ignoring compiler options unknown to the engine");
        }
        compiler = merged;
    }

    Ok((engine, compiler))
}
