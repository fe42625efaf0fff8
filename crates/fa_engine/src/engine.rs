use swc_common::Mark;
use swc_ecma_ast::Program;

use crate::{
    error::EngineError,
    options::{CompilerOptions, EnvOptions},
};

/// One compilation unit as seen by an engine.
pub struct EngineUnit<'a> {
    pub program: &'a mut Program,
    /// Original source text of the unit.
    pub source: &'a str,
    pub filename: &'a str,
}

/// Something that can rewrite async functions across a whole program.
///
/// Implementations must leave no partially rewritten tree observable on
/// failure; callers discard the tree when `asynchronize` returns an error.
pub trait TransformEngine {
    /// Derive engine options from a mode directive such as `"use nodent-promises";`.
    fn parse_compiler_options(&self, directive: &str) -> Result<CompilerOptions, EngineError>;

    /// Parse source with the engine's own parser configuration.
    fn parse(
        &self,
        source: &str,
        filename: &str,
        options: &CompilerOptions,
    ) -> Result<Program, EngineError>;

    /// Rewrite every async function in the unit in place.
    fn asynchronize(
        &self,
        unit: EngineUnit<'_>,
        options: &CompilerOptions,
    ) -> Result<(), EngineError>;

    /// Mark applied to the syntax context of every function this engine rewrote.
    fn marker(&self) -> Mark;
}

/// Builds an engine from environment options.
pub trait EngineFactory {
    type Engine: TransformEngine;

    fn configure(&self, env: EnvOptions) -> Self::Engine;
}
