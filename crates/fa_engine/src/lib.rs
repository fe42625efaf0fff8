//! Transform engines that rewrite async functions into continuation code.
//!
//! The [`TransformEngine`] trait is the seam the fast-async pass talks to.
//! [`NodentEngine`] is the bundled implementation: it lowers each `async`
//! function into a `$asyncbind`-bound executor returning a `Promise` (or a
//! lazy thenable in es7 mode) and splits statement-level `await`s into
//! `.then` continuations.

mod build;
pub mod engine;
pub mod error;
mod lower;
pub mod nodent;
pub mod options;

pub use engine::{EngineFactory, EngineUnit, TransformEngine};
pub use error::EngineError;
pub use nodent::{NodentEngine, NodentFactory};
pub use options::{AsyncMode, CompilerOptions, EnvOptions, LogSink};
