//! fast-async: a compiler pass that rewrites `async` functions into
//! promise-based code and makes sure the `$asyncbind` runtime they call is
//! available, either inlined into the program or imported from a module.
//!
//! ```text
//! manipulate_options ─▶ parse ─▶ transform
//!                                  ├─ enter:  configure engine, asynchronize
//!                                  ├─ observe rewritten functions
//!                                  └─ exit:   inject runtime per policy
//! ```

mod adapter;
pub mod error;
pub mod host;
pub mod inject;
pub mod options;
pub mod pass;
pub mod runtime;
pub mod usage;

pub use adapter::PROMISE_DIRECTIVE;
pub use error::PassError;
pub use host::{ImportAdder, PendingImports};
pub use inject::{InjectionMode, RUNTIME_DIRECTIVE};
pub use options::{PluginOptions, UseModule};
pub use pass::{CompilationUnit, FastAsync, Injection, PassOutcome};
pub use runtime::{synthesize_runtime, RUNTIME_SOURCE, RUNTIME_SYMBOL};
pub use usage::UsageTracker;
