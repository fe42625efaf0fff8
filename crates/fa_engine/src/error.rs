use fa_parser::ParseError;

/// Failures raised by a transform engine while parsing or rewriting a unit.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("invalid mode directive: {0}")]
    InvalidDirective(String),

    #[error("invalid compiler options: {0}")]
    InvalidOptions(#[source] serde_json::Error),

    #[error("compiler options select no async mode (set `es7` or `promises`)")]
    NoAsyncMode,

    #[error("`{0}` mode is not supported by this engine")]
    UnsupportedMode(&'static str),

    #[error("`await` in async function `{function}` is not in a statement position this engine can split")]
    UnsupportedAwait { function: String },

    #[error("`for await` in async function `{function}` is not supported")]
    ForAwait { function: String },

    #[error("`var` declared after an `await` in async function `{function}` cannot be hoisted")]
    UnhoistableVar { function: String },

    #[error("`{construct}` in async function `{function}` cannot move into the rewritten executor")]
    UnsupportedMetaRef {
        construct: &'static str,
        function: String,
    },

    #[error("async generator `{function}` is not supported")]
    AsyncGenerator { function: String },
}
