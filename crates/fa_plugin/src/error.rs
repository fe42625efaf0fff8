use fa_engine::EngineError;
use fa_parser::ParseError;

/// Why a pass over one compilation unit failed.
///
/// A failed pass leaves the unit's program unchanged.
#[derive(Debug, thiserror::Error)]
pub enum PassError {
    #[error("transform engine failed: {0}")]
    Engine(#[from] EngineError),

    #[error("could not synthesize the runtime fragment: {reason}")]
    FragmentSynthesis {
        reason: String,
        #[source]
        source: Option<EngineError>,
    },

    #[error("invalid runtimePattern `{pattern}`")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("could not build import of `{module}`")]
    Import {
        module: String,
        #[source]
        source: ParseError,
    },
}
