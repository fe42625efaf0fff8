//! ECMAScript AST and parser configuration for fast-async.
//!
//! Re-exports the standard SWC AST and adds the pieces every stage shares:
//! - [`SyntaxExtension`]: parser feature flags, addressed by identifier
//! - [`ParserExtensions`]: the de-duplicated list of enabled extensions
//! - [`ParserOptions`]: location tracking switches (`ranges`, `locations`)

pub use swc_ecma_ast::*;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Parser-level syntax extensions that can be switched on per compilation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyntaxExtension {
    /// `async function`, `async` arrows and methods, `await`, `for await`.
    AsyncFunctions,
    /// JSX elements and fragments.
    Jsx,
    /// `@decorator` syntax on classes and members.
    Decorators,
}

impl SyntaxExtension {
    /// Identifier used in parser plugin lists.
    pub fn identifier(self) -> &'static str {
        match self {
            SyntaxExtension::AsyncFunctions => "asyncFunctions",
            SyntaxExtension::Jsx => "jsx",
            SyntaxExtension::Decorators => "decorators",
        }
    }
}

impl fmt::Display for SyntaxExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// Raised when a parser configuration names an extension this parser does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown syntax extension `{0}`")]
pub struct UnknownExtension(pub String);

impl FromStr for SyntaxExtension {
    type Err = UnknownExtension;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asyncFunctions" => Ok(SyntaxExtension::AsyncFunctions),
            "jsx" => Ok(SyntaxExtension::Jsx),
            "decorators" => Ok(SyntaxExtension::Decorators),
            other => Err(UnknownExtension(other.to_string())),
        }
    }
}

/// The parser's enabled-extensions list.
///
/// Kept in registration order. Enabling an extension that is already present
/// is a no-op, so hooks that run more than once per unit never register twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParserExtensions(Vec<SyntaxExtension>);

impl ParserExtensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `ext` unless it is already enabled. Returns `true` if it was added.
    pub fn enable(&mut self, ext: SyntaxExtension) -> bool {
        if self.0.contains(&ext) {
            return false;
        }
        self.0.push(ext);
        true
    }

    /// Enable an extension given by its identifier (`"asyncFunctions"`, `"jsx"`, ...).
    pub fn enable_named(&mut self, name: &str) -> Result<bool, UnknownExtension> {
        Ok(self.enable(name.parse()?))
    }

    pub fn contains(&self, ext: SyntaxExtension) -> bool {
        self.0.contains(&ext)
    }

    pub fn iter(&self) -> impl Iterator<Item = SyntaxExtension> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<SyntaxExtension> for ParserExtensions {
    fn from_iter<I: IntoIterator<Item = SyntaxExtension>>(iter: I) -> Self {
        let mut exts = ParserExtensions::new();
        for ext in iter {
            exts.enable(ext);
        }
        exts
    }
}

/// Location-tracking switches for a parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParserOptions {
    /// Keep byte ranges (spans) on the parsed nodes.
    pub ranges: bool,
    /// Collect comments, which are attached to source positions.
    pub locations: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            ranges: true,
            locations: true,
        }
    }
}

/// Everything the parser needs to know besides the source text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserConfig {
    pub extensions: ParserExtensions,
    pub options: ParserOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabling_twice_keeps_one_entry() {
        let mut exts = ParserExtensions::new();
        assert!(exts.enable(SyntaxExtension::AsyncFunctions));
        assert!(!exts.enable(SyntaxExtension::AsyncFunctions));
        assert_eq!(exts.len(), 1);
        assert!(exts.contains(SyntaxExtension::AsyncFunctions));
    }

    #[test]
    fn extension_identifiers_parse_back() {
        for ext in [
            SyntaxExtension::AsyncFunctions,
            SyntaxExtension::Jsx,
            SyntaxExtension::Decorators,
        ] {
            assert_eq!(ext.identifier().parse::<SyntaxExtension>(), Ok(ext));
        }
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let mut exts = ParserExtensions::new();
        let err = exts.enable_named("pipelineOperator").unwrap_err();
        assert_eq!(err, UnknownExtension("pipelineOperator".into()));
        assert!(exts.is_empty());
    }

    #[test]
    fn parser_options_default_tracks_locations() {
        let opts = ParserOptions::default();
        assert!(opts.ranges);
        assert!(opts.locations);
    }
}
