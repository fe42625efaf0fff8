//! Engine configuration: environment options, compiler options, and the
//! `"use nodent-*"` mode directive.

use std::{
    fmt,
    sync::{Arc, LazyLock},
};

use fa_ast::ParserOptions;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EngineError;

/// Destination for the engine's human-readable messages.
#[derive(Clone)]
pub struct LogSink(Arc<dyn Fn(&str) + Send + Sync>);

impl LogSink {
    pub fn new(f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Forward messages to `tracing` at info level.
    pub fn tracing() -> Self {
        Self::new(|msg| tracing::info!(target: "fast_async::engine", "{msg}"))
    }

    pub fn silent() -> Self {
        Self::new(|_| {})
    }

    pub fn log(&self, msg: &str) {
        (self.0)(msg)
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LogSink(..)")
    }
}

/// Options used to instantiate an engine (the `env` section).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvOptions {
    /// `false` silences the engine; unset means "supply a default sink".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<bool>,
    /// Suppress installing a module-loader hook as a side effect of construction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dont_install_require_hook: Option<bool>,
    /// Keys this engine does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Programmatic sink; takes precedence over `log`.
    #[serde(skip)]
    pub sink: Option<LogSink>,
}

impl EnvOptions {
    pub fn with_sink(mut self, sink: LogSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Fill in the defaults a caller did not specify.
    ///
    /// A missing log setting gets a sink forwarding to `tracing`; a missing
    /// `dontInstallRequireHook` becomes `true`.
    pub fn with_defaults(mut self) -> Self {
        if self.log.is_none() {
            self.log = Some(true);
        }
        if self.sink.is_none() {
            self.sink = Some(if self.log == Some(false) {
                LogSink::silent()
            } else {
                LogSink::tracing()
            });
        }
        if self.dont_install_require_hook.is_none() {
            self.dont_install_require_hook = Some(true);
        }
        self
    }

    /// The resolved sink; silent if defaults were never applied.
    pub fn log_sink(&self) -> LogSink {
        self.sink.clone().unwrap_or_else(LogSink::silent)
    }
}

/// Options controlling one `asynchronize` run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerOptions {
    /// Lazy-thenable output: rewritten functions return a thenable, not a `Promise`.
    pub es7: bool,
    /// Promise output: rewritten functions return `new Promise(...)`.
    pub promises: bool,
    pub generators: bool,
    pub engine: bool,
    /// Wrap awaited values in `Promise.resolve(..)` so non-thenables can be awaited.
    pub wrap_await: bool,
    pub parser: ParserOptions,
}

/// The code shape an engine run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncMode {
    Promises,
    LazyThenable,
}

impl CompilerOptions {
    /// Overlay `overrides` onto these options, key by key.
    ///
    /// Only keys already present in the serialized defaults are applied;
    /// unknown keys are ignored and returned alongside the merged options.
    pub fn overlay(
        &self,
        overrides: &Map<String, Value>,
    ) -> Result<(Self, Vec<String>), EngineError> {
        let mut merged = match serde_json::to_value(self).map_err(EngineError::InvalidOptions)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let mut ignored = Vec::new();
        for (key, value) in overrides {
            match merged.get_mut(key) {
                Some(slot) => *slot = value.clone(),
                None => ignored.push(key.clone()),
            }
        }

        let options = serde_json::from_value(Value::Object(merged))
            .map_err(EngineError::InvalidOptions)?;
        Ok((options, ignored))
    }

    /// The output mode these options select.
    pub fn mode(&self) -> Result<AsyncMode, EngineError> {
        if self.generators {
            return Err(EngineError::UnsupportedMode("generators"));
        }
        if self.engine {
            return Err(EngineError::UnsupportedMode("engine"));
        }
        if self.promises {
            return Ok(AsyncMode::Promises);
        }
        if self.es7 {
            return Ok(AsyncMode::LazyThenable);
        }
        Err(EngineError::NoAsyncMode)
    }
}

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(["'])use nodent(?:-([a-z0-9]+))?(?:\s+(\{.*\}))?\s*(["'])\s*;?\s*$"#)
        .expect("directive pattern is a valid regex")
});

/// Parse a mode directive such as `"use nodent-promises";`.
///
/// The directive may carry a JSON object of option overrides after the mode
/// name: `"use nodent-promises {\"wrapAwait\": true}";`.
pub fn parse_directive(directive: &str) -> Result<CompilerOptions, EngineError> {
    let caps = DIRECTIVE
        .captures(directive)
        .filter(|c| c[1] == c[4])
        .ok_or_else(|| EngineError::InvalidDirective(directive.to_string()))?;

    let mut options = CompilerOptions::default();
    match caps.get(2).map(|m| m.as_str()) {
        None | Some("es7") => options.es7 = true,
        Some("promise") | Some("promises") => {
            options.es7 = true;
            options.promises = true;
        }
        Some("generator") | Some("generators") => options.generators = true,
        Some("engine") => options.engine = true,
        Some(_) => return Err(EngineError::InvalidDirective(directive.to_string())),
    }

    if let Some(json) = caps.get(3) {
        let overrides: Map<String, Value> =
            serde_json::from_str(json.as_str()).map_err(EngineError::InvalidOptions)?;
        let (merged, ignored) = options.overlay(&overrides)?;
        if !ignored.is_empty() {
            tracing::debug!(?ignored, "ignoring unknown options in mode directive");
        }
        options = merged;
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn promises_directive_selects_promise_mode() {
        let opts = parse_directive("\"use nodent-promises\";").unwrap();
        assert!(opts.promises);
        assert_eq!(opts.mode().unwrap(), AsyncMode::Promises);
        assert!(opts.parser.ranges);
    }

    #[test]
    fn bare_directive_selects_lazy_thenables() {
        let opts = parse_directive("'use nodent'").unwrap();
        assert_eq!(opts.mode().unwrap(), AsyncMode::LazyThenable);
    }

    #[test]
    fn directive_carries_option_overrides() {
        let opts = parse_directive(r#"'use nodent-promise {"wrapAwait": true}';"#).unwrap();
        assert!(opts.wrap_await);
        assert!(opts.promises);
    }

    #[test]
    fn malformed_directives_are_rejected() {
        for bad in ["\"use strict\";", "\"use nodent-fibers\";", "\"use nodent'"] {
            assert!(
                matches!(parse_directive(bad), Err(EngineError::InvalidDirective(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn generator_mode_is_unsupported() {
        let opts = parse_directive("\"use nodent-generators\";").unwrap();
        assert!(matches!(
            opts.mode(),
            Err(EngineError::UnsupportedMode("generators"))
        ));
    }

    #[test]
    fn overlay_only_applies_known_keys() {
        let defaults = parse_directive("\"use nodent-promises\";").unwrap();
        let (merged, ignored) = defaults
            .overlay(&map(json!({ "wrapAwait": true, "sourcemap": true })))
            .unwrap();
        assert!(merged.wrap_await);
        assert_eq!(ignored, vec!["sourcemap".to_string()]);
    }

    #[test]
    fn overlay_with_wrong_type_fails() {
        let defaults = CompilerOptions::default();
        let err = defaults.overlay(&map(json!({ "promises": "yes" }))).unwrap_err();
        assert!(matches!(err, EngineError::InvalidOptions(_)));
    }

    #[test]
    fn env_defaults_fill_missing_fields_only() {
        let env = EnvOptions::default().with_defaults();
        assert_eq!(env.log, Some(true));
        assert_eq!(env.dont_install_require_hook, Some(true));

        let env: EnvOptions =
            serde_json::from_value(json!({ "dontInstallRequireHook": false, "extension": ".js" }))
                .unwrap();
        let env = env.with_defaults();
        assert_eq!(env.dont_install_require_hook, Some(false));
        assert!(env.extra.contains_key("extension"));
    }
}
