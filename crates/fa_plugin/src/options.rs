//! Per-unit host configuration.

use fa_engine::EnvOptions;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Module imported when `useModule` is `true`.
pub const DEFAULT_RUNTIME_MODULE: &str = "nodent-runtime";

/// Value of `runtimePattern` that selects directive-gated injection.
pub const DIRECTIVE_PATTERN: &str = "directive";

/// `useModule`: either a flag or the name of the module to import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UseModule {
    Flag(bool),
    Name(String),
}

impl UseModule {
    /// The module to import, or `None` when the setting is falsy.
    pub fn module_name(&self) -> Option<&str> {
        match self {
            UseModule::Flag(true) => Some(DEFAULT_RUNTIME_MODULE),
            UseModule::Flag(false) => None,
            UseModule::Name(name) if name.is_empty() => None,
            UseModule::Name(name) => Some(name),
        }
    }
}

/// Options recognised by the pass. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginOptions {
    /// Overrides for the engine's environment options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<EnvOptions>,
    /// Overrides for engine compiler options; only keys the engine defaults know are applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_module: Option<UseModule>,
    /// `"directive"`, or a regular expression matched against the unit's filename.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_pattern: Option<String>,
}

impl PluginOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn runtime_module(&self) -> Option<&str> {
        self.use_module.as_ref().and_then(UseModule::module_name)
    }

    /// `runtimePattern`, treating an empty string as unset.
    pub fn runtime_pattern(&self) -> Option<&str> {
        self.runtime_pattern.as_deref().filter(|p| !p.is_empty())
    }
}
