use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::resource::ResourceLimits;

/// How the source language models text.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TextModel {
    /// Text is a byte sequence. The builtin byte string is named `str` and constant-index
    /// reads on it are served by the fast path.
    ByteString,
    /// Text is unicode. The builtin byte string is named `bytes` and is read through the
    /// generic dispatcher like any other sequence.
    #[default]
    Unicode,
}

/// Which tracer a new runtime installs.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TraceMode {
    #[default]
    Off,
    Stderr,
}

/// Runtime configuration.
///
/// ```
/// use subscript_rt::{RuntimeConfig, TextModel};
///
/// let config = RuntimeConfig::from_json(r#"{"text_model": "bytestring"}"#).unwrap();
/// assert_eq!(config.text_model, TextModel::ByteString);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub text_model: TextModel,
    pub limits: ResourceLimits,
    pub trace: TraceMode,
}

impl RuntimeConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text_model(mut self, text_model: TextModel) -> Self {
        self.text_model = text_model;
        self
    }

    #[must_use]
    pub fn limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn trace(mut self, trace: TraceMode) -> Self {
        self.trace = trace;
        self
    }

    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
