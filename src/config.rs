//! Configuration for the binding layer.
//!
//! The only behavioural knob is what a setter does with a value that does
//! not fit the native field: wrap it like a C cast, or refuse it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "python-ext")]
use pyo3::prelude::*;

use crate::error::{BindError, Result};

/// Environment variable consulted by [`BindingConfig::from_env`].
pub const TRUNCATION_ENV: &str = "NALT_BIND_TRUNCATION";

/// What to do when a setter value is wider than its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "python-ext", pyclass(eq, eq_int))]
pub enum TruncationPolicy {
    /// Keep the low bits, two's complement (native cast semantics)
    #[default]
    Wrap,
    /// Fail the store and leave the descriptor untouched
    Reject,
}

impl fmt::Display for TruncationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TruncationPolicy::Wrap => write!(f, "wrap"),
            TruncationPolicy::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for TruncationPolicy {
    type Err = BindError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wrap" | "truncate" => Ok(TruncationPolicy::Wrap),
            "reject" | "strict" => Ok(TruncationPolicy::Reject),
            other => Err(BindError::Config(format!(
                "unknown truncation policy `{}` (expected `wrap` or `reject`)",
                other
            ))),
        }
    }
}

/// Binding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[cfg_attr(feature = "python-ext", pyclass)]
pub struct BindingConfig {
    /// Setter behaviour for out-of-range values.
    pub truncation: TruncationPolicy,
    /// Emit a `warn` event whenever a wrapped store loses bits.
    pub log_truncation: bool,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            truncation: TruncationPolicy::Wrap,
            log_truncation: true,
        }
    }
}

impl BindingConfig {
    /// Strict configuration: oversized values are rejected.
    pub fn strict() -> Self {
        Self {
            truncation: TruncationPolicy::Reject,
            ..Self::default()
        }
    }

    /// Defaults, with the truncation policy overridden by
    /// `NALT_BIND_TRUNCATION` when it is set.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(TRUNCATION_ENV) {
            config.truncation = raw.parse()?;
        }
        Ok(config)
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON string. Missing keys take their defaults.
    pub fn from_json(json_str: &str) -> Result<Self> {
        Ok(serde_json::from_str(json_str)?)
    }
}

#[cfg(feature = "python-ext")]
#[pymethods]
impl BindingConfig {
    #[new]
    #[pyo3(signature = (truncation=TruncationPolicy::Wrap, log_truncation=true))]
    fn new_py(truncation: TruncationPolicy, log_truncation: bool) -> Self {
        Self {
            truncation,
            log_truncation,
        }
    }

    #[staticmethod]
    #[pyo3(name = "from_env")]
    fn from_env_py() -> PyResult<Self> {
        Ok(Self::from_env()?)
    }

    #[getter]
    fn get_truncation(&self) -> TruncationPolicy {
        self.truncation
    }

    #[setter]
    fn set_truncation(&mut self, value: TruncationPolicy) {
        self.truncation = value;
    }

    #[getter]
    fn get_log_truncation(&self) -> bool {
        self.log_truncation
    }

    #[setter]
    fn set_log_truncation(&mut self, value: bool) {
        self.log_truncation = value;
    }

    fn __repr__(&self) -> String {
        format!(
            "BindingConfig(truncation='{}', log_truncation={})",
            self.truncation, self.log_truncation
        )
    }
}
