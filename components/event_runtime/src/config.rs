//! Runtime configuration.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes:
//!
//! ```
//! use event_runtime::{ClockKind, ErrorPolicy, RuntimeConfig};
//!
//! let config = RuntimeConfig::from_json(r#"{ "clock": "virtual", "error_policy": "abort" }"#).unwrap();
//! assert_eq!(config.clock, ClockKind::Virtual);
//! assert_eq!(config.error_policy, ErrorPolicy::Abort);
//! assert_eq!(config.name, "main");
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Which clock a loop built from a config uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockKind {
    /// Monotonic wall clock; idle waits block the thread.
    #[default]
    System,
    /// Manually advanced clock; idle waits jump to the next deadline.
    Virtual,
}

/// What the loop does when a task or microtask callback returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Log, record a diagnostic and keep running.
    #[default]
    Report,
    /// Stop and return the error from the running loop method.
    Abort,
}

/// Settings for one event loop (one agent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Agent label used in log lines
    pub name: String,
    /// Clock used for task readiness
    pub clock: ClockKind,
    /// Handling of uncaught callback errors
    pub error_policy: ErrorPolicy,
    /// Whether unhandled rejections are tracked and reported
    pub track_unhandled_rejections: bool,
    /// Maximum microtasks a single drain may run; `None` means unbounded
    pub microtask_budget: Option<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            name: "main".to_string(),
            clock: ClockKind::System,
            error_policy: ErrorPolicy::Report,
            track_unhandled_rejections: true,
            microtask_budget: None,
        }
    }
}

impl RuntimeConfig {
    /// Parses a config from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the config as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Config with a virtual clock, the usual choice for deterministic tests.
    pub fn virtual_time() -> Self {
        Self {
            clock: ClockKind::Virtual,
            ..Self::default()
        }
    }
}
