//! Runtime Configuration
//!
//! Settings are fixed when a [`Runtime`](crate::Runtime) is created. They can
//! be built in code or loaded from JSON; missing fields take their defaults.
//!
//! ```rust
//! use ripple_core::config::{ObservationMode, RuntimeConfig};
//!
//! let config = RuntimeConfig::from_json_str(r#"{ "mode": "eager" }"#).unwrap();
//! assert_eq!(config.mode, ObservationMode::Eager);
//! assert!(config.trigger_on_delete);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// When nested containers get wrapped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationMode {
    /// Wrap a nested container the first time it is read.
    #[default]
    Lazy,
    /// Wrap every reachable container when the root is observed, and every
    /// container as it is written.
    ///
    /// Eager wrapping only registers containers in the identity map ahead of
    /// time. Tracking still goes through handles made when a value is read,
    /// so reactions behave exactly as in lazy mode; the only visible
    /// difference is [`Runtime::observed_count`](crate::Runtime::observed_count).
    Eager,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub mode: ObservationMode,

    /// Whether deleting a record field notifies its readers.
    pub trigger_on_delete: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mode: ObservationMode::Lazy,
            trigger_on_delete: true,
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: ObservationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_trigger_on_delete(mut self, trigger: bool) -> Self {
        self.trigger_on_delete = trigger;
        self
    }

    /// Parse a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn defaults_are_lazy_and_trigger_on_delete() {
        let config = RuntimeConfig::default();
        assert_eq!(config.mode, ObservationMode::Lazy);
        assert!(config.trigger_on_delete);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = RuntimeConfig::from_json_str(r#"{ "trigger_on_delete": false }"#).unwrap();
        assert_eq!(config, RuntimeConfig::new().with_trigger_on_delete(false));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = RuntimeConfig::from_json_str(r#"{ "mode": "sometimes" }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = RuntimeConfig::new().with_mode(ObservationMode::Eager);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(RuntimeConfig::from_json_str(&json).unwrap(), config);
    }
}
