//! Runtime Configuration
//!
//! Knobs that decide how the runtime behaves when a subscriber misbehaves.
//! Configuration can be built in code or loaded from JSON:
//!
//! ```rust,ignore
//! let config = RuntimeConfig::from_json(r#"{ "max_depth": 64, "failure_policy": "propagate" }"#)?;
//! let runtime = Runtime::builder().config(config).build()?;
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ReactiveError, Result};

/// Default limit on nested subscriber runs.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// What a notification pass does when one of its subscribers fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the failure and keep notifying the remaining subscribers.
    #[default]
    Isolate,

    /// Stop the pass at the first failure and hand it to the writer.
    Propagate,
}

/// Configuration for a [`Runtime`](crate::reactive::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Maximum context-stack depth a subscriber run may reach.
    pub max_depth: usize,

    /// How failures inside a notification pass are handled.
    pub failure_policy: FailurePolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate a configuration from JSON. Missing fields take
    /// their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ReactiveError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the runtime cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(ReactiveError::InvalidConfig(
                "max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
