//! Runtime configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ReactiveError, Result};

/// Default bound on how deeply a single effect may re-enter itself.
pub const DEFAULT_MAX_EFFECT_DEPTH: usize = 64;

/// Tunables for a [`Runtime`](crate::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// How many invocations of the same effect may be on the call stack at
    /// once before the next one fails with
    /// [`ReactiveError::RecursionLimitExceeded`].
    pub max_effect_depth: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_effect_depth: DEFAULT_MAX_EFFECT_DEPTH,
        }
    }
}

impl RuntimeConfig {
    /// Set the re-entrancy bound.
    pub fn with_max_effect_depth(mut self, depth: usize) -> Self {
        self.max_effect_depth = depth;
        self
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the runtime cannot operate under.
    pub fn validate(&self) -> Result<()> {
        if self.max_effect_depth == 0 {
            return Err(ReactiveError::invalid(
                "max_effect_depth must be at least 1",
            ));
        }
        Ok(())
    }
}
