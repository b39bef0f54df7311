//! Preset configurations
//!
//! Presets provide complete default configurations for common use cases.

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Configuration preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Hot path: no checker on commit, lazy memoization
    ///
    /// - undo_depth=100
    /// - check_on_commit=false
    Production,

    /// Tests and debug builds: full invariant audit on every commit
    ///
    /// - undo_depth=100
    /// - check_on_commit=true
    /// - eager_memoization=true (memoization self-check runs too)
    Debug,
}

impl Preset {
    /// Parse preset from string
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "debug" => Ok(Self::Debug),
            _ => Err(ConfigError::UnknownPreset(s.to_string())),
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Debug => "debug",
        }
    }
}

impl Default for Preset {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Production
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
