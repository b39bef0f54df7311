//! Configuration System
//!
//! Two tiers, same as the rest of the engine:
//! - Level 1: Preset (`production` / `debug`)
//! - Level 2: YAML v1 file with field overrides
//!
//! # Examples
//!
//! ```rust,ignore
//! use circuitdb_core::config::{DatabaseConfig, Preset};
//!
//! let config = DatabaseConfig::preset(Preset::Debug).undo_depth(20).build()?;
//! let config = DatabaseConfig::from_yaml("session.yaml")?;
//! ```

pub mod database_config;
pub mod error;
pub mod preset;
pub mod validation;

// Re-exports
pub use database_config::{DatabaseConfig, MAX_UNDO_DEPTH};
pub use error::{ConfigError, ConfigResult};
pub use preset::Preset;
pub use validation::Validatable;
