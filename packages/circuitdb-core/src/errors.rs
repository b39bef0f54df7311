//! Error types for circuitdb-core
//!
//! Provides unified error handling across the crate.

use thiserror::Error;

use crate::config::ConfigError;

/// Main error type for circuitdb operations
#[derive(Debug, Error)]
pub enum CircuitDbError {
    /// Caller-supplied data violates an ordering/uniqueness rule, or a name is malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A required cross-field precondition is missing (e.g. no technology on a cell)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Structural invariant broken (reported by the checker)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// A usage references an export that no longer exists in the subcell
    #[error("Dangling reference: {0}")]
    DanglingReference(String),

    /// A serialized key could not be resolved to a live handle
    #[error("Invalid object state: {0}")]
    InvalidObjectState(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Metrics registration failed
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl CircuitDbError {
    /// Create an invalid-argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        CircuitDbError::InvalidArgument(msg.into())
    }

    /// Create an invalid-state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        CircuitDbError::InvalidState(msg.into())
    }

    /// Create an invariant violation
    pub fn invariant(msg: impl Into<String>) -> Self {
        CircuitDbError::InvariantViolation(msg.into())
    }

    /// Create a dangling-reference error
    pub fn dangling(msg: impl Into<String>) -> Self {
        CircuitDbError::DanglingReference(msg.into())
    }

    /// Create an invalid-object-state error (unresolvable key)
    pub fn invalid_object_state(msg: impl Into<String>) -> Self {
        CircuitDbError::InvalidObjectState(msg.into())
    }

    /// Short machine-readable name of the error kind
    pub fn kind_str(&self) -> &'static str {
        match self {
            CircuitDbError::InvalidArgument(_) => "invalid_argument",
            CircuitDbError::InvalidState(_) => "invalid_state",
            CircuitDbError::InvariantViolation(_) => "invariant_violation",
            CircuitDbError::DanglingReference(_) => "dangling_reference",
            CircuitDbError::InvalidObjectState(_) => "invalid_object_state",
            CircuitDbError::Config(_) => "config",
            CircuitDbError::Metrics(_) => "metrics",
        }
    }
}

/// Result type alias for circuitdb operations
pub type Result<T> = std::result::Result<T, CircuitDbError>;

/// Return an `InvariantViolation` from the enclosing function unless `cond` holds.
macro_rules! ensure_invariant {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::errors::CircuitDbError::invariant(format!($($arg)+)));
        }
    };
}

pub(crate) use ensure_invariant;
