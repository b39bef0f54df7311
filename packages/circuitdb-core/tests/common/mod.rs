//! Common test utilities for circuitdb-core
//!
//! Shared fixtures, builders and assertions for integration tests.

#![allow(dead_code, unused_imports)]

mod assertions;
mod builders;
mod fixtures;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
