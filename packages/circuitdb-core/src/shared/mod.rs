//! Shared value types used across features

pub mod bitset;
pub mod models;

pub use bitset::{share_bits, BitSet};
