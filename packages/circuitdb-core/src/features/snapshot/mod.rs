//! Cell and design snapshots
//!
//! - `cell_backup`: immutable per-cell snapshot and its incremental update
//! - `memoization`: lazily built connectivity / export / wipe tables
//! - `checker`: full structural audit of a cell snapshot
//! - `design`: whole-design snapshot with cross-cell checks

mod cell_backup;
mod checker;
mod design;
mod memoization;

pub use cell_backup::CellBackup;
pub use design::{CellChange, DesignSnapshot};
pub use memoization::Memoization;
