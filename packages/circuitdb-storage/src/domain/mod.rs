//! Domain layer for cell snapshot persistence
//!
//! # Core Principles
//!
//! 1. **Keys, not handles**: streams carry names and chronological indices.
//!    Reading resolves them back to the canonical handles of a registry.
//! 2. **Rebuild, don't trust**: a decoded cell goes through
//!    `CellBackup::empty(..).with(..)`, so every loaded snapshot has passed
//!    the same validation as an edit.
//! 3. **Single record**: one stream holds one cell snapshot. No checksums or
//!    format versioning beyond what the cell record itself carries.
//!
//! # Stream Layout
//!
//! All integers little-endian. Strings are `u32` byte length + UTF-8.
//!
//! ```text
//! tech table    u32 count, then per technology: name
//! cell table    u32 count, then per cell: lib, cell, u32 n, n export external ids
//!               (slot 0 is the snapshot's own cell)
//! cell record   name, u8 has_tech [u32 tech slot], i64 created, i64 revised,
//!               u32 flags, vars
//! header        i64 revision, u8 modified
//! nodes         u32 count, node records
//! arcs          u32 count, arc records
//! exports       u32 count, export records
//! history       u32 defined exports length (chronological indices below it
//!               without a live export are deleted)
//! ```
//!
//! Primitive nodes, primitive ports and arc prototypes are written as
//! `(tech slot, name)` / `(tech slot, name, port index)` and resolved by
//! name on read. Subcells and their exports are written as cell-table slots.
//!
//! # Port Trait
//!
//! - `SnapshotStore`: named cell snapshots in some backing store

use std::sync::Arc;

use circuitdb_core::CellBackup;

use crate::Result;

/// Named cell snapshot storage
///
/// Implementations decide where bytes live; encoding is shared through
/// [`crate::infrastructure::SnapshotWriter`] and
/// [`crate::infrastructure::SnapshotReader`].
///
/// # Examples
///
/// ```rust,ignore
/// use circuitdb_storage::{FileSnapshotStore, SnapshotStore};
///
/// let store = FileSnapshotStore::new("/tmp/snapshots", ids, pool)?;
/// store.save("inv", &backup)?;
/// let restored = store.load("inv")?;
/// restored.check()?;
/// ```
pub trait SnapshotStore {
    /// Persist `backup` under `name`, replacing any previous snapshot
    fn save(&self, name: &str, backup: &CellBackup) -> Result<()>;

    /// Load and rebuild the snapshot stored under `name`
    fn load(&self, name: &str) -> Result<Arc<CellBackup>>;

    fn exists(&self, name: &str) -> Result<bool>;

    /// Stored snapshot names, sorted
    fn list(&self) -> Result<Vec<String>>;

    /// Remove `name`; returns false if it did not exist
    fn delete(&self, name: &str) -> Result<bool>;
}
