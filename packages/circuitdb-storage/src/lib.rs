//! CircuitDB Storage - Binary persistence for cell snapshots
//!
//! > Save a cell snapshot as keys, load it back as live handles.
//!
//! ## Core Principles
//!
//! 1. **Registry-relative**: handles are never written; technology, primitive
//!    and arc prototypes travel by name, cells and exports by library/cell
//!    name plus chronological index
//! 2. **Explicit resolution**: a key that does not resolve fails with a
//!    `resolution` error, it never becomes a disconnected handle
//! 3. **Validated on load**: decoded records are replayed through
//!    `CellBackup::with`, so a loaded snapshot always passes `check()`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use circuitdb_storage::{FileSnapshotStore, SnapshotReader, SnapshotStore, SnapshotWriter};
//!
//! // 1. In-memory round trip
//! let bytes = SnapshotWriter::new(&ids).to_bytes(&backup)?;
//! let restored = SnapshotReader::new(&ids, pool.clone()).from_bytes(&bytes)?;
//!
//! // 2. Named snapshots on disk
//! let store = FileSnapshotStore::new("snapshots", ids.clone(), pool.clone())?;
//! store.save("inv", &backup)?;
//! let restored = store.load("inv")?;
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{ErrorKind, Result, StorageError};

pub use domain::SnapshotStore;
pub use infrastructure::{FileSnapshotStore, SnapshotReader, SnapshotWriter};
