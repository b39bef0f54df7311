/*
 * CircuitDB Core - Versioned Circuit Design Database
 *
 * Feature-First Architecture:
 * - shared/      : Value types (Name, geometry, variables) and bitsets
 * - features/    : identity → technology → records → usage → snapshot → database
 * - config/      : Presets + YAML overrides
 *
 * Snapshot model:
 * - Immutable cell backups behind Arc, structurally shared between versions
 * - Incremental `with(...)` updates, O(changed) instead of O(n) copies
 * - Lazy memoization, rayon-parallel self-checks
 */

#![allow(clippy::too_many_arguments)] // with(...) mirrors the snapshot fields
#![allow(clippy::type_complexity)] // Arc<[Option<Arc<..>>]> sequences
#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::unnecessary_map_or)] // map_or style for compatibility

pub mod config;
pub mod errors;
pub mod features;
pub mod shared;

pub use errors::{CircuitDbError, Result};

// Feature re-exports
pub use features::database::{Database, DatabaseMetrics};
pub use features::identity::{
    ArcId, ArcProtoId, CellId, CellKey, CellUsage, ExportId, ExportKey, IdManager, NodeId,
    NodeProtoId, PortProtoId, PrimitiveNodeId, PrimitivePortId, ResolvableRef, TechId,
    MAX_INSTANCE_ID,
};
pub use features::records::{
    ArcEnd, ImmutableArcInst, ImmutableCell, ImmutableExport, ImmutableNodeInst,
    PortCharacteristic,
};
pub use features::snapshot::{CellBackup, CellChange, DesignSnapshot, Memoization};
pub use features::technology::{TechPool, Technology};
pub use features::usage::CellUsageInfo;
pub use shared::models::{Name, Orientation, Point, Rect};
