//! Identity registry
//!
//! Stable handles decoupled from mutable names. Every handle type compares
//! by identity; its chronological index never changes after creation.

mod cell_id;
mod id_manager;
mod proto;
mod resolvable;
mod tech_ids;

pub use cell_id::{CellId, CellKey, CellUsage, ExportId};
pub use id_manager::IdManager;
pub use proto::{ArcId, NodeId, NodeProtoId, PortProtoId, MAX_INSTANCE_ID};
pub use resolvable::{
    ArcProtoKey, ExportKey, PrimitiveNodeKey, PrimitivePortKey, ResolvableRef, TechKey,
};
pub use tech_ids::{ArcProtoId, PrimitiveNodeId, PrimitivePortId, TechId};
