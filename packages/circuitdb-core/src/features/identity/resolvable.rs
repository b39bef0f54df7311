//! Serialized identity keys
//!
//! Streams carry compact keys instead of handles. Reading resolves a key back
//! to the canonical live handle through the registry; a key the registry
//! does not know fails with `InvalidObjectState` instead of fabricating a
//! disconnected handle.

use std::sync::Arc;

use super::cell_id::{CellId, CellKey, ExportId};
use super::id_manager::IdManager;
use super::tech_ids::{ArcProtoId, PrimitiveNodeId, PrimitivePortId, TechId};
use crate::errors::{CircuitDbError, Result};

/// A key that resolves to a live handle of type `T`
pub trait ResolvableRef<T> {
    fn resolve(&self, ids: &IdManager) -> Result<T>;
}

impl ResolvableRef<CellId> for CellKey {
    fn resolve(&self, ids: &IdManager) -> Result<CellId> {
        ids.find_cell_id(self)
            .ok_or_else(|| CircuitDbError::invalid_object_state(format!("unknown cell {}", self)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExportKey {
    pub cell: CellKey,
    pub chron_index: u32,
}

impl ExportKey {
    pub fn of(parent: &CellId, export: &ExportId) -> Self {
        Self {
            cell: parent.key().clone(),
            chron_index: export.chron_index(),
        }
    }
}

impl ResolvableRef<ExportId> for ExportKey {
    fn resolve(&self, ids: &IdManager) -> Result<ExportId> {
        let cell = self.cell.resolve(ids)?;
        cell.export_id(self.chron_index).ok_or_else(|| {
            CircuitDbError::invalid_object_state(format!(
                "unknown export #{} in cell {}",
                self.chron_index, self.cell
            ))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TechKey {
    pub tech_name: Arc<str>,
}

impl TechKey {
    pub fn of(tech: &TechId) -> Self {
        Self {
            tech_name: Arc::from(tech.name()),
        }
    }
}

impl ResolvableRef<TechId> for TechKey {
    fn resolve(&self, ids: &IdManager) -> Result<TechId> {
        ids.find_tech_id(&self.tech_name).ok_or_else(|| {
            CircuitDbError::invalid_object_state(format!("unknown technology {}", self.tech_name))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrimitiveNodeKey {
    pub tech: TechKey,
    pub name: Arc<str>,
}

impl PrimitiveNodeKey {
    pub fn of(ids: &IdManager, node: &PrimitiveNodeId) -> Result<Self> {
        let tech = ids.tech_id(node.tech_index()).ok_or_else(|| {
            CircuitDbError::invalid_object_state(format!("{:?} has no registered technology", node))
        })?;
        Ok(Self {
            tech: TechKey::of(&tech),
            name: Arc::from(node.name()),
        })
    }
}

impl ResolvableRef<PrimitiveNodeId> for PrimitiveNodeKey {
    fn resolve(&self, ids: &IdManager) -> Result<PrimitiveNodeId> {
        self.tech
            .resolve(ids)?
            .find_primitive_node_id(&self.name)
            .ok_or_else(|| {
                CircuitDbError::invalid_object_state(format!(
                    "unknown primitive {}:{}",
                    self.tech.tech_name, self.name
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrimitivePortKey {
    pub node: PrimitiveNodeKey,
    pub chron_index: u32,
}

impl ResolvableRef<PrimitivePortId> for PrimitivePortKey {
    fn resolve(&self, ids: &IdManager) -> Result<PrimitivePortId> {
        let node = self.node.resolve(ids)?;
        node.port(self.chron_index).ok_or_else(|| {
            CircuitDbError::invalid_object_state(format!(
                "unknown port #{} on {}",
                self.chron_index,
                node.full_name()
            ))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArcProtoKey {
    pub tech: TechKey,
    pub name: Arc<str>,
}

impl ArcProtoKey {
    pub fn of(ids: &IdManager, proto: &ArcProtoId) -> Result<Self> {
        let tech = ids.tech_id(proto.tech_index()).ok_or_else(|| {
            CircuitDbError::invalid_object_state(format!("{:?} has no registered technology", proto))
        })?;
        Ok(Self {
            tech: TechKey::of(&tech),
            name: Arc::from(proto.name()),
        })
    }
}

impl ResolvableRef<ArcProtoId> for ArcProtoKey {
    fn resolve(&self, ids: &IdManager) -> Result<ArcProtoId> {
        self.tech
            .resolve(ids)?
            .find_arc_proto_id(&self.name)
            .ok_or_else(|| {
                CircuitDbError::invalid_object_state(format!(
                    "unknown arc prototype {}:{}",
                    self.tech.tech_name, self.name
                ))
            })
    }
}
