//! Per-cell instance identities and prototype references.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::cell_id::{CellId, ExportId};
use super::tech_ids::{PrimitiveNodeId, PrimitivePortId};

/// Largest node or arc id a snapshot accepts.
///
/// Per-id lookup tables are dense, so an id bounds their size.
pub const MAX_INSTANCE_ID: u32 = (1 << 22) - 1;

/// Chronological id of a node instance within its parent cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Chronological id of an arc instance within its parent cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArcId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

impl fmt::Display for ArcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "arc#{}", self.0)
    }
}

/// Prototype of a node instance: a technology primitive or a subcell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeProtoId {
    Primitive(PrimitiveNodeId),
    Cell(CellId),
}

impl NodeProtoId {
    pub fn as_cell(&self) -> Option<&CellId> {
        match self {
            NodeProtoId::Cell(cell) => Some(cell),
            NodeProtoId::Primitive(_) => None,
        }
    }

    pub fn as_primitive(&self) -> Option<&PrimitiveNodeId> {
        match self {
            NodeProtoId::Primitive(p) => Some(p),
            NodeProtoId::Cell(_) => None,
        }
    }

    pub fn is_cell(&self) -> bool {
        matches!(self, NodeProtoId::Cell(_))
    }
}

impl From<PrimitiveNodeId> for NodeProtoId {
    fn from(id: PrimitiveNodeId) -> Self {
        NodeProtoId::Primitive(id)
    }
}

impl From<CellId> for NodeProtoId {
    fn from(id: CellId) -> Self {
        NodeProtoId::Cell(id)
    }
}

/// Port on a node prototype: a primitive port or a subcell export
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PortProtoId {
    Primitive(PrimitivePortId),
    Export(ExportId),
}

impl PortProtoId {
    /// Chronological index of the port within its prototype
    pub fn chron_index(&self) -> u32 {
        match self {
            PortProtoId::Primitive(p) => p.chron_index(),
            PortProtoId::Export(e) => e.chron_index(),
        }
    }

    pub fn as_export(&self) -> Option<&ExportId> {
        match self {
            PortProtoId::Export(e) => Some(e),
            PortProtoId::Primitive(_) => None,
        }
    }

    /// True when this port is declared by `proto`
    pub fn belongs_to(&self, proto: &NodeProtoId) -> bool {
        match (self, proto) {
            (PortProtoId::Primitive(port), NodeProtoId::Primitive(node)) => port.node() == node,
            (PortProtoId::Export(export), NodeProtoId::Cell(cell)) => export.is_in(cell),
            _ => false,
        }
    }
}

impl From<PrimitivePortId> for PortProtoId {
    fn from(id: PrimitivePortId) -> Self {
        PortProtoId::Primitive(id)
    }
}

impl From<ExportId> for PortProtoId {
    fn from(id: ExportId) -> Self {
        PortProtoId::Export(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::identity::{CellKey, TechId};

    #[test]
    fn test_port_belongs_to_proto() {
        let tech = TechId::new("generic", 0);
        let pin = tech.get_or_create_primitive_node_id("pin", &["p"]).unwrap();
        let other = tech.get_or_create_primitive_node_id("other", &["p"]).unwrap();
        let cell = CellId::new(CellKey::new("lib", "inv").unwrap(), 0);
        let export = cell.new_export_id("a").unwrap();

        let pin_port: PortProtoId = pin.port(0).unwrap().into();
        assert!(pin_port.belongs_to(&pin.clone().into()));
        assert!(!pin_port.belongs_to(&other.into()));
        assert!(!pin_port.belongs_to(&cell.clone().into()));

        let export_port: PortProtoId = export.into();
        assert!(export_port.belongs_to(&cell.into()));
        assert!(!export_port.belongs_to(&pin.into()));
        assert_eq!(export_port.chron_index(), 0);
    }

    #[test]
    fn test_ids_order_numerically() {
        assert!(NodeId(2) < NodeId(10));
        assert_eq!(ArcId(7).to_string(), "arc#7");
    }
}
