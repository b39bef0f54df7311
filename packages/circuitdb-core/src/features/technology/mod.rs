//! Technology pool
//!
//! The core only needs a narrow view of a technology: which primitives exist,
//! which of them is the cell-center marker, which ones suppress arc drawing
//! when one or two arcs cross them, and which arc prototypes are wipable.
//! Layers, shapes and design rules belong to the technology libraries.

use std::sync::Arc;

use crate::errors::{CircuitDbError, Result};
use crate::features::identity::{ArcProtoId, IdManager, NodeProtoId, PrimitiveNodeId, TechId};

/// Primitive node prototype as seen by the database
#[derive(Debug, Clone)]
pub struct PrimitiveNode {
    pub id: PrimitiveNodeId,
    /// Marks the cell's origin; at most one instance per cell
    pub cell_center: bool,
    /// Arcs are not drawn through the node when one or two connect to it
    pub wipe_on_1or2: bool,
}

/// Arc prototype as seen by the database
#[derive(Debug, Clone)]
pub struct ArcProto {
    pub id: ArcProtoId,
    pub wipable: bool,
}

#[derive(Debug)]
pub struct Technology {
    id: TechId,
    primitives: Vec<Option<PrimitiveNode>>,
    arcs: Vec<Option<ArcProto>>,
}

impl Technology {
    pub fn builder(name: &str) -> TechnologyBuilder {
        TechnologyBuilder::new(name)
    }

    /// The generic technology every design can fall back to
    pub fn generic(ids: &IdManager) -> Result<Technology> {
        Technology::builder("generic")
            .cell_center("Facet-Center")
            .pin("Universal-Pin", &["univ"])
            .pin("Invisible-Pin", &["center"])
            .arc("Universal")
            .wipable_arc("Unrouted")
            .build(ids)
    }

    pub fn id(&self) -> &TechId {
        &self.id
    }

    pub fn primitive(&self, id: &PrimitiveNodeId) -> Option<&PrimitiveNode> {
        self.primitives
            .get(id.chron_index() as usize)?
            .as_ref()
            .filter(|p| p.id == *id)
    }

    pub fn find_primitive(&self, name: &str) -> Option<&PrimitiveNode> {
        self.primitives.iter().flatten().find(|p| p.id.name() == name)
    }

    pub fn arc_proto(&self, id: &ArcProtoId) -> Option<&ArcProto> {
        self.arcs
            .get(id.chron_index() as usize)?
            .as_ref()
            .filter(|a| a.id == *id)
    }

    pub fn find_arc_proto(&self, name: &str) -> Option<&ArcProto> {
        self.arcs.iter().flatten().find(|a| a.id.name() == name)
    }

    pub fn primitives(&self) -> impl Iterator<Item = &PrimitiveNode> {
        self.primitives.iter().flatten()
    }

    pub fn arc_protos(&self) -> impl Iterator<Item = &ArcProto> {
        self.arcs.iter().flatten()
    }
}

enum Entry {
    Primitive {
        name: String,
        ports: Vec<String>,
        cell_center: bool,
        wipe_on_1or2: bool,
    },
    Arc {
        name: String,
        wipable: bool,
    },
}

/// Declarative technology description, registered on `build`
pub struct TechnologyBuilder {
    name: String,
    entries: Vec<Entry>,
}

impl TechnologyBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn primitive(mut self, name: &str, ports: &[&str]) -> Self {
        self.push_primitive(name, ports, false, false);
        self
    }

    /// Pin-like primitive that wipes arcs crossing it
    pub fn pin(mut self, name: &str, ports: &[&str]) -> Self {
        self.push_primitive(name, ports, false, true);
        self
    }

    /// Port-less cell-center marker
    pub fn cell_center(mut self, name: &str) -> Self {
        self.push_primitive(name, &[], true, false);
        self
    }

    pub fn arc(mut self, name: &str) -> Self {
        self.entries.push(Entry::Arc {
            name: name.to_string(),
            wipable: false,
        });
        self
    }

    pub fn wipable_arc(mut self, name: &str) -> Self {
        self.entries.push(Entry::Arc {
            name: name.to_string(),
            wipable: true,
        });
        self
    }

    fn push_primitive(&mut self, name: &str, ports: &[&str], cell_center: bool, wipe: bool) {
        self.entries.push(Entry::Primitive {
            name: name.to_string(),
            ports: ports.iter().map(|p| p.to_string()).collect(),
            cell_center,
            wipe_on_1or2: wipe,
        });
    }

    /// Register every declared prototype in `ids` and assemble the technology.
    ///
    /// Building the same description twice yields the same handles, so a
    /// technology can be rebuilt after its ids were restored from a stream.
    pub fn build(self, ids: &IdManager) -> Result<Technology> {
        let id = ids.get_or_create_tech_id(&self.name)?;
        let mut primitives: Vec<Option<PrimitiveNode>> = Vec::new();
        let mut arcs: Vec<Option<ArcProto>> = Vec::new();

        for entry in self.entries {
            match entry {
                Entry::Primitive {
                    name,
                    ports,
                    cell_center,
                    wipe_on_1or2,
                } => {
                    let port_refs: Vec<&str> = ports.iter().map(String::as_str).collect();
                    let node_id = id.get_or_create_primitive_node_id(&name, &port_refs)?;
                    let slot = node_id.chron_index() as usize;
                    if primitives.len() <= slot {
                        primitives.resize(slot + 1, None);
                    }
                    if primitives[slot].is_some() {
                        return Err(CircuitDbError::invalid_argument(format!(
                            "primitive {} declared twice in {}",
                            name, self.name
                        )));
                    }
                    primitives[slot] = Some(PrimitiveNode {
                        id: node_id,
                        cell_center,
                        wipe_on_1or2,
                    });
                }
                Entry::Arc { name, wipable } => {
                    let arc_id = id.get_or_create_arc_proto_id(&name)?;
                    let slot = arc_id.chron_index() as usize;
                    if arcs.len() <= slot {
                        arcs.resize(slot + 1, None);
                    }
                    if arcs[slot].is_some() {
                        return Err(CircuitDbError::invalid_argument(format!(
                            "arc prototype {} declared twice in {}",
                            name, self.name
                        )));
                    }
                    arcs[slot] = Some(ArcProto { id: arc_id, wipable });
                }
            }
        }

        if primitives.iter().flatten().filter(|p| p.cell_center).count() > 1 {
            return Err(CircuitDbError::invalid_argument(format!(
                "technology {} declares more than one cell-center primitive",
                self.name
            )));
        }

        tracing::debug!(
            "built technology {} with {} primitives and {} arc prototypes",
            self.name,
            primitives.iter().flatten().count(),
            arcs.iter().flatten().count()
        );
        Ok(Technology {
            id,
            primitives,
            arcs,
        })
    }
}

/// Immutable set of technologies indexed by tech index.
///
/// Adding a technology produces a new pool; snapshots hold the pool they
/// were built against.
#[derive(Debug, Default, Clone)]
pub struct TechPool {
    techs: Vec<Option<Arc<Technology>>>,
}

impl TechPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tech(&self, tech: Technology) -> TechPool {
        let slot = tech.id().tech_index() as usize;
        let mut techs = self.techs.clone();
        if techs.len() <= slot {
            techs.resize(slot + 1, None);
        }
        techs[slot] = Some(Arc::new(tech));
        TechPool { techs }
    }

    pub fn tech(&self, id: &TechId) -> Option<&Arc<Technology>> {
        self.techs
            .get(id.tech_index() as usize)?
            .as_ref()
            .filter(|t| t.id() == id)
    }

    pub fn contains(&self, id: &TechId) -> bool {
        self.tech(id).is_some()
    }

    pub fn techs(&self) -> impl Iterator<Item = &Arc<Technology>> {
        self.techs.iter().flatten()
    }

    pub fn primitive(&self, id: &PrimitiveNodeId) -> Option<&PrimitiveNode> {
        self.techs
            .get(id.tech_index() as usize)?
            .as_ref()?
            .primitive(id)
    }

    pub fn arc_proto(&self, id: &ArcProtoId) -> Option<&ArcProto> {
        self.techs
            .get(id.tech_index() as usize)?
            .as_ref()?
            .arc_proto(id)
    }

    pub fn is_cell_center(&self, proto: &NodeProtoId) -> bool {
        match proto {
            NodeProtoId::Primitive(p) => self.primitive(p).map_or(false, |p| p.cell_center),
            NodeProtoId::Cell(_) => false,
        }
    }

    /// Prototype suppresses drawing of one or two crossing arcs
    pub fn is_wipe_on_1or2(&self, proto: &NodeProtoId) -> bool {
        match proto {
            NodeProtoId::Primitive(p) => self.primitive(p).map_or(false, |p| p.wipe_on_1or2),
            NodeProtoId::Cell(_) => false,
        }
    }

    pub fn is_wipable(&self, proto: &ArcProtoId) -> bool {
        self.arc_proto(proto).map_or(false, |a| a.wipable)
    }
}
