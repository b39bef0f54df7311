//! Technology-side identity handles: technologies, primitive node
//! prototypes (with their fixed port lists) and arc prototypes.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::errors::{CircuitDbError, Result};

/// Technology handle (identity semantics)
#[derive(Clone)]
pub struct TechId(Arc<TechIdData>);

struct TechIdData {
    name: Arc<str>,
    tech_index: u32,
    primitives: RwLock<Vec<PrimitiveNodeId>>,
    arc_protos: RwLock<Vec<ArcProtoId>>,
}

impl TechId {
    pub(crate) fn new(name: &str, tech_index: u32) -> Self {
        Self(Arc::new(TechIdData {
            name: Arc::from(name),
            tech_index,
            primitives: RwLock::new(Vec::new()),
            arc_protos: RwLock::new(Vec::new()),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Chronological index within the registry
    pub fn tech_index(&self) -> u32 {
        self.0.tech_index
    }

    /// Get or create the primitive prototype `name`.
    ///
    /// An existing prototype must have been declared with the same port names.
    pub fn get_or_create_primitive_node_id(&self, name: &str, ports: &[&str]) -> Result<PrimitiveNodeId> {
        if name.is_empty() {
            return Err(CircuitDbError::invalid_argument(format!(
                "primitive node name in technology {} must not be empty",
                self.name()
            )));
        }
        if ports.iter().any(|p| p.is_empty()) {
            return Err(CircuitDbError::invalid_argument(format!(
                "primitive {}:{} has an empty port name",
                self.name(),
                name
            )));
        }

        let mut primitives = self.0.primitives.write();
        if let Some(existing) = primitives.iter().find(|p| p.name() == name) {
            let same_ports = existing.0.port_names.len() == ports.len()
                && existing.0.port_names.iter().zip(ports).all(|(a, b)| &**a == *b);
            if !same_ports {
                return Err(CircuitDbError::invalid_argument(format!(
                    "primitive {}:{} redeclared with different ports",
                    self.name(),
                    name
                )));
            }
            return Ok(existing.clone());
        }

        let id = PrimitiveNodeId(Arc::new(PrimitiveNodeIdData {
            tech_index: self.tech_index(),
            chron_index: primitives.len() as u32,
            name: Arc::from(name),
            full_name: Arc::from(format!("{}:{}", self.name(), name)),
            port_names: ports.iter().map(|p| Arc::from(*p)).collect(),
        }));
        tracing::debug!("registered primitive {}", id.full_name());
        primitives.push(id.clone());
        Ok(id)
    }

    /// Get or create the arc prototype `name`
    pub fn get_or_create_arc_proto_id(&self, name: &str) -> Result<ArcProtoId> {
        if name.is_empty() {
            return Err(CircuitDbError::invalid_argument(format!(
                "arc prototype name in technology {} must not be empty",
                self.name()
            )));
        }

        let mut arcs = self.0.arc_protos.write();
        if let Some(existing) = arcs.iter().find(|a| a.name() == name) {
            return Ok(existing.clone());
        }
        let id = ArcProtoId(Arc::new(ArcProtoIdData {
            tech_index: self.tech_index(),
            chron_index: arcs.len() as u32,
            name: Arc::from(name),
            full_name: Arc::from(format!("{}:{}", self.name(), name)),
        }));
        arcs.push(id.clone());
        Ok(id)
    }

    pub fn find_primitive_node_id(&self, name: &str) -> Option<PrimitiveNodeId> {
        self.0.primitives.read().iter().find(|p| p.name() == name).cloned()
    }

    pub fn find_arc_proto_id(&self, name: &str) -> Option<ArcProtoId> {
        self.0.arc_protos.read().iter().find(|a| a.name() == name).cloned()
    }

    pub fn num_primitive_node_ids(&self) -> usize {
        self.0.primitives.read().len()
    }

    pub fn num_arc_proto_ids(&self) -> usize {
        self.0.arc_protos.read().len()
    }
}

impl PartialEq for TechId {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TechId {}

impl Hash for TechId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.tech_index.hash(state);
    }
}

impl fmt::Debug for TechId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TechId({})", self.name())
    }
}

/// Primitive node prototype handle
#[derive(Clone)]
pub struct PrimitiveNodeId(Arc<PrimitiveNodeIdData>);

struct PrimitiveNodeIdData {
    tech_index: u32,
    chron_index: u32,
    name: Arc<str>,
    full_name: Arc<str>,
    port_names: Vec<Arc<str>>,
}

impl PrimitiveNodeId {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// `tech:name`
    pub fn full_name(&self) -> &str {
        &self.0.full_name
    }

    pub fn tech_index(&self) -> u32 {
        self.0.tech_index
    }

    pub fn chron_index(&self) -> u32 {
        self.0.chron_index
    }

    pub fn num_ports(&self) -> usize {
        self.0.port_names.len()
    }

    pub fn port(&self, chron_index: u32) -> Option<PrimitivePortId> {
        ((chron_index as usize) < self.num_ports()).then(|| PrimitivePortId {
            node: self.clone(),
            chron_index,
        })
    }

    pub fn find_port(&self, name: &str) -> Option<PrimitivePortId> {
        self.0
            .port_names
            .iter()
            .position(|p| &**p == name)
            .and_then(|i| self.port(i as u32))
    }

    pub fn ports(&self) -> impl Iterator<Item = PrimitivePortId> + '_ {
        (0..self.num_ports() as u32).filter_map(move |i| self.port(i))
    }
}

impl PartialEq for PrimitiveNodeId {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for PrimitiveNodeId {}

impl Hash for PrimitiveNodeId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.0.tech_index, self.0.chron_index).hash(state);
    }
}

impl fmt::Debug for PrimitiveNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrimitiveNodeId({})", self.full_name())
    }
}

/// Port of a primitive prototype: the prototype plus the port's position
/// in its declared port list
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PrimitivePortId {
    node: PrimitiveNodeId,
    chron_index: u32,
}

impl PrimitivePortId {
    pub fn node(&self) -> &PrimitiveNodeId {
        &self.node
    }

    pub fn chron_index(&self) -> u32 {
        self.chron_index
    }

    pub fn name(&self) -> &str {
        &self.node.0.port_names[self.chron_index as usize]
    }
}

impl fmt::Debug for PrimitivePortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrimitivePortId({}.{})", self.node.full_name(), self.name())
    }
}

/// Arc prototype handle
#[derive(Clone)]
pub struct ArcProtoId(Arc<ArcProtoIdData>);

struct ArcProtoIdData {
    tech_index: u32,
    chron_index: u32,
    name: Arc<str>,
    full_name: Arc<str>,
}

impl ArcProtoId {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn full_name(&self) -> &str {
        &self.0.full_name
    }

    pub fn tech_index(&self) -> u32 {
        self.0.tech_index
    }

    pub fn chron_index(&self) -> u32 {
        self.0.chron_index
    }
}

impl PartialEq for ArcProtoId {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ArcProtoId {}

impl Hash for ArcProtoId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.0.tech_index, self.0.chron_index).hash(state);
    }
}

impl fmt::Debug for ArcProtoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArcProtoId({})", self.full_name())
    }
}
