//! Test fixtures: a registry plus a small technology

use std::sync::Arc;

use circuitdb_core::{
    ArcProtoId, CellBackup, CellId, IdManager, ImmutableCell, Name, PortProtoId, PrimitiveNodeId, TechId,
    TechPool, Technology,
};

pub struct Fixture {
    pub ids: Arc<IdManager>,
    pub tech: TechId,
    pub pool: Arc<TechPool>,
    /// One port `a`, wipes crossing arcs
    pub pin: PrimitiveNodeId,
    /// Ports `g`, `s`, `d`
    pub nmos: PrimitiveNodeId,
    pub center: PrimitiveNodeId,
    pub wire: ArcProtoId,
    /// Wipable
    pub unrouted: ArcProtoId,
}

impl Fixture {
    pub fn new() -> Self {
        let ids = Arc::new(IdManager::new());
        let tech = Technology::builder("test")
            .cell_center("center")
            .pin("pin", &["a"])
            .primitive("nmos", &["g", "s", "d"])
            .arc("wire")
            .wipable_arc("unrouted")
            .build(&ids)
            .unwrap();

        let tech_id = tech.id().clone();
        let pin = tech_id.find_primitive_node_id("pin").unwrap();
        let nmos = tech_id.find_primitive_node_id("nmos").unwrap();
        let center = tech_id.find_primitive_node_id("center").unwrap();
        let wire = tech_id.find_arc_proto_id("wire").unwrap();
        let unrouted = tech_id.find_arc_proto_id("unrouted").unwrap();

        Self {
            ids,
            tech: tech_id,
            pool: Arc::new(TechPool::new().with_tech(tech)),
            pin,
            nmos,
            center,
            wire,
            unrouted,
        }
    }

    pub fn pin_port(&self) -> PortProtoId {
        self.pin.port(0).unwrap().into()
    }

    pub fn nmos_port(&self, port: &str) -> PortProtoId {
        self.nmos.find_port(port).unwrap().into()
    }

    pub fn cell_record(&self, cell_id: &CellId) -> Arc<ImmutableCell> {
        Arc::new(
            ImmutableCell::new(
                cell_id.clone(),
                Name::new(&cell_id.key().cell_name).unwrap(),
                1_700_000_000_000,
            )
            .with_tech(self.tech.clone()),
        )
    }

    /// New cell `lib:name` and its empty backup
    pub fn cell(&self, name: &str) -> (CellId, Arc<CellBackup>) {
        let cell_id = self.ids.new_cell_id("lib", name).unwrap();
        let record = (*self.cell_record(&cell_id)).clone();
        let backup = CellBackup::empty(record, Arc::clone(&self.pool)).unwrap();
        (cell_id, backup)
    }
}
