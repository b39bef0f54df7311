//! Shared setup for storage tests: a technology and a two-level design
#![allow(dead_code)]

use std::sync::Arc;

use circuitdb_core::features::records::{ArcList, ExportList, NodeList};
use circuitdb_core::shared::models::{VarValue, Variable};
use circuitdb_core::{
    ArcEnd, ArcId, CellBackup, CellId, IdManager, ImmutableArcInst, ImmutableCell, ImmutableExport,
    ImmutableNodeInst, Name, NodeId, NodeProtoId, Orientation, Point, PortCharacteristic,
    PortProtoId, TechId, TechPool, Technology,
};

pub fn name(s: &str) -> Name {
    Name::new(s).unwrap()
}

/// Registry plus the `test` technology, registered the same way every time
pub struct World {
    pub ids: Arc<IdManager>,
    pub tech: TechId,
    pub pool: Arc<TechPool>,
}

impl World {
    pub fn new() -> Self {
        let ids = Arc::new(IdManager::new());
        let tech = Technology::builder("test")
            .cell_center("center")
            .pin("pin", &["a"])
            .primitive("nmos", &["g", "s", "d"])
            .arc("wire")
            .build(&ids)
            .unwrap();
        let tech_id = tech.id().clone();
        Self {
            ids,
            tech: tech_id,
            pool: Arc::new(TechPool::new().with_tech(tech)),
        }
    }

    fn port(&self, proto: &str, port: &str) -> PortProtoId {
        self.tech
            .find_primitive_node_id(proto)
            .unwrap()
            .find_port(port)
            .unwrap()
            .into()
    }

    fn empty(&self, cell: &CellId, date: i64) -> Arc<CellBackup> {
        let record = ImmutableCell::new(cell.clone(), name(&cell.key().cell_name), date)
            .with_tech(self.tech.clone());
        CellBackup::empty(record, Arc::clone(&self.pool)).unwrap()
    }

    /// `lib:inv`: one pin exported as `a`
    pub fn inv(&self) -> Arc<CellBackup> {
        let cell = self.ids.get_or_create_cell_id("lib", "inv").unwrap();
        let a = self.ids.get_or_create_export_id(&cell, 0, "a").unwrap();
        let pin = self.tech.find_primitive_node_id("pin").unwrap();

        let empty = self.empty(&cell, 1_000);
        let nodes: NodeList = Arc::from(vec![Arc::new(ImmutableNodeInst::new(
            NodeId(0),
            pin.into(),
            name("p0"),
            Point::ORIGIN,
            Orientation::R0,
            Point::new(1, 1),
        ))]);
        let exports: ExportList = Arc::from(vec![Arc::new(
            ImmutableExport::new(a, name("a"), NodeId(0), self.port("pin", "a"))
                .with_characteristic(PortCharacteristic::Input),
        )]);
        empty
            .with(Arc::clone(empty.cell()), 1, false, Some(nodes), None, Some(exports))
            .unwrap()
    }

    /// `lib:top`: an nmos, a pin and an `inv` instance wired together,
    /// with `y` exported from the nmos drain and a deleted export slot
    pub fn top(&self) -> Arc<CellBackup> {
        let inv = self.ids.get_or_create_cell_id("lib", "inv").unwrap();
        let inv_a = self.ids.get_or_create_export_id(&inv, 0, "a").unwrap();
        let cell = self.ids.get_or_create_cell_id("lib", "top").unwrap();
        self.ids.get_or_create_export_id(&cell, 0, "old").unwrap();
        let y = self.ids.get_or_create_export_id(&cell, 1, "y").unwrap();

        let nmos = self.tech.find_primitive_node_id("nmos").unwrap();
        let pin = self.tech.find_primitive_node_id("pin").unwrap();
        let wire = self.tech.find_arc_proto_id("wire").unwrap();

        let record = ImmutableCell::new(cell.clone(), name("top"), 2_000)
            .with_tech(self.tech.clone())
            .with_revision_date(3_000)
            .with_flags(0x5)
            .with_var(Variable::new("author", VarValue::Text(Arc::from("ic"))))
            .with_var(Variable::new("scale", VarValue::Double(0.5)));
        let empty = CellBackup::empty(record.clone(), Arc::clone(&self.pool)).unwrap();

        let mut nodes = vec![
            ImmutableNodeInst::new(
                NodeId(0),
                nmos.into(),
                name("m1"),
                Point::new(10, 0),
                Orientation::R90,
                Point::new(4, 2),
            )
            .with_var(Variable::new("w", VarValue::Int(12))),
            ImmutableNodeInst::new(
                NodeId(1),
                pin.into(),
                name("p1"),
                Point::new(0, 0),
                Orientation::R0,
                Point::new(1, 1),
            ),
            ImmutableNodeInst::new(
                NodeId(2),
                NodeProtoId::Cell(inv),
                name("x1"),
                Point::new(20, 0),
                Orientation::XR180,
                Point::ORIGIN,
            ),
        ];
        nodes.sort_by(|a, b| (&a.name, a.node_id).cmp(&(&b.name, b.node_id)));

        let mut arcs = vec![
            ImmutableArcInst::new(
                ArcId(0),
                wire.clone(),
                name("net1"),
                ArcEnd::new(NodeId(1), self.port("pin", "a"), Point::new(0, 0)),
                ArcEnd::new(NodeId(0), self.port("nmos", "g"), Point::new(10, 0)),
                3,
            ),
            ImmutableArcInst::new(
                ArcId(1),
                wire,
                name("net2"),
                ArcEnd::new(NodeId(0), self.port("nmos", "s"), Point::new(10, 0)),
                ArcEnd::new(NodeId(2), inv_a, Point::new(20, 0)),
                3,
            )
            .with_flags(0x2),
        ];
        arcs.sort_by(|a, b| (&a.name, a.arc_id).cmp(&(&b.name, b.arc_id)));

        let exports = vec![ImmutableExport::new(y, name("y"), NodeId(0), self.port("nmos", "d"))
            .with_characteristic(PortCharacteristic::Output)
            .with_always_drawn(true)];

        let nodes: NodeList = nodes.into_iter().map(Arc::new).collect();
        let arcs: ArcList = arcs.into_iter().map(Arc::new).collect();
        let exports: ExportList = exports.into_iter().map(Arc::new).collect();
        empty
            .with(Arc::new(record), 7, true, Some(nodes), Some(arcs), Some(exports))
            .unwrap()
    }

    /// `lib:buf`: one pin exported as `a` and `b`, then `b` removed, so the
    /// last chronological index is deleted
    pub fn buf(&self) -> Arc<CellBackup> {
        let cell = self.ids.get_or_create_cell_id("lib", "buf").unwrap();
        let a = self.ids.get_or_create_export_id(&cell, 0, "a").unwrap();
        let b = self.ids.get_or_create_export_id(&cell, 1, "b").unwrap();
        let pin = self.tech.find_primitive_node_id("pin").unwrap();

        let empty = self.empty(&cell, 1_000);
        let nodes: NodeList = Arc::from(vec![Arc::new(ImmutableNodeInst::new(
            NodeId(0),
            pin.into(),
            name("p0"),
            Point::ORIGIN,
            Orientation::R0,
            Point::new(1, 1),
        ))]);
        let export_a = Arc::new(ImmutableExport::new(a, name("a"), NodeId(0), self.port("pin", "a")));
        let export_b = Arc::new(ImmutableExport::new(b, name("b"), NodeId(0), self.port("pin", "a")));
        let both = empty
            .with(
                Arc::clone(empty.cell()),
                1,
                false,
                Some(nodes),
                None,
                Some(Arc::from(vec![Arc::clone(&export_a), export_b])),
            )
            .unwrap();
        both.with(Arc::clone(both.cell()), 2, true, None, None, Some(Arc::from(vec![export_a])))
            .unwrap()
    }

    /// `b` of `lib:buf` as a record, for trying to bring it back
    pub fn buf_export_b(&self) -> Arc<ImmutableExport> {
        let cell = self.ids.get_or_create_cell_id("lib", "buf").unwrap();
        let b = self.ids.get_or_create_export_id(&cell, 1, "b").unwrap();
        Arc::new(ImmutableExport::new(b, name("b"), NodeId(0), self.port("pin", "a")))
    }
}

/// Same records, compared through names so snapshots from different
/// registries can be matched
pub fn assert_same_content(a: &CellBackup, b: &CellBackup) {
    assert_eq!(a.cell_id().key(), b.cell_id().key());
    assert_eq!(a.cell().cell_name, b.cell().cell_name);
    assert_eq!(a.cell().creation_date, b.cell().creation_date);
    assert_eq!(a.cell().revision_date, b.cell().revision_date);
    assert_eq!(a.cell().flags, b.cell().flags);
    assert_eq!(&*a.cell().vars, &*b.cell().vars);
    assert_eq!(a.revision(), b.revision());
    assert_eq!(a.is_modified(), b.is_modified());

    assert_eq!(a.nodes().len(), b.nodes().len());
    for (x, y) in a.nodes().iter().zip(b.nodes().iter()) {
        assert_eq!(x.node_id, y.node_id);
        assert_eq!(x.name, y.name);
        assert_eq!(x.anchor, y.anchor);
        assert_eq!(x.orient, y.orient);
        assert_eq!(x.size, y.size);
        assert_eq!(&*x.vars, &*y.vars);
        assert_eq!(proto_name(&x.proto_id), proto_name(&y.proto_id));
    }

    assert_eq!(a.arcs().len(), b.arcs().len());
    for (x, y) in a.arcs().iter().zip(b.arcs().iter()) {
        assert_eq!(x.arc_id, y.arc_id);
        assert_eq!(x.name, y.name);
        assert_eq!(x.proto_id.full_name(), y.proto_id.full_name());
        assert_eq!(x.width, y.width);
        assert_eq!(x.flags, y.flags);
        for end in [ImmutableArcInst::TAIL, ImmutableArcInst::HEAD] {
            assert_eq!(x.end(end).node_id, y.end(end).node_id);
            assert_eq!(x.end(end).location, y.end(end).location);
            assert_eq!(x.end(end).port_id.chron_index(), y.end(end).port_id.chron_index());
        }
    }

    assert_eq!(a.exports().len(), b.exports().len());
    for (x, y) in a.exports().iter().zip(b.exports().iter()) {
        assert_eq!(x.export_id.chron_index(), y.export_id.chron_index());
        assert_eq!(x.export_id.external_id(), y.export_id.external_id());
        assert_eq!(x.name, y.name);
        assert_eq!(x.original_node_id, y.original_node_id);
        assert_eq!(x.characteristic, y.characteristic);
        assert_eq!(x.always_drawn, y.always_drawn);
        assert_eq!(x.body_only, y.body_only);
    }
}

fn proto_name(proto: &NodeProtoId) -> String {
    match proto {
        NodeProtoId::Primitive(p) => p.full_name().to_string(),
        NodeProtoId::Cell(c) => c.key().to_string(),
    }
}
