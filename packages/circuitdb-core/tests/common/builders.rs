//! Record builders
//!
//! Sequences handed to `CellBackup::with` must be sorted; the `sorted_*`
//! helpers sort the way the snapshot expects.

use std::sync::Arc;

use circuitdb_core::features::records::{ArcList, ExportList, NodeList};
use circuitdb_core::{
    ArcEnd, ArcId, ArcProtoId, CellId, ExportId, ImmutableArcInst, ImmutableExport,
    ImmutableNodeInst, Name, NodeId, NodeProtoId, Orientation, Point, PortProtoId,
};

pub fn name(s: &str) -> Name {
    Name::new(s).unwrap()
}

pub fn prim_node(id: u32, node_name: &str, proto: impl Into<NodeProtoId>, at: Point) -> ImmutableNodeInst {
    ImmutableNodeInst::new(
        NodeId(id),
        proto.into(),
        name(node_name),
        at,
        Orientation::R0,
        Point::new(2, 2),
    )
}

pub fn sub_node(id: u32, node_name: &str, proto: &CellId, at: Point) -> ImmutableNodeInst {
    ImmutableNodeInst::new(
        NodeId(id),
        NodeProtoId::Cell(proto.clone()),
        name(node_name),
        at,
        Orientation::R0,
        Point::ORIGIN,
    )
}

pub fn arc_inst(
    id: u32,
    arc_name: &str,
    proto: &ArcProtoId,
    tail: (u32, PortProtoId, Point),
    head: (u32, PortProtoId, Point),
) -> ImmutableArcInst {
    ImmutableArcInst::new(
        ArcId(id),
        proto.clone(),
        name(arc_name),
        ArcEnd::new(NodeId(tail.0), tail.1, tail.2),
        ArcEnd::new(NodeId(head.0), head.1, head.2),
        2,
    )
}

pub fn export_inst(export_id: &ExportId, export_name: &str, node: u32, port: PortProtoId) -> ImmutableExport {
    ImmutableExport::new(export_id.clone(), name(export_name), NodeId(node), port)
}

pub fn sorted_nodes(mut nodes: Vec<ImmutableNodeInst>) -> NodeList {
    nodes.sort_by(|a, b| (&a.name, a.node_id).cmp(&(&b.name, b.node_id)));
    nodes.into_iter().map(Arc::new).collect()
}

pub fn sorted_arcs(mut arcs: Vec<ImmutableArcInst>) -> ArcList {
    arcs.sort_by(|a, b| (&a.name, a.arc_id).cmp(&(&b.name, b.arc_id)));
    arcs.into_iter().map(Arc::new).collect()
}

pub fn sorted_exports(mut exports: Vec<ImmutableExport>) -> ExportList {
    exports.sort_by(|a, b| a.name.cmp(&b.name));
    exports.into_iter().map(Arc::new).collect()
}
