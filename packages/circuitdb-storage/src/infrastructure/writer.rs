//! Cell snapshot encoder

use std::collections::HashMap;
use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use circuitdb_core::features::identity::{ArcProtoKey, PrimitiveNodeKey, TechKey};
use circuitdb_core::{
    ArcEnd, CellBackup, CellId, IdManager, ImmutableArcInst, ImmutableCell, ImmutableExport,
    ImmutableNodeInst, NodeProtoId, PortProtoId, TechId,
};
use tracing::debug;

use super::codec::{
    write_bool, write_count, write_point, write_str, write_vars, PORT_EXPORT, PORT_PRIMITIVE,
    PROTO_CELL, PROTO_PRIMITIVE,
};
use crate::error::{Result, StorageError};

/// Technologies and cells referenced by one snapshot, in first-seen order
#[derive(Default)]
struct IdTable {
    techs: Vec<TechKey>,
    tech_slots: HashMap<u32, u32>,
    cells: Vec<CellId>,
    cell_slots: HashMap<u32, u32>,
}

impl IdTable {
    fn collect(ids: &IdManager, backup: &CellBackup) -> Result<Self> {
        let mut table = IdTable::default();
        table.add_cell(backup.cell_id());
        if let Some(tech) = &backup.cell().tech_id {
            table.add_tech(tech);
        }
        for node in backup.nodes().iter() {
            match &node.proto_id {
                NodeProtoId::Primitive(p) => table.add_tech_index(ids, p.tech_index())?,
                NodeProtoId::Cell(c) => table.add_cell(c),
            }
        }
        for arc in backup.arcs().iter() {
            table.add_tech_index(ids, arc.proto_id.tech_index())?;
            table.add_port(ids, &arc.tail.port_id)?;
            table.add_port(ids, &arc.head.port_id)?;
        }
        for export in backup.exports().iter() {
            table.add_port(ids, &export.original_port_id)?;
        }
        Ok(table)
    }

    fn add_tech(&mut self, tech: &TechId) {
        if !self.tech_slots.contains_key(&tech.tech_index()) {
            self.tech_slots
                .insert(tech.tech_index(), self.techs.len() as u32);
            self.techs.push(TechKey::of(tech));
        }
    }

    fn add_tech_index(&mut self, ids: &IdManager, tech_index: u32) -> Result<()> {
        if self.tech_slots.contains_key(&tech_index) {
            return Ok(());
        }
        let tech = ids.tech_id(tech_index).ok_or_else(|| {
            StorageError::resolution(format!("technology #{} is not registered", tech_index))
        })?;
        self.add_tech(&tech);
        Ok(())
    }

    fn add_cell(&mut self, cell: &CellId) {
        if !self.cell_slots.contains_key(&cell.cell_index()) {
            self.cell_slots
                .insert(cell.cell_index(), self.cells.len() as u32);
            self.cells.push(cell.clone());
        }
    }

    fn add_port(&mut self, ids: &IdManager, port: &PortProtoId) -> Result<()> {
        match port {
            PortProtoId::Primitive(p) => self.add_tech_index(ids, p.node().tech_index()),
            PortProtoId::Export(e) => {
                let parent = e.parent().ok_or_else(|| {
                    StorageError::resolution(format!("{:?} has no live parent cell", e))
                })?;
                self.add_cell(&parent);
                Ok(())
            }
        }
    }

    fn tech_slot(&self, tech_index: u32) -> Result<u32> {
        self.tech_slots.get(&tech_index).copied().ok_or_else(|| {
            StorageError::resolution(format!("technology #{} missing from id table", tech_index))
        })
    }

    fn cell_slot(&self, cell_index: u32) -> Result<u32> {
        self.cell_slots.get(&cell_index).copied().ok_or_else(|| {
            StorageError::resolution(format!("cell #{} missing from id table", cell_index))
        })
    }

    fn write<W: Write>(&self, out: &mut W) -> Result<()> {
        write_count(out, self.techs.len())?;
        for tech in &self.techs {
            write_str(out, &tech.tech_name)?;
        }
        write_count(out, self.cells.len())?;
        for cell in &self.cells {
            write_str(out, &cell.key().lib_name)?;
            write_str(out, &cell.key().cell_name)?;
            let exports = cell.export_ids();
            write_count(out, exports.len())?;
            for export in &exports {
                write_str(out, export.external_id())?;
            }
        }
        Ok(())
    }
}

/// Encodes cell snapshots into the binary stream format
pub struct SnapshotWriter<'a> {
    ids: &'a IdManager,
}

impl<'a> SnapshotWriter<'a> {
    pub fn new(ids: &'a IdManager) -> Self {
        Self { ids }
    }

    /// Write `backup` as one self-contained record
    pub fn write_cell_backup<W: Write>(&self, out: &mut W, backup: &CellBackup) -> Result<()> {
        let table = IdTable::collect(self.ids, backup)?;
        table.write(out)?;

        self.write_cell(out, &table, backup.cell())?;
        out.write_i64::<LittleEndian>(backup.revision())?;
        write_bool(out, backup.is_modified())?;

        write_count(out, backup.nodes().len())?;
        for node in backup.nodes().iter() {
            self.write_node(out, &table, node)?;
        }
        write_count(out, backup.arcs().len())?;
        for arc in backup.arcs().iter() {
            self.write_arc(out, &table, arc)?;
        }
        write_count(out, backup.exports().len())?;
        for export in backup.exports().iter() {
            self.write_export(out, &table, export)?;
        }
        out.write_u32::<LittleEndian>(backup.defined_exports_length())?;

        debug!(
            cell = %backup.cell_id().key(),
            revision = backup.revision(),
            nodes = backup.nodes().len(),
            arcs = backup.arcs().len(),
            exports = backup.exports().len(),
            deleted_exports = backup.deleted_exports().count_ones(),
            "wrote cell snapshot"
        );
        Ok(())
    }

    /// Encode into a fresh buffer
    pub fn to_bytes(&self, backup: &CellBackup) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_cell_backup(&mut buf, backup)?;
        Ok(buf)
    }

    fn write_cell<W: Write>(&self, out: &mut W, table: &IdTable, cell: &ImmutableCell) -> Result<()> {
        write_str(out, cell.cell_name.as_str())?;
        match &cell.tech_id {
            Some(tech) => {
                write_bool(out, true)?;
                out.write_u32::<LittleEndian>(table.tech_slot(tech.tech_index())?)?;
            }
            None => write_bool(out, false)?,
        }
        out.write_i64::<LittleEndian>(cell.creation_date)?;
        out.write_i64::<LittleEndian>(cell.revision_date)?;
        out.write_u32::<LittleEndian>(cell.flags)?;
        write_vars(out, &cell.vars)
    }

    fn write_node<W: Write>(&self, out: &mut W, table: &IdTable, node: &ImmutableNodeInst) -> Result<()> {
        out.write_u32::<LittleEndian>(node.node_id.0)?;
        match &node.proto_id {
            NodeProtoId::Primitive(p) => {
                let key = PrimitiveNodeKey::of(self.ids, p)?;
                out.write_u8(PROTO_PRIMITIVE)?;
                out.write_u32::<LittleEndian>(table.tech_slot(p.tech_index())?)?;
                write_str(out, &key.name)?;
            }
            NodeProtoId::Cell(c) => {
                out.write_u8(PROTO_CELL)?;
                out.write_u32::<LittleEndian>(table.cell_slot(c.cell_index())?)?;
            }
        }
        write_str(out, node.name.as_str())?;
        write_point(out, node.anchor)?;
        out.write_u8(node.orient.code())?;
        write_point(out, node.size)?;
        out.write_u32::<LittleEndian>(node.flags)?;
        write_vars(out, &node.vars)
    }

    fn write_arc<W: Write>(&self, out: &mut W, table: &IdTable, arc: &ImmutableArcInst) -> Result<()> {
        let key = ArcProtoKey::of(self.ids, &arc.proto_id)?;
        out.write_u32::<LittleEndian>(arc.arc_id.0)?;
        out.write_u32::<LittleEndian>(table.tech_slot(arc.proto_id.tech_index())?)?;
        write_str(out, &key.name)?;
        write_str(out, arc.name.as_str())?;
        self.write_end(out, table, &arc.tail)?;
        self.write_end(out, table, &arc.head)?;
        out.write_i64::<LittleEndian>(arc.width)?;
        out.write_u32::<LittleEndian>(arc.flags)?;
        write_vars(out, &arc.vars)
    }

    fn write_end<W: Write>(&self, out: &mut W, table: &IdTable, end: &ArcEnd) -> Result<()> {
        out.write_u32::<LittleEndian>(end.node_id.0)?;
        self.write_port(out, table, &end.port_id)?;
        write_point(out, end.location)
    }

    fn write_export<W: Write>(&self, out: &mut W, table: &IdTable, export: &ImmutableExport) -> Result<()> {
        out.write_u32::<LittleEndian>(export.export_id.chron_index())?;
        write_str(out, export.name.as_str())?;
        out.write_u32::<LittleEndian>(export.original_node_id.0)?;
        self.write_port(out, table, &export.original_port_id)?;
        out.write_u8(export.characteristic.code())?;
        write_bool(out, export.always_drawn)?;
        write_bool(out, export.body_only)?;
        write_vars(out, &export.vars)
    }

    fn write_port<W: Write>(&self, out: &mut W, table: &IdTable, port: &PortProtoId) -> Result<()> {
        match port {
            PortProtoId::Primitive(p) => {
                let node = p.node();
                out.write_u8(PORT_PRIMITIVE)?;
                out.write_u32::<LittleEndian>(table.tech_slot(node.tech_index())?)?;
                write_str(out, node.name())?;
                out.write_u32::<LittleEndian>(p.chron_index())?;
            }
            PortProtoId::Export(e) => {
                out.write_u8(PORT_EXPORT)?;
                out.write_u32::<LittleEndian>(table.cell_slot(e.parent_index())?)?;
                out.write_u32::<LittleEndian>(e.chron_index())?;
            }
        }
        Ok(())
    }
}
