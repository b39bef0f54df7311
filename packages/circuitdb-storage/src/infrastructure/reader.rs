//! Cell snapshot decoder
//!
//! Technology-side keys must already be registered (a technology is built
//! before any cell that uses it is loaded). Cell-side keys are restored into
//! the registry by default so a snapshot can be loaded into a fresh process;
//! [`SnapshotReader::resolve_only`] requires them to exist as well.

use std::io::{Cursor, Read};
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt};
use circuitdb_core::features::identity::{
    ArcProtoKey, PrimitiveNodeKey, PrimitivePortKey, TechKey,
};
use circuitdb_core::{
    ArcEnd, ArcId, CellBackup, CellId, CellKey, ExportId, ExportKey, IdManager, ImmutableArcInst,
    ImmutableCell, ImmutableExport, ImmutableNodeInst, NodeId, NodeProtoId, PortCharacteristic,
    PortProtoId, ResolvableRef, TechId, TechPool,
};
use tracing::debug;

use super::codec::{
    capacity, read_bool, read_count, read_name, read_orientation, read_point, read_string,
    read_vars, PORT_EXPORT, PORT_PRIMITIVE, PROTO_CELL, PROTO_PRIMITIVE,
};
use crate::error::{Result, StorageError};

/// Id table resolved against the registry
struct ResolvedTable {
    techs: Vec<TechId>,
    cells: Vec<(CellId, Vec<ExportId>)>,
}

impl ResolvedTable {
    fn tech(&self, slot: u32) -> Result<&TechId> {
        self.techs
            .get(slot as usize)
            .ok_or_else(|| StorageError::format(format!("tech slot {} out of range", slot)))
    }

    fn cell(&self, slot: u32) -> Result<&CellId> {
        self.cells
            .get(slot as usize)
            .map(|(cell, _)| cell)
            .ok_or_else(|| StorageError::format(format!("cell slot {} out of range", slot)))
    }

    fn export(&self, slot: u32, chron_index: u32) -> Result<&ExportId> {
        let (cell, exports) = self
            .cells
            .get(slot as usize)
            .ok_or_else(|| StorageError::format(format!("cell slot {} out of range", slot)))?;
        exports.get(chron_index as usize).ok_or_else(|| {
            StorageError::resolution(format!(
                "export #{} of {} is not in the id table",
                chron_index,
                cell.key()
            ))
        })
    }
}

/// Decodes cell snapshots written by [`super::SnapshotWriter`]
pub struct SnapshotReader<'a> {
    ids: &'a IdManager,
    tech_pool: Arc<TechPool>,
    restore_cells: bool,
}

impl<'a> SnapshotReader<'a> {
    pub fn new(ids: &'a IdManager, tech_pool: Arc<TechPool>) -> Self {
        Self {
            ids,
            tech_pool,
            restore_cells: true,
        }
    }

    /// Fail on cell or export keys the registry does not already know
    pub fn resolve_only(mut self) -> Self {
        self.restore_cells = false;
        self
    }

    /// Read one record and rebuild it as a validated snapshot
    pub fn read_cell_backup<R: Read>(&self, input: &mut R) -> Result<Arc<CellBackup>> {
        let table = self.read_table(input)?;
        let cell = self.read_cell(input, &table)?;
        let revision = input.read_i64::<LittleEndian>()?;
        let modified = read_bool(input)?;

        let n = read_count(input)?;
        let mut nodes = Vec::with_capacity(capacity(n));
        for _ in 0..n {
            nodes.push(Arc::new(self.read_node(input, &table)?));
        }
        let n = read_count(input)?;
        let mut arcs = Vec::with_capacity(capacity(n));
        for _ in 0..n {
            arcs.push(Arc::new(self.read_arc(input, &table)?));
        }
        let n = read_count(input)?;
        let mut exports = Vec::with_capacity(capacity(n));
        for _ in 0..n {
            exports.push(Arc::new(self.read_export(input, &table)?));
        }
        let defined_exports_length = input.read_u32::<LittleEndian>()?;

        let empty = CellBackup::empty(cell.clone(), Arc::clone(&self.tech_pool))?;
        let backup = empty.with(
            Arc::new(cell),
            revision,
            modified,
            Some(Arc::from(nodes)),
            Some(Arc::from(arcs)),
            Some(Arc::from(exports)),
        )?
        .with_defined_exports_length(defined_exports_length)?;

        debug!(
            cell = %backup.cell_id().key(),
            revision,
            nodes = backup.nodes().len(),
            arcs = backup.arcs().len(),
            exports = backup.exports().len(),
            "read cell snapshot"
        );
        Ok(backup)
    }

    /// Decode a whole buffer; trailing bytes are an error
    pub fn from_bytes(&self, bytes: &[u8]) -> Result<Arc<CellBackup>> {
        let mut cursor = Cursor::new(bytes);
        let backup = self.read_cell_backup(&mut cursor)?;
        let consumed = cursor.position() as usize;
        if consumed != bytes.len() {
            return Err(StorageError::format(format!(
                "{} trailing bytes after cell record",
                bytes.len() - consumed
            )));
        }
        Ok(backup)
    }

    fn read_table<R: Read>(&self, input: &mut R) -> Result<ResolvedTable> {
        let n = read_count(input)?;
        let mut techs = Vec::with_capacity(capacity(n));
        for _ in 0..n {
            let key = TechKey {
                tech_name: Arc::from(read_string(input)?),
            };
            techs.push(key.resolve(self.ids)?);
        }

        let n = read_count(input)?;
        if n == 0 {
            return Err(StorageError::format("cell table is empty"));
        }
        let mut cells = Vec::with_capacity(capacity(n));
        for _ in 0..n {
            let lib = read_string(input)?;
            let name = read_string(input)?;
            let key = CellKey::new(&lib, &name)
                .map_err(|e| StorageError::format(format!("bad cell key {}:{}", lib, name)).with_source(e))?;
            let cell = if self.restore_cells {
                self.ids.get_or_create_cell_id(&lib, &name)?
            } else {
                key.resolve(self.ids)?
            };

            let num_exports = read_count(input)?;
            let mut exports = Vec::with_capacity(capacity(num_exports));
            for chron_index in 0..num_exports as u32 {
                let external_id = read_string(input)?;
                exports.push(self.resolve_export(&cell, &key, chron_index, &external_id)?);
            }
            cells.push((cell, exports));
        }
        Ok(ResolvedTable { techs, cells })
    }

    fn resolve_export(
        &self,
        cell: &CellId,
        key: &CellKey,
        chron_index: u32,
        external_id: &str,
    ) -> Result<ExportId> {
        if self.restore_cells {
            return self
                .ids
                .get_or_create_export_id(cell, chron_index, external_id)
                .map_err(|e| {
                    StorageError::resolution(format!(
                        "export #{} {:?} of {} conflicts with the registry",
                        chron_index, external_id, key
                    ))
                    .with_source(e)
                });
        }
        let export = ExportKey {
            cell: key.clone(),
            chron_index,
        }
        .resolve(self.ids)?;
        if export.external_id() != external_id {
            return Err(StorageError::resolution(format!(
                "export #{} of {} is {:?}, stream has {:?}",
                chron_index,
                key,
                export.external_id(),
                external_id
            )));
        }
        Ok(export)
    }

    fn read_cell<R: Read>(&self, input: &mut R, table: &ResolvedTable) -> Result<ImmutableCell> {
        let cell_name = read_name(input)?;
        let tech_id = if read_bool(input)? {
            let slot = input.read_u32::<LittleEndian>()?;
            Some(table.tech(slot)?.clone())
        } else {
            None
        };
        Ok(ImmutableCell {
            cell_id: table.cell(0)?.clone(),
            cell_name,
            tech_id,
            creation_date: input.read_i64::<LittleEndian>()?,
            revision_date: input.read_i64::<LittleEndian>()?,
            flags: input.read_u32::<LittleEndian>()?,
            vars: read_vars(input)?,
        })
    }

    fn read_node<R: Read>(&self, input: &mut R, table: &ResolvedTable) -> Result<ImmutableNodeInst> {
        let node_id = NodeId(input.read_u32::<LittleEndian>()?);
        let proto_id = match input.read_u8()? {
            PROTO_PRIMITIVE => {
                let key = self.primitive_key(input, table)?;
                NodeProtoId::Primitive(key.resolve(self.ids)?)
            }
            PROTO_CELL => {
                let slot = input.read_u32::<LittleEndian>()?;
                NodeProtoId::Cell(table.cell(slot)?.clone())
            }
            tag => return Err(StorageError::format(format!("{} has unknown proto tag {}", node_id, tag))),
        };
        Ok(ImmutableNodeInst {
            node_id,
            proto_id,
            name: read_name(input)?,
            anchor: read_point(input)?,
            orient: read_orientation(input)?,
            size: read_point(input)?,
            flags: input.read_u32::<LittleEndian>()?,
            vars: read_vars(input)?,
        })
    }

    fn read_arc<R: Read>(&self, input: &mut R, table: &ResolvedTable) -> Result<ImmutableArcInst> {
        let arc_id = ArcId(input.read_u32::<LittleEndian>()?);
        let tech = TechKey::of(table.tech(input.read_u32::<LittleEndian>()?)?);
        let proto_key = ArcProtoKey {
            tech,
            name: Arc::from(read_string(input)?),
        };
        Ok(ImmutableArcInst {
            arc_id,
            proto_id: proto_key.resolve(self.ids)?,
            name: read_name(input)?,
            tail: self.read_end(input, table)?,
            head: self.read_end(input, table)?,
            width: input.read_i64::<LittleEndian>()?,
            flags: input.read_u32::<LittleEndian>()?,
            vars: read_vars(input)?,
        })
    }

    fn read_end<R: Read>(&self, input: &mut R, table: &ResolvedTable) -> Result<ArcEnd> {
        Ok(ArcEnd {
            node_id: NodeId(input.read_u32::<LittleEndian>()?),
            port_id: self.read_port(input, table)?,
            location: read_point(input)?,
        })
    }

    fn read_export<R: Read>(&self, input: &mut R, table: &ResolvedTable) -> Result<ImmutableExport> {
        let chron_index = input.read_u32::<LittleEndian>()?;
        let export_id = table.export(0, chron_index)?.clone();
        let name = read_name(input)?;
        let original_node_id = NodeId(input.read_u32::<LittleEndian>()?);
        let original_port_id = self.read_port(input, table)?;
        let code = input.read_u8()?;
        let characteristic = PortCharacteristic::from_code(code)
            .ok_or_else(|| StorageError::format(format!("bad port characteristic code {}", code)))?;
        Ok(ImmutableExport {
            export_id,
            name,
            original_node_id,
            original_port_id,
            characteristic,
            always_drawn: read_bool(input)?,
            body_only: read_bool(input)?,
            vars: read_vars(input)?,
        })
    }

    fn read_port<R: Read>(&self, input: &mut R, table: &ResolvedTable) -> Result<PortProtoId> {
        match input.read_u8()? {
            PORT_PRIMITIVE => {
                let node = self.primitive_key(input, table)?;
                let key = PrimitivePortKey {
                    node,
                    chron_index: input.read_u32::<LittleEndian>()?,
                };
                Ok(PortProtoId::Primitive(key.resolve(self.ids)?))
            }
            PORT_EXPORT => {
                let slot = input.read_u32::<LittleEndian>()?;
                let chron_index = input.read_u32::<LittleEndian>()?;
                Ok(PortProtoId::Export(table.export(slot, chron_index)?.clone()))
            }
            tag => Err(StorageError::format(format!("unknown port tag {}", tag))),
        }
    }

    fn primitive_key<R: Read>(&self, input: &mut R, table: &ResolvedTable) -> Result<PrimitiveNodeKey> {
        let tech = TechKey::of(table.tech(input.read_u32::<LittleEndian>()?)?);
        Ok(PrimitiveNodeKey {
            tech,
            name: Arc::from(read_string(input)?),
        })
    }
}
