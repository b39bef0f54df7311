//! Immutable snapshot of one cell.
//!
//! A `CellBackup` is published behind an `Arc` and never mutated afterwards,
//! except for the lazily filled memoization slot. Successors are produced by
//! [`CellBackup::with`], which reuses every sequence and derived array whose
//! contents did not change.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use super::memoization::Memoization;
use crate::errors::{CircuitDbError, Result};
use crate::features::identity::{CellId, NodeId, NodeProtoId, MAX_INSTANCE_ID};
use crate::features::records::{
    ArcList, ExportList, ImmutableArcInst, ImmutableArray, ImmutableCell, ImmutableExport,
    ImmutableNodeInst, NodeList,
};
use crate::features::technology::TechPool;
use crate::features::usage::{no_usages, CellUsageInfo, UsageArray, UsageCollector};
use crate::shared::models::Name;
use crate::shared::{share_bits, BitSet};

pub struct CellBackup {
    pub(super) cell: Arc<ImmutableCell>,
    pub(super) tech_pool: Arc<TechPool>,
    pub(super) revision: i64,
    pub(super) modified: bool,
    pub(super) nodes: NodeList,
    pub(super) arcs: ArcList,
    pub(super) exports: ExportList,
    pub(super) cell_usages: UsageArray,
    /// Export chron index -> position in `exports`
    pub(super) export_index: ImmutableArray<Option<u32>>,
    pub(super) defined_exports: Arc<BitSet>,
    pub(super) deleted_exports: Arc<BitSet>,
    pub(super) defined_exports_length: u32,
    memo: OnceCell<Arc<Memoization>>,
}

impl CellBackup {
    /// Snapshot of a cell with no content
    pub fn empty(cell: ImmutableCell, tech_pool: Arc<TechPool>) -> Result<Arc<CellBackup>> {
        check_tech(&cell, &tech_pool)?;
        Ok(Arc::new(CellBackup {
            cell: Arc::new(cell),
            tech_pool,
            revision: 0,
            modified: false,
            nodes: Arc::from(Vec::new()),
            arcs: Arc::from(Vec::new()),
            exports: Arc::from(Vec::new()),
            cell_usages: no_usages(),
            export_index: Arc::from(Vec::new()),
            defined_exports: BitSet::empty(),
            deleted_exports: BitSet::empty(),
            defined_exports_length: 0,
            memo: OnceCell::new(),
        }))
    }

    /// Successor snapshot.
    ///
    /// `None` (or the current sequence itself) leaves a sequence unchanged.
    /// When nothing differs the receiver is returned. Sequences must already
    /// be sorted; this validates, it never sorts. On error the receiver is
    /// untouched and remains the valid state.
    pub fn with(
        self: &Arc<Self>,
        cell: Arc<ImmutableCell>,
        revision: i64,
        modified: bool,
        nodes: Option<NodeList>,
        arcs: Option<ArcList>,
        exports: Option<ExportList>,
    ) -> Result<Arc<CellBackup>> {
        let nodes = nodes.filter(|n| !Arc::ptr_eq(n, &self.nodes));
        let arcs = arcs.filter(|a| !Arc::ptr_eq(a, &self.arcs));
        let exports = exports.filter(|e| !Arc::ptr_eq(e, &self.exports));
        let cell = if Arc::ptr_eq(&cell, &self.cell) || *cell == *self.cell {
            Arc::clone(&self.cell)
        } else {
            cell
        };
        let cell_changed = !Arc::ptr_eq(&cell, &self.cell);

        if !cell_changed
            && revision == self.revision
            && modified == self.modified
            && nodes.is_none()
            && arcs.is_none()
            && exports.is_none()
        {
            return Ok(Arc::clone(self));
        }

        check_tech(&cell, &self.tech_pool)?;
        if cell.cell_id != self.cell.cell_id {
            return Err(CircuitDbError::invalid_argument(format!(
                "record of {:?} cannot replace {:?}",
                cell.cell_id, self.cell.cell_id
            )));
        }

        if let Some(nodes) = &nodes {
            self.validate_nodes(&cell.cell_id, nodes)?;
        }
        if let Some(arcs) = &arcs {
            validate_arcs(arcs)?;
        }

        let mut export_index = Arc::clone(&self.export_index);
        let mut defined_exports = Arc::clone(&self.defined_exports);
        let mut deleted_exports = Arc::clone(&self.deleted_exports);
        let mut defined_exports_length = self.defined_exports_length;
        if let Some(exports) = &exports {
            let index = self.build_export_index(&cell.cell_id, exports)?;
            if *index != *self.export_index {
                let defined = BitSet::from_indices(
                    index
                        .iter()
                        .enumerate()
                        .filter(|(_, pos)| pos.is_some())
                        .map(|(chron, _)| chron),
                );
                defined_exports_length = defined_exports_length.max(index.len() as u32);
                let deleted = defined.complement_within(defined_exports_length as usize);
                defined_exports = share_bits(&self.defined_exports, defined);
                deleted_exports = share_bits(&self.deleted_exports, deleted);
                export_index = Arc::from(index);
            }
        }

        let nodes = nodes.unwrap_or_else(|| Arc::clone(&self.nodes));
        let arcs = arcs.unwrap_or_else(|| Arc::clone(&self.arcs));
        let exports = exports.unwrap_or_else(|| Arc::clone(&self.exports));

        let content_changed = cell_changed
            || !Arc::ptr_eq(&nodes, &self.nodes)
            || !Arc::ptr_eq(&arcs, &self.arcs)
            || !Arc::ptr_eq(&exports, &self.exports);
        let cell_usages = if content_changed {
            UsageCollector::new(&cell.cell_id, &nodes, &arcs, &exports)?.merge(&self.cell_usages)
        } else {
            Arc::clone(&self.cell_usages)
        };

        tracing::debug!(
            "cell {} revision {} -> {}: {} nodes, {} arcs, {} exports",
            cell.cell_id.key(),
            self.revision,
            revision,
            nodes.len(),
            arcs.len(),
            exports.len()
        );

        Ok(Arc::new(CellBackup {
            cell,
            tech_pool: Arc::clone(&self.tech_pool),
            revision,
            modified,
            nodes,
            arcs,
            exports,
            cell_usages,
            export_index,
            defined_exports,
            deleted_exports,
            defined_exports_length,
            memo: OnceCell::new(),
        }))
    }

    /// Same content against another technology pool
    pub fn with_tech_pool(self: &Arc<Self>, tech_pool: Arc<TechPool>) -> Result<Arc<CellBackup>> {
        if Arc::ptr_eq(&tech_pool, &self.tech_pool) {
            return Ok(Arc::clone(self));
        }
        check_tech(&self.cell, &tech_pool)?;
        Ok(Arc::new(CellBackup {
            cell: Arc::clone(&self.cell),
            tech_pool,
            revision: self.revision,
            modified: self.modified,
            nodes: Arc::clone(&self.nodes),
            arcs: Arc::clone(&self.arcs),
            exports: Arc::clone(&self.exports),
            cell_usages: Arc::clone(&self.cell_usages),
            export_index: Arc::clone(&self.export_index),
            defined_exports: Arc::clone(&self.defined_exports),
            deleted_exports: Arc::clone(&self.deleted_exports),
            defined_exports_length: self.defined_exports_length,
            memo: OnceCell::new(),
        }))
    }

    /// Same content with the export history extended to `length`.
    ///
    /// Every chronological index below `length` without a live export is
    /// marked deleted, so it can never be defined again. Used when a
    /// snapshot is rebuilt from a stream that only carries live exports.
    /// `length` may not shrink and may not pass the ids the parent cell
    /// has allocated.
    pub fn with_defined_exports_length(self: &Arc<Self>, length: u32) -> Result<Arc<CellBackup>> {
        if length == self.defined_exports_length {
            return Ok(Arc::clone(self));
        }
        if length < self.defined_exports_length {
            return Err(CircuitDbError::invalid_argument(format!(
                "export history of {} cannot shrink from {} to {}",
                self.cell.cell_id.key(),
                self.defined_exports_length,
                length
            )));
        }
        let allocated = self.cell.cell_id.num_export_ids();
        if length as usize > allocated {
            return Err(CircuitDbError::invalid_argument(format!(
                "export history of {} has length {} but only {} export ids exist",
                self.cell.cell_id.key(),
                length,
                allocated
            )));
        }
        let deleted = self.defined_exports.complement_within(length as usize);
        Ok(Arc::new(CellBackup {
            cell: Arc::clone(&self.cell),
            tech_pool: Arc::clone(&self.tech_pool),
            revision: self.revision,
            modified: self.modified,
            nodes: Arc::clone(&self.nodes),
            arcs: Arc::clone(&self.arcs),
            exports: Arc::clone(&self.exports),
            cell_usages: Arc::clone(&self.cell_usages),
            export_index: Arc::clone(&self.export_index),
            defined_exports: Arc::clone(&self.defined_exports),
            deleted_exports: share_bits(&self.deleted_exports, deleted),
            defined_exports_length: length,
            memo: OnceCell::new(),
        }))
    }

    fn validate_nodes(&self, cell_id: &CellId, nodes: &[Arc<ImmutableNodeInst>]) -> Result<()> {
        let mut seen = BitSet::new();
        let mut cell_center: Option<usize> = None;
        for (i, node) in nodes.iter().enumerate() {
            if i > 0 {
                let prev = &nodes[i - 1];
                if (&prev.name, prev.node_id) >= (&node.name, node.node_id) {
                    return Err(CircuitDbError::invalid_argument(format!(
                        "nodes[{}] {} {} is not after nodes[{}] {} {}",
                        i,
                        node.name,
                        node.node_id,
                        i - 1,
                        prev.name,
                        prev.node_id
                    )));
                }
            }
            if node.node_id.0 > MAX_INSTANCE_ID {
                return Err(CircuitDbError::invalid_argument(format!(
                    "nodes[{}] {} exceeds the largest id {}",
                    i, node.node_id, MAX_INSTANCE_ID
                )));
            }
            let id = node.node_id.0 as usize;
            if seen.get(id) {
                return Err(CircuitDbError::invalid_argument(format!(
                    "nodes[{}] duplicates {}",
                    i, node.node_id
                )));
            }
            seen.set(id);

            if let NodeProtoId::Cell(proto) = &node.proto_id {
                if proto == cell_id {
                    return Err(CircuitDbError::invalid_argument(format!(
                        "nodes[{}] {} instantiates its own cell {}",
                        i,
                        node.name,
                        cell_id.key()
                    )));
                }
            }
            if self.tech_pool.is_cell_center(&node.proto_id) {
                if let Some(first) = cell_center {
                    return Err(CircuitDbError::invalid_argument(format!(
                        "nodes[{}] is a second cell-center (first at nodes[{}])",
                        i, first
                    )));
                }
                cell_center = Some(i);
            }
        }
        Ok(())
    }

    fn build_export_index(
        &self,
        cell_id: &CellId,
        exports: &[Arc<ImmutableExport>],
    ) -> Result<Vec<Option<u32>>> {
        let mut index: Vec<Option<u32>> = Vec::new();
        for (i, export) in exports.iter().enumerate() {
            if i > 0 && exports[i - 1].name >= export.name {
                return Err(CircuitDbError::invalid_argument(format!(
                    "exports[{}] {} is not after exports[{}] {}",
                    i,
                    export.name,
                    i - 1,
                    exports[i - 1].name
                )));
            }
            if !export.export_id.is_in(cell_id) {
                return Err(CircuitDbError::invalid_argument(format!(
                    "exports[{}] {:?} does not belong to {}",
                    i,
                    export.export_id,
                    cell_id.key()
                )));
            }
            let chron = export.export_id.chron_index() as usize;
            if self.deleted_exports.get(chron) {
                return Err(CircuitDbError::invalid_argument(format!(
                    "exports[{}] {} reuses deleted chronological index {}",
                    i, export.name, chron
                )));
            }
            if index.len() <= chron {
                index.resize(chron + 1, None);
            }
            if let Some(prev) = index[chron] {
                return Err(CircuitDbError::invalid_argument(format!(
                    "exports[{}] and exports[{}] share chronological index {}",
                    prev, i, chron
                )));
            }
            index[chron] = Some(i as u32);
        }
        Ok(index)
    }

    pub fn cell(&self) -> &Arc<ImmutableCell> {
        &self.cell
    }

    pub fn cell_id(&self) -> &CellId {
        &self.cell.cell_id
    }

    pub fn tech_pool(&self) -> &Arc<TechPool> {
        &self.tech_pool
    }

    pub fn revision(&self) -> i64 {
        self.revision
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn nodes(&self) -> &NodeList {
        &self.nodes
    }

    pub fn arcs(&self) -> &ArcList {
        &self.arcs
    }

    pub fn exports(&self) -> &ExportList {
        &self.exports
    }

    pub fn cell_usages(&self) -> &UsageArray {
        &self.cell_usages
    }

    pub fn export_index(&self) -> &ImmutableArray<Option<u32>> {
        &self.export_index
    }

    pub fn defined_exports(&self) -> &Arc<BitSet> {
        &self.defined_exports
    }

    pub fn deleted_exports(&self) -> &Arc<BitSet> {
        &self.deleted_exports
    }

    /// Number of export chron indices ever defined in this cell's history
    pub fn defined_exports_length(&self) -> u32 {
        self.defined_exports_length
    }

    /// Current export with `chron_index`, `None` if absent or deleted
    pub fn export(&self, chron_index: u32) -> Option<&Arc<ImmutableExport>> {
        let pos = (*self.export_index.get(chron_index as usize)?)?;
        self.exports.get(pos as usize)
    }

    pub fn find_export(&self, name: &Name) -> Option<&Arc<ImmutableExport>> {
        self.exports
            .binary_search_by(|e| e.name.cmp(name))
            .ok()
            .map(|i| &self.exports[i])
    }

    /// First node named `name`
    pub fn find_node(&self, name: &Name) -> Option<&Arc<ImmutableNodeInst>> {
        let i = self.nodes.partition_point(|n| n.name < *name);
        self.nodes.get(i).filter(|n| n.name == *name)
    }

    /// Usage accounting of `proto` inside this cell
    pub fn usage_info(&self, proto: &CellId) -> Option<&Arc<CellUsageInfo>> {
        let usage = self.cell.cell_id.find_usage_in(proto)?;
        self.cell_usages.get(usage.usage_index() as usize)?.as_ref()
    }

    /// Number of instances of `proto` in this cell
    pub fn inst_count(&self, proto: &CellId) -> u32 {
        self.usage_info(proto).map_or(0, |u| u.inst_count)
    }

    /// Derived lookup tables, built on first request and cached
    pub fn memoization(&self) -> &Arc<Memoization> {
        self.memo.get_or_init(|| Arc::new(Memoization::build(self)))
    }

    pub fn has_memoization(&self) -> bool {
        self.memo.get().is_some()
    }

    pub(super) fn cached_memoization(&self) -> Option<&Arc<Memoization>> {
        self.memo.get()
    }

    pub fn node_by_id(&self, node_id: NodeId) -> Option<&Arc<ImmutableNodeInst>> {
        self.memoization().node_by_id(node_id)
    }
}

fn check_tech(cell: &ImmutableCell, tech_pool: &TechPool) -> Result<()> {
    let tech = cell.tech_id.as_ref().ok_or_else(|| {
        CircuitDbError::invalid_state(format!("cell {} has no technology", cell.cell_id.key()))
    })?;
    if !tech_pool.contains(tech) {
        return Err(CircuitDbError::invalid_state(format!(
            "technology {} of cell {} is not in the technology pool",
            tech.name(),
            cell.cell_id.key()
        )));
    }
    Ok(())
}

fn validate_arcs(arcs: &[Arc<ImmutableArcInst>]) -> Result<()> {
    let mut seen = BitSet::new();
    for (i, arc) in arcs.iter().enumerate() {
        if i > 0 {
            let prev = &arcs[i - 1];
            if (&prev.name, prev.arc_id) >= (&arc.name, arc.arc_id) {
                return Err(CircuitDbError::invalid_argument(format!(
                    "arcs[{}] {} {} is not after arcs[{}] {} {}",
                    i,
                    arc.name,
                    arc.arc_id,
                    i - 1,
                    prev.name,
                    prev.arc_id
                )));
            }
        }
        if arc.arc_id.0 > MAX_INSTANCE_ID {
            return Err(CircuitDbError::invalid_argument(format!(
                "arcs[{}] {} exceeds the largest id {}",
                i, arc.arc_id, MAX_INSTANCE_ID
            )));
        }
        let id = arc.arc_id.0 as usize;
        if seen.get(id) {
            return Err(CircuitDbError::invalid_argument(format!(
                "arcs[{}] duplicates {}",
                i, arc.arc_id
            )));
        }
        seen.set(id);
    }
    Ok(())
}

impl fmt::Debug for CellBackup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellBackup")
            .field("cell", &self.cell.cell_id)
            .field("revision", &self.revision)
            .field("modified", &self.modified)
            .field("nodes", &self.nodes.len())
            .field("arcs", &self.arcs.len())
            .field("exports", &self.exports.len())
            .field("defined_exports", &self.defined_exports)
            .field("deleted_exports", &self.deleted_exports)
            .finish()
    }
}
