//! Full structural audit of a cell snapshot.
//!
//! O(n) and off the hot path: run from tests, debug builds, and commits when
//! the database is configured to check. Stops at the first violation.

use std::sync::Arc;

use rayon::prelude::*;

use super::cell_backup::CellBackup;
use crate::errors::{ensure_invariant, CircuitDbError, Result};
use crate::features::identity::{NodeId, NodeProtoId, PortProtoId};
use crate::features::records::ImmutableNodeInst;
use crate::features::usage::export_parent;
use crate::shared::BitSet;

/// Below this many records the self-checks run on the calling thread
const PARALLEL_THRESHOLD: usize = 1024;

impl CellBackup {
    pub fn check(&self) -> Result<()> {
        let result = self.check_all();
        if let Err(err) = &result {
            tracing::warn!("check failed for cell {}: {}", self.cell_id().key(), err);
        }
        result
    }

    fn check_all(&self) -> Result<()> {
        self.check_records()?;
        let node_index = self.check_nodes()?;
        self.check_arcs(&node_index)?;
        self.check_exports(&node_index)?;
        self.check_usages()?;
        self.check_export_index()?;
        if let Some(memo) = self.cached_memoization() {
            memo.check()?;
        }
        Ok(())
    }

    fn check_records(&self) -> Result<()> {
        self.cell.check()?;
        let tech = self.cell.tech_id.as_ref().ok_or_else(|| {
            CircuitDbError::invariant(format!("cell {} has no technology", self.cell_id().key()))
        })?;
        ensure_invariant!(
            self.tech_pool.contains(tech),
            "technology {} missing from the pool",
            tech.name()
        );

        if self.nodes.len() + self.arcs.len() + self.exports.len() < PARALLEL_THRESHOLD {
            self.nodes.iter().try_for_each(|n| n.check())?;
            self.arcs.iter().try_for_each(|a| a.check())?;
            self.exports.iter().try_for_each(|e| e.check())?;
        } else {
            self.nodes.par_iter().try_for_each(|n| n.check())?;
            self.arcs.par_iter().try_for_each(|a| a.check())?;
            self.exports.par_iter().try_for_each(|e| e.check())?;
        }
        Ok(())
    }

    /// Ordering, uniqueness and prototype checks; returns node id -> position
    fn check_nodes(&self) -> Result<Vec<Option<usize>>> {
        let mut node_index: Vec<Option<usize>> = Vec::new();
        let mut cell_centers = 0;
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                let prev = &self.nodes[i - 1];
                ensure_invariant!(
                    (&prev.name, prev.node_id) < (&node.name, node.node_id),
                    "nodes[{}] {} out of order",
                    i,
                    node.name
                );
            }
            let id = node.node_id.0 as usize;
            if node_index.len() <= id {
                node_index.resize(id + 1, None);
            }
            ensure_invariant!(node_index[id].is_none(), "nodes[{}] duplicates {}", i, node.node_id);
            node_index[id] = Some(i);

            match &node.proto_id {
                NodeProtoId::Primitive(p) => ensure_invariant!(
                    self.tech_pool.primitive(p).is_some(),
                    "nodes[{}] prototype {} not in the technology pool",
                    i,
                    p.full_name()
                ),
                NodeProtoId::Cell(c) => ensure_invariant!(
                    c != self.cell_id(),
                    "nodes[{}] instantiates its own cell",
                    i
                ),
            }
            if self.tech_pool.is_cell_center(&node.proto_id) {
                cell_centers += 1;
            }
        }
        ensure_invariant!(cell_centers <= 1, "{} cell-center nodes", cell_centers);
        Ok(node_index)
    }

    fn port_node<'a>(
        &'a self,
        node_index: &[Option<usize>],
        what: &str,
        node_id: NodeId,
        port: &PortProtoId,
    ) -> Result<&'a Arc<ImmutableNodeInst>> {
        let node = node_index
            .get(node_id.0 as usize)
            .copied()
            .flatten()
            .map(|i| &self.nodes[i])
            .ok_or_else(|| CircuitDbError::invariant(format!("{} refers to missing {}", what, node_id)))?;
        ensure_invariant!(
            port.belongs_to(&node.proto_id),
            "{} port {:?} is not a port of {:?}",
            what,
            port,
            node.proto_id
        );
        Ok(node)
    }

    fn check_arcs(&self, node_index: &[Option<usize>]) -> Result<()> {
        let mut seen = BitSet::new();
        for (i, arc) in self.arcs.iter().enumerate() {
            if i > 0 {
                let prev = &self.arcs[i - 1];
                ensure_invariant!(
                    (&prev.name, prev.arc_id) < (&arc.name, arc.arc_id),
                    "arcs[{}] {} out of order",
                    i,
                    arc.name
                );
            }
            ensure_invariant!(!seen.get(arc.arc_id.0 as usize), "arcs[{}] duplicates {}", i, arc.arc_id);
            seen.set(arc.arc_id.0 as usize);
            ensure_invariant!(
                self.tech_pool.arc_proto(&arc.proto_id).is_some(),
                "arcs[{}] prototype {} not in the technology pool",
                i,
                arc.proto_id.full_name()
            );
            self.port_node(node_index, &format!("arcs[{}] tail", i), arc.tail.node_id, &arc.tail.port_id)?;
            self.port_node(node_index, &format!("arcs[{}] head", i), arc.head.node_id, &arc.head.port_id)?;
        }
        Ok(())
    }

    fn check_exports(&self, node_index: &[Option<usize>]) -> Result<()> {
        for (i, export) in self.exports.iter().enumerate() {
            if i > 0 {
                ensure_invariant!(
                    self.exports[i - 1].name < export.name,
                    "exports[{}] {} out of order",
                    i,
                    export.name
                );
            }
            ensure_invariant!(
                export.export_id.is_in(self.cell_id()),
                "exports[{}] {:?} belongs to another cell",
                i,
                export.export_id
            );
            self.port_node(
                node_index,
                &format!("exports[{}]", i),
                export.original_node_id,
                &export.original_port_id,
            )?;
        }
        Ok(())
    }

    fn check_usages(&self) -> Result<()> {
        let cell_id = self.cell_id();
        let mut counts: Vec<u32> = Vec::with_capacity(self.cell_usages.len());
        let mut used: Vec<BitSet> = Vec::with_capacity(self.cell_usages.len());
        for (slot, info) in self.cell_usages.iter().enumerate() {
            ensure_invariant!(
                cell_id.usage(slot as u32).is_some(),
                "cell usage slot {} was never allocated",
                slot
            );
            if let Some(info) = info {
                ensure_invariant!(
                    info.inst_count > 0 || !info.used_exports.is_empty(),
                    "cell usage slot {} is empty but present",
                    slot
                );
            }
            counts.push(info.as_ref().map_or(0, |u| u.inst_count));
            used.push(BitSet::new());
        }
        ensure_invariant!(
            !matches!(self.cell_usages.last(), Some(None)),
            "cell usage array has a trailing empty slot"
        );

        for node in self.nodes.iter() {
            if let Some(proto) = node.proto_id.as_cell() {
                let slot = cell_id
                    .find_usage_in(proto)
                    .map(|u| u.usage_index() as usize)
                    .ok_or_else(|| {
                        CircuitDbError::invariant(format!("no usage slot for {:?}", proto))
                    })?;
                let count = counts.get_mut(slot).ok_or_else(|| {
                    CircuitDbError::invariant(format!("usage slot {} beyond the usage array", slot))
                })?;
                ensure_invariant!(*count > 0, "usage slot {} counts too few instances", slot);
                *count -= 1;
            }
        }
        if let Some(slot) = counts.iter().position(|&c| c != 0) {
            return Err(CircuitDbError::invariant(format!(
                "usage slot {} counts {} instances too many",
                slot, counts[slot]
            )));
        }

        let ports = self
            .arcs
            .iter()
            .flat_map(|a| [&a.tail.port_id, &a.head.port_id])
            .chain(self.exports.iter().map(|e| &e.original_port_id));
        for port in ports {
            if let PortProtoId::Export(export) = port {
                let proto = export_parent(export)?;
                let slot = cell_id
                    .find_usage_in(&proto)
                    .map(|u| u.usage_index() as usize)
                    .ok_or_else(|| {
                        CircuitDbError::invariant(format!("no usage slot for {:?}", proto))
                    })?;
                let bits = used.get_mut(slot).ok_or_else(|| {
                    CircuitDbError::invariant(format!("usage slot {} beyond the usage array", slot))
                })?;
                bits.set(export.chron_index() as usize);
            }
        }
        for (slot, info) in self.cell_usages.iter().enumerate() {
            let stored = info.as_ref().map(|u| &*u.used_exports);
            let empty = BitSet::new();
            ensure_invariant!(
                *stored.unwrap_or(&empty) == used[slot],
                "usage slot {} used exports {:?} but arcs and exports use {:?}",
                slot,
                stored,
                used[slot]
            );
        }
        Ok(())
    }

    fn check_export_index(&self) -> Result<()> {
        let expected_len = self
            .exports
            .iter()
            .map(|e| e.export_id.chron_index() as usize + 1)
            .max()
            .unwrap_or(0);
        ensure_invariant!(
            self.export_index.len() == expected_len,
            "export index length {} (expected {})",
            self.export_index.len(),
            expected_len
        );
        for (i, export) in self.exports.iter().enumerate() {
            let chron = export.export_id.chron_index() as usize;
            ensure_invariant!(
                self.export_index[chron] == Some(i as u32),
                "export index[{}] does not point to exports[{}]",
                chron,
                i
            );
        }
        ensure_invariant!(
            self.export_index.iter().flatten().count() == self.exports.len(),
            "export index has entries for absent exports"
        );

        for (chron, pos) in self.export_index.iter().enumerate() {
            ensure_invariant!(
                self.defined_exports.get(chron) == pos.is_some(),
                "defined exports disagree with the export index at {}",
                chron
            );
        }
        ensure_invariant!(
            self.defined_exports.len() <= self.export_index.len(),
            "defined exports extend past the export index"
        );
        ensure_invariant!(
            self.export_index.len() <= self.defined_exports_length as usize,
            "defined exports length {} below export index length {}",
            self.defined_exports_length,
            self.export_index.len()
        );
        ensure_invariant!(
            self.defined_exports_length as usize <= self.cell_id().num_export_ids(),
            "defined exports length {} exceeds allocated export ids",
            self.defined_exports_length
        );
        let deleted = self
            .defined_exports
            .complement_within(self.defined_exports_length as usize);
        ensure_invariant!(
            *self.deleted_exports == deleted,
            "deleted exports {:?} are not the complement of defined {:?}",
            self.deleted_exports,
            self.defined_exports
        );
        if self.defined_exports.is_empty() {
            ensure_invariant!(
                Arc::ptr_eq(&self.defined_exports, &BitSet::empty()),
                "empty defined exports are not the shared empty set"
            );
        }
        Ok(())
    }
}
