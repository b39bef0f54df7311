//! Usage collector
//!
//! Recomputes, from a candidate node/arc/export set, how many times each
//! subcell is instantiated and which of its exports are referenced. The result
//! is merged against the previous usage array so that untouched slots keep
//! their `Arc`.

use std::sync::Arc;

use crate::errors::{CircuitDbError, Result};
use crate::features::identity::{CellId, ExportId, PortProtoId};
use crate::features::records::{ImmutableArcInst, ImmutableExport, ImmutableNodeInst};
use crate::shared::{share_bits, BitSet};

/// Accounting for one usage slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellUsageInfo {
    pub inst_count: u32,
    /// Chronological indices of the subcell's exports referenced from the parent
    pub used_exports: Arc<BitSet>,
}

/// Indexed by usage slot; `None` where the slot is unused
pub type UsageArray = Arc<[Option<Arc<CellUsageInfo>>]>;

pub fn no_usages() -> UsageArray {
    Arc::from(Vec::new())
}

#[derive(Default)]
struct Tally {
    inst_count: u32,
    used_exports: BitSet,
}

pub struct UsageCollector {
    tallies: Vec<Option<Tally>>,
}

impl UsageCollector {
    pub fn new(
        parent: &CellId,
        nodes: &[Arc<ImmutableNodeInst>],
        arcs: &[Arc<ImmutableArcInst>],
        exports: &[Arc<ImmutableExport>],
    ) -> Result<Self> {
        let mut collector = Self {
            tallies: Vec::new(),
        };

        for node in nodes {
            if let Some(proto) = node.proto_id.as_cell() {
                let usage = parent.usage_in(proto);
                collector.slot(usage.usage_index()).inst_count += 1;
            }
        }

        for arc in arcs {
            collector.add_port(parent, &arc.tail.port_id)?;
            collector.add_port(parent, &arc.head.port_id)?;
        }
        for export in exports {
            collector.add_port(parent, &export.original_port_id)?;
        }

        Ok(collector)
    }

    fn slot(&mut self, usage_index: u32) -> &mut Tally {
        let i = usage_index as usize;
        if self.tallies.len() <= i {
            self.tallies.resize_with(i + 1, || None);
        }
        self.tallies[i].get_or_insert_with(Tally::default)
    }

    fn add_port(&mut self, parent: &CellId, port: &PortProtoId) -> Result<()> {
        if let PortProtoId::Export(export) = port {
            let proto = export_parent(export)?;
            let usage = parent.usage_in(&proto);
            self.slot(usage.usage_index())
                .used_exports
                .set(export.chron_index() as usize);
        }
        Ok(())
    }

    /// Collected data merged against `old`: an unchanged slot keeps its old
    /// `Arc`, and when nothing changed `old` itself is returned
    pub fn merge(self, old: &UsageArray) -> UsageArray {
        let mut merged: Vec<Option<Arc<CellUsageInfo>>> = Vec::with_capacity(self.tallies.len());
        for (i, tally) in self.tallies.into_iter().enumerate() {
            let old_info = old.get(i).and_then(|o| o.as_ref());
            let info = match (tally, old_info) {
                (None, _) => None,
                (Some(t), Some(prev))
                    if t.inst_count == prev.inst_count && *prev.used_exports == t.used_exports =>
                {
                    Some(Arc::clone(prev))
                }
                (Some(t), prev) => {
                    let used_exports = match prev {
                        Some(prev) => share_bits(&prev.used_exports, t.used_exports),
                        None if t.used_exports.is_empty() => BitSet::empty(),
                        None => Arc::new(t.used_exports),
                    };
                    Some(Arc::new(CellUsageInfo {
                        inst_count: t.inst_count,
                        used_exports,
                    }))
                }
            };
            merged.push(info);
        }
        while matches!(merged.last(), Some(None)) {
            merged.pop();
        }

        let unchanged = merged.len() == old.len()
            && merged.iter().zip(old.iter()).all(|(new, prev)| match (new, prev) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            });
        if unchanged {
            Arc::clone(old)
        } else {
            Arc::from(merged)
        }
    }
}

/// Subcell owning `export`
pub(crate) fn export_parent(export: &ExportId) -> Result<CellId> {
    export.parent().ok_or_else(|| {
        CircuitDbError::invalid_argument(format!(
            "{:?} belongs to a cell that is no longer registered",
            export
        ))
    })
}
