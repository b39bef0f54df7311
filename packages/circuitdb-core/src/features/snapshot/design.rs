//! Whole-design snapshot: one cell backup per cell, indexed by cell index.

use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;

use super::cell_backup::CellBackup;
use crate::errors::{ensure_invariant, CircuitDbError, Result};
use crate::features::identity::CellId;
use crate::features::records::ImmutableArray;
use crate::features::technology::TechPool;

/// One edit applied by [`DesignSnapshot::with_cells`]
#[derive(Debug, Clone)]
pub enum CellChange {
    Update(Arc<CellBackup>),
    Remove(CellId),
}

pub struct DesignSnapshot {
    snapshot_id: u64,
    tech_pool: Arc<TechPool>,
    cells: ImmutableArray<Option<Arc<CellBackup>>>,
}

impl DesignSnapshot {
    pub fn empty(tech_pool: Arc<TechPool>) -> Arc<DesignSnapshot> {
        Arc::new(DesignSnapshot {
            snapshot_id: 0,
            tech_pool,
            cells: Arc::from(Vec::new()),
        })
    }

    /// Successor with `changes` applied; untouched cells are shared.
    ///
    /// Returns the receiver when every change is a no-op.
    pub fn with_cells(
        self: &Arc<Self>,
        changes: impl IntoIterator<Item = CellChange>,
    ) -> Result<Arc<DesignSnapshot>> {
        let mut cells: Vec<Option<Arc<CellBackup>>> = self.cells.to_vec();
        let mut changed = false;

        for change in changes {
            match change {
                CellChange::Update(backup) => {
                    if !Arc::ptr_eq(backup.tech_pool(), &self.tech_pool) {
                        return Err(CircuitDbError::invalid_argument(format!(
                            "cell {} was built against another technology pool",
                            backup.cell_id().key()
                        )));
                    }
                    let slot = backup.cell_id().cell_index() as usize;
                    if cells.len() <= slot {
                        cells.resize(slot + 1, None);
                    }
                    if cells[slot].as_ref().map_or(true, |old| !Arc::ptr_eq(old, &backup)) {
                        cells[slot] = Some(backup);
                        changed = true;
                    }
                }
                CellChange::Remove(cell_id) => {
                    let slot = cell_id.cell_index() as usize;
                    if let Some(entry) = cells.get_mut(slot) {
                        if entry.as_ref().map_or(false, |b| *b.cell_id() == cell_id) {
                            *entry = None;
                            changed = true;
                        }
                    }
                }
            }
        }

        if !changed {
            return Ok(Arc::clone(self));
        }
        while matches!(cells.last(), Some(None)) {
            cells.pop();
        }
        Ok(Arc::new(DesignSnapshot {
            snapshot_id: self.snapshot_id + 1,
            tech_pool: Arc::clone(&self.tech_pool),
            cells: Arc::from(cells),
        }))
    }

    /// Sequence number, increasing along a chain of successors
    pub fn snapshot_id(&self) -> u64 {
        self.snapshot_id
    }

    pub fn tech_pool(&self) -> &Arc<TechPool> {
        &self.tech_pool
    }

    pub fn cell(&self, cell_id: &CellId) -> Option<&Arc<CellBackup>> {
        self.cells
            .get(cell_id.cell_index() as usize)?
            .as_ref()
            .filter(|b| b.cell_id() == cell_id)
    }

    pub fn cells(&self) -> impl Iterator<Item = &Arc<CellBackup>> {
        self.cells.iter().flatten()
    }

    pub fn num_cells(&self) -> usize {
        self.cells().count()
    }

    /// Every cell's own audit, then references across cells
    pub fn check(&self) -> Result<()> {
        for (slot, backup) in self.cells.iter().enumerate() {
            if let Some(backup) = backup {
                ensure_invariant!(
                    backup.cell_id().cell_index() as usize == slot,
                    "cell {} stored in slot {}",
                    backup.cell_id().key(),
                    slot
                );
                ensure_invariant!(
                    Arc::ptr_eq(backup.tech_pool(), &self.tech_pool),
                    "cell {} uses another technology pool",
                    backup.cell_id().key()
                );
            }
        }

        self.cells
            .par_iter()
            .filter_map(|b| b.as_ref())
            .try_for_each(|b| b.check())?;

        for backup in self.cells() {
            self.check_usages_of(backup)?;
        }
        Ok(())
    }

    fn check_usages_of(&self, backup: &CellBackup) -> Result<()> {
        let cell_id = backup.cell_id();
        for (slot, info) in backup.cell_usages().iter().enumerate() {
            let Some(info) = info else { continue };
            let usage = cell_id.usage(slot as u32).ok_or_else(|| {
                CircuitDbError::invariant(format!(
                    "cell {} usage slot {} was never allocated",
                    cell_id.key(),
                    slot
                ))
            })?;
            let proto = usage.proto();
            let sub = self.cell(proto).ok_or_else(|| {
                CircuitDbError::invariant(format!(
                    "cell {} instantiates {} which is not in the design",
                    cell_id.key(),
                    proto.key()
                ))
            })?;

            if info.used_exports.intersects(sub.deleted_exports()) {
                let gone: Vec<usize> = info
                    .used_exports
                    .intersection(sub.deleted_exports())
                    .iter()
                    .collect();
                return Err(CircuitDbError::dangling(format!(
                    "cell {} uses deleted exports {:?} of {}",
                    cell_id.key(),
                    gone,
                    proto.key()
                )));
            }
            ensure_invariant!(
                info.used_exports.is_subset(sub.defined_exports()),
                "cell {} uses exports {:?} never defined in {}",
                cell_id.key(),
                info.used_exports,
                proto.key()
            );
        }
        Ok(())
    }
}

impl fmt::Debug for DesignSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DesignSnapshot")
            .field("snapshot_id", &self.snapshot_id)
            .field("cells", &self.num_cells())
            .finish()
    }
}
