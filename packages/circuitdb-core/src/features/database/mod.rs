//! Database session
//!
//! Publishes one current [`DesignSnapshot`] to any number of readers and
//! serializes writers. Every commit keeps the previous snapshot on a bounded
//! undo stack; undo and redo simply republish a retained snapshot.

mod metrics;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use prometheus::Registry;

pub use metrics::DatabaseMetrics;

use crate::config::{DatabaseConfig, Validatable};
use crate::errors::{CircuitDbError, Result};
use crate::features::identity::{CellId, IdManager, TechId};
use crate::features::records::ImmutableCell;
use crate::features::snapshot::{CellBackup, CellChange, DesignSnapshot};
use crate::features::technology::TechPool;
use crate::shared::models::Name;

#[derive(Default)]
struct History {
    undo: VecDeque<Arc<DesignSnapshot>>,
    redo: Vec<Arc<DesignSnapshot>>,
}

pub struct Database {
    ids: Arc<IdManager>,
    config: DatabaseConfig,
    metrics: DatabaseMetrics,
    current: RwLock<Arc<DesignSnapshot>>,
    /// Held for the whole of a commit, undo or redo; the single-writer lock
    history: Mutex<History>,
}

impl Database {
    pub fn new(
        ids: Arc<IdManager>,
        tech_pool: Arc<TechPool>,
        config: DatabaseConfig,
        registry: &Registry,
    ) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            "opening database (preset {}, undo depth {}, check on commit {})",
            config.get_preset(),
            config.undo_depth,
            config.check_on_commit
        );
        Ok(Self {
            ids,
            metrics: DatabaseMetrics::new(registry)?,
            config,
            current: RwLock::new(DesignSnapshot::empty(tech_pool)),
            history: Mutex::new(History::default()),
        })
    }

    pub fn ids(&self) -> &Arc<IdManager> {
        &self.ids
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn metrics(&self) -> &DatabaseMetrics {
        &self.metrics
    }

    /// Currently published snapshot
    pub fn snapshot(&self) -> Arc<DesignSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Latest backup of `cell_id`
    pub fn cell(&self, cell_id: &CellId) -> Option<Arc<CellBackup>> {
        self.snapshot().cell(cell_id).cloned()
    }

    pub fn commit(&self, changes: Vec<CellChange>) -> Result<Arc<DesignSnapshot>> {
        self.edit(|_| Ok(changes))
    }

    /// Compute changes against the current snapshot and publish the result.
    ///
    /// `f` runs under the writer lock, so the snapshot it sees is the one
    /// the changes are applied to. The lock is not reentrant: `f` may read
    /// through [`Database::snapshot`] or [`Database::cell`], but calling a
    /// writing method (`commit`, `edit`, `update_cell`, `new_cell`,
    /// `remove_cell`, `undo`, `redo`) or a history query (`can_undo`,
    /// `can_redo`, `undo_depth`) from inside `f` deadlocks.
    pub fn edit<F>(&self, f: F) -> Result<Arc<DesignSnapshot>>
    where
        F: FnOnce(&Arc<DesignSnapshot>) -> Result<Vec<CellChange>>,
    {
        let started = Instant::now();
        let mut history = self.history.lock();
        let current = self.snapshot();

        let next = match self.prepare(&current, f) {
            Ok(next) => next,
            Err(err) => {
                self.metrics.rejected_commits.inc();
                tracing::warn!("commit rejected: {}", err);
                return Err(err);
            }
        };
        if Arc::ptr_eq(&next, &current) {
            self.metrics.noop_commits.inc();
            return Ok(current);
        }

        if self.config.eager_memoization {
            for backup in next.cells() {
                if !backup.has_memoization() {
                    backup.memoization();
                    self.metrics.memo_builds.inc();
                }
            }
        }

        history.undo.push_back(current);
        while history.undo.len() > self.config.undo_depth {
            history.undo.pop_front();
        }
        history.redo.clear();
        *self.current.write() = Arc::clone(&next);

        self.metrics.commits.inc();
        self.metrics.undo_depth.set(history.undo.len() as i64);
        self.metrics
            .commit_latency
            .observe(started.elapsed().as_secs_f64());
        tracing::debug!(
            "published snapshot {} with {} cells",
            next.snapshot_id(),
            next.num_cells()
        );
        Ok(next)
    }

    fn prepare<F>(&self, current: &Arc<DesignSnapshot>, f: F) -> Result<Arc<DesignSnapshot>>
    where
        F: FnOnce(&Arc<DesignSnapshot>) -> Result<Vec<CellChange>>,
    {
        let changes = f(current)?;
        let next = current.with_cells(changes)?;
        if self.config.check_on_commit && !Arc::ptr_eq(&next, current) {
            next.check()?;
        }
        Ok(next)
    }

    /// Register a new cell with an empty backup in technology `tech`
    pub fn new_cell(
        &self,
        lib_name: &str,
        cell_name: &str,
        tech: &TechId,
        creation_date: i64,
    ) -> Result<Arc<CellBackup>> {
        let cell_id = self.ids.new_cell_id(lib_name, cell_name)?;
        let record = ImmutableCell::new(cell_id.clone(), Name::new(cell_name)?, creation_date)
            .with_tech(tech.clone());
        let pool = Arc::clone(self.snapshot().tech_pool());
        let backup = CellBackup::empty(record, pool)?;
        self.commit(vec![CellChange::Update(Arc::clone(&backup))])?;
        tracing::info!("created cell {}", cell_id.key());
        Ok(backup)
    }

    /// Replace the backup of `cell_id` with `f(current backup)`
    ///
    /// `f` runs under the writer lock with the same restriction as
    /// [`Database::edit`]: it must not call back into a writing method.
    pub fn update_cell<F>(&self, cell_id: &CellId, f: F) -> Result<Arc<CellBackup>>
    where
        F: FnOnce(&Arc<CellBackup>) -> Result<Arc<CellBackup>>,
    {
        let snapshot = self.edit(|snapshot| {
            let backup = snapshot.cell(cell_id).ok_or_else(|| {
                CircuitDbError::invalid_argument(format!(
                    "cell {} is not in the design",
                    cell_id.key()
                ))
            })?;
            Ok(vec![CellChange::Update(f(backup)?)])
        })?;
        snapshot.cell(cell_id).cloned().ok_or_else(|| {
            CircuitDbError::invalid_state(format!("cell {} vanished on commit", cell_id.key()))
        })
    }

    pub fn remove_cell(&self, cell_id: &CellId) -> Result<Arc<DesignSnapshot>> {
        self.commit(vec![CellChange::Remove(cell_id.clone())])
    }

    /// Republish the snapshot before the last commit
    pub fn undo(&self) -> Option<Arc<DesignSnapshot>> {
        let mut history = self.history.lock();
        let previous = history.undo.pop_back()?;
        let current = std::mem::replace(&mut *self.current.write(), Arc::clone(&previous));
        history.redo.push(current);
        self.metrics.undos.inc();
        self.metrics.undo_depth.set(history.undo.len() as i64);
        tracing::info!("undo to snapshot {}", previous.snapshot_id());
        Some(previous)
    }

    /// Republish the snapshot the last undo left
    pub fn redo(&self) -> Option<Arc<DesignSnapshot>> {
        let mut history = self.history.lock();
        let next = history.redo.pop()?;
        let current = std::mem::replace(&mut *self.current.write(), Arc::clone(&next));
        history.undo.push_back(current);
        while history.undo.len() > self.config.undo_depth {
            history.undo.pop_front();
        }
        self.metrics.redos.inc();
        self.metrics.undo_depth.set(history.undo.len() as i64);
        tracing::info!("redo to snapshot {}", next.snapshot_id());
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.history.lock().undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.history.lock().redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.history.lock().undo.len()
    }
}
