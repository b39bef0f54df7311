//! Identity registry
//!
//! Owned by the hosting session and passed by reference; tests build a fresh
//! registry per case. Lookups go through `DashMap`/read locks; creation is
//! serialized by `create_lock` so every key maps to exactly one handle.

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};

use super::cell_id::{CellId, CellKey, ExportId};
use super::tech_ids::TechId;
use crate::errors::{CircuitDbError, Result};

#[derive(Default)]
pub struct IdManager {
    techs: RwLock<Vec<TechId>>,
    tech_by_name: DashMap<String, TechId>,
    cells: RwLock<Vec<CellId>>,
    cell_by_key: DashMap<CellKey, CellId>,
    create_lock: Mutex<()>,
}

impl IdManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create_tech_id(&self, name: &str) -> Result<TechId> {
        if name.is_empty() {
            return Err(CircuitDbError::invalid_argument("technology name must not be empty"));
        }
        if let Some(id) = self.tech_by_name.get(name) {
            return Ok(id.clone());
        }

        let _guard = self.create_lock.lock();
        if let Some(id) = self.tech_by_name.get(name) {
            return Ok(id.clone());
        }
        let mut techs = self.techs.write();
        let id = TechId::new(name, techs.len() as u32);
        techs.push(id.clone());
        self.tech_by_name.insert(name.to_string(), id.clone());
        tracing::debug!("registered technology {} as #{}", name, id.tech_index());
        Ok(id)
    }

    pub fn find_tech_id(&self, name: &str) -> Option<TechId> {
        self.tech_by_name.get(name).map(|id| id.clone())
    }

    pub fn tech_id(&self, tech_index: u32) -> Option<TechId> {
        self.techs.read().get(tech_index as usize).cloned()
    }

    pub fn num_techs(&self) -> usize {
        self.techs.read().len()
    }

    pub fn get_or_create_cell_id(&self, lib_name: &str, cell_name: &str) -> Result<CellId> {
        let key = CellKey::new(lib_name, cell_name)?;
        if let Some(id) = self.cell_by_key.get(&key) {
            return Ok(id.clone());
        }

        let _guard = self.create_lock.lock();
        if let Some(id) = self.cell_by_key.get(&key) {
            return Ok(id.clone());
        }
        let mut cells = self.cells.write();
        let id = CellId::new(key.clone(), cells.len() as u32);
        cells.push(id.clone());
        self.cell_by_key.insert(key, id.clone());
        tracing::debug!("registered cell {} as #{}", id.key(), id.cell_index());
        Ok(id)
    }

    /// Create a cell id; fails if the key is already registered
    pub fn new_cell_id(&self, lib_name: &str, cell_name: &str) -> Result<CellId> {
        let key = CellKey::new(lib_name, cell_name)?;
        if self.cell_by_key.contains_key(&key) {
            return Err(CircuitDbError::invalid_argument(format!(
                "cell {} is already registered",
                key
            )));
        }
        self.get_or_create_cell_id(lib_name, cell_name)
    }

    pub fn find_cell_id(&self, key: &CellKey) -> Option<CellId> {
        self.cell_by_key.get(key).map(|id| id.clone())
    }

    pub fn cell_id(&self, cell_index: u32) -> Option<CellId> {
        self.cells.read().get(cell_index as usize).cloned()
    }

    pub fn num_cells(&self) -> usize {
        self.cells.read().len()
    }

    /// Same handle for the same `(parent, chron_index)` for the registry's
    /// lifetime; only the next sequential index may be created.
    pub fn get_or_create_export_id(
        &self,
        parent: &CellId,
        chron_index: u32,
        external_id: &str,
    ) -> Result<ExportId> {
        self.check_owned(parent)?;
        parent.get_or_create_export_id(chron_index, external_id)
    }

    /// Fresh export id in `parent`
    pub fn new_export_id(&self, parent: &CellId, external_id: &str) -> Result<ExportId> {
        self.check_owned(parent)?;
        parent.new_export_id(external_id)
    }

    fn check_owned(&self, cell: &CellId) -> Result<()> {
        match self.cell_id(cell.cell_index()) {
            Some(own) if own == *cell => Ok(()),
            _ => Err(CircuitDbError::invalid_argument(format!(
                "{:?} is not registered in this id manager",
                cell
            ))),
        }
    }
}
