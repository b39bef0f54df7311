//! Cell-side identity handles: cells, their exports, and the usage slots a
//! cell allocates for each distinct subcell it instantiates.
//!
//! Export chronological indices are assigned per parent cell in creation
//! order and never reused. `external_id` is the export's name at creation
//! time; the current name lives in the export record and may change.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::errors::{CircuitDbError, Result};

/// Registry key of a cell: library name + cell name at creation time
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub lib_name: Arc<str>,
    pub cell_name: Arc<str>,
}

impl CellKey {
    pub fn new(lib_name: &str, cell_name: &str) -> Result<Self> {
        if lib_name.is_empty() || cell_name.is_empty() {
            return Err(CircuitDbError::invalid_argument(format!(
                "cell key {:?}:{:?} must have a library and a cell name",
                lib_name, cell_name
            )));
        }
        Ok(Self {
            lib_name: Arc::from(lib_name),
            cell_name: Arc::from(cell_name),
        })
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.lib_name, self.cell_name)
    }
}

/// Cell handle (identity semantics)
#[derive(Clone)]
pub struct CellId(Arc<CellIdData>);

pub(crate) struct CellIdData {
    key: CellKey,
    cell_index: u32,
    exports: RwLock<Vec<ExportId>>,
    usages_in: RwLock<Vec<CellUsage>>,
    usage_by_proto: DashMap<u32, u32>,
}

impl CellId {
    pub(crate) fn new(key: CellKey, cell_index: u32) -> Self {
        Self(Arc::new(CellIdData {
            key,
            cell_index,
            exports: RwLock::new(Vec::new()),
            usages_in: RwLock::new(Vec::new()),
            usage_by_proto: DashMap::new(),
        }))
    }

    pub fn key(&self) -> &CellKey {
        &self.0.key
    }

    /// Chronological index within the registry
    pub fn cell_index(&self) -> u32 {
        self.0.cell_index
    }

    /// Allocate a fresh export id with the next chronological index
    pub fn new_export_id(&self, external_id: &str) -> Result<ExportId> {
        if external_id.is_empty() {
            return Err(CircuitDbError::invalid_argument(format!(
                "export external id in cell {} must not be empty",
                self.key()
            )));
        }
        let mut exports = self.0.exports.write();
        let id = self.make_export_id(exports.len() as u32, external_id);
        exports.push(id.clone());
        Ok(id)
    }

    /// Return the export at `chron_index`, creating it only when it is the
    /// next index to be assigned. Used when restoring serialized ids.
    pub fn get_or_create_export_id(&self, chron_index: u32, external_id: &str) -> Result<ExportId> {
        if external_id.is_empty() {
            return Err(CircuitDbError::invalid_argument(format!(
                "export external id in cell {} must not be empty",
                self.key()
            )));
        }
        if let Some(existing) = self.export_id(chron_index) {
            if existing.external_id() != external_id {
                return Err(CircuitDbError::invalid_argument(format!(
                    "export #{} of {} is {:?}, not {:?}",
                    chron_index,
                    self.key(),
                    existing.external_id(),
                    external_id
                )));
            }
            return Ok(existing);
        }

        let mut exports = self.0.exports.write();
        // another writer may have created it between the read and the write lock
        if let Some(existing) = exports.get(chron_index as usize) {
            if existing.external_id() == external_id {
                return Ok(existing.clone());
            }
            return Err(CircuitDbError::invalid_argument(format!(
                "export #{} of {} was concurrently created as {:?}",
                chron_index,
                self.key(),
                existing.external_id()
            )));
        }
        if chron_index as usize != exports.len() {
            return Err(CircuitDbError::invalid_argument(format!(
                "export #{} of {} skips chronological indices (next is {})",
                chron_index,
                self.key(),
                exports.len()
            )));
        }
        let id = self.make_export_id(chron_index, external_id);
        exports.push(id.clone());
        Ok(id)
    }

    fn make_export_id(&self, chron_index: u32, external_id: &str) -> ExportId {
        ExportId(Arc::new(ExportIdData {
            parent: Arc::downgrade(&self.0),
            parent_index: self.cell_index(),
            chron_index,
            external_id: Arc::from(external_id),
        }))
    }

    pub fn export_id(&self, chron_index: u32) -> Option<ExportId> {
        self.0.exports.read().get(chron_index as usize).cloned()
    }

    pub fn num_export_ids(&self) -> usize {
        self.0.exports.read().len()
    }

    /// All export ids ever allocated, in chronological order
    pub fn export_ids(&self) -> Vec<ExportId> {
        self.0.exports.read().clone()
    }

    /// Usage slot of `proto` inside this cell, allocated on first request
    pub fn usage_in(&self, proto: &CellId) -> CellUsage {
        if let Some(usage) = self.find_usage_in(proto) {
            return usage;
        }
        let mut usages = self.0.usages_in.write();
        if let Some(index) = self.0.usage_by_proto.get(&proto.cell_index()) {
            return usages[*index as usize].clone();
        }
        let usage = CellUsage(Arc::new(CellUsageData {
            parent_index: self.cell_index(),
            proto: proto.clone(),
            usage_index: usages.len() as u32,
        }));
        self.0
            .usage_by_proto
            .insert(proto.cell_index(), usage.usage_index());
        usages.push(usage.clone());
        usage
    }

    /// Usage slot of `proto` if one was ever allocated
    pub fn find_usage_in(&self, proto: &CellId) -> Option<CellUsage> {
        let index = *self.0.usage_by_proto.get(&proto.cell_index())?;
        self.0.usages_in.read().get(index as usize).cloned()
    }

    pub fn usage(&self, usage_index: u32) -> Option<CellUsage> {
        self.0.usages_in.read().get(usage_index as usize).cloned()
    }

    pub fn num_usages_in(&self) -> usize {
        self.0.usages_in.read().len()
    }
}

impl PartialEq for CellId {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for CellId {}

impl Hash for CellId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.cell_index.hash(state);
    }
}

impl fmt::Debug for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CellId(#{} {})", self.cell_index(), self.key())
    }
}

/// Export handle (identity semantics)
#[derive(Clone)]
pub struct ExportId(Arc<ExportIdData>);

struct ExportIdData {
    parent: Weak<CellIdData>,
    parent_index: u32,
    chron_index: u32,
    external_id: Arc<str>,
}

impl ExportId {
    pub fn chron_index(&self) -> u32 {
        self.0.chron_index
    }

    pub fn external_id(&self) -> &str {
        &self.0.external_id
    }

    /// Registry index of the owning cell
    pub fn parent_index(&self) -> u32 {
        self.0.parent_index
    }

    /// Owning cell, if its registry entry is still alive
    pub fn parent(&self) -> Option<CellId> {
        self.0.parent.upgrade().map(CellId)
    }

    pub fn is_in(&self, cell: &CellId) -> bool {
        Weak::as_ptr(&self.0.parent) == Arc::as_ptr(&cell.0)
    }
}

impl PartialEq for ExportId {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ExportId {}

impl Hash for ExportId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.0.parent_index, self.0.chron_index).hash(state);
    }
}

impl fmt::Debug for ExportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExportId(cell#{}:{} {:?})",
            self.parent_index(),
            self.chron_index(),
            self.external_id()
        )
    }
}

/// One usage slot: `proto` instantiated inside the cell at `parent_index`
#[derive(Clone)]
pub struct CellUsage(Arc<CellUsageData>);

struct CellUsageData {
    parent_index: u32,
    proto: CellId,
    usage_index: u32,
}

impl CellUsage {
    pub fn parent_index(&self) -> u32 {
        self.0.parent_index
    }

    pub fn proto(&self) -> &CellId {
        &self.0.proto
    }

    pub fn usage_index(&self) -> u32 {
        self.0.usage_index
    }
}

impl PartialEq for CellUsage {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for CellUsage {}

impl fmt::Debug for CellUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CellUsage(#{} in cell#{} of {:?})",
            self.usage_index(),
            self.parent_index(),
            self.proto()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(name: &str, index: u32) -> CellId {
        CellId::new(CellKey::new("lib", name).unwrap(), index)
    }

    #[test]
    fn test_export_ids_are_chronological_and_never_reused() {
        let c = cell("inv", 0);
        let out = c.new_export_id("out").unwrap();
        let again = c.new_export_id("out").unwrap();
        assert_eq!(out.chron_index(), 0);
        assert_eq!(again.chron_index(), 1);
        assert_ne!(out, again);
        assert!(out.is_in(&c));
        assert_eq!(out.parent(), Some(c.clone()));
        assert_eq!(c.num_export_ids(), 2);
    }

    #[test]
    fn test_empty_external_id_rejected() {
        let c = cell("inv", 0);
        assert!(matches!(
            c.new_export_id(""),
            Err(CircuitDbError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_get_or_create_export_id_rules() {
        let c = cell("inv", 0);
        let a = c.get_or_create_export_id(0, "a").unwrap();
        assert_eq!(c.get_or_create_export_id(0, "a").unwrap(), a);
        assert!(c.get_or_create_export_id(0, "b").is_err());
        assert!(c.get_or_create_export_id(5, "gap").is_err());
        assert_eq!(c.get_or_create_export_id(1, "b").unwrap().chron_index(), 1);
    }

    #[test]
    fn test_usage_slots() {
        let top = cell("top", 0);
        let inv = cell("inv", 1);
        let nand = cell("nand", 2);

        let u_inv = top.usage_in(&inv);
        let u_nand = top.usage_in(&nand);
        assert_eq!(u_inv.usage_index(), 0);
        assert_eq!(u_nand.usage_index(), 1);
        assert_eq!(top.usage_in(&inv), u_inv);
        assert_eq!(top.find_usage_in(&nand), Some(u_nand));
        assert!(inv.find_usage_in(&top).is_none());
        assert_eq!(u_inv.proto(), &inv);
        assert_eq!(u_inv.parent_index(), 0);
    }
}
