//! Custom assertions

use std::sync::Arc;

use circuitdb_core::CellBackup;

/// Assert two `Arc`s point to the same allocation
#[track_caller]
pub fn assert_shared<T: ?Sized>(a: &Arc<T>, b: &Arc<T>, what: &str) {
    assert!(Arc::ptr_eq(a, b), "{} should be shared", what);
}

#[track_caller]
pub fn assert_not_shared<T: ?Sized>(a: &Arc<T>, b: &Arc<T>, what: &str) {
    assert!(!Arc::ptr_eq(a, b), "{} should be rebuilt", what);
}

/// Every field of `a` is reference-equal to the field of `b`
#[track_caller]
pub fn assert_fields_shared(a: &CellBackup, b: &CellBackup) {
    assert_shared(a.cell(), b.cell(), "cell record");
    assert_eq!(a.revision(), b.revision());
    assert_eq!(a.is_modified(), b.is_modified());
    assert_shared(a.nodes(), b.nodes(), "nodes");
    assert_shared(a.arcs(), b.arcs(), "arcs");
    assert_shared(a.exports(), b.exports(), "exports");
    assert_shared(a.cell_usages(), b.cell_usages(), "cell usages");
    assert_shared(a.export_index(), b.export_index(), "export index");
    assert_shared(a.defined_exports(), b.defined_exports(), "defined exports");
    assert_shared(a.deleted_exports(), b.deleted_exports(), "deleted exports");
    assert_eq!(a.defined_exports_length(), b.defined_exports_length());
}

/// Run the full checker and report the violation on failure
#[track_caller]
pub fn assert_checks(backup: &CellBackup) {
    if let Err(err) = backup.check() {
        panic!("check failed for {:?}: {}", backup, err);
    }
}
