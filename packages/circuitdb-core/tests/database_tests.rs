//! Database session: commit, undo/redo, configuration and concurrent readers

mod common;

use std::sync::Arc;
use std::thread;

use circuitdb_core::config::{DatabaseConfig, Preset};
use circuitdb_core::{CellChange, CircuitDbError, Database, Point, PortProtoId};
use common::*;
use prometheus::Registry;

fn open(fx: &Fixture, config: DatabaseConfig) -> Database {
    Database::new(
        Arc::clone(&fx.ids),
        Arc::clone(&fx.pool),
        config,
        &Registry::new(),
    )
    .unwrap()
}

fn add_pin(db: &Database, fx: &Fixture, cell: &circuitdb_core::CellId, id: u32, node: &str) {
    db.update_cell(cell, |b| {
        let mut nodes: Vec<_> = b.nodes().iter().map(|n| (**n).clone()).collect();
        nodes.push(prim_node(id, node, fx.pin.clone(), Point::ORIGIN));
        b.with(
            Arc::clone(b.cell()),
            b.revision() + 1,
            true,
            Some(sorted_nodes(nodes)),
            None,
            None,
        )
    })
    .unwrap();
}

#[test]
fn test_commit_undo_redo() {
    let fx = Fixture::new();
    let db = open(&fx, DatabaseConfig::preset(Preset::Debug));
    assert!(!db.can_undo());

    let created = db.new_cell("lib", "top", &fx.tech, 0).unwrap();
    let cell = created.cell_id().clone();
    add_pin(&db, &fx, &cell, 0, "a");
    add_pin(&db, &fx, &cell, 1, "b");
    assert_eq!(db.cell(&cell).unwrap().nodes().len(), 2);
    assert_eq!(db.undo_depth(), 3);

    let undone = db.undo().unwrap();
    assert_eq!(undone.cell(&cell).unwrap().nodes().len(), 1);
    assert_eq!(db.cell(&cell).unwrap().nodes().len(), 1);
    assert!(db.can_redo());

    let redone = db.redo().unwrap();
    assert_eq!(redone.cell(&cell).unwrap().nodes().len(), 2);
    assert!(!db.can_redo());

    db.undo().unwrap();
    db.undo().unwrap();
    db.undo().unwrap();
    assert!(db.cell(&cell).is_none());
    assert!(db.undo().is_none());

    // a new commit clears the redo stack
    db.redo().unwrap();
    add_pin(&db, &fx, &cell, 5, "z");
    assert!(!db.can_redo());

    assert_eq!(db.metrics().undos.get(), 4);
    assert_eq!(db.metrics().redos.get(), 2);
}

#[test]
fn test_edit_closure_may_read_the_published_state() {
    let fx = Fixture::new();
    let db = open(&fx, DatabaseConfig::preset(Preset::Debug));
    let created = db.new_cell("lib", "top", &fx.tech, 0).unwrap();
    let cell = created.cell_id().clone();

    let published = db
        .edit(|snapshot| {
            assert!(Arc::ptr_eq(snapshot, &db.snapshot()));
            let backup = db.cell(&cell).unwrap();
            assert_eq!(backup.revision(), created.revision());
            let next = backup.with(Arc::clone(backup.cell()), 1, true, None, None, None)?;
            Ok(vec![CellChange::Update(next)])
        })
        .unwrap();
    assert_eq!(published.cell(&cell).unwrap().revision(), 1);

    let updated = db
        .update_cell(&cell, |b| {
            assert_eq!(db.cell(&cell).unwrap().revision(), 1);
            b.with(Arc::clone(b.cell()), 2, true, None, None, None)
        })
        .unwrap();
    assert_eq!(updated.revision(), 2);
    assert_eq!(db.undo_depth(), 3);
}

#[test]
fn test_undo_depth_is_bounded() {
    let fx = Fixture::new();
    let config = DatabaseConfig::preset(Preset::Production)
        .undo_depth(2)
        .build()
        .unwrap();
    let db = open(&fx, config);
    let cell = db.new_cell("lib", "c", &fx.tech, 0).unwrap().cell_id().clone();
    for i in 0..5 {
        add_pin(&db, &fx, &cell, i, &format!("n{}", i));
    }
    assert_eq!(db.undo_depth(), 2);
    assert_eq!(db.metrics().undo_depth.get(), 2);
    db.undo().unwrap();
    db.undo().unwrap();
    assert!(!db.can_undo());
    assert_eq!(db.cell(&cell).unwrap().nodes().len(), 3);
}

#[test]
fn test_noop_and_rejected_commits() {
    let fx = Fixture::new();
    let db = open(&fx, DatabaseConfig::preset(Preset::Debug));
    let backup = db.new_cell("lib", "c", &fx.tech, 0).unwrap();

    let before = db.snapshot();
    let after = db.commit(vec![CellChange::Update(Arc::clone(&backup))]).unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(db.metrics().noop_commits.get(), 1);

    let result = db.update_cell(backup.cell_id(), |b| {
        b.with(
            Arc::clone(b.cell()),
            1,
            true,
            Some(
                vec![
                    Arc::new(prim_node(0, "b", fx.pin.clone(), Point::ORIGIN)),
                    Arc::new(prim_node(1, "a", fx.pin.clone(), Point::ORIGIN)),
                ]
                .into(),
            ),
            None,
            None,
        )
    });
    assert!(matches!(result, Err(CircuitDbError::InvalidArgument(_))));
    assert_eq!(db.metrics().rejected_commits.get(), 1);
    assert!(Arc::ptr_eq(&db.snapshot(), &after));
}

#[test]
fn test_check_on_commit_rejects_dangling_usage() {
    let fx = Fixture::new();
    let db = open(&fx, DatabaseConfig::preset(Preset::Debug));
    let sub = db.new_cell("lib", "sub", &fx.tech, 0).unwrap().cell_id().clone();
    let top = db.new_cell("lib", "top", &fx.tech, 0).unwrap().cell_id().clone();
    let a = sub.new_export_id("a").unwrap();

    db.update_cell(&sub, |b| {
        b.with(
            Arc::clone(b.cell()),
            1,
            true,
            Some(sorted_nodes(vec![prim_node(0, "p", fx.pin.clone(), Point::ORIGIN)])),
            None,
            Some(sorted_exports(vec![export_inst(&a, "a", 0, fx.pin_port())])),
        )
    })
    .unwrap();
    db.update_cell(&top, |b| {
        b.with(
            Arc::clone(b.cell()),
            1,
            true,
            Some(sorted_nodes(vec![
                sub_node(0, "i0", &sub, Point::ORIGIN),
                prim_node(1, "p", fx.pin.clone(), Point::ORIGIN),
            ])),
            Some(sorted_arcs(vec![arc_inst(
                0,
                "w",
                &fx.wire,
                (0, PortProtoId::Export(a.clone()), Point::ORIGIN),
                (1, fx.pin_port(), Point::ORIGIN),
            )])),
            None,
        )
    })
    .unwrap();

    let err = db
        .update_cell(&sub, |b| {
            b.with(
                Arc::clone(b.cell()),
                2,
                true,
                None,
                None,
                Some(sorted_exports(vec![])),
            )
        })
        .unwrap_err();
    assert!(matches!(err, CircuitDbError::DanglingReference(_)), "{}", err);
    assert_eq!(db.cell(&sub).unwrap().exports().len(), 1);
}

#[test]
fn test_eager_memoization() {
    let fx = Fixture::new();
    let config = DatabaseConfig::preset(Preset::Production).eager_memoization(true);
    let db = open(&fx, config);
    let backup = db.new_cell("lib", "c", &fx.tech, 0).unwrap();
    assert!(db.cell(backup.cell_id()).unwrap().has_memoization());
    assert_eq!(db.metrics().memo_builds.get(), 1);

    let lazy = open(&fx, DatabaseConfig::preset(Preset::Production));
    let backup = lazy.new_cell("lib", "d", &fx.tech, 0).unwrap();
    assert!(!lazy.cell(backup.cell_id()).unwrap().has_memoization());
}

#[test]
fn test_invalid_config_rejected() {
    let fx = Fixture::new();
    let config = DatabaseConfig::preset(Preset::Production).undo_depth(0);
    let result = Database::new(
        Arc::clone(&fx.ids),
        Arc::clone(&fx.pool),
        config,
        &Registry::new(),
    );
    assert!(matches!(result, Err(CircuitDbError::Config(_))));
}

#[test]
fn test_readers_see_complete_snapshots() {
    let fx = Fixture::new();
    let db = Arc::new(open(&fx, DatabaseConfig::preset(Preset::Production)));
    let cell = db.new_cell("lib", "c", &fx.tech, 0).unwrap().cell_id().clone();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let db = Arc::clone(&db);
            let cell = cell.clone();
            thread::spawn(move || {
                let mut last_revision = 0;
                for _ in 0..200 {
                    let snapshot = db.snapshot();
                    let backup = snapshot.cell(&cell).unwrap();
                    backup.check().unwrap();
                    assert_eq!(backup.nodes().len() as i64, backup.revision());
                    assert!(backup.revision() >= last_revision);
                    last_revision = backup.revision();
                }
            })
        })
        .collect();

    for i in 0..50 {
        add_pin(&db, &fx, &cell, i, &format!("n{}", i));
    }
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(db.cell(&cell).unwrap().nodes().len(), 50);
}
