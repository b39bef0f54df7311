//! Performance benchmarks for cell snapshots
//!
//! - Incremental `with(...)` touching only arcs vs. rebuilding nodes
//! - Memoization build
//! - Full checker pass

use std::sync::Arc;

use circuitdb_core::features::records::{ArcList, NodeList};
use circuitdb_core::{
    ArcEnd, ArcId, CellBackup, IdManager, ImmutableArcInst, ImmutableCell, ImmutableNodeInst,
    Name, NodeId, Orientation, Point, TechPool, Technology,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

struct Setup {
    base: Arc<CellBackup>,
    nodes: NodeList,
    arcs: ArcList,
}

fn setup(size: usize) -> Setup {
    let ids = IdManager::new();
    let tech = Technology::builder("bench")
        .pin("pin", &["a"])
        .arc("wire")
        .wipable_arc("unrouted")
        .build(&ids)
        .unwrap();
    let pin = tech.id().find_primitive_node_id("pin").unwrap();
    let wire = tech.id().find_arc_proto_id("unrouted").unwrap();
    let port = pin.port(0).unwrap();
    let tech_id = tech.id().clone();
    let pool = Arc::new(TechPool::new().with_tech(tech));

    let cell = ids.new_cell_id("lib", "bench").unwrap();
    let record = ImmutableCell::new(cell, Name::new("bench").unwrap(), 0).with_tech(tech_id);
    let empty = CellBackup::empty(record, pool).unwrap();

    let mut nodes: Vec<ImmutableNodeInst> = (0..size as u32)
        .map(|i| {
            ImmutableNodeInst::new(
                NodeId(i),
                pin.clone().into(),
                Name::new(&format!("n{}", i)).unwrap(),
                Point::new(i as i64 * 10, 0),
                Orientation::R0,
                Point::new(2, 2),
            )
        })
        .collect();
    nodes.sort_by(|a, b| a.name.cmp(&b.name));
    let nodes: NodeList = nodes.into_iter().map(Arc::new).collect();

    let mut arcs: Vec<ImmutableArcInst> = (1..size as u32)
        .map(|i| {
            ImmutableArcInst::new(
                ArcId(i),
                wire.clone(),
                Name::new(&format!("a{}", i)).unwrap(),
                ArcEnd::new(NodeId(i - 1), port.clone(), Point::new((i as i64 - 1) * 10, 0)),
                ArcEnd::new(NodeId(i), port.clone(), Point::new(i as i64 * 10, 0)),
                2,
            )
        })
        .collect();
    arcs.sort_by(|a, b| a.name.cmp(&b.name));
    let arcs: ArcList = arcs.into_iter().map(Arc::new).collect();

    let base = empty
        .with(
            Arc::clone(empty.cell()),
            1,
            false,
            Some(Arc::clone(&nodes)),
            Some(Arc::clone(&arcs)),
            None,
        )
        .unwrap();
    Setup { base, nodes, arcs }
}

fn bench_with(c: &mut Criterion) {
    let mut group = c.benchmark_group("cell_backup_with");
    for size in [100usize, 1_000, 10_000] {
        let s = setup(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("arcs_only", size), &s, |b, s| {
            let arcs: ArcList = s.arcs.iter().cloned().collect();
            b.iter(|| {
                let next = s
                    .base
                    .with(Arc::clone(s.base.cell()), 2, true, None, Some(Arc::clone(&arcs)), None)
                    .unwrap();
                black_box(next)
            });
        });

        group.bench_with_input(BenchmarkId::new("nodes_and_arcs", size), &s, |b, s| {
            let nodes: NodeList = s.nodes.iter().cloned().collect();
            let arcs: ArcList = s.arcs.iter().cloned().collect();
            b.iter(|| {
                let next = s
                    .base
                    .with(
                        Arc::clone(s.base.cell()),
                        2,
                        true,
                        Some(Arc::clone(&nodes)),
                        Some(Arc::clone(&arcs)),
                        None,
                    )
                    .unwrap();
                black_box(next)
            });
        });

        group.bench_with_input(BenchmarkId::new("noop", size), &s, |b, s| {
            b.iter(|| {
                let next = s
                    .base
                    .with(Arc::clone(s.base.cell()), 1, false, None, None, None)
                    .unwrap();
                black_box(next)
            });
        });
    }
    group.finish();
}

fn bench_memoization(c: &mut Criterion) {
    let mut group = c.benchmark_group("memoization_build");
    for size in [100usize, 1_000, 10_000] {
        let s = setup(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &s, |b, s| {
            b.iter(|| {
                // fresh snapshot each time so the cache is empty
                let fresh = s.base.with_tech_pool(Arc::new((**s.base.tech_pool()).clone())).unwrap();
                black_box(Arc::clone(fresh.memoization()))
            });
        });
    }
    group.finish();
}

fn bench_check(c: &mut Criterion) {
    let s = setup(10_000);
    c.bench_function("check_10k", |b| {
        b.iter(|| black_box(s.base.check()).unwrap());
    });
}

criterion_group!(benches, bench_with, bench_memoization, bench_check);
criterion_main!(benches);
