//! Derived lookup tables of one cell snapshot.
//!
//! Built once per snapshot from its sequences and never updated in place: a
//! successor snapshot builds its own. The tables hold `Arc`s of the
//! sequences they index, not the snapshot itself, so caching the result on
//! the snapshot forms no cycle.

use std::cmp::Ordering;
use std::sync::Arc;

use super::cell_backup::CellBackup;
use crate::errors::{ensure_invariant, Result};
use crate::features::identity::{NodeId, PortProtoId};
use crate::features::records::{
    ArcList, ExportList, ImmutableArcInst, ImmutableExport, ImmutableNodeInst, NodeList,
};
use crate::shared::models::{Point, Rect};
use crate::shared::BitSet;

pub struct Memoization {
    nodes: NodeList,
    arcs: ArcList,
    exports: ExportList,
    /// Node id -> position in `nodes`
    node_index: Vec<Option<u32>>,
    /// Arc-end tokens `arc_index * 2 + end`, sorted by (node id, port chron, token)
    arc_ends: Vec<u32>,
    /// Positions in `exports`, sorted by (original node id, port chron, position)
    sorted_exports: Vec<u32>,
    wiped: BitSet,
    bounds: Option<Rect>,
}

impl Memoization {
    pub fn build(backup: &CellBackup) -> Memoization {
        let nodes = Arc::clone(backup.nodes());
        let arcs = Arc::clone(backup.arcs());
        let exports = Arc::clone(backup.exports());
        let pool = backup.tech_pool();

        let mut node_index: Vec<Option<u32>> = Vec::new();
        for (i, node) in nodes.iter().enumerate() {
            let id = node.node_id.0 as usize;
            if node_index.len() <= id {
                node_index.resize(id + 1, None);
            }
            node_index[id] = Some(i as u32);
        }

        let mut arc_ends: Vec<u32> = (0..(arcs.len() * 2) as u32).collect();
        arc_ends.sort_unstable_by(|&a, &b| cmp_arc_ends(&arcs, a, b));

        let mut sorted_exports: Vec<u32> = (0..exports.len() as u32).collect();
        sorted_exports.sort_unstable_by(|&a, &b| cmp_exports(&exports, a, b));

        let mut wiped = BitSet::new();
        for arc in arcs.iter() {
            if pool.is_wipable(&arc.proto_id) {
                wiped.set(arc.tail.node_id.0 as usize);
                wiped.set(arc.head.node_id.0 as usize);
            }
        }
        let marked: Vec<usize> = wiped.iter().collect();
        for id in marked {
            let eligible = node_index
                .get(id)
                .copied()
                .flatten()
                .map_or(false, |i| pool.is_wipe_on_1or2(&nodes[i as usize].proto_id));
            if !eligible {
                wiped.clear(id);
            }
        }

        let bounds = compute_bounds(&nodes, &arcs);

        tracing::debug!(
            "memoized cell {}: {} arc ends, {} exports, {} wiped nodes",
            backup.cell_id().key(),
            arc_ends.len(),
            sorted_exports.len(),
            wiped.count_ones()
        );

        Memoization {
            nodes,
            arcs,
            exports,
            node_index,
            arc_ends,
            sorted_exports,
            wiped,
            bounds,
        }
    }

    /// Position of `node_id` in the node sequence
    pub fn node_index(&self, node_id: NodeId) -> Option<usize> {
        self.node_index
            .get(node_id.0 as usize)
            .copied()
            .flatten()
            .map(|i| i as usize)
    }

    pub fn node_by_id(&self, node_id: NodeId) -> Option<&Arc<ImmutableNodeInst>> {
        self.node_index(node_id).map(|i| &self.nodes[i])
    }

    /// Node owning the port plus the port, if the port belongs to its prototype
    pub fn resolve_port<'a>(
        &'a self,
        node_id: NodeId,
        port: &'a PortProtoId,
    ) -> Option<(&'a Arc<ImmutableNodeInst>, &'a PortProtoId)> {
        let node = self.node_by_id(node_id)?;
        port.belongs_to(&node.proto_id).then_some((node, port))
    }

    /// Union of node extents and arc extents; `None` for an empty cell
    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    fn arc_end_range(&self, node_id: NodeId, port_chron: u32) -> &[u32] {
        let key = (node_id, port_chron);
        let lo = self
            .arc_ends
            .partition_point(|&t| arc_end_key(&self.arcs, t) < key);
        let hi = self
            .arc_ends
            .partition_point(|&t| arc_end_key(&self.arcs, t) <= key);
        &self.arc_ends[lo..hi]
    }

    /// Arcs ending on `port` of `node_id`, with the end index (`TAIL`/`HEAD`)
    pub fn connections(
        &self,
        node_id: NodeId,
        port: &PortProtoId,
    ) -> impl Iterator<Item = (&Arc<ImmutableArcInst>, usize)> + '_ {
        self.arc_end_range(node_id, port.chron_index())
            .iter()
            .map(move |&t| (&self.arcs[(t / 2) as usize], (t % 2) as usize))
    }

    pub fn has_connections(&self, node_id: NodeId, port: &PortProtoId) -> bool {
        !self.arc_end_range(node_id, port.chron_index()).is_empty()
    }

    /// Number of arc ends on any port of `node_id`
    pub fn num_connections(&self, node_id: NodeId) -> usize {
        let lo = self
            .arc_ends
            .partition_point(|&t| arc_end_key(&self.arcs, t).0 < node_id);
        let hi = self
            .arc_ends
            .partition_point(|&t| arc_end_key(&self.arcs, t).0 <= node_id);
        hi - lo
    }

    fn export_range(&self, node_id: NodeId, port_chron: u32) -> &[u32] {
        let key = (node_id, port_chron);
        let lo = self
            .sorted_exports
            .partition_point(|&e| export_key(&self.exports, e) < key);
        let hi = self
            .sorted_exports
            .partition_point(|&e| export_key(&self.exports, e) <= key);
        &self.sorted_exports[lo..hi]
    }

    /// Exports re-exposing `port` of `node_id`
    pub fn exports_on(
        &self,
        node_id: NodeId,
        port: &PortProtoId,
    ) -> impl Iterator<Item = &Arc<ImmutableExport>> + '_ {
        self.export_range(node_id, port.chron_index())
            .iter()
            .map(move |&e| &self.exports[e as usize])
    }

    pub fn has_exports(&self, node_id: NodeId, port: &PortProtoId) -> bool {
        !self.export_range(node_id, port.chron_index()).is_empty()
    }

    pub fn is_wiped(&self, node_id: NodeId) -> bool {
        self.wiped.get(node_id.0 as usize)
    }

    /// Verify the tables against the sequences they were built from
    pub fn check(&self) -> Result<()> {
        ensure_invariant!(
            self.arc_ends.len() == self.arcs.len() * 2,
            "memoization holds {} arc ends for {} arcs",
            self.arc_ends.len(),
            self.arcs.len()
        );
        let mut seen = BitSet::new();
        for (i, &token) in self.arc_ends.iter().enumerate() {
            ensure_invariant!(
                (token as usize) < self.arc_ends.len() && !seen.get(token as usize),
                "memoization arc end token {} at {} is out of range or repeated",
                token,
                i
            );
            seen.set(token as usize);
            if i > 0 {
                ensure_invariant!(
                    cmp_arc_ends(&self.arcs, self.arc_ends[i - 1], token) == Ordering::Less,
                    "memoization arc ends unsorted at {}",
                    i
                );
            }
        }

        ensure_invariant!(
            self.sorted_exports.len() == self.exports.len(),
            "memoization holds {} exports for {}",
            self.sorted_exports.len(),
            self.exports.len()
        );
        for i in 1..self.sorted_exports.len() {
            ensure_invariant!(
                cmp_exports(&self.exports, self.sorted_exports[i - 1], self.sorted_exports[i])
                    == Ordering::Less,
                "memoization exports unsorted at {}",
                i
            );
        }

        for (id, pos) in self.node_index.iter().enumerate() {
            if let Some(pos) = pos {
                ensure_invariant!(
                    self.nodes.get(*pos as usize).map(|n| n.node_id.0 as usize) == Some(id),
                    "memoization node index for node#{} points to {}",
                    id,
                    pos
                );
            }
        }
        ensure_invariant!(
            self.node_index.iter().flatten().count() == self.nodes.len(),
            "memoization indexes {} of {} nodes",
            self.node_index.iter().flatten().count(),
            self.nodes.len()
        );
        for id in self.wiped.iter() {
            ensure_invariant!(
                self.node_index(NodeId(id as u32)).is_some(),
                "memoization marks missing node#{} as wiped",
                id
            );
        }
        Ok(())
    }
}

fn arc_end_key(arcs: &[Arc<ImmutableArcInst>], token: u32) -> (NodeId, u32) {
    let end = arcs[(token / 2) as usize].end((token % 2) as usize);
    (end.node_id, end.port_id.chron_index())
}

fn cmp_arc_ends(arcs: &[Arc<ImmutableArcInst>], a: u32, b: u32) -> Ordering {
    arc_end_key(arcs, a)
        .cmp(&arc_end_key(arcs, b))
        .then(a.cmp(&b))
}

fn export_key(exports: &[Arc<ImmutableExport>], pos: u32) -> (NodeId, u32) {
    let e = &exports[pos as usize];
    (e.original_node_id, e.original_port_id.chron_index())
}

fn cmp_exports(exports: &[Arc<ImmutableExport>], a: u32, b: u32) -> Ordering {
    export_key(exports, a)
        .cmp(&export_key(exports, b))
        .then(a.cmp(&b))
}

fn compute_bounds(nodes: &[Arc<ImmutableNodeInst>], arcs: &[Arc<ImmutableArcInst>]) -> Option<Rect> {
    let node_rects = nodes.iter().map(|n| n.bounds());
    let arc_rects = arcs.iter().map(|a| {
        let hw = a.width / 2;
        let (t, h) = (a.tail.location, a.head.location);
        Rect {
            lo: Point::new(t.x.min(h.x) - hw, t.y.min(h.y) - hw),
            hi: Point::new(t.x.max(h.x) + hw, t.y.max(h.y) + hw),
        }
    });
    node_rects.chain(arc_rects).reduce(|acc, r| acc.union(&r))
}
