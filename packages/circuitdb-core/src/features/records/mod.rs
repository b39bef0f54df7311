//! Immutable persistent records
//!
//! Pure value objects. A record never changes after construction; the
//! `with_*` methods return a modified copy. Snapshot sequences hold records
//! behind `Arc` so an unchanged record is shared between versions.

mod arc;
mod cell;
mod export;
mod node;

use std::sync::Arc;

pub use arc::{ArcEnd, ImmutableArcInst};
pub use cell::ImmutableCell;
pub use export::{ImmutableExport, PortCharacteristic};
pub use node::ImmutableNodeInst;

/// Reference-counted immutable sequence; `Arc::ptr_eq` is the sharing test
pub type ImmutableArray<T> = Arc<[T]>;

pub type NodeList = ImmutableArray<Arc<ImmutableNodeInst>>;
pub type ArcList = ImmutableArray<Arc<ImmutableArcInst>>;
pub type ExportList = ImmutableArray<Arc<ImmutableExport>>;

/// Build a sequence from owned records
pub fn array_of<T>(items: impl IntoIterator<Item = T>) -> ImmutableArray<Arc<T>> {
    items.into_iter().map(Arc::new).collect()
}
