//! Infrastructure layer: binary stream codec and file-backed store

mod codec;
mod file_store;
mod reader;
mod writer;

pub use file_store::FileSnapshotStore;
pub use reader::SnapshotReader;
pub use writer::SnapshotWriter;
