//! File-backed snapshot store
//!
//! One `<name>.cdb` file per snapshot under a root directory. Saves go to a
//! sibling temp file first and are renamed into place, so a crash leaves
//! either the old or the new snapshot on disk.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use circuitdb_core::{CellBackup, IdManager, TechPool};
use tracing::{debug, info};

use super::{SnapshotReader, SnapshotWriter};
use crate::domain::SnapshotStore;
use crate::error::{Result, StorageError};

const EXTENSION: &str = "cdb";
const TEMP_EXTENSION: &str = "cdb.tmp";

/// Snapshot store over a directory of `.cdb` files
pub struct FileSnapshotStore {
    root: PathBuf,
    ids: Arc<IdManager>,
    tech_pool: Arc<TechPool>,
}

impl FileSnapshotStore {
    /// Open (creating if needed) the store rooted at `root`
    pub fn new(root: impl Into<PathBuf>, ids: Arc<IdManager>, tech_pool: Arc<TechPool>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        info!("Opened snapshot store at {}", root.display());
        Ok(Self {
            root,
            ids,
            tech_pool,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\'])
            && !name.chars().any(|c| c.is_control());
        if !valid {
            return Err(StorageError::validation(format!(
                "invalid snapshot name {:?}",
                name
            )));
        }
        Ok(self.root.join(format!("{}.{}", name, EXTENSION)))
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension(TEMP_EXTENSION);
    let result = (|| -> io::Result<()> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(StorageError::io(format!("failed to write {}", path.display())).with_source(e));
    }
    Ok(())
}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, name: &str, backup: &CellBackup) -> Result<()> {
        let path = self.path_for(name)?;
        let bytes = SnapshotWriter::new(&self.ids).to_bytes(backup)?;
        write_atomic(&path, &bytes)?;
        info!(
            "Saved snapshot {} ({}, revision {}, {} bytes)",
            name,
            backup.cell_id().key(),
            backup.revision(),
            bytes.len()
        );
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Arc<CellBackup>> {
        let path = self.path_for(name)?;
        let bytes = fs::read(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StorageError::io(format!("no snapshot named {:?}", name)).with_source(e)
            } else {
                StorageError::from(e)
            }
        })?;
        let backup = SnapshotReader::new(&self.ids, Arc::clone(&self.tech_pool)).from_bytes(&bytes)?;
        debug!("Loaded snapshot {} from {}", name, path.display());
        Ok(backup)
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.path_for(name)?.is_file())
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn delete(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted snapshot {}", name);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
