/// Sequence stores — persisted round-robin positions for `sequential` nodes.

use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("RON serialization error: {0}")]
    RonWrite(#[from] ron::Error),
    #[error("sequence store lock poisoned")]
    Poisoned,
    #[error("sequence '{0}' asked for an index into an empty pool")]
    EmptyPool(String),
}

/// Round-robin position store keyed by node.
///
/// Implementations must serialize advances per key so that concurrent
/// callers never observe the same index.
pub trait SequenceStore: Send + Sync {
    /// Return the current index for `key` in `[0, pool_size)` and advance
    /// it, wrapping after the last index. A stored position that no longer
    /// fits the pool restarts at 0.
    fn next_index(&self, key: &str, pool_size: usize) -> Result<usize, SequenceError>;
}

fn advance(
    positions: &mut FxHashMap<String, usize>,
    key: &str,
    pool_size: usize,
) -> Result<usize, SequenceError> {
    if pool_size == 0 {
        return Err(SequenceError::EmptyPool(key.to_string()));
    }
    let current = positions
        .get(key)
        .copied()
        .filter(|&i| i < pool_size)
        .unwrap_or(0);
    positions.insert(key.to_string(), (current + 1) % pool_size);
    Ok(current)
}

/// Process-local store. Positions are lost on restart.
#[derive(Debug, Default)]
pub struct MemorySequenceStore {
    positions: Mutex<FxHashMap<String, usize>>,
}

impl MemorySequenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The index the next call for `key` would start from, if any.
    pub fn peek(&self, key: &str) -> Result<Option<usize>, SequenceError> {
        let positions = self.positions.lock().map_err(|_| SequenceError::Poisoned)?;
        Ok(positions.get(key).copied())
    }

    pub fn reset(&self, key: &str) -> Result<(), SequenceError> {
        let mut positions = self.positions.lock().map_err(|_| SequenceError::Poisoned)?;
        positions.remove(key);
        Ok(())
    }
}

impl SequenceStore for MemorySequenceStore {
    fn next_index(&self, key: &str, pool_size: usize) -> Result<usize, SequenceError> {
        let mut positions = self.positions.lock().map_err(|_| SequenceError::Poisoned)?;
        advance(&mut positions, key, pool_size)
    }
}

/// Store backed by a RON file, rewritten on every advance so positions
/// survive restarts.
#[derive(Debug)]
pub struct FileSequenceStore {
    path: PathBuf,
    positions: Mutex<FxHashMap<String, usize>>,
}

impl FileSequenceStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: &Path) -> Result<Self, SequenceError> {
        let positions = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let stored: BTreeMap<String, usize> = ron::from_str(&contents)?;
            stored.into_iter().collect()
        } else {
            FxHashMap::default()
        };
        tracing::debug!(path = %path.display(), keys = positions.len(), "opened sequence store");
        Ok(Self {
            path: path.to_path_buf(),
            positions: Mutex::new(positions),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, positions: &FxHashMap<String, usize>) -> Result<(), SequenceError> {
        // Sorted so the file diffs cleanly.
        let sorted: BTreeMap<&String, &usize> = positions.iter().collect();
        let contents = ron::ser::to_string_pretty(&sorted, ron::ser::PrettyConfig::default())?;
        let tmp = self.path.with_extension("ron.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SequenceStore for FileSequenceStore {
    fn next_index(&self, key: &str, pool_size: usize) -> Result<usize, SequenceError> {
        let mut positions = self.positions.lock().map_err(|_| SequenceError::Poisoned)?;
        let previous = positions.get(key).copied();
        let index = advance(&mut positions, key, pool_size)?;
        if let Err(e) = self.persist(&positions) {
            // Memory must not run ahead of the file.
            match previous {
                Some(position) => positions.insert(key.to_string(), position),
                None => positions.remove(key),
            };
            return Err(e);
        }
        Ok(index)
    }
}

/// A store bound to one node key, as handed to the selector.
///
/// Store failures never reach the selector: they are logged and the
/// sequence falls back to index 0.
pub struct Sequencer<'a> {
    store: &'a dyn SequenceStore,
    key: String,
}

impl<'a> Sequencer<'a> {
    pub fn new(store: &'a dyn SequenceStore, key: String) -> Self {
        Self { store, key }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn next(&self, pool_size: usize) -> usize {
        match self.store.next_index(&self.key, pool_size) {
            Ok(index) if index < pool_size => index,
            Ok(index) => {
                tracing::warn!(key = %self.key, index, pool_size, "sequence index out of range, using 0");
                0
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "sequence store failed, using index 0");
                0
            }
        }
    }
}
