use crate::domain::Result;
use crate::ports::{Snapshot, StateStore};
use parking_lot::RwLock;
use shared_types::{Hash, EMPTY_ROOT};
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory implementation of `StateStore`.
///
/// Always knows the empty root so a fresh chain can open its genesis state.
pub struct MemoryStateStore {
    snapshots: RwLock<HashMap<Hash, Arc<Snapshot>>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        let mut snapshots = HashMap::new();
        snapshots.insert(EMPTY_ROOT, Arc::new(Snapshot::new()));
        Self {
            snapshots: RwLock::new(snapshots),
        }
    }

    /// Number of distinct roots held.
    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.read().is_empty()
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, root: &Hash) -> Result<Option<Arc<Snapshot>>> {
        Ok(self.snapshots.read().get(root).cloned())
    }

    fn store(&self, root: Hash, snapshot: Arc<Snapshot>) -> Result<()> {
        self.snapshots.write().entry(root).or_insert(snapshot);
        Ok(())
    }
}
