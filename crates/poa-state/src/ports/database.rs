use crate::domain::{Account, Result};
use shared_types::{Address, Hash};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Fully materialized account map for one state root.
pub type Snapshot = BTreeMap<Address, Account>;

/// Committed-state storage abstraction.
///
/// Snapshots are immutable once stored; the same root always maps to the
/// same accounts, so storing twice is harmless.
pub trait StateStore: Send + Sync {
    fn load(&self, root: &Hash) -> Result<Option<Arc<Snapshot>>>;
    fn store(&self, root: Hash, snapshot: Arc<Snapshot>) -> Result<()>;
}
