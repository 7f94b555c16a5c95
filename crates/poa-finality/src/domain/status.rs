//! Persisted finality status
//!
//! Layout in the key-value store, one bincode value per key:
//!
//! | Key | Value |
//! |-----|-------|
//! | `finality/height` | `u32` finalized height |
//! | `finality/id` | `BlockId` finalized block |
//! | `finality/prune-base` | `u32` prune base |
//!
//! Missing keys on first run default to the genesis values.

use crate::error::{FinalityError, FinalityResult};
use poa_chain::{BatchOperation, KeyValueStore};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared_types::BlockId;

const KEY_HEIGHT: &[u8] = b"finality/height";
const KEY_ID: &[u8] = b"finality/id";
const KEY_PRUNE_BASE: &[u8] = b"finality/prune-base";

/// Finalized checkpoint plus prune base
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalityStatus {
    /// Height of the finalized block
    pub finalized_height: u32,
    /// Finalized block
    pub finalized_id: BlockId,
    /// Height below which history may be pruned
    pub prune_base: u32,
}

impl FinalityStatus {
    /// Status of a chain that has finalized only its genesis
    pub fn genesis(genesis_id: BlockId) -> Self {
        Self {
            finalized_height: 0,
            finalized_id: genesis_id,
            prune_base: 0,
        }
    }

    /// Load from `store`, falling back to genesis values per missing key
    pub fn load(store: &dyn KeyValueStore, genesis_id: BlockId) -> FinalityResult<Self> {
        let defaults = Self::genesis(genesis_id);
        Ok(Self {
            finalized_height: read(store, KEY_HEIGHT)?.unwrap_or(defaults.finalized_height),
            finalized_id: read(store, KEY_ID)?.unwrap_or(defaults.finalized_id),
            prune_base: read(store, KEY_PRUNE_BASE)?.unwrap_or(defaults.prune_base),
        })
    }

    /// Write all keys in one atomic batch
    pub fn save(&self, store: &dyn KeyValueStore) -> FinalityResult<()> {
        store.atomic_batch_write(vec![
            BatchOperation::put(KEY_HEIGHT, encode(&self.finalized_height)?),
            BatchOperation::put(KEY_ID, encode(&self.finalized_id)?),
            BatchOperation::put(KEY_PRUNE_BASE, encode(&self.prune_base)?),
        ])?;
        Ok(())
    }
}

fn read<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &[u8]) -> FinalityResult<Option<T>> {
    store
        .get(key)?
        .map(|bytes| bincode::deserialize(&bytes).map_err(|e| FinalityError::Codec(e.to_string())))
        .transpose()
}

fn encode<T: Serialize>(value: &T) -> FinalityResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| FinalityError::Codec(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use poa_chain::InMemoryKVStore;

    fn genesis() -> BlockId {
        BlockId::from_parts(0, [0x11; 32])
    }

    #[test]
    fn test_missing_keys_default_to_genesis() {
        let store = InMemoryKVStore::new();
        assert_eq!(
            FinalityStatus::load(&store, genesis()).unwrap(),
            FinalityStatus::genesis(genesis())
        );
    }

    #[test]
    fn test_save_then_load() {
        let store = InMemoryKVStore::new();
        let status = FinalityStatus {
            finalized_height: 42,
            finalized_id: BlockId::from_parts(42, [0x42; 32]),
            prune_base: 30,
        };
        status.save(&store).unwrap();

        let loaded = FinalityStatus::load(&store, genesis()).unwrap();
        assert_eq!(loaded, status);
        assert_eq!(loaded.finalized_height, 42);
        assert_eq!(loaded.prune_base, 30);
    }

    #[test]
    fn test_partial_status_fills_defaults() {
        let store = InMemoryKVStore::new();
        store.put(KEY_PRUNE_BASE, &encode(&7u32).unwrap()).unwrap();

        let loaded = FinalityStatus::load(&store, genesis()).unwrap();
        assert_eq!(loaded.prune_base, 7);
        assert_eq!(loaded.finalized_id, genesis());
    }

    #[test]
    fn test_corrupt_value_reported() {
        let store = InMemoryKVStore::new();
        store.put(KEY_ID, &[1, 2]).unwrap();
        assert!(matches!(
            FinalityStatus::load(&store, genesis()),
            Err(FinalityError::Codec(_))
        ));
    }
}
