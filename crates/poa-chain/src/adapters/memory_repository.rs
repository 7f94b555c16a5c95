//! In-memory chain repository.

use crate::domain::{Result, StorageError};
use crate::ports::{ChainRepository, TxLocation};
use parking_lot::RwLock;
use shared_types::{Block, BlockId, BlockSummary, Hash, Receipt};
use std::collections::HashMap;
use tokio::sync::watch;
use tracing::{debug, info};

struct Inner {
    summaries: HashMap<BlockId, BlockSummary>,
    blocks: HashMap<BlockId, Block>,
    receipts: HashMap<BlockId, Vec<Receipt>>,
    by_number: HashMap<u32, Vec<BlockId>>,
    tx_index: HashMap<Hash, Vec<TxLocation>>,
    best: BlockId,
}

impl Inner {
    fn insert(&mut self, block: &Block, receipts: Vec<Receipt>, conflicts: u32) -> Result<BlockSummary> {
        let summary = block.summarize(conflicts);
        if let Some(existing) = self.summaries.get(&summary.id) {
            return Ok(existing.clone());
        }

        let parent = block.header.parent_id;
        let parent_summary = self
            .summaries
            .get(&parent)
            .ok_or(StorageError::ParentNotFound {
                parent,
                number: block.number(),
            })?;
        if parent_summary.number().wrapping_add(1) != block.number() {
            return Err(StorageError::NumberMismatch {
                parent: parent_summary.number(),
                number: block.number(),
            });
        }

        self.index(block, &summary, &receipts);
        self.receipts.insert(summary.id, receipts);
        self.blocks.insert(summary.id, block.clone());
        self.summaries.insert(summary.id, summary.clone());
        debug!(block_id = %summary.id, txs = summary.tx_ids.len(), "block added");
        Ok(summary)
    }

    fn index(&mut self, block: &Block, summary: &BlockSummary, receipts: &[Receipt]) {
        self.by_number
            .entry(block.number())
            .or_default()
            .push(summary.id);
        for (index, tx_id) in summary.tx_ids.iter().enumerate() {
            let reverted = receipts.get(index).map(|r| r.reverted).unwrap_or(false);
            self.tx_index.entry(*tx_id).or_default().push(TxLocation {
                block_id: summary.id,
                index: index as u32,
                reverted,
            });
        }
    }

    fn ancestor(&self, id: &BlockId, number: u32) -> Option<BlockId> {
        if number > id.number() {
            return None;
        }
        let mut current = *id;
        while current.number() > number {
            current = self.summaries.get(&current)?.header.parent_id;
        }
        Some(current).filter(|found| self.summaries.contains_key(found))
    }
}

/// Chain repository held entirely in memory under one `RwLock`.
pub struct MemoryChainRepository {
    genesis_id: BlockId,
    inner: RwLock<Inner>,
    best_tx: watch::Sender<BlockId>,
}

impl MemoryChainRepository {
    /// Create a repository whose only block is `genesis`.
    pub fn new(genesis: &Block) -> Self {
        let summary = genesis.summarize(0);
        let genesis_id = summary.id;
        let mut inner = Inner {
            summaries: HashMap::new(),
            blocks: HashMap::new(),
            receipts: HashMap::new(),
            by_number: HashMap::new(),
            tx_index: HashMap::new(),
            best: genesis_id,
        };
        inner.index(genesis, &summary, &[]);
        inner.receipts.insert(genesis_id, Vec::new());
        inner.blocks.insert(genesis_id, genesis.clone());
        inner.summaries.insert(genesis_id, summary);

        let (best_tx, _) = watch::channel(genesis_id);
        info!(genesis = %genesis_id, "chain repository initialised");
        Self {
            genesis_id,
            inner: RwLock::new(inner),
            best_tx,
        }
    }

    fn publish_best(&self, id: BlockId) {
        self.best_tx.send_replace(id);
    }
}

impl ChainRepository for MemoryChainRepository {
    fn genesis_id(&self) -> BlockId {
        self.genesis_id
    }

    fn best_block_summary(&self) -> BlockSummary {
        let inner = self.inner.read();
        inner.summaries[&inner.best].clone()
    }

    fn get_block_summary(&self, id: &BlockId) -> Result<Option<BlockSummary>> {
        Ok(self.inner.read().summaries.get(id).cloned())
    }

    fn get_block(&self, id: &BlockId) -> Result<Option<Block>> {
        Ok(self.inner.read().blocks.get(id).cloned())
    }

    fn get_receipts(&self, id: &BlockId) -> Result<Option<Vec<Receipt>>> {
        Ok(self.inner.read().receipts.get(id).cloned())
    }

    fn add_block(
        &self,
        block: &Block,
        receipts: Vec<Receipt>,
        conflicts: u32,
    ) -> Result<BlockSummary> {
        self.inner.write().insert(block, receipts, conflicts)
    }

    fn set_best_block_id(&self, id: BlockId) -> Result<()> {
        {
            let mut inner = self.inner.write();
            if !inner.summaries.contains_key(&id) {
                return Err(StorageError::BlockNotFound(id));
            }
            inner.best = id;
        }
        self.publish_best(id);
        Ok(())
    }

    fn add_block_and_set_best(
        &self,
        block: &Block,
        receipts: Vec<Receipt>,
        conflicts: u32,
    ) -> Result<BlockSummary> {
        let summary = {
            let mut inner = self.inner.write();
            let summary = inner.insert(block, receipts, conflicts)?;
            inner.best = summary.id;
            summary
        };
        self.publish_best(summary.id);
        Ok(summary)
    }

    fn conflicts_at(&self, number: u32) -> u32 {
        self.inner
            .read()
            .by_number
            .get(&number)
            .map(|ids| ids.len() as u32)
            .unwrap_or(0)
    }

    fn ancestor_id(&self, id: &BlockId, number: u32) -> Result<Option<BlockId>> {
        Ok(self.inner.read().ancestor(id, number))
    }

    fn find_tx(&self, head: &BlockId, tx_id: &Hash) -> Result<Option<TxLocation>> {
        let inner = self.inner.read();
        let Some(locations) = inner.tx_index.get(tx_id) else {
            return Ok(None);
        };
        Ok(locations
            .iter()
            .find(|loc| inner.ancestor(head, loc.block_id.number()) == Some(loc.block_id))
            .copied())
    }

    fn subscribe_best(&self) -> watch::Receiver<BlockId> {
        self.best_tx.subscribe()
    }
}
