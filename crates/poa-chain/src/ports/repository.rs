//! # Chain Repository Port
//!
//! Driven port consumed by the packer, the finality engine and the node
//! runtime, and produced (appended to) by the node runtime.

use crate::domain::Result;
use shared_types::{Block, BlockId, BlockSummary, Hash, Receipt};
use tokio::sync::watch;

/// Where a transaction was included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxLocation {
    /// Containing block.
    pub block_id: BlockId,
    /// Position in the block.
    pub index: u32,
    /// Whether its clauses were rolled back.
    pub reverted: bool,
}

/// Append-only block store with a best-block pointer.
pub trait ChainRepository: Send + Sync {
    /// ID of the genesis block.
    fn genesis_id(&self) -> BlockId;

    /// Chain tag: last byte of the genesis ID.
    fn chain_tag(&self) -> u8 {
        self.genesis_id().0[31]
    }

    /// Summary of the current best block.
    fn best_block_summary(&self) -> BlockSummary;

    /// Summary of any known block.
    fn get_block_summary(&self, id: &BlockId) -> Result<Option<BlockSummary>>;

    /// Full block.
    fn get_block(&self, id: &BlockId) -> Result<Option<Block>>;

    /// Receipts of a block, in transaction order.
    fn get_receipts(&self, id: &BlockId) -> Result<Option<Vec<Receipt>>>;

    /// Append a block whose parent is known. Idempotent per block ID.
    fn add_block(&self, block: &Block, receipts: Vec<Receipt>, conflicts: u32)
        -> Result<BlockSummary>;

    /// Move the best pointer to a known block.
    fn set_best_block_id(&self, id: BlockId) -> Result<()>;

    /// Append and move the best pointer as one atomic step.
    fn add_block_and_set_best(
        &self,
        block: &Block,
        receipts: Vec<Receipt>,
        conflicts: u32,
    ) -> Result<BlockSummary>;

    /// Number of known blocks at `number` (the conflict count for a new one).
    fn conflicts_at(&self, number: u32) -> u32;

    /// ID of the ancestor of `id` at `number` (or `id` itself).
    fn ancestor_id(&self, id: &BlockId, number: u32) -> Result<Option<BlockId>>;

    /// Locate a transaction among the ancestors of `head` (inclusive).
    fn find_tx(&self, head: &BlockId, tx_id: &Hash) -> Result<Option<TxLocation>>;

    /// Whether `descendant` has `ancestor` on its parent chain (inclusive).
    fn is_ancestor(&self, ancestor: &BlockId, descendant: &BlockId) -> Result<bool> {
        if ancestor.number() > descendant.number() {
            return Ok(false);
        }
        Ok(self.ancestor_id(descendant, ancestor.number())? == Some(*ancestor))
    }

    /// Subscribe to best-block changes.
    fn subscribe_best(&self) -> watch::Receiver<BlockId>;
}
