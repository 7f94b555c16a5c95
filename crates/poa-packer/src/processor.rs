//! Peer block verification.
//!
//! Validates the header against its parent and the rotation, then
//! re-executes the transactions through a [`Flow`] and compares the
//! resulting roots. Nothing is written; the caller commits the returned
//! stage and appends the block.

use crate::domain::is_valid_gas_limit;
use crate::error::ProcessError;
use crate::flow::{Flow, FlowParams};
use poa_chain::ChainRepository;
use poa_state::{Stage, Stater};
use shared_types::{merkle_root, Address, Block, Hash, Receipt, ValidatorSet};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Result of a successful verification
#[derive(Debug)]
pub struct ProcessedBlock {
    /// Post-state, uncommitted
    pub stage: Stage,
    /// Receipts in transaction order
    pub receipts: Vec<Receipt>,
    /// Recovered proposer
    pub signer: Address,
}

/// Verifies blocks produced by other authorities
pub struct BlockProcessor {
    repo: Arc<dyn ChainRepository>,
    stater: Stater,
    validators: ValidatorSet,
    interval: u64,
}

impl BlockProcessor {
    pub fn new(
        repo: Arc<dyn ChainRepository>,
        stater: Stater,
        validators: ValidatorSet,
        interval: u64,
    ) -> Self {
        Self {
            repo,
            stater,
            validators,
            interval,
        }
    }

    /// Verify `block` as of local clock `now` (unix seconds)
    #[instrument(skip(self, block), fields(id = %block.id()))]
    pub fn process(&self, block: &Block, now: u64) -> Result<ProcessedBlock, ProcessError> {
        let header = &block.header;
        let id = block.id();
        if self.repo.get_block_summary(&id)?.is_some() {
            return Err(ProcessError::Known(id));
        }
        let parent = self
            .repo
            .get_block_summary(&header.parent_id)?
            .ok_or(ProcessError::ParentMissing(header.parent_id))?;

        let parent_timestamp = parent.timestamp();
        if self.interval == 0
            || header.timestamp % self.interval != 0
            || header.timestamp < parent_timestamp.saturating_add(self.interval)
        {
            return Err(ProcessError::InvalidTimestamp {
                timestamp: header.timestamp,
                parent_timestamp,
            });
        }
        if header.timestamp > now.saturating_add(self.interval) {
            return Err(ProcessError::FutureBlock {
                timestamp: header.timestamp,
                now,
            });
        }

        let signer = header.signer()?;
        if self.validators.proposer_at(header.timestamp, self.interval) != Some(signer) {
            return Err(ProcessError::WrongProposer { signer });
        }
        if !is_valid_gas_limit(parent.header.gas_limit, header.gas_limit) {
            return Err(ProcessError::InvalidGasLimit {
                limit: header.gas_limit,
                parent_limit: parent.header.gas_limit,
            });
        }
        let expected = parent.header.total_score + 1;
        if header.total_score != expected {
            return Err(ProcessError::InvalidScore {
                score: header.total_score,
                expected,
            });
        }
        if merkle_root(&block.tx_ids()) != header.txs_root
            || block.tx_ids().len() != block.transactions.len()
        {
            return Err(ProcessError::Mismatch { field: "txs_root" });
        }

        let state = self.stater.new_state(parent.header.state_root)?;
        let mut flow = Flow::open(FlowParams {
            repo: Arc::clone(&self.repo),
            parent,
            state,
            timestamp: header.timestamp,
            gas_limit: header.gas_limit,
            proposer: signer,
            beneficiary: header.beneficiary,
            chain_tag: self.repo.chain_tag(),
        });
        for (index, tx) in block.transactions.iter().enumerate() {
            flow.adopt(tx)
                .map_err(|source| ProcessError::InvalidTransaction { index, source })?;
        }

        if flow.gas_used() != header.gas_used {
            return Err(ProcessError::Mismatch { field: "gas_used" });
        }
        let (stage, receipts) = flow.into_parts();
        let receipt_hashes: Vec<Hash> = receipts.iter().map(Receipt::hash).collect();
        if merkle_root(&receipt_hashes) != header.receipts_root {
            return Err(ProcessError::Mismatch {
                field: "receipts_root",
            });
        }
        if stage.root() != header.state_root {
            return Err(ProcessError::Mismatch {
                field: "state_root",
            });
        }

        debug!(txs = block.transactions.len(), "block verified");
        Ok(ProcessedBlock {
            stage,
            receipts,
            signer,
        })
    }
}
