//! # Flow
//!
//! One attempt to assemble a block, from scheduling through sealing.
//!
//! ```text
//! Open ──adopt()*──→ Open ──pack()──→ Packed (terminal)
//! ```
//!
//! A flow exclusively owns its state overlay. A rejected `adopt` rolls the
//! overlay back to the checkpoint taken before it, so the staged root is
//! unchanged. `pack` hands back the staged state uncommitted; whoever holds
//! it decides whether to persist it.

use crate::domain::execute;
use crate::error::{AdoptionError, PackError};
use poa_chain::ChainRepository;
use poa_state::{Stage, State};
use shared_crypto::Secp256k1KeyPair;
use shared_types::{
    merkle_root, Address, Block, BlockSummary, Hash, Header, Receipt, Transaction,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Lifecycle of a [`Flow`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStatus {
    /// Accepting transactions
    Open,
    /// Sealed; no further operations allowed
    Packed,
}

/// Inputs fixed when a flow is opened
pub(crate) struct FlowParams {
    pub repo: Arc<dyn ChainRepository>,
    pub parent: BlockSummary,
    pub state: State,
    pub timestamp: u64,
    pub gas_limit: u64,
    pub proposer: Address,
    pub beneficiary: Address,
    pub chain_tag: u8,
}

/// Block-assembly state machine
pub struct Flow {
    repo: Arc<dyn ChainRepository>,
    parent: BlockSummary,
    state: State,
    timestamp: u64,
    gas_limit: u64,
    proposer: Address,
    beneficiary: Address,
    chain_tag: u8,
    txs: Vec<Transaction>,
    receipts: Vec<Receipt>,
    // Adopted transaction IDs and whether each reverted.
    adopted: HashMap<Hash, bool>,
    gas_used: u64,
    status: FlowStatus,
}

impl Flow {
    pub(crate) fn open(params: FlowParams) -> Self {
        Self {
            repo: params.repo,
            parent: params.parent,
            state: params.state,
            timestamp: params.timestamp,
            gas_limit: params.gas_limit,
            proposer: params.proposer,
            beneficiary: params.beneficiary,
            chain_tag: params.chain_tag,
            txs: Vec::new(),
            receipts: Vec::new(),
            adopted: HashMap::new(),
            gas_used: 0,
            status: FlowStatus::Open,
        }
    }

    /// Parent block summary
    pub fn parent(&self) -> &BlockSummary {
        &self.parent
    }

    /// Slot timestamp of the block being assembled
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Number of the block being assembled
    pub fn number(&self) -> u32 {
        self.parent.number().wrapping_add(1)
    }

    /// Gas limit the block will be sealed with (absent an override)
    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    /// Gas consumed by adopted transactions
    pub fn gas_used(&self) -> u64 {
        self.gas_used
    }

    /// Gas still available
    pub fn remaining_gas(&self) -> u64 {
        self.gas_limit.saturating_sub(self.gas_used)
    }

    /// Scheduled proposer
    pub fn proposer(&self) -> Address {
        self.proposer
    }

    /// Adopted transactions, in execution order
    pub fn transactions(&self) -> &[Transaction] {
        &self.txs
    }

    /// Current root of the staged overlay
    pub fn state_root(&self) -> Hash {
        self.state.root()
    }

    /// Lifecycle status
    pub fn status(&self) -> FlowStatus {
        self.status
    }

    /// Validate `tx` and execute it against the overlay.
    ///
    /// A transaction whose clauses revert is still adopted with a reverted
    /// receipt; only structurally invalid transactions are rejected.
    pub fn adopt(&mut self, tx: &Transaction) -> Result<(), AdoptionError> {
        if self.status == FlowStatus::Packed {
            return Err(AdoptionError::AlreadyPacked);
        }
        if tx.chain_tag != self.chain_tag {
            return Err(AdoptionError::ChainTagMismatch {
                expected: self.chain_tag,
                actual: tx.chain_tag,
            });
        }

        let origin = tx.origin()?;
        let id = tx.id()?;
        let number = self.number();

        if tx.is_premature(number) {
            return Err(AdoptionError::NotAdoptableNow {
                block_ref: tx.block_ref_number(),
                number,
            });
        }
        if tx.is_expired(number) {
            return Err(AdoptionError::Expired { number });
        }

        let intrinsic = tx.intrinsic_gas()?;
        if tx.gas < intrinsic {
            return Err(AdoptionError::IntrinsicGasTooLow {
                declared: tx.gas,
                required: intrinsic,
            });
        }
        if tx.gas > self.remaining_gas() {
            return Err(AdoptionError::GasExceedsLimit {
                required: tx.gas,
                remaining: self.remaining_gas(),
            });
        }

        if self.adopted.contains_key(&id) || self.repo.find_tx(&self.parent.id, &id)?.is_some() {
            return Err(AdoptionError::Duplicate(id));
        }
        if let Some(dep) = tx.depends_on {
            self.check_dependency(dep)?;
        }

        let checkpoint = self.state.checkpoint();
        match execute(&mut self.state, tx, &id, origin, intrinsic, self.beneficiary) {
            Ok(receipt) => {
                self.gas_used += receipt.gas_used;
                self.adopted.insert(id, receipt.reverted);
                self.receipts.push(receipt);
                self.txs.push(tx.clone());
                Ok(())
            }
            Err(err) => {
                self.state.revert_to(checkpoint)?;
                Err(err)
            }
        }
    }

    fn check_dependency(&self, dep: Hash) -> Result<(), AdoptionError> {
        let reverted = match self.adopted.get(&dep) {
            Some(reverted) => *reverted,
            None => match self.repo.find_tx(&self.parent.id, &dep)? {
                Some(location) => location.reverted,
                None => return Err(AdoptionError::UnresolvedDependency(dep)),
            },
        };
        if reverted {
            return Err(AdoptionError::DependencyReverted(dep));
        }
        Ok(())
    }

    /// Seal the block.
    ///
    /// Execution order is adoption order. A gas-limit override replaces the
    /// flow's limit in the header and must cover the gas already used. An
    /// override of zero discards every adopted transaction and seals an empty
    /// block on the parent's state.
    #[instrument(skip(self, key), fields(number = self.number(), txs = self.txs.len()))]
    pub fn pack(
        &mut self,
        key: &Secp256k1KeyPair,
        gas_limit_override: Option<u64>,
        should_vote: bool,
    ) -> Result<(Block, Stage, Vec<Receipt>), PackError> {
        if self.status == FlowStatus::Packed {
            return Err(PackError::AlreadyPacked);
        }
        let signer = key.address();
        if signer != self.proposer {
            return Err(PackError::KeyMismatch {
                expected: self.proposer,
                actual: signer,
            });
        }
        let gas_limit = gas_limit_override.unwrap_or(self.gas_limit);
        if gas_limit == 0 {
            self.discard_adopted();
        }
        if gas_limit < self.gas_used {
            return Err(PackError::GasLimitBelowUsage {
                limit: gas_limit,
                used: self.gas_used,
            });
        }

        let stage = self.state.stage();
        let tx_ids: Vec<Hash> = self.adopted_ids();
        let receipt_hashes: Vec<Hash> = self.receipts.iter().map(Receipt::hash).collect();

        let mut header = Header {
            parent_id: self.parent.id,
            timestamp: self.timestamp,
            gas_limit,
            beneficiary: self.beneficiary,
            gas_used: self.gas_used,
            total_score: self.parent.header.total_score + 1,
            txs_root: merkle_root(&tx_ids),
            state_root: stage.root(),
            receipts_root: merkle_root(&receipt_hashes),
            vote_finality: should_vote,
            signature: Vec::new(),
        };
        header.sign(key)?;

        self.status = FlowStatus::Packed;
        let block = Block {
            header,
            transactions: self.txs.clone(),
        };
        debug!(block_id = %block.id(), gas_used = self.gas_used, "flow packed");
        Ok((block, stage, self.receipts.clone()))
    }

    /// Consume an unsealed flow, yielding its staged state and receipts.
    pub(crate) fn into_parts(self) -> (Stage, Vec<Receipt>) {
        (self.state.stage(), self.receipts)
    }

    fn discard_adopted(&mut self) {
        if !self.txs.is_empty() {
            debug!(dropped = self.txs.len(), "zero gas limit, adopted transactions dropped");
        }
        self.state.reset();
        self.txs.clear();
        self.receipts.clear();
        self.adopted.clear();
        self.gas_used = 0;
    }

    fn adopted_ids(&self) -> Vec<Hash> {
        // Adopted transactions always carry a recoverable origin.
        self.txs.iter().filter_map(|tx| tx.id().ok()).collect()
    }
}

impl fmt::Debug for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow")
            .field("parent", &self.parent.id)
            .field("timestamp", &self.timestamp)
            .field("gas_limit", &self.gas_limit)
            .field("gas_used", &self.gas_used)
            .field("txs", &self.txs.len())
            .field("status", &self.status)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, FUNDS, RECIPIENT};
    use shared_types::constants::MIN_TX_GAS;
    use shared_types::{Clause, TransactionBuilder, EMPTY_ROOT};

    fn open(fx: &Fixture) -> Flow {
        let genesis = fx.repo.best_block_summary();
        fx.packer(0)
            .schedule(&genesis, fx.slot_of(0, &genesis))
            .unwrap()
    }

    #[test]
    fn test_empty_flow_packs_signed_block() {
        let fx = Fixture::new(1);
        let mut flow = open(&fx);
        let parent_root = flow.parent().header.state_root;

        let (block, stage, receipts) = flow.pack(&fx.keys[0], None, true).unwrap();
        assert_eq!(block.number(), 1);
        assert!(block.transactions.is_empty());
        assert!(receipts.is_empty());
        assert_eq!(block.header.signer().unwrap(), fx.keys[0].address());
        assert_eq!(block.header.state_root, parent_root);
        assert_eq!(stage.root(), parent_root);
        assert_eq!(block.header.total_score, 1);
        assert!(block.header.vote_finality);
        assert_eq!(flow.status(), FlowStatus::Packed);
    }

    #[test]
    fn test_adopt_and_pack() {
        let fx = Fixture::new(1);
        let mut flow = open(&fx);
        flow.adopt(&fx.transfer(1, 0, 1_000)).unwrap();
        flow.adopt(&fx.transfer(2, 0, 2_000)).unwrap();
        assert_eq!(flow.gas_used(), 2 * MIN_TX_GAS);
        assert_eq!(flow.remaining_gas(), flow.gas_limit() - 2 * MIN_TX_GAS);

        let (block, stage, receipts) = flow.pack(&fx.keys[0], None, false).unwrap();
        assert_eq!(block.transactions.len(), 2);
        assert_eq!(receipts.len(), 2);
        assert_eq!(block.header.gas_used, 2 * MIN_TX_GAS);

        let root = stage.commit().unwrap();
        let state = fx.stater.new_state(root).unwrap();
        assert_eq!(state.balance(&RECIPIENT), 3_000);
    }

    #[test]
    fn test_pack_twice_fails_and_keeps_first_result() {
        let fx = Fixture::new(1);
        let mut flow = open(&fx);
        flow.adopt(&fx.transfer(1, 0, 1)).unwrap();

        let (block, stage, _) = flow.pack(&fx.keys[0], None, false).unwrap();
        assert_eq!(
            flow.pack(&fx.keys[0], None, false).unwrap_err(),
            PackError::AlreadyPacked
        );
        assert_eq!(
            flow.adopt(&fx.transfer(2, 0, 1)).unwrap_err(),
            AdoptionError::AlreadyPacked
        );
        assert_eq!(block.header.state_root, stage.root());
        assert_eq!(block.transactions.len(), 1);
    }

    #[test]
    fn test_wrong_key_does_not_seal() {
        let fx = Fixture::new(1);
        let mut flow = open(&fx);
        assert!(matches!(
            flow.pack(&fx.keys[1], None, false),
            Err(PackError::KeyMismatch { .. })
        ));
        assert_eq!(flow.status(), FlowStatus::Open);
        assert!(flow.pack(&fx.keys[0], None, false).is_ok());
    }

    #[test]
    fn test_rejected_adopt_leaves_root_unchanged() {
        let fx = Fixture::new(1);
        let mut flow = open(&fx);
        flow.adopt(&fx.transfer(1, 0, 1)).unwrap();
        let root = flow.state_root();

        let pauper = shared_crypto::Secp256k1KeyPair::generate();
        let broke = TransactionBuilder::new(fx.repo.chain_tag())
            .clause(Clause::transfer(RECIPIENT, 1))
            .gas(MIN_TX_GAS)
            .sign(&pauper)
            .unwrap();
        assert!(matches!(
            flow.adopt(&broke),
            Err(AdoptionError::InsufficientFunds { available: 0, .. })
        ));
        assert_eq!(flow.state_root(), root);
        assert_eq!(flow.transactions().len(), 1);
    }

    #[test]
    fn test_reverted_clause_still_adopted() {
        let fx = Fixture::new(1);
        let mut flow = open(&fx);
        flow.adopt(&fx.transfer(1, 0, FUNDS * 2)).unwrap();

        let (_, _, receipts) = flow.pack(&fx.keys[0], None, false).unwrap();
        assert!(receipts[0].reverted);
    }

    #[test]
    fn test_duplicate_rejected_in_flow_and_chain() {
        let fx = Fixture::new(1);
        let genesis = fx.repo.best_block_summary();
        let packer = fx.packer(0);
        let tx = fx.transfer(1, 0, 1);

        let mut flow = packer.schedule(&genesis, fx.slot_of(0, &genesis)).unwrap();
        flow.adopt(&tx).unwrap();
        let id = tx.id().unwrap();
        assert_eq!(flow.adopt(&tx).unwrap_err(), AdoptionError::Duplicate(id));

        let (block, stage, receipts) = flow.pack(&fx.keys[0], None, false).unwrap();
        stage.commit().unwrap();
        let best = fx.repo.add_block_and_set_best(&block, receipts, 0).unwrap();

        let mut next = packer.schedule(&best, fx.slot_of(0, &best)).unwrap();
        assert_eq!(next.adopt(&tx).unwrap_err(), AdoptionError::Duplicate(id));
    }

    #[test]
    fn test_dependency_rules() {
        let fx = Fixture::new(1);
        let mut flow = open(&fx);
        let first = fx.transfer(1, 0, 1);
        let dependent = |dep| {
            TransactionBuilder::new(fx.repo.chain_tag())
                .clause(Clause::transfer(RECIPIENT, 1))
                .gas(MIN_TX_GAS)
                .depends_on(dep)
                .sign(&fx.keys[2])
                .unwrap()
        };

        let early = dependent(first.id().unwrap());
        let err = flow.adopt(&early).unwrap_err();
        assert!(err.is_recoverable());
        assert!(matches!(err, AdoptionError::UnresolvedDependency(_)));

        flow.adopt(&first).unwrap();
        flow.adopt(&early).unwrap();

        let failed = fx.transfer(3, 0, FUNDS * 2);
        flow.adopt(&failed).unwrap();
        assert!(matches!(
            flow.adopt(&dependent(failed.id().unwrap())),
            Err(AdoptionError::DependencyReverted(_))
        ));
    }

    #[test]
    fn test_chain_tag_and_window_checks() {
        let fx = Fixture::new(1);
        let mut flow = open(&fx);
        let tag = fx.repo.chain_tag();

        let foreign = TransactionBuilder::new(tag.wrapping_add(1))
            .clause(Clause::transfer(RECIPIENT, 1))
            .gas(MIN_TX_GAS)
            .sign(&fx.keys[1])
            .unwrap();
        assert!(matches!(
            flow.adopt(&foreign),
            Err(AdoptionError::ChainTagMismatch { .. })
        ));

        let premature = TransactionBuilder::new(tag)
            .block_ref(5)
            .clause(Clause::transfer(RECIPIENT, 1))
            .gas(MIN_TX_GAS)
            .sign(&fx.keys[1])
            .unwrap();
        assert!(flow.adopt(&premature).unwrap_err().is_recoverable());

        let starved = TransactionBuilder::new(tag)
            .clause(Clause::transfer(RECIPIENT, 1))
            .gas(MIN_TX_GAS - 1)
            .sign(&fx.keys[1])
            .unwrap();
        assert!(matches!(
            flow.adopt(&starved),
            Err(AdoptionError::IntrinsicGasTooLow { .. })
        ));
        assert!(flow.transactions().is_empty());
    }

    #[test]
    fn test_gas_limit_enforced() {
        let fx = Fixture::new(1);
        let mut flow = open(&fx);
        let greedy = TransactionBuilder::new(fx.repo.chain_tag())
            .clause(Clause::transfer(RECIPIENT, 1))
            .gas(flow.gas_limit() + 1)
            .sign(&fx.keys[1])
            .unwrap();

        let err = flow.adopt(&greedy).unwrap_err();
        assert!(matches!(err, AdoptionError::GasExceedsLimit { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_zero_gas_limit_packs_empty_block() {
        let fx = Fixture::new(1);
        let genesis = fx.repo.best_block_summary();
        let mut flow = fx
            .packer(0)
            .schedule_with_gas_limit(&genesis, fx.slot_of(0, &genesis), Some(0))
            .unwrap();

        assert!(matches!(
            flow.adopt(&fx.transfer(1, 0, 1)),
            Err(AdoptionError::GasExceedsLimit { remaining: 0, .. })
        ));
        let (block, _, _) = flow.pack(&fx.keys[0], None, false).unwrap();
        assert!(block.transactions.is_empty());
        assert_eq!(block.header.gas_limit, 0);
    }

    #[test]
    fn test_zero_gas_limit_override_after_adopt_packs_empty_block() {
        let fx = Fixture::new(1);
        let mut flow = open(&fx);
        let parent_root = flow.parent().header.state_root;
        flow.adopt(&fx.transfer(1, 0, 1)).unwrap();
        assert_ne!(flow.state_root(), parent_root);

        let (block, stage, receipts) = flow.pack(&fx.keys[0], Some(0), false).unwrap();
        assert!(block.transactions.is_empty());
        assert!(receipts.is_empty());
        assert_eq!(block.header.gas_limit, 0);
        assert_eq!(block.header.gas_used, 0);
        assert_eq!(block.header.txs_root, EMPTY_ROOT);
        assert_eq!(block.header.receipts_root, EMPTY_ROOT);
        assert_eq!(block.header.state_root, parent_root);
        assert_eq!(stage.root(), parent_root);
        assert_eq!(block.header.signer().unwrap(), fx.keys[0].address());
    }

    #[test]
    fn test_gas_limit_override_must_cover_usage() {
        let fx = Fixture::new(1);
        let mut flow = open(&fx);
        flow.adopt(&fx.transfer(1, 0, 1)).unwrap();

        assert_eq!(
            flow.pack(&fx.keys[0], Some(MIN_TX_GAS - 1), false).unwrap_err(),
            PackError::GasLimitBelowUsage {
                limit: MIN_TX_GAS - 1,
                used: MIN_TX_GAS
            }
        );
        let (block, _, _) = flow.pack(&fx.keys[0], Some(MIN_TX_GAS), false).unwrap();
        assert_eq!(block.header.gas_limit, MIN_TX_GAS);
    }
}
