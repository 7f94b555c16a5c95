//! Finality Engine - vote aggregation and checkpoint advancement
//!
//! ```text
//! Vote / flagged header ──→ cast ──(block unknown)──→ pending buffer
//!                            │                              │
//!                            └──────→ tally ←── on_block ───┘
//!                                       │
//!                               quorum certificate
//!                                       │
//!                       descends from finalized? ──→ advance + persist
//! ```
//!
//! All bookkeeping sits behind one `RwLock`; readers of [`FinalityEngine::finalized`]
//! only ever take the read side.

use crate::config::FinalityConfig;
use crate::domain::{Ballot, FinalityStatus, QuorumCertificate, Vote, VoteTally};
use crate::error::{FinalityError, FinalityResult};
use crate::metrics;
use parking_lot::RwLock;
use poa_chain::{ChainRepository, KeyValueStore, StorageError};
use shared_types::{Address, BlockId, BlockSummary, ValidatorSet};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened to a vote
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    /// At or below the finalized height
    Stale,
    /// Already counted
    Duplicate,
    /// Voter already chose another block at this height and round
    Equivocation,
    /// Block unknown; kept until it arrives
    Buffered,
    /// Counted without advancing finality
    Counted,
    /// Counted and finalized this block
    Finalized(BlockSummary),
}

/// A validator voting for two blocks at one height and round
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Equivocation {
    pub validator: Address,
    pub height: u32,
    pub round: u32,
    /// Block counted
    pub first: BlockId,
    /// Block ignored
    pub second: BlockId,
}

struct EngineState {
    status: FinalityStatus,
    finalized: BlockSummary,
    justified: Option<QuorumCertificate>,
    tallies: HashMap<(BlockId, u32), VoteTally>,
    // (validator, height, round) -> chosen block
    cast: HashMap<(Address, u32, u32), BlockId>,
    pending: VecDeque<Ballot>,
    equivocations: Vec<Equivocation>,
}

impl EngineState {
    fn prune(&mut self, height: u32) {
        self.tallies.retain(|(id, _), _| id.number() > height);
        self.cast.retain(|(_, h, _), _| *h > height);
        self.pending.retain(|ballot| ballot.height() > height);
        self.equivocations.retain(|e| e.height > height);
        metrics::set_pending_votes(self.pending.len());
    }
}

/// Tracks quorum certificates and the finalized checkpoint
pub struct FinalityEngine {
    config: FinalityConfig,
    repo: Arc<dyn ChainRepository>,
    store: Arc<dyn KeyValueStore>,
    validators: ValidatorSet,
    state: RwLock<EngineState>,
}

impl FinalityEngine {
    /// Restore the persisted status, or start from genesis on first run
    pub fn open(
        config: FinalityConfig,
        repo: Arc<dyn ChainRepository>,
        store: Arc<dyn KeyValueStore>,
        validators: ValidatorSet,
    ) -> FinalityResult<Self> {
        let status = FinalityStatus::load(store.as_ref(), repo.genesis_id())?;
        let finalized = repo
            .get_block_summary(&status.finalized_id)?
            .ok_or(FinalityError::FinalizedNotFound(status.finalized_id))?;

        info!(
            height = status.finalized_height,
            block_id = %status.finalized_id,
            prune_base = status.prune_base,
            "finality status restored"
        );
        metrics::set_finalized_height(status.finalized_height);

        Ok(Self {
            config,
            repo,
            store,
            validators,
            state: RwLock::new(EngineState {
                status,
                finalized,
                justified: None,
                tallies: HashMap::new(),
                cast: HashMap::new(),
                pending: VecDeque::new(),
                equivocations: Vec::new(),
            }),
        })
    }

    /// Latest finalized block; genesis until the first quorum
    pub fn finalized(&self) -> BlockSummary {
        self.state.read().finalized.clone()
    }

    pub fn finalized_height(&self) -> u32 {
        self.state.read().status.finalized_height
    }

    /// Persisted status as last saved
    pub fn status(&self) -> FinalityStatus {
        self.state.read().status
    }

    /// Highest quorum certificate seen
    pub fn justified(&self) -> Option<QuorumCertificate> {
        self.state.read().justified.clone()
    }

    pub fn pending_votes(&self) -> usize {
        self.state.read().pending.len()
    }

    pub fn equivocations(&self) -> Vec<Equivocation> {
        self.state.read().equivocations.clone()
    }

    pub fn validators(&self) -> &ValidatorSet {
        &self.validators
    }

    /// Count an explicit vote.
    ///
    /// Errors only when the vote itself is unacceptable (unknown voter,
    /// bad signature) or persistence fails.
    pub fn on_vote(&self, vote: &Vote) -> FinalityResult<VoteOutcome> {
        if !self.validators.contains(&vote.validator) {
            metrics::record_vote_rejected("unknown_validator");
            return Err(FinalityError::UnknownValidator(vote.validator));
        }
        let ballot = vote.verify().inspect_err(|_| {
            metrics::record_vote_rejected("bad_signature");
        })?;

        let mut state = self.state.write();
        self.cast(&mut state, ballot)
    }

    /// Observe a committed block: release votes buffered for it and count
    /// the vote it carries, if any.
    ///
    /// Returns the newly finalized block when finality advanced.
    pub fn on_block(&self, summary: &BlockSummary) -> FinalityResult<Option<BlockSummary>> {
        let mut state = self.state.write();
        let mut advanced = None;

        let (ready, waiting): (VecDeque<Ballot>, VecDeque<Ballot>) =
            std::mem::take(&mut state.pending)
                .into_iter()
                .partition(|ballot| ballot.block_id == summary.id);
        state.pending = waiting;
        metrics::set_pending_votes(state.pending.len());
        for ballot in ready {
            if let Some(finalized) = self.tally(&mut state, ballot)? {
                advanced = Some(finalized);
            }
        }

        if let Some(ballot) = Ballot::from_header(&summary.header) {
            if self.validators.contains(&ballot.validator) {
                if let VoteOutcome::Finalized(finalized) = self.cast(&mut state, ballot)? {
                    advanced = Some(finalized);
                }
            }
        }
        Ok(advanced)
    }

    /// Move the prune base; must not pass the finalized height
    pub fn set_prune_base(&self, base: u32) -> FinalityResult<()> {
        let mut state = self.state.write();
        if base > state.status.finalized_height {
            return Err(FinalityError::InvalidPruneBase {
                base,
                finalized: state.status.finalized_height,
            });
        }
        let status = FinalityStatus {
            prune_base: base,
            ..state.status
        };
        status.save(self.store.as_ref())?;
        state.status = status;
        debug!(prune_base = base, "prune base updated");
        Ok(())
    }

    fn cast(&self, state: &mut EngineState, ballot: Ballot) -> FinalityResult<VoteOutcome> {
        let height = ballot.height();
        if height <= state.status.finalized_height {
            return Ok(VoteOutcome::Stale);
        }

        let key = (ballot.validator, height, ballot.round);
        match state.cast.get(&key).copied() {
            Some(chosen) if chosen == ballot.block_id => return Ok(VoteOutcome::Duplicate),
            Some(chosen) => {
                warn!(
                    validator = %hex::encode(ballot.validator),
                    height,
                    first = %chosen,
                    second = %ballot.block_id,
                    "equivocation detected"
                );
                metrics::record_equivocation();
                state.equivocations.push(Equivocation {
                    validator: ballot.validator,
                    height,
                    round: ballot.round,
                    first: chosen,
                    second: ballot.block_id,
                });
                return Ok(VoteOutcome::Equivocation);
            }
            None => {
                state.cast.insert(key, ballot.block_id);
            }
        }

        if self.repo.get_block_summary(&ballot.block_id)?.is_none() {
            if state.pending.len() >= self.config.max_pending_votes {
                if let Some(evicted) = state.pending.pop_front() {
                    // A dropped vote may be delivered again later.
                    let key = (evicted.validator, evicted.height(), evicted.round);
                    if state.cast.get(&key) == Some(&evicted.block_id) {
                        state.cast.remove(&key);
                    }
                }
                debug!("pending vote buffer full, oldest dropped");
            }
            state.pending.push_back(ballot);
            metrics::set_pending_votes(state.pending.len());
            return Ok(VoteOutcome::Buffered);
        }

        Ok(match self.tally(state, ballot)? {
            Some(finalized) => VoteOutcome::Finalized(finalized),
            None => VoteOutcome::Counted,
        })
    }

    fn tally(&self, state: &mut EngineState, ballot: Ballot) -> FinalityResult<Option<BlockSummary>> {
        if ballot.height() <= state.status.finalized_height {
            return Ok(None);
        }

        let certificate = {
            let tally = state
                .tallies
                .entry((ballot.block_id, ballot.round))
                .or_insert_with(|| VoteTally::new(ballot.block_id, ballot.round));
            if !tally.add(ballot.validator) {
                return Ok(None);
            }
            tally.certificate(
                &self.validators,
                self.config.quorum_numerator,
                self.config.quorum_denominator,
            )
        };
        metrics::record_vote_processed();

        let Some(qc) = certificate else {
            return Ok(None);
        };
        let is_new = state.justified.as_ref().map(|j| j.block_id) != Some(qc.block_id);
        if state
            .justified
            .as_ref()
            .map_or(true, |j| qc.height() >= j.height())
        {
            state.justified = Some(qc.clone());
        }
        if is_new {
            metrics::record_quorum();
            debug!(block_id = %qc.block_id, voters = qc.voters.len(), "quorum certificate formed");
        }

        self.try_finalize(state, &qc)
    }

    fn try_finalize(
        &self,
        state: &mut EngineState,
        qc: &QuorumCertificate,
    ) -> FinalityResult<Option<BlockSummary>> {
        if qc.height() <= state.status.finalized_height {
            return Ok(None);
        }
        if !self.repo.is_ancestor(&state.status.finalized_id, &qc.block_id)? {
            warn!(
                block_id = %qc.block_id,
                finalized = %state.status.finalized_id,
                "quorum on a branch not descending from the finalized block"
            );
            return Ok(None);
        }
        let summary = self
            .repo
            .get_block_summary(&qc.block_id)?
            .ok_or(StorageError::BlockNotFound(qc.block_id))?;

        let status = FinalityStatus {
            finalized_height: qc.height(),
            finalized_id: qc.block_id,
            prune_base: state.status.prune_base,
        };
        status.save(self.store.as_ref())?;
        state.status = status;
        state.finalized = summary.clone();
        state.prune(status.finalized_height);

        metrics::set_finalized_height(status.finalized_height);
        info!(
            height = status.finalized_height,
            block_id = %status.finalized_id,
            participation = qc.participation_percent(&self.validators),
            "block finalized"
        );
        Ok(Some(summary))
    }
}
