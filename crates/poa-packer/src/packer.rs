//! # Scheduler
//!
//! Decides whether the local master may propose on top of a parent at a
//! given timestamp and, if so, opens a [`Flow`].
//!
//! Proposer rotation is recomputed from (validator set, timestamp,
//! interval) on every call; nothing about turns is cached.

use crate::config::PackerConfig;
use crate::domain::next_gas_limit;
use crate::error::SchedulingError;
use crate::flow::{Flow, FlowParams};
use poa_bandwidth::Bandwidth;
use poa_chain::ChainRepository;
use poa_state::Stater;
use shared_types::{Address, BlockSummary, ValidatorSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Flow factory bound to one master identity
pub struct Packer {
    repo: Arc<dyn ChainRepository>,
    stater: Stater,
    bandwidth: Arc<Bandwidth>,
    validators: ValidatorSet,
    master: Address,
    beneficiary: Address,
    interval: u64,
    target_gas_limit: AtomicU64,
}

impl Packer {
    /// Create a packer for `master`. Rewards go to `beneficiary`, or to the
    /// master when none is given.
    pub fn new(
        repo: Arc<dyn ChainRepository>,
        stater: Stater,
        bandwidth: Arc<Bandwidth>,
        validators: ValidatorSet,
        master: Address,
        beneficiary: Option<Address>,
        config: &PackerConfig,
    ) -> Self {
        Self {
            repo,
            stater,
            bandwidth,
            validators,
            master,
            beneficiary: beneficiary.unwrap_or(master),
            interval: config.block_interval_secs,
            target_gas_limit: AtomicU64::new(config.target_gas_limit),
        }
    }

    /// Address the packer signs for
    pub fn master(&self) -> Address {
        self.master
    }

    /// Authority set used for rotation
    pub fn validators(&self) -> &ValidatorSet {
        &self.validators
    }

    /// Seconds between slots
    pub fn block_interval(&self) -> u64 {
        self.interval
    }

    /// Gas limit the chain should drift toward (0 = follow bandwidth)
    pub fn set_target_gas_limit(&self, gas_limit: u64) {
        self.target_gas_limit.store(gas_limit, Ordering::Relaxed);
    }

    /// Current target gas limit (0 = follow bandwidth)
    pub fn target_gas_limit(&self) -> u64 {
        self.target_gas_limit.load(Ordering::Relaxed)
    }

    /// Rightful proposer of the slot at `timestamp`
    pub fn proposer_at(&self, timestamp: u64) -> Option<Address> {
        self.validators.proposer_at(timestamp, self.interval)
    }

    /// Open a flow on `parent` at `timestamp`
    pub fn schedule(&self, parent: &BlockSummary, timestamp: u64) -> Result<Flow, SchedulingError> {
        self.schedule_with_gas_limit(parent, timestamp, None)
    }

    /// Open a flow with an explicit gas-limit target.
    ///
    /// `Some(0)` opens a flow that can hold no transactions; any other value
    /// is approached from the parent's limit within the drift bound.
    #[instrument(skip(self, parent), fields(parent = %parent.id))]
    pub fn schedule_with_gas_limit(
        &self,
        parent: &BlockSummary,
        timestamp: u64,
        gas_limit: Option<u64>,
    ) -> Result<Flow, SchedulingError> {
        self.check_slot(parent, timestamp)?;

        let best = self.repo.best_block_summary();
        if best.id != parent.id {
            return Err(SchedulingError::StaleParent {
                parent: parent.id,
                best: best.id,
            });
        }

        let state = self.stater.new_state(parent.header.state_root)?;
        let gas_limit = self.gas_limit_for(parent.header.gas_limit, gas_limit);
        debug!(timestamp, gas_limit, "flow scheduled");

        Ok(Flow::open(FlowParams {
            repo: Arc::clone(&self.repo),
            parent: parent.clone(),
            state,
            timestamp,
            gas_limit,
            proposer: self.master,
            beneficiary: self.beneficiary,
            chain_tag: self.repo.chain_tag(),
        }))
    }

    /// Earliest slot at or after `max(now, parent.timestamp + interval)`
    /// owned by the master
    pub fn next_turn(&self, parent: &BlockSummary, now: u64) -> Result<u64, SchedulingError> {
        if self.interval == 0 {
            return Err(SchedulingError::ZeroInterval);
        }
        if !self.validators.contains(&self.master) {
            return Err(SchedulingError::NotAuthorized(self.master));
        }

        let earliest = now.max(parent.timestamp() + self.interval);
        let mut timestamp = earliest.div_ceil(self.interval) * self.interval;
        for _ in 0..self.validators.len() {
            if self.proposer_at(timestamp) == Some(self.master) {
                return Ok(timestamp);
            }
            timestamp += self.interval;
        }
        Err(SchedulingError::NotAuthorized(self.master))
    }

    fn check_slot(&self, parent: &BlockSummary, timestamp: u64) -> Result<(), SchedulingError> {
        if self.interval == 0 {
            return Err(SchedulingError::ZeroInterval);
        }
        if timestamp % self.interval != 0 {
            return Err(SchedulingError::NotAligned {
                timestamp,
                interval: self.interval,
            });
        }
        let earliest = parent.timestamp() + self.interval;
        if timestamp < earliest {
            return Err(SchedulingError::TooEarly {
                timestamp,
                earliest,
            });
        }
        if !self.validators.contains(&self.master) {
            return Err(SchedulingError::NotAuthorized(self.master));
        }
        match self.proposer_at(timestamp) {
            Some(proposer) if proposer == self.master => Ok(()),
            Some(proposer) => Err(SchedulingError::NotOurTurn {
                timestamp,
                proposer,
            }),
            None => Err(SchedulingError::NotAuthorized(self.master)),
        }
    }

    fn gas_limit_for(&self, parent_limit: u64, explicit: Option<u64>) -> u64 {
        if explicit == Some(0) {
            return 0;
        }
        let target = explicit
            .or_else(|| Some(self.target_gas_limit()).filter(|t| *t > 0))
            .or_else(|| Some(self.bandwidth.suggest_gas_limit()).filter(|s| *s > 0))
            .unwrap_or(parent_limit);
        next_gas_limit(parent_limit, target)
    }
}
