//! # Packer Loop
//!
//! One [`Node`] per local master. The loop walks
//! `Idle → Scheduling → Packing → Committing → Broadcasting → Idle`:
//!
//! 1. wait for the master's next slot after the best block
//! 2. open a [`Flow`] and drain the mempool into it within the packing budget
//! 3. seal, then commit state and block under the commit lock
//! 4. feed bandwidth and finality, hand the block to the communicator
//!
//! Peer blocks enter through [`Node::import_block`]. Promoting one moves the
//! best pointer, which cancels any cycle still building on the old parent.
//! Cancellation is sampled between adoptions, before sealing, and under the
//! commit lock; a started step always runs to completion.

use crate::adapters::ports::Communicator;
use crate::container::{NodeConfig, Subsystems};
use crate::error::NodeError;
use crate::master::Master;
use parking_lot::Mutex;
use poa_bandwidth::Bandwidth;
use poa_chain::ChainRepository;
use poa_finality::FinalityEngine;
use poa_packer::{AdoptionError, BlockProcessor, Flow, Metrics, Packer, PackerConfig, ProcessError};
use poa_state::Stage;
use poa_txpool::Mempool;
use shared_types::constants::MIN_TX_GAS;
use shared_types::{Block, BlockId, BlockSummary, Receipt};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, instrument, warn};

/// Inbound blocks waiting for import
const INBOUND_BUFFER: usize = 64;

/// Where the packer loop currently is
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopPhase {
    Idle,
    Scheduling,
    Packing,
    Committing,
    Broadcasting,
}

impl fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Scheduling => "scheduling",
            Self::Packing => "packing",
            Self::Committing => "committing",
            Self::Broadcasting => "broadcasting",
        };
        f.write_str(name)
    }
}

/// Result of importing a peer block
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Already stored
    Known,
    /// Stored; `promoted` when it became the best block
    Imported {
        summary: BlockSummary,
        promoted: bool,
    },
}

/// Cancellation signal of one cycle: raised once the best block moves off
/// the cycle's parent.
struct Cancellation {
    best: watch::Receiver<BlockId>,
    parent: BlockId,
}

impl Cancellation {
    fn is_raised(&self) -> bool {
        *self.best.borrow() != self.parent
    }
}

/// Sealed block awaiting commit
struct Sealed {
    block: Block,
    stage: Stage,
    receipts: Vec<Receipt>,
    packing_time: Duration,
}

/// A validator node: packer loop plus block ingress.
pub struct Node {
    config: PackerConfig,
    master: Master,
    repo: Arc<dyn ChainRepository>,
    mempool: Arc<dyn Mempool>,
    bandwidth: Arc<Bandwidth>,
    finality: Arc<FinalityEngine>,
    packer: Packer,
    processor: BlockProcessor,
    communicator: Arc<dyn Communicator>,
    metrics: Metrics,
    phase: watch::Sender<LoopPhase>,
    commit_lock: Mutex<()>,
}

impl Node {
    /// Assemble the services for `master` on top of `subsystems`.
    pub fn new(
        config: &NodeConfig,
        subsystems: Subsystems,
        master: Master,
        mempool: Arc<dyn Mempool>,
        communicator: Arc<dyn Communicator>,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        let Subsystems {
            stater,
            repo,
            kv,
            validators,
            ..
        } = subsystems;

        let bandwidth = Arc::new(
            Bandwidth::new(config.bandwidth.clone()).with_local_signer(master.address()),
        );
        let finality = Arc::new(FinalityEngine::open(
            config.finality.clone(),
            Arc::clone(&repo),
            kv,
            validators.clone(),
        )?);
        let packer = Packer::new(
            Arc::clone(&repo),
            stater.clone(),
            Arc::clone(&bandwidth),
            validators.clone(),
            master.address(),
            master.beneficiary(),
            &config.packer,
        );
        let processor = BlockProcessor::new(
            Arc::clone(&repo),
            stater,
            validators,
            config.packer.block_interval_secs,
        );
        let (phase, _) = watch::channel(LoopPhase::Idle);

        info!(
            master = %hex::encode(master.address()),
            authorised = packer.validators().contains(&master.address()),
            interval = config.packer.block_interval_secs,
            "node assembled"
        );

        Ok(Self {
            config: config.packer.clone(),
            master,
            repo,
            mempool,
            bandwidth,
            finality,
            packer,
            processor,
            communicator,
            metrics: Metrics::new(),
            phase,
            commit_lock: Mutex::new(()),
        })
    }

    pub fn master(&self) -> &Master {
        &self.master
    }

    pub fn repo(&self) -> &Arc<dyn ChainRepository> {
        &self.repo
    }

    pub fn mempool(&self) -> &Arc<dyn Mempool> {
        &self.mempool
    }

    pub fn bandwidth(&self) -> &Arc<Bandwidth> {
        &self.bandwidth
    }

    pub fn finality(&self) -> &Arc<FinalityEngine> {
        &self.finality
    }

    pub fn packer(&self) -> &Packer {
        &self.packer
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Current loop phase
    pub fn phase(&self) -> LoopPhase {
        *self.phase.borrow()
    }

    /// Follow loop phase changes
    pub fn subscribe_phase(&self) -> watch::Receiver<LoopPhase> {
        self.phase.subscribe()
    }

    /// Gas limit the bandwidth estimate currently supports
    pub fn suggested_gas_limit(&self) -> u64 {
        self.bandwidth.suggest_gas_limit()
    }

    /// Drive the packer loop until `shutdown` flips or a fatal error occurs.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> Result<(), NodeError> {
        let mut best = self.repo.subscribe_best();
        let mut not_before = 0u64;
        info!(master = %hex::encode(self.master.address()), "packer loop started");

        loop {
            if *shutdown.borrow() {
                break;
            }
            self.set_phase(LoopPhase::Idle);
            best.borrow_and_update();
            let parent = self.repo.best_block_summary();

            let slot = match self.packer.next_turn(&parent, unix_now().max(not_before)) {
                Ok(slot) => slot,
                Err(err) => {
                    error!(error = %err, "master cannot produce blocks");
                    return Err(err.into());
                }
            };
            debug!(slot, parent = %parent.id, "waiting for slot");

            tokio::select! {
                _ = tokio::time::sleep(until(slot)) => {}
                changed = best.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                _ = shutdown.changed() => break,
            }

            match self.pack_at(&parent, slot).await {
                Ok(_) => {}
                Err(err) if err.is_fatal() => {
                    self.set_phase(LoopPhase::Idle);
                    error!(error = %err, "packer loop halted");
                    return Err(err);
                }
                Err(err) => {
                    warn!(slot, error = %err, "packing cycle failed");
                    not_before = slot + 1;
                }
            }
        }

        self.set_phase(LoopPhase::Idle);
        info!("packer loop stopped");
        Ok(())
    }

    /// Run one cycle on `parent` at `timestamp`.
    ///
    /// `Ok(None)` when the cycle was cancelled because the best block moved.
    #[instrument(skip(self, parent), fields(parent = %parent.id, number = parent.number() + 1))]
    pub async fn pack_at(
        &self,
        parent: &BlockSummary,
        timestamp: u64,
    ) -> Result<Option<BlockSummary>, NodeError> {
        let cancel = Cancellation {
            best: self.repo.subscribe_best(),
            parent: parent.id,
        };

        let sealed = match self.assemble(parent, timestamp, &cancel) {
            Ok(Some(sealed)) => sealed,
            Ok(None) => return Ok(self.cancelled(parent)),
            Err(err) => {
                self.set_phase(LoopPhase::Idle);
                return Err(err);
            }
        };

        self.set_phase(LoopPhase::Committing);
        let Sealed {
            block,
            stage,
            receipts,
            packing_time,
        } = sealed;
        let summary = match self.commit(&block, &stage, receipts, &cancel).await {
            Ok(Some(summary)) => summary,
            Ok(None) => return Ok(self.cancelled(parent)),
            Err(err) => {
                self.set_phase(LoopPhase::Idle);
                return Err(err);
            }
        };

        self.bandwidth.update(&block.header, packing_time);
        self.mempool.remove(&summary.tx_ids);
        self.observe_finality(&summary);
        self.metrics
            .record_block_packed(block.transactions.len(), block.header.gas_used);
        info!(
            height = summary.number(),
            block_id = %summary.id,
            txs = block.transactions.len(),
            gas_used = block.header.gas_used,
            elapsed_ms = packing_time.as_millis() as u64,
            "block packed"
        );

        self.set_phase(LoopPhase::Broadcasting);
        if let Err(err) = self.communicator.broadcast_block(&block).await {
            warn!(block_id = %summary.id, error = %err, "broadcast failed");
        }
        self.set_phase(LoopPhase::Idle);
        Ok(Some(summary))
    }

    /// Verify and store a block received from a peer.
    #[instrument(skip(self, block), fields(block_id = %block.id(), number = block.number()))]
    pub fn import_block(&self, block: &Block) -> Result<ImportOutcome, NodeError> {
        let started = Instant::now();
        let (summary, promoted) = {
            let _guard = self.commit_lock.lock();
            let processed = match self.processor.process(block, unix_now()) {
                Ok(processed) => processed,
                Err(ProcessError::Known(_)) => return Ok(ImportOutcome::Known),
                Err(err) => {
                    warn!(error = %err, "peer block rejected");
                    return Err(err.into());
                }
            };
            let promoted = block.number() > self.repo.best_block_summary().number();
            let summary =
                self.write_block(block, &processed.stage, processed.receipts, promoted)?;
            (summary, promoted)
        };
        let elapsed = started.elapsed();

        self.bandwidth.update(&block.header, elapsed);
        self.mempool.remove(&summary.tx_ids);
        self.observe_finality(&summary);
        info!(
            promoted,
            txs = summary.tx_ids.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "peer block imported"
        );
        Ok(ImportOutcome::Imported { summary, promoted })
    }

    /// Import blocks delivered by the communicator until `shutdown` flips.
    pub async fn run_ingress(
        self: Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), NodeError> {
        let (sink, mut inbound) = mpsc::channel(INBOUND_BUFFER);
        let communicator = Arc::clone(&self.communicator);
        let pump = tokio::spawn(async move { communicator.sync(sink).await });

        loop {
            tokio::select! {
                block = inbound.recv() => match block {
                    Some(block) => {
                        // Rejections are logged by import_block.
                        if let Err(err) = self.import_block(&block) {
                            if err.is_fatal() {
                                pump.abort();
                                return Err(err);
                            }
                        }
                    }
                    None => {
                        return match pump.await {
                            Ok(Err(err)) => Err(err.into()),
                            _ => Ok(()),
                        };
                    }
                },
                _ = shutdown.changed() => break,
            }
        }
        pump.abort();
        Ok(())
    }

    /// Schedule, drain the mempool and seal. `None` when cancelled.
    fn assemble(
        &self,
        parent: &BlockSummary,
        timestamp: u64,
        cancel: &Cancellation,
    ) -> Result<Option<Sealed>, NodeError> {
        self.set_phase(LoopPhase::Scheduling);
        let mut flow = self.packer.schedule(parent, timestamp)?;

        self.set_phase(LoopPhase::Packing);
        let started = Instant::now();
        if !self.drain_mempool(&mut flow, cancel, started + self.config.packing_budget()) {
            return Ok(None);
        }
        if cancel.is_raised() {
            return Ok(None);
        }

        let (block, stage, receipts) =
            flow.pack(self.master.key(), None, self.config.vote_finality)?;
        Ok(Some(Sealed {
            block,
            stage,
            receipts,
            packing_time: started.elapsed(),
        }))
    }

    /// Adopt pending transactions until the pool, the gas or the budget runs
    /// out. Returns `false` when cancelled.
    fn drain_mempool(&self, flow: &mut Flow, cancel: &Cancellation, deadline: Instant) -> bool {
        let mut evicted = Vec::new();
        let mut adopted = 0usize;
        let mut completed = true;

        for tx in self.mempool.pending() {
            if cancel.is_raised() {
                completed = false;
                break;
            }
            if Instant::now() >= deadline {
                debug!(adopted, "packing budget exhausted");
                break;
            }
            match flow.adopt(&tx) {
                Ok(()) => adopted += 1,
                Err(AdoptionError::GasExceedsLimit { .. }) => {
                    if flow.remaining_gas() < MIN_TX_GAS {
                        break;
                    }
                }
                Err(err) if err.is_recoverable() => {
                    debug!(error = %err, "transaction deferred");
                }
                Err(err) => {
                    debug!(error = %err, "transaction rejected");
                    self.metrics.record_rejection();
                    if let Ok(id) = tx.id() {
                        evicted.push(id);
                    }
                }
            }
        }

        if !evicted.is_empty() {
            self.mempool.remove(&evicted);
        }
        debug!(adopted, evicted = evicted.len(), gas_used = flow.gas_used(), "mempool drained");
        completed
    }

    /// Commit with bounded retries. `None` when cancelled under the lock.
    async fn commit(
        &self,
        block: &Block,
        stage: &Stage,
        receipts: Vec<Receipt>,
        cancel: &Cancellation,
    ) -> Result<Option<BlockSummary>, NodeError> {
        let attempts = self.config.max_commit_retries.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = {
                let _guard = self.commit_lock.lock();
                if cancel.is_raised() {
                    return Ok(None);
                }
                self.write_block(block, stage, receipts.clone(), true)
            };

            match result {
                Ok(summary) => return Ok(Some(summary)),
                Err(err) if attempt < attempts => {
                    warn!(attempt, max = attempts, error = %err, "commit failed, retrying");
                    tokio::time::sleep(self.config.commit_backoff(attempt)).await;
                }
                Err(err) => {
                    error!(attempts = attempt, error = %err, "commit failed, halting packer");
                    return Err(NodeError::StorageHalt {
                        attempts: attempt,
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    /// Materialise state and append. Caller holds the commit lock.
    fn write_block(
        &self,
        block: &Block,
        stage: &Stage,
        receipts: Vec<Receipt>,
        promote: bool,
    ) -> Result<BlockSummary, NodeError> {
        stage.commit()?;
        let conflicts = self.repo.conflicts_at(block.number());
        let summary = if promote {
            self.repo.add_block_and_set_best(block, receipts, conflicts)?
        } else {
            self.repo.add_block(block, receipts, conflicts)?
        };
        Ok(summary)
    }

    fn observe_finality(&self, summary: &BlockSummary) {
        match self.finality.on_block(summary) {
            Ok(Some(finalized)) => {
                debug!(height = finalized.number(), block_id = %finalized.id, "finality advanced");
            }
            Ok(None) => {}
            Err(err) => warn!(block_id = %summary.id, error = %err, "finality could not observe block"),
        }
    }

    fn cancelled(&self, parent: &BlockSummary) -> Option<BlockSummary> {
        self.metrics.record_cancelled();
        self.set_phase(LoopPhase::Idle);
        info!(
            parent = %parent.id,
            best = %self.repo.best_block_summary().id,
            "cycle cancelled, parent is stale"
        );
        None
    }

    fn set_phase(&self, phase: LoopPhase) {
        let previous = self.phase.send_replace(phase);
        if previous != phase {
            debug!(from = %previous, to = %phase, "loop phase");
        }
    }
}

/// Unix time in seconds
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Delay until unix second `timestamp`
fn until(timestamp: u64) -> Duration {
    (UNIX_EPOCH + Duration::from_secs(timestamp))
        .duration_since(SystemTime::now())
        .unwrap_or(Duration::ZERO)
}
