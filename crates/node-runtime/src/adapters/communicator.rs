//! # In-Process Communicator
//!
//! Channel-backed [`Communicator`] for the solo devnet and for tests that run
//! several nodes in one process. Peers are linked explicitly; a broadcast
//! lands in every linked peer's inbound stream.

use super::ports::{Communicator, CommunicatorError};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{Block, BlockId};
use tokio::sync::mpsc;
use tracing::{debug, trace};

pub struct InProcessCommunicator {
    inbound_tx: mpsc::UnboundedSender<Block>,
    inbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Block>>>,
    peers: RwLock<Vec<mpsc::UnboundedSender<Block>>>,
    broadcasted: RwLock<Vec<BlockId>>,
}

impl InProcessCommunicator {
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            peers: RwLock::new(Vec::new()),
            broadcasted: RwLock::new(Vec::new()),
        }
    }

    /// Deliver broadcasts in both directions between `a` and `b`
    pub fn link(a: &Self, b: &Self) {
        a.peers.write().push(b.inbound_tx.clone());
        b.peers.write().push(a.inbound_tx.clone());
    }

    /// Inject a block as if a peer had sent it
    pub fn deliver(&self, block: Block) -> Result<(), CommunicatorError> {
        self.inbound_tx
            .send(block)
            .map_err(|_| CommunicatorError::Closed)
    }

    /// IDs of blocks broadcast so far, oldest first
    pub fn broadcasted(&self) -> Vec<BlockId> {
        self.broadcasted.read().clone()
    }
}

impl Default for InProcessCommunicator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Communicator for InProcessCommunicator {
    async fn broadcast_block(&self, block: &Block) -> Result<(), CommunicatorError> {
        let id = block.id();
        self.broadcasted.write().push(id);
        // Closed peers are dropped from the fan-out.
        self.peers.write().retain(|peer| peer.send(block.clone()).is_ok());
        trace!(block_id = %id, "block broadcast");
        Ok(())
    }

    async fn sync(&self, sink: mpsc::Sender<Block>) -> Result<(), CommunicatorError> {
        let mut inbound = self
            .inbound_rx
            .lock()
            .take()
            .ok_or(CommunicatorError::AlreadySyncing)?;
        while let Some(block) = inbound.recv().await {
            if sink.send(block).await.is_err() {
                debug!("inbound sink closed");
                break;
            }
        }
        Ok(())
    }
}
