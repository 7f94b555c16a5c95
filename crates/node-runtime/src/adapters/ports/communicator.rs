//! Network port: block gossip in both directions

use async_trait::async_trait;
use shared_types::Block;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised by a [`Communicator`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommunicatorError {
    /// Inbound stream already handed to another consumer
    #[error("Inbound block stream already taken")]
    AlreadySyncing,

    /// Transport shut down
    #[error("Communicator closed")]
    Closed,
}

/// Peer-to-peer block exchange.
#[async_trait]
pub trait Communicator: Send + Sync {
    /// Announce a locally sealed block to peers.
    async fn broadcast_block(&self, block: &Block) -> Result<(), CommunicatorError>;

    /// Forward peer-delivered blocks into `sink`, in arrival order, until the
    /// transport or the sink closes.
    async fn sync(&self, sink: mpsc::Sender<Block>) -> Result<(), CommunicatorError>;
}
