//! # Authority-Chain Node Runtime
//!
//! Runs a single-validator solo devnet on in-memory collaborators.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (JSON file given as the first argument, then `POA_*`
//!    environment overrides)
//! 2. Load or generate the master key under the data directory
//! 3. Build a devnet genesis with the master as sole authority
//! 4. Start the packer loop and block ingress
//! 5. Run until Ctrl+C

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use node_runtime::{
    devnet_genesis, unix_now, InProcessCommunicator, Master, Node, NodeConfig, NodeError,
    Subsystems,
};
use poa_packer::dev_accounts;
use poa_txpool::TxPool;
use shared_types::constants::MIN_TX_GAS;
use shared_types::{Clause, TransactionBuilder};

/// Transfers queued at startup so the first blocks carry traffic
const SEED_TRANSFERS: u64 = 16;

/// The running node plus its task handles.
struct NodeRuntime {
    node: Arc<Node>,
    shutdown_tx: watch::Sender<bool>,
    packer: JoinHandle<Result<(), NodeError>>,
    ingress: JoinHandle<Result<(), NodeError>>,
}

impl NodeRuntime {
    fn start(config: &NodeConfig) -> Result<Self> {
        let master = Master::load_or_generate(config.storage.master_key_path())
            .context("Failed to load master key")?;
        let genesis = devnet_genesis(
            master.address(),
            config.packer.block_interval_secs,
            unix_now(),
        );
        let subsystems = Subsystems::in_memory(&genesis).context("Failed to build genesis")?;

        let pool = Arc::new(TxPool::new(config.mempool.clone()));
        let node = Arc::new(
            Node::new(
                config,
                subsystems,
                master,
                pool,
                Arc::new(InProcessCommunicator::new()),
            )
            .context("Failed to assemble node")?,
        );
        seed_transfers(&node);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let packer = tokio::spawn(Arc::clone(&node).run(shutdown_rx.clone()));
        let ingress = tokio::spawn(Arc::clone(&node).run_ingress(shutdown_rx));

        info!(
            master = %hex::encode(node.master().address()),
            genesis = %node.repo().genesis_id(),
            interval = config.packer.block_interval_secs,
            data_dir = %config.storage.data_dir.display(),
            "solo devnet running"
        );
        Ok(Self {
            node,
            shutdown_tx,
            packer,
            ingress,
        })
    }

    /// Run until Ctrl+C, or until the packer loop halts on its own.
    async fn run_until_ctrl_c(mut self) -> Result<()> {
        let halted = tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl+C")?;
                None
            }
            result = &mut self.packer => Some(result),
        };
        let Some(result) = halted else {
            return self.shutdown().await;
        };

        self.shutdown_tx.send_replace(true);
        self.ingress.await.context("ingress task panicked")??;
        result.context("packer task panicked")??;
        Ok(())
    }

    async fn shutdown(self) -> Result<()> {
        info!("Initiating graceful shutdown...");
        self.shutdown_tx.send_replace(true);
        self.packer.await.context("packer task panicked")??;
        self.ingress.await.context("ingress task panicked")??;

        let best = self.node.repo().best_block_summary();
        info!(
            height = best.number(),
            finalized = self.node.finality().finalized_height(),
            blocks_packed = self.node.metrics().get_blocks_packed(),
            "Shutdown complete"
        );
        Ok(())
    }
}

/// Queue value transfers between dev accounts.
fn seed_transfers(node: &Node) {
    let accounts = dev_accounts();
    let chain_tag = node.repo().chain_tag();
    for nonce in 0..SEED_TRANSFERS {
        let from = &accounts[nonce as usize % accounts.len()];
        let to = accounts[(nonce as usize + 1) % accounts.len()].address();
        let queued = TransactionBuilder::new(chain_tag)
            .clause(Clause::transfer(to, 1_000_000_000))
            .gas(MIN_TX_GAS)
            .nonce(nonce)
            .sign(from)
            .map_err(|e| e.to_string())
            .and_then(|tx| node.mempool().add(tx).map_err(|e| e.to_string()));
        if let Err(err) = queued {
            error!(nonce, error = %err, "seed transfer not queued");
        }
    }
}

/// Load configuration from file and environment.
fn load_config() -> Result<NodeConfig> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => NodeConfig::from_json_file(&path)
            .with_context(|| format!("Failed to load configuration from {path}"))?,
        None => NodeConfig::default(),
    };
    config.apply_env();
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let config = load_config()?;
    let runtime = NodeRuntime::start(&config)?;

    info!("Node is running. Press Ctrl+C to stop.");
    runtime.run_until_ctrl_c().await
}
