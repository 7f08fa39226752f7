use crate::config::{load_config, Config};
use crate::ledger::Ledger;
use crate::payment::{DevGateway, PaymentGateway, SharedSecretGateway};
use crate::persistence::{Database, InMemoryStore, Persistence};
use std::fs;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeState {
    Booting,
    Ready,
    /// The restored chain failed its integrity check. The node keeps
    /// serving so the failure can be inspected, but health reports it.
    Degraded,
}

pub struct Node {
    pub config: Config,
    pub persistence: Arc<Box<dyn Persistence>>,
    pub ledger: Arc<RwLock<Ledger>>,
    pub gateway: Arc<Box<dyn PaymentGateway>>,
    pub state: Arc<RwLock<NodeState>>,
}

impl Node {
    pub async fn init() -> Result<Self, Box<dyn std::error::Error>> {
        // Load and validate config
        let config = load_config()?;

        tracing_subscriber::fmt::init();
        info!("Starting fundledger node (db = {})", config.database.path);

        // Ensure the data directory exists before sqlite tries to create the file
        let db_path = std::path::Path::new(&config.database.path);
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create data dir {:?}: {}", parent, e))?;
            }
        }

        // Setup persistence
        let persistence: Box<dyn Persistence> = match Database::open(&config.database.path) {
            Ok(db) => Box::new(db),
            Err(e) => {
                warn!(
                    "Failed to open DB at {}: {}. Falling back to in-memory storage.",
                    config.database.path, e
                );
                Box::new(InMemoryStore::new())
            }
        };

        // Payment gateway boundary
        let gateway: Box<dyn PaymentGateway> = if config.gateway.dev_mode {
            warn!("gateway.dev_mode is enabled; receipts will not be signature-checked");
            Box::new(DevGateway)
        } else {
            Box::new(SharedSecretGateway::new(config.gateway.key_secret.clone()))
        };

        Self::from_parts(config, persistence, gateway)
    }

    /// Assemble a node from explicit parts. `init()` goes through here;
    /// tests construct nodes directly with an in-memory store.
    pub fn from_parts(
        config: Config,
        persistence: Box<dyn Persistence>,
        gateway: Box<dyn PaymentGateway>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        // Restore the chain from the block log, or synthesize a genesis and
        // write it ahead so restarts observe the same chain.
        let stored = persistence.load_chain()?;
        let ledger = if stored.is_empty() {
            let ledger = Ledger::new()?;
            if let Some(genesis) = ledger.tail() {
                persistence.append_block(genesis)?;
            }
            info!("Created new ledger with genesis block");
            ledger
        } else {
            let ledger = Ledger::from_blocks(stored)?;
            info!("Restored ledger with {} block(s)", ledger.len());
            ledger
        };

        // Integrity failure is a signal, not an exception: report it and let
        // operators decide. The ledger never attempts self-repair.
        let state = if ledger.verify() {
            NodeState::Booting
        } else {
            error!("Ledger integrity check failed on startup; node is degraded");
            NodeState::Degraded
        };

        Ok(Node {
            config,
            persistence: Arc::new(persistence),
            ledger: Arc::new(RwLock::new(ledger)),
            gateway: Arc::new(gateway),
            state: Arc::new(RwLock::new(state)),
        })
    }

    pub async fn start(self: Arc<Self>) -> Result<(), Box<dyn std::error::Error>> {
        // Ensure the API port is available before spawning anything
        let api_port = self.config.server.api_port;
        let api_bind = format!("0.0.0.0:{}", api_port);
        TcpListener::bind(&api_bind)
            .map_err(|e| format!("API port {} unavailable: {}", api_port, e))?;

        let node = self.clone();
        let _api_task = tokio::spawn(async move {
            if let Err(e) = Node::start_api(node, api_port).await {
                error!("API server failed: {}", e);
            }
        });

        {
            let mut s = self.state.write().await;
            if *s == NodeState::Booting {
                *s = NodeState::Ready;
            }
        }

        // Node main loop - health logging
        loop {
            info!(
                "Node running: chain height = {}",
                self.ledger.read().await.len()
            );
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    }

    #[cfg(feature = "api")]
    async fn start_api(node: Arc<Self>, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let api_node = std::sync::Arc::new(crate::api::ApiNode::new(node));
        info!("Starting axum API server on 0.0.0.0:{}", port);
        crate::api::run_api_server(api_node, port).await?;
        Ok(())
    }

    #[cfg(not(feature = "api"))]
    async fn start_api(_node: Arc<Self>, _port: u16) -> Result<(), Box<dyn std::error::Error>> {
        Err("API feature not enabled in this build".into())
    }
}
