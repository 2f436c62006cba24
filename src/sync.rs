//! Peer synchronization protocol
//!
//! One pass walks a snapshot of the known peers and, per peer: queries its
//! status, merges any peers it knows that we do not, and pulls blocks we are
//! missing, applying them to local chain state one at a time. Failures are
//! per-peer: a broken peer is logged and the pass moves on to the next one.

use crate::block::PeerBlock;
use crate::config::{FailurePolicy, SyncConfig};
use crate::error::{ChainError, Result};
use crate::events::Events;
use crate::node::NodeClient;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Status reported by a peer; fetched fresh every pass, never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct PeerStatus {
    pub hash: String,
    pub latest_block_number: u64,
    pub known_peers: HashSet<String>,
}

/// Runs peer synchronization passes against a node.
pub struct PeerSync<N: NodeClient> {
    node: Arc<N>,
    client: reqwest::Client,
    events: Events,
    failure_policy: FailurePolicy,
}

impl<N: NodeClient> PeerSync<N> {
    pub fn new(node: Arc<N>, config: &SyncConfig, events: Events) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(PeerSync {
            node,
            client: builder.build()?,
            events,
            failure_policy: config.failure_policy,
        })
    }

    /// One full synchronization pass over the currently known peers.
    pub async fn run_peer_operation(&self) {
        self.events.emit("sync: run_peer_operation: started");

        for endpoint in self.node.copy_known_peers() {
            let status = match self.query_peer_status(&endpoint).await {
                Ok(status) => status,
                Err(err) => {
                    self.events
                        .emit(&format!("sync: query_peer_status: {}: ERROR: {}", endpoint, err));
                    continue;
                }
            };

            if let Err(err) = self.add_new_peers(&status.known_peers) {
                self.events
                    .emit(&format!("sync: add_new_peers: {}: ERROR: {}", endpoint, err));
            }

            if status.latest_block_number > self.node.copy_latest_header().number {
                self.events.emit(&format!(
                    "sync: fetch_peer_blocks: {}: remote head at {}",
                    endpoint, status.latest_block_number
                ));
                if let Err(err) = self.fetch_peer_blocks(&endpoint).await {
                    self.events
                        .emit(&format!("sync: fetch_peer_blocks: {}: ERROR: {}", endpoint, err));
                }
            }
        }

        self.events.emit("sync: run_peer_operation: completed");
    }

    /// Asks a peer for its status: chain head and the peers it knows about.
    pub async fn query_peer_status(&self, endpoint: &str) -> Result<PeerStatus> {
        let url = format!("http://{}/v1/node/status", endpoint);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ChainError::PeerQuery(e.to_string()))?;

        if response.status() != StatusCode::OK {
            let body = response
                .text()
                .await
                .map_err(|e| ChainError::PeerQuery(e.to_string()))?;
            return Err(ChainError::RemoteStatus(body));
        }

        let status: PeerStatus = response
            .json()
            .await
            .map_err(|e| ChainError::PeerQuery(e.to_string()))?;

        self.events.emit(&format!(
            "sync: query_peer_status: {}: head {} / {} known peers",
            endpoint,
            status.latest_block_number,
            status.known_peers.len()
        ));

        Ok(status)
    }

    /// Registers every reported peer the node does not already know.
    fn add_new_peers(&self, known_peers: &HashSet<String>) -> Result<()> {
        for endpoint in known_peers {
            match self.node.add_peer_node(endpoint) {
                Ok(()) => self
                    .events
                    .emit(&format!("sync: add_new_peers: registered {}", endpoint)),
                Err(err) => {
                    let err = ChainError::PeerRegistration(format!("{}: {}", endpoint, err));
                    match self.failure_policy {
                        FailurePolicy::FailFast => return Err(err),
                        FailurePolicy::Continue => {
                            self.events.emit(&format!("sync: add_new_peers: ERROR: {}", err))
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Requests the blocks this node is missing and applies them in order.
    pub async fn fetch_peer_blocks(&self, endpoint: &str) -> Result<()> {
        let from = self.node.copy_latest_header().number + 1;
        let url = format!("http://{}/v1/blocks/list/{}/latest", endpoint, from);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ChainError::PeerQuery(e.to_string()))?;

        if response.status() == StatusCode::NO_CONTENT {
            self.events
                .emit(&format!("sync: fetch_peer_blocks: {}: no new blocks", endpoint));
            return Ok(());
        }

        if response.status() != StatusCode::OK {
            let body = response
                .text()
                .await
                .map_err(|e| ChainError::PeerQuery(e.to_string()))?;
            return Err(ChainError::RemoteStatus(body));
        }

        let blocks: Vec<PeerBlock> = response
            .json()
            .await
            .map_err(|e| ChainError::PeerQuery(e.to_string()))?;

        for block in blocks {
            self.events.emit(&format!(
                "sync: fetch_peer_blocks: applying block {} [{}]",
                block.header.number, block.header.this_block_hash
            ));
            if let Err(err) = self.node.apply_peer_block(block) {
                let err = ChainError::BlockApplication(err.to_string());
                match self.failure_policy {
                    FailurePolicy::FailFast => return Err(err),
                    FailurePolicy::Continue => self
                        .events
                        .emit(&format!("sync: fetch_peer_blocks: ERROR: {}", err)),
                }
            }
        }

        Ok(())
    }
}
