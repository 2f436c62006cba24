//! The node collaborator contract
//!
//! The worker and the sync protocol never touch chain storage, the mempool
//! or the peer table directly. They drive a [`NodeClient`] implementation,
//! which owns that state and is responsible for its own synchronization.

use crate::block::{BlockHeader, PeerBlock};
use crate::error::Result;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

/// Contract the node implementation provides to the worker and sync loops.
///
/// All methods except `mine_new_block` are expected to return quickly.
/// `mine_new_block` is a long computation; the worker runs it on a blocking
/// thread and hands it a cancellation token the implementation must poll at
/// safe points. Cancellation is cooperative: a block finished after the
/// token fires is a benign race and is simply discarded by the caller.
pub trait NodeClient: Send + Sync + 'static {
    /// Number of pending transactions in the mempool.
    fn query_mempool_length(&self) -> usize;

    /// Snapshot of the currently known peer endpoints (`host:port`).
    fn copy_known_peers(&self) -> HashSet<String>;

    /// Header of the current chain head.
    fn copy_latest_header(&self) -> BlockHeader;

    /// Mines a new block over the current mempool contents.
    ///
    /// Fails with [`crate::error::ChainError::NotEnoughTransactions`] when
    /// the mempool is too small and [`crate::error::ChainError::MiningCancelled`]
    /// when the token fired before the proof of work completed.
    fn mine_new_block(&self, cancel: &CancellationToken) -> Result<PeerBlock>;

    /// Registers a peer endpoint if it is not already known.
    fn add_peer_node(&self, endpoint: &str) -> Result<()>;

    /// Validates and applies a block received from a peer to local chain state.
    fn apply_peer_block(&self, block: PeerBlock) -> Result<()>;
}
