//! Block wire types exchanged with peers
//!
//! Only the fields the sync protocol needs are modeled here. Full block
//! construction and validation live behind the [`crate::node::NodeClient`]
//! contract.

use crate::transaction::SignedTx;
use serde::{Deserialize, Serialize};

/// The part of a block header the sync protocol cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub number: u64,
    pub previous_block_hash: String,
    pub this_block_hash: String,
}

impl BlockHeader {
    /// The header a freshly initialized chain reports before any block exists.
    pub fn genesis() -> Self {
        BlockHeader {
            number: 0,
            previous_block_hash: String::new(),
            this_block_hash: String::new(),
        }
    }
}

/// A block as received from (or handed to) a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerBlock {
    pub header: BlockHeader,
    pub transactions: Vec<SignedTx>,
}
