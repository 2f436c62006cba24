//! Emberchain - a minimal proof-of-work blockchain node core
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Ledger & Transactions
//! - [`ledger`] - Account balance sheet with atomic transaction application
//! - [`transaction`] - Transaction types, signing and sender recovery
//! - [`block`] - Block wire types exchanged with peers
//!
//! ## Coordination
//! - [`worker`] - Mining coordinator: peer-sync and mining loops
//! - [`sync`] - Peer synchronization protocol
//! - [`node`] - Contract the node implementation provides to the loops
//!
//! ## Cryptography
//! - [`crypto`] - Addresses, key pairs, recoverable signatures (secp256k1)
//!
//! ## Configuration & Utilities
//! - [`accounts`] - Address-to-name lookup from key files
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`events`] - Event sink for tracing state transitions

#![forbid(unsafe_code)]

// ============================================================================
// Ledger & Transactions
// ============================================================================
pub mod block;
pub mod ledger;
pub mod transaction;

// ============================================================================
// Coordination
// ============================================================================
pub mod node;
pub mod sync;
pub mod worker;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod accounts;
pub mod config;
pub mod error;
pub mod events;
