//! Account balance ledger
//!
//! The ledger is the only piece of state in the node core that needs explicit
//! mutual exclusion. One mutex spans every read and write, including the
//! copying reads: reads never run concurrently with each other either. That
//! costs throughput and keeps the reasoning trivial, a trade-off left as-is
//! until profiling says otherwise.

use crate::crypto::{address_to_hex, Address};
use crate::error::{ChainError, Result};
use crate::transaction::SignedTx;
use parking_lot::Mutex;
use std::collections::HashMap;

/// In-memory balance sheet mapping account addresses to balances.
pub struct Ledger {
    mining_reward: u64,
    balances: Mutex<HashMap<Address, u64>>,
}

impl Ledger {
    /// Constructs a ledger, optionally seeded from a genesis snapshot.
    pub fn new(mining_reward: u64, snapshot: Option<HashMap<Address, u64>>) -> Self {
        Ledger {
            mining_reward,
            balances: Mutex::new(snapshot.unwrap_or_default()),
        }
    }

    pub fn mining_reward(&self) -> u64 {
        self.mining_reward
    }

    /// Discards current balances and installs the given snapshot.
    pub fn reset(&self, snapshot: HashMap<Address, u64>) {
        *self.balances.lock() = snapshot;
    }

    /// Adopts another ledger's balances, e.g. a freshly recomputed canonical
    /// state after a chain reorganization.
    pub fn replace(&self, other: &Ledger) {
        let theirs = other.balances.lock().clone();
        *self.balances.lock() = theirs;
    }

    /// Deletes the address's entry.
    pub fn remove(&self, address: &Address) {
        self.balances.lock().remove(address);
    }

    /// Returns an independent copy of the current balances.
    pub fn balances(&self) -> HashMap<Address, u64> {
        self.balances.lock().clone()
    }

    /// Credits the mining reward to the miner.
    pub fn apply_mining_reward(&self, miner: &Address) {
        let mut balances = self.balances.lock();
        *balances.entry(*miner).or_insert(0) += self.mining_reward;
    }

    /// Applies a transaction to the balance sheet.
    ///
    /// Validation and mutation happen under one lock hold so the
    /// read-check-write sequence is atomic: either every balance change
    /// commits or none does. The sender pays the transferred value and the
    /// fee; the recipient receives the value; the miner receives the fee.
    pub fn apply_transaction(&self, miner: &Address, tx: &SignedTx) -> Result<()> {
        // Signature recovery is pure computation, keep it outside the lock.
        let from = tx.from_address()?;

        let mut balances = self.balances.lock();

        if from == tx.tx.to {
            return Err(ChainError::InvalidTransaction(format!(
                "sending money to yourself, from {}, to {}",
                address_to_hex(&from),
                address_to_hex(&tx.tx.to)
            )));
        }

        let from_balance = balances.get(&from).copied().unwrap_or(0);
        if tx.tx.value > from_balance {
            return Err(ChainError::InsufficientBalance(format!(
                "{} has an insufficient balance",
                address_to_hex(&from)
            )));
        }

        *balances.entry(from).or_insert(0) -= tx.tx.value;
        *balances.entry(tx.tx.to).or_insert(0) += tx.tx.value;

        // The fee is charged on top of the value. Only the value is covered
        // by the balance check above, so the fee debit saturates rather than
        // letting an unsigned subtraction underflow.
        let fee = tx.fee();
        *balances.entry(*miner).or_insert(0) += fee;
        let entry = balances.entry(from).or_insert(0);
        *entry = entry.saturating_sub(fee);

        Ok(())
    }
}

impl Clone for Ledger {
    /// Deep copy: mutations to either ledger afterward never affect the other.
    fn clone(&self) -> Self {
        Ledger {
            mining_reward: self.mining_reward,
            balances: Mutex::new(self.balances.lock().clone()),
        }
    }
}
