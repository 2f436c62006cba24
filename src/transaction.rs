//! Transaction types and sender recovery
//!
//! A transaction never stores its sender. The sender address is recovered
//! from the recoverable signature over the unsigned transaction, which is
//! what makes forging a sender impossible without the secret key.

use crate::crypto::{self, Address, KeyPair};
use crate::error::{ChainError, Result};
use serde::{Deserialize, Serialize};

/// An unsigned transfer of value between two accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    pub to: Address,
    pub value: u64,
    pub gas: u64,
    pub tip: u64,
}

impl Tx {
    pub fn new(to: Address, value: u64, gas: u64, tip: u64) -> Self {
        Tx {
            to,
            value,
            gas,
            tip,
        }
    }

    /// The fee charged to the sender and credited to the mining node.
    pub fn fee(&self) -> u64 {
        self.gas + self.tip
    }

    /// Signs the transaction, producing the form accepted by the ledger.
    pub fn sign(self, key_pair: &KeyPair) -> Result<SignedTx> {
        let payload = bincode::serialize(&self)?;
        let signature = key_pair.sign_recoverable(&payload)?;
        Ok(SignedTx {
            tx: self,
            signature: signature.to_vec(),
        })
    }
}

/// A transaction plus the recoverable signature of its sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTx {
    pub tx: Tx,
    pub signature: Vec<u8>,
}

impl SignedTx {
    /// Recovers the address of the account that signed this transaction.
    pub fn from_address(&self) -> Result<Address> {
        let payload = bincode::serialize(&self.tx)?;
        crypto::recover_address(&payload, &self.signature)
    }

    pub fn fee(&self) -> u64 {
        self.tx.fee()
    }
}
