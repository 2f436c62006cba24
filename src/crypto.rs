//! Cryptographic primitives for Emberchain
//!
//! Addresses are the SHA-256 hash of a compressed secp256k1 public key.
//! Transactions carry recoverable signatures so the sender address can be
//! derived from the signature alone.

use crate::error::ChainError;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE, SECRET_KEY_SIZE},
    ecdsa::{RecoverableSignature, RecoveryId},
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};

/// A thread-safe, lazily initialized secp256k1 context shared by the crate.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Recoverable signature bytes: 64 compact bytes plus one recovery id byte.
pub const RECOVERABLE_SIGNATURE_SIZE: usize = COMPACT_SIGNATURE_SIZE + 1;

/// Derived account address: a 32-byte hash.
pub type Address = [u8; 32];

/// Convert an address to a hex string for display.
pub fn address_to_hex(addr: &Address) -> String {
    hex::encode(addr)
}

/// Convert a hex string to an address.
pub fn address_from_hex(hex_str: &str) -> Result<Address, ChainError> {
    let bytes = hex::decode(hex_str)
        .map_err(|e| ChainError::CryptoError(format!("Invalid hex address: {}", e)))?;
    bytes
        .try_into()
        .map_err(|_| ChainError::CryptoError("Address must be 32 bytes".to_string()))
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// Creates a KeyPair from raw secret key bytes.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, ChainError> {
        let secret_key = SecretKey::from_slice(bytes).map_err(|e| {
            if bytes.len() != SECRET_KEY_SIZE {
                ChainError::CryptoError(format!(
                    "Secret key must be {} bytes, got {}",
                    SECRET_KEY_SIZE,
                    bytes.len()
                ))
            } else {
                ChainError::CryptoError(format!("Invalid secret key bytes: {}", e))
            }
        })?;
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        Ok(KeyPair {
            secret_key,
            public_key,
        })
    }

    /// Computes the account address (SHA-256 of the compressed public key).
    pub fn address(&self) -> Address {
        let pubkey_bytes: [u8; PUBLIC_KEY_SIZE] = self.public_key.serialize();
        Sha256::digest(pubkey_bytes).into()
    }

    /// Signs a message (hashed with SHA-256 first) with a recoverable
    /// signature: 64 compact bytes followed by the recovery id.
    pub fn sign_recoverable(
        &self,
        message: &[u8],
    ) -> Result<[u8; RECOVERABLE_SIGNATURE_SIZE], ChainError> {
        let digest = Sha256::digest(message);
        let message = Message::from_digest_slice(&digest)
            .map_err(|e| ChainError::CryptoError(format!("Failed to create message: {}", e)))?;

        let signature = SECP256K1_CONTEXT.sign_ecdsa_recoverable(&message, &self.secret_key);
        let (recovery_id, compact) = signature.serialize_compact();

        let mut bytes = [0u8; RECOVERABLE_SIGNATURE_SIZE];
        bytes[..COMPACT_SIGNATURE_SIZE].copy_from_slice(&compact);
        bytes[COMPACT_SIGNATURE_SIZE] = recovery_id.to_i32() as u8;
        Ok(bytes)
    }
}

/// Recovers the signing account's address from a recoverable signature over
/// the given message. Fails if the signature bytes are malformed or do not
/// resolve to a valid public key.
pub fn recover_address(message: &[u8], signature: &[u8]) -> Result<Address, ChainError> {
    if signature.len() != RECOVERABLE_SIGNATURE_SIZE {
        return Err(ChainError::InvalidSignature(format!(
            "signature must be {} bytes, got {}",
            RECOVERABLE_SIGNATURE_SIZE,
            signature.len()
        )));
    }

    let recovery_id = RecoveryId::from_i32(signature[COMPACT_SIGNATURE_SIZE] as i32)
        .map_err(|e| ChainError::InvalidSignature(format!("bad recovery id: {}", e)))?;
    let recoverable =
        RecoverableSignature::from_compact(&signature[..COMPACT_SIGNATURE_SIZE], recovery_id)
            .map_err(|e| ChainError::InvalidSignature(format!("malformed signature: {}", e)))?;

    let digest = Sha256::digest(message);
    let message = Message::from_digest_slice(&digest)
        .map_err(|e| ChainError::CryptoError(format!("Failed to create message: {}", e)))?;

    let public_key = SECP256K1_CONTEXT
        .recover_ecdsa(&message, &recoverable)
        .map_err(|e| ChainError::InvalidSignature(format!("recovery failed: {}", e)))?;

    let pubkey_bytes: [u8; PUBLIC_KEY_SIZE] = public_key.serialize();
    Ok(Sha256::digest(pubkey_bytes).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_recover_roundtrip() {
        let kp = KeyPair::generate();
        let sig = kp.sign_recoverable(b"hello world").unwrap();
        let recovered = recover_address(b"hello world", &sig).unwrap();
        assert_eq!(recovered, kp.address());
    }

    #[test]
    fn recover_rejects_wrong_length() {
        let err = recover_address(b"msg", &[0u8; 12]).unwrap_err();
        assert!(matches!(err, ChainError::InvalidSignature(_)));
    }

    #[test]
    fn recovered_address_changes_with_message() {
        let kp = KeyPair::generate();
        let sig = kp.sign_recoverable(b"original").unwrap();
        // Recovery over a different message yields some other address.
        let recovered = recover_address(b"tampered", &sig);
        if let Ok(addr) = recovered {
            assert_ne!(addr, kp.address());
        }
    }

    #[test]
    fn hex_roundtrip() {
        let kp = KeyPair::generate();
        let addr = kp.address();
        assert_eq!(address_from_hex(&address_to_hex(&addr)).unwrap(), addr);
        assert!(address_from_hex("zzzz").is_err());
    }
}
