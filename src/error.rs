//! Error types for Emberchain

use std::fmt;

#[derive(Debug, Clone)]
pub enum ChainError {
    InvalidSignature(String),
    InvalidTransaction(String),
    InsufficientBalance(String),
    NotEnoughTransactions,
    MiningCancelled,
    PeerQuery(String),
    PeerRegistration(String),
    BlockApplication(String),
    RemoteStatus(String),
    NetworkError(String),
    CryptoError(String),
    IoError(String),
    ConfigError(String),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChainError::InvalidSignature(msg) => write!(f, "invalid signature: {}", msg),
            ChainError::InvalidTransaction(msg) => write!(f, "invalid transaction: {}", msg),
            ChainError::InsufficientBalance(msg) => write!(f, "insufficient balance: {}", msg),
            ChainError::NotEnoughTransactions => write!(f, "not enough transactions to mine"),
            ChainError::MiningCancelled => write!(f, "mining cancelled"),
            ChainError::PeerQuery(msg) => write!(f, "peer query failed: {}", msg),
            ChainError::PeerRegistration(msg) => write!(f, "peer registration failed: {}", msg),
            ChainError::BlockApplication(msg) => write!(f, "block application failed: {}", msg),
            ChainError::RemoteStatus(msg) => write!(f, "{}", msg),
            ChainError::NetworkError(msg) => write!(f, "network error: {}", msg),
            ChainError::CryptoError(msg) => write!(f, "cryptographic error: {}", msg),
            ChainError::IoError(msg) => write!(f, "IO error: {}", msg),
            ChainError::ConfigError(msg) => write!(f, "config error: {}", msg),
        }
    }
}

impl std::error::Error for ChainError {}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<reqwest::Error> for ChainError {
    fn from(err: reqwest::Error) -> Self {
        ChainError::NetworkError(err.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for ChainError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        ChainError::CryptoError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
