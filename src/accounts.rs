//! Account name lookup
//!
//! Scans a directory of hex-encoded secret key files (`*.key`) and maps each
//! derived address to the file stem, so traces can show `miner1` instead of
//! a 64-character hex address. Unknown addresses fall back to the address
//! itself.

use crate::crypto::{address_to_hex, KeyPair};
use crate::error::{ChainError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub struct NameService {
    accounts: HashMap<String, String>,
}

impl NameService {
    /// Builds the lookup table from every `*.key` file under `root`.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let mut accounts = HashMap::new();
        scan_dir(root.as_ref(), &mut accounts)?;
        Ok(NameService { accounts })
    }

    /// Returns the name for the address, or the address itself if unknown.
    pub fn lookup(&self, address: &str) -> String {
        self.accounts
            .get(address)
            .cloned()
            .unwrap_or_else(|| address.to_string())
    }

    /// Returns a copy of the address-to-name map.
    pub fn copy(&self) -> HashMap<String, String> {
        self.accounts.clone()
    }
}

fn scan_dir(dir: &Path, accounts: &mut HashMap<String, String>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            scan_dir(&path, accounts)?;
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("key") {
            continue;
        }

        let hex_key = fs::read_to_string(&path)?;
        let secret = hex::decode(hex_key.trim())
            .map_err(|e| ChainError::CryptoError(format!("{}: {}", path.display(), e)))?;
        let key_pair = KeyPair::from_secret_bytes(&secret)?;

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        accounts.insert(address_to_hex(&key_pair.address()), name);
    }
    Ok(())
}
