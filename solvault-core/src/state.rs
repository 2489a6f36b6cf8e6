//! Vault account state and the reader that fetches it from the ledger.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::Serialize;
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use crate::error::VaultRailError;
use crate::rpc::LedgerClient;
use crate::types::Lamports;

/// Name of the vault account type in the program.
const VAULT_ACCOUNT_NAME: &str = "Vault";

/// Anchor account discriminator: first 8 bytes of `sha256("account:<Name>")`.
pub fn account_discriminator(name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("account:{}", name).as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// A single contribution entry.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Contributor {
    address: [u8; 32],
    pub amount: u64,
}

impl Contributor {
    pub fn new(address: Pubkey, amount: u64) -> Self {
        Self {
            address: address.to_bytes(),
            amount,
        }
    }

    pub fn address(&self) -> Pubkey {
        Pubkey::new_from_array(self.address)
    }
}

/// On-chain vault record.
///
/// Layout after the 8-byte discriminator: `bump: u8`, `total_sol: u64`,
/// `contributors: Vec<Contributor>` (borsh).
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct VaultRecord {
    pub bump: u8,
    pub total_amount: u64,
    pub contributors: Vec<Contributor>,
}

impl VaultRecord {
    /// Decode raw account data, checking the discriminator.
    ///
    /// Trailing bytes (unused allocated space) are ignored.
    pub fn from_account_data(data: &[u8]) -> Result<Self, VaultRailError> {
        if data.len() < 8 {
            return Err(VaultRailError::Decode(format!(
                "vault account too short: {} bytes",
                data.len()
            )));
        }
        let (disc, mut body) = data.split_at(8);
        if disc != account_discriminator(VAULT_ACCOUNT_NAME) {
            return Err(VaultRailError::Decode("vault discriminator mismatch".into()));
        }
        VaultRecord::deserialize(&mut body)
            .map_err(|e| VaultRailError::Decode(format!("invalid vault layout: {}", e)))
    }

    /// Encode as account data, discriminator included.
    pub fn to_account_data(&self) -> Result<Vec<u8>, VaultRailError> {
        let mut data = account_discriminator(VAULT_ACCOUNT_NAME).to_vec();
        borsh::to_writer(&mut data, self)
            .map_err(|e| VaultRailError::Decode(format!("failed to encode vault: {}", e)))?;
        Ok(data)
    }

    pub fn total(&self) -> Lamports {
        Lamports::new(self.total_amount)
    }

    pub fn summary(&self) -> VaultSummary {
        VaultSummary {
            total_lamports: self.total_amount,
            total_sol: self.total().to_string(),
            contributors: self.contributors.len(),
        }
    }
}

/// Serializable view of a vault for status responses.
#[derive(Clone, Debug, Serialize)]
pub struct VaultSummary {
    pub total_lamports: u64,
    pub total_sol: String,
    pub contributors: usize,
}

/// Reads the vault record from the ledger.
///
/// Nothing is cached: every call goes to the node, so each request decides
/// on fresh contributor data.
pub struct VaultStateReader<'a> {
    ledger: &'a dyn LedgerClient,
}

impl<'a> VaultStateReader<'a> {
    pub fn new(ledger: &'a dyn LedgerClient) -> Self {
        Self { ledger }
    }

    /// Fetch the vault at `vault`; `Ok(None)` when the account does not exist.
    pub async fn fetch(&self, vault: &Pubkey) -> Result<Option<VaultRecord>, VaultRailError> {
        match self.ledger.get_account_data(vault).await? {
            Some(data) => {
                let record = VaultRecord::from_account_data(&data)?;
                debug!(
                    vault = %vault,
                    total = record.total_amount,
                    contributors = record.contributors.len(),
                    "fetched vault"
                );
                Ok(Some(record))
            }
            None => {
                debug!(vault = %vault, "vault account not found");
                Ok(None)
            }
        }
    }
}
