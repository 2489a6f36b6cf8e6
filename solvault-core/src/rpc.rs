//! Solana JSON-RPC client for reading ledger state.
//!
//! The service only ever reads: account data, a recent blockhash, the
//! rent-exempt minimum and the current slot. Nothing here retries or wraps
//! calls in extra timeouts; a failed call fails the enclosing request.

use std::str::FromStr;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use serde::Deserialize;
use solana_sdk::{hash::Hash, pubkey::Pubkey};

use crate::error::VaultRailError;

/// Read-only view of the ledger used by the reader and the builder.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Raw data of an account, `None` if the account does not exist.
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, VaultRailError>;

    /// Most recent blockhash at `confirmed` commitment.
    async fn get_latest_blockhash(&self) -> Result<Hash, VaultRailError>;

    /// Minimum lamports an account with `data_len` bytes needs to be rent exempt.
    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, VaultRailError>;

    /// Current slot, used as a connectivity probe.
    async fn get_slot(&self) -> Result<u64, VaultRailError>;
}

/// HTTP JSON-RPC implementation of [`LedgerClient`].
pub struct SolanaRpcClient {
    rpc_url: String,
    client: reqwest::Client,
}

impl SolanaRpcClient {
    /// Create a new RPC client.
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn rpc_call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, VaultRailError> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| VaultRailError::Rpc(format!("{} failed: {}", method, e)))?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| VaultRailError::Rpc(format!("{} returned invalid json: {}", method, e)))?;

        if let Some(error) = json.get("error") {
            return Err(VaultRailError::Rpc(format!("{}: {}", method, error)));
        }

        let result = json
            .get("result")
            .cloned()
            .ok_or_else(|| VaultRailError::Rpc(format!("{}: missing result in response", method)))?;

        serde_json::from_value(result)
            .map_err(|e| VaultRailError::Rpc(format!("{}: unexpected result shape: {}", method, e)))
    }
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    value: T,
}

#[derive(Deserialize)]
struct RpcAccount {
    /// `[payload, encoding]`
    data: (String, String),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcBlockhash {
    blockhash: String,
}

#[async_trait]
impl LedgerClient for SolanaRpcClient {
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, VaultRailError> {
        let response: RpcResponse<Option<RpcAccount>> = self
            .rpc_call(
                "getAccountInfo",
                serde_json::json!([
                    address.to_string(),
                    { "encoding": "base64", "commitment": "confirmed" }
                ]),
            )
            .await?;

        match response.value {
            Some(account) => {
                let (payload, encoding) = account.data;
                if encoding != "base64" {
                    return Err(VaultRailError::Rpc(format!(
                        "getAccountInfo: unexpected encoding {}",
                        encoding
                    )));
                }
                let data = BASE64_STANDARD
                    .decode(payload)
                    .map_err(|e| VaultRailError::Decode(format!("account data is not base64: {}", e)))?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, VaultRailError> {
        let response: RpcResponse<RpcBlockhash> = self
            .rpc_call(
                "getLatestBlockhash",
                serde_json::json!([{ "commitment": "confirmed" }]),
            )
            .await?;
        Hash::from_str(&response.value.blockhash)
            .map_err(|e| VaultRailError::Rpc(format!("getLatestBlockhash: invalid hash: {}", e)))
    }

    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, VaultRailError> {
        self.rpc_call(
            "getMinimumBalanceForRentExemption",
            serde_json::json!([data_len]),
        )
        .await
    }

    async fn get_slot(&self) -> Result<u64, VaultRailError> {
        self.rpc_call("getSlot", serde_json::json!([])).await
    }
}

/// In-memory ledger for tests and offline runs.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use tokio::sync::Notify;

    use super::*;
    use crate::state::VaultRecord;

    /// Rent-exempt minimum of a zero-data account on mainnet.
    pub const ZERO_DATA_RENT_EXEMPT_MINIMUM: u64 = 890_880;

    /// Holds rent-minimum calls until released, to simulate a slow node.
    #[derive(Default)]
    pub struct RentGate {
        entered: Notify,
        release: Notify,
    }

    impl RentGate {
        /// Wait until a rent-minimum call is parked on the gate.
        pub async fn entered(&self) {
            self.entered.notified().await;
        }

        /// Let the parked call return.
        pub fn release(&self) {
            self.release.notify_one();
        }
    }

    /// A [`LedgerClient`] backed by a hash map.
    pub struct MockLedger {
        accounts: Mutex<HashMap<Pubkey, Vec<u8>>>,
        blockhash: Hash,
        failure: Mutex<Option<String>>,
        rent_gate: Mutex<Option<Arc<RentGate>>>,
    }

    impl MockLedger {
        pub fn new() -> Self {
            Self {
                accounts: Mutex::new(HashMap::new()),
                blockhash: Hash::new_unique(),
                failure: Mutex::new(None),
                rent_gate: Mutex::new(None),
            }
        }

        /// Blockhash every call to `get_latest_blockhash` returns.
        pub fn blockhash(&self) -> Hash {
            self.blockhash
        }

        /// Store an encoded vault record at `address`.
        pub fn set_vault(&self, address: Pubkey, vault: &VaultRecord) {
            let data = vault.to_account_data().expect("vault encodes");
            self.accounts.lock().unwrap().insert(address, data);
        }

        /// Make every subsequent call fail with a transport error.
        pub fn fail_with(&self, message: &str) {
            *self.failure.lock().unwrap() = Some(message.to_string());
        }

        /// Park every subsequent rent-minimum call on the returned gate.
        pub fn hold_rent_calls(&self) -> Arc<RentGate> {
            let gate = Arc::new(RentGate::default());
            *self.rent_gate.lock().unwrap() = Some(gate.clone());
            gate
        }

        fn check(&self) -> Result<(), VaultRailError> {
            match self.failure.lock().unwrap().as_ref() {
                Some(msg) => Err(VaultRailError::Rpc(msg.clone())),
                None => Ok(()),
            }
        }
    }

    impl Default for MockLedger {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl LedgerClient for MockLedger {
        async fn get_account_data(
            &self,
            address: &Pubkey,
        ) -> Result<Option<Vec<u8>>, VaultRailError> {
            self.check()?;
            Ok(self.accounts.lock().unwrap().get(address).cloned())
        }

        async fn get_latest_blockhash(&self) -> Result<Hash, VaultRailError> {
            self.check()?;
            Ok(self.blockhash)
        }

        async fn get_minimum_balance_for_rent_exemption(
            &self,
            data_len: usize,
        ) -> Result<u64, VaultRailError> {
            let gate = self.rent_gate.lock().unwrap().clone();
            if let Some(gate) = gate {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
            self.check()?;
            Ok(ZERO_DATA_RENT_EXEMPT_MINIMUM + 6_960 * data_len as u64)
        }

        async fn get_slot(&self) -> Result<u64, VaultRailError> {
            self.check()?;
            Ok(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests require a running validator
    // Run with: cargo test -- --ignored

    #[tokio::test]
    #[ignore]
    async fn test_get_latest_blockhash() {
        let client = SolanaRpcClient::new("http://127.0.0.1:8899");
        let hash = client.get_latest_blockhash().await.expect("should get blockhash");
        assert_ne!(hash, Hash::default());
    }

    #[tokio::test]
    #[ignore]
    async fn test_rent_exempt_minimum() {
        let client = SolanaRpcClient::new("http://127.0.0.1:8899");
        let min = client
            .get_minimum_balance_for_rent_exemption(0)
            .await
            .expect("should get minimum balance");
        assert_eq!(min, 890_880);
    }

    #[tokio::test]
    async fn test_unreachable_node_is_rpc_error() {
        let client = SolanaRpcClient::new("http://127.0.0.1:1");
        let err = client.get_slot().await.unwrap_err();
        assert_eq!(err.error_code(), "RPC_ERROR");
    }
}
