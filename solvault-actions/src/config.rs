//! Service configuration read from the environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use solana_sdk::pubkey::Pubkey;
use tracing::warn;

use solvault_core::{Cluster, ClusterConfig, InstructionEncoding, VaultRailError};

// ═══════════════════════════════════════════════════════════════════════════════
// ENVIRONMENT VARIABLES
// ═══════════════════════════════════════════════════════════════════════════════

const CLUSTER_ENV: &str = "SOLVAULT_CLUSTER";
const RPC_URL_ENV: &str = "SOLVAULT_RPC_URL";
const PROGRAM_ID_ENV: &str = "SOLVAULT_PROGRAM_ID";
const ENCODING_ENV: &str = "SOLVAULT_INSTRUCTION_ENCODING";
const BASE_URL_ENV: &str = "SOLVAULT_BASE_URL";
const STATIC_DIR_ENV: &str = "SOLVAULT_STATIC_DIR";
const PORT_ENV: &str = "PORT";

pub const DEFAULT_PORT: u16 = 8080;
const DEFAULT_STATIC_DIR: &str = "public";

/// Everything the HTTP service needs to know at startup.
#[derive(Clone, Debug)]
pub struct ActionConfig {
    /// Cluster, RPC endpoint, program id and instruction encoding.
    pub cluster: ClusterConfig,
    /// Public origin used in action hrefs and icon URLs.
    pub base_url: String,
    /// Directory served at `/static`.
    pub static_dir: PathBuf,
    pub port: u16,
}

impl ActionConfig {
    /// Configuration for a cluster with local defaults for everything else.
    pub fn new(cluster: ClusterConfig) -> Self {
        Self {
            cluster,
            base_url: format!("http://localhost:{}", DEFAULT_PORT),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            port: DEFAULT_PORT,
        }
    }

    /// Read the configuration from `SOLVAULT_*` variables and `PORT`.
    ///
    /// Unknown cluster or encoding names fall back to the defaults; a
    /// malformed program id is fatal.
    pub fn from_env() -> Result<Self, VaultRailError> {
        let cluster = match env::var(CLUSTER_ENV) {
            Ok(name) => Cluster::from_str(&name).unwrap_or_else(|e| {
                warn!("{}; falling back to localnet", e);
                Cluster::Localnet
            }),
            Err(_) => Cluster::Localnet,
        };

        let mut cluster_config = ClusterConfig::for_cluster(cluster);

        if let Ok(rpc_url) = env::var(RPC_URL_ENV) {
            cluster_config = cluster_config.with_rpc_url(rpc_url);
        }

        if let Ok(program_id) = env::var(PROGRAM_ID_ENV) {
            let program_id = Pubkey::from_str(program_id.trim()).map_err(|e| {
                VaultRailError::Config(format!("{} is not a valid pubkey: {}", PROGRAM_ID_ENV, e))
            })?;
            cluster_config = cluster_config.with_program_id(program_id);
        }

        if let Ok(encoding) = env::var(ENCODING_ENV) {
            match InstructionEncoding::from_str(&encoding) {
                Ok(encoding) => cluster_config = cluster_config.with_encoding(encoding),
                Err(e) => warn!("{}; using anchor encoding", e),
            }
        }

        let port = env::var(PORT_ENV)
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let base_url = env::var(BASE_URL_ENV)
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| format!("http://localhost:{}", port));

        let static_dir = env::var(STATIC_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_STATIC_DIR));

        Ok(Self {
            cluster: cluster_config,
            base_url,
            static_dir,
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_defaults() {
        let config = ActionConfig::new(ClusterConfig::localnet());
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.cluster.rpc_url, "http://127.0.0.1:8899");
        assert_eq!(config.static_dir, PathBuf::from("public"));
    }
}
