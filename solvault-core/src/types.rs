//! Type definitions shared by the vault reader, builder and HTTP layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::error::VaultRailError;

/// Lamports per whole SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Number of decimal places in a SOL amount.
pub const SOL_DECIMALS: usize = 9;

/// Seed of the vault's program-derived address.
pub const VAULT_SEED: &str = "vault";

/// Program id of the deployed vault program.
pub const DEFAULT_PROGRAM_ID: &str = "AH4vTxcx557pVqWXsdXp9mqxb73SayXrb1gf9ugbWp9W";

/// Solana cluster the service talks to.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Cluster {
    /// Local test validator.
    Localnet,
    /// Public devnet.
    Devnet,
    /// Mainnet beta.
    MainnetBeta,
}

impl Cluster {
    /// Default JSON-RPC endpoint for the cluster.
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Cluster::Localnet => "http://127.0.0.1:8899",
            Cluster::Devnet => "https://api.devnet.solana.com",
            Cluster::MainnetBeta => "https://api.mainnet-beta.solana.com",
        }
    }

    /// Chain identifier advertised in the `X-Blockchain-Ids` header.
    pub fn blockchain_id(&self) -> &'static str {
        match self {
            Cluster::Localnet => "solana:localnet",
            Cluster::Devnet => "solana:EtWTRABZaYq6iMfeYKouRu166VU2xqa1",
            Cluster::MainnetBeta => "solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp",
        }
    }

    /// Cluster name as used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Cluster::Localnet => "localnet",
            Cluster::Devnet => "devnet",
            Cluster::MainnetBeta => "mainnet-beta",
        }
    }
}

impl FromStr for Cluster {
    type Err = VaultRailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "localnet" | "local" => Ok(Cluster::Localnet),
            "devnet" => Ok(Cluster::Devnet),
            "mainnet" | "mainnet-beta" => Ok(Cluster::MainnetBeta),
            other => Err(VaultRailError::Config(format!("unknown cluster: {}", other))),
        }
    }
}

/// How vault instructions are encoded on the wire.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstructionEncoding {
    /// 8-byte Anchor discriminator (`sha256("global:<name>")`) followed by borsh args.
    Anchor,
    /// One-byte opcode followed by little-endian args.
    Raw,
}

impl FromStr for InstructionEncoding {
    type Err = VaultRailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anchor" => Ok(InstructionEncoding::Anchor),
            "raw" => Ok(InstructionEncoding::Raw),
            other => Err(VaultRailError::Config(format!(
                "unknown instruction encoding: {}",
                other
            ))),
        }
    }
}

/// Cluster configuration: which node, which program, which encoding.
#[derive(Clone, Debug)]
pub struct ClusterConfig {
    pub cluster: Cluster,
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,
    /// Vault program id.
    pub program_id: Pubkey,
    pub encoding: InstructionEncoding,
}

impl ClusterConfig {
    /// Local validator configuration.
    pub fn localnet() -> Self {
        Self::for_cluster(Cluster::Localnet)
    }

    /// Configuration for a cluster with its default endpoint and the deployed program.
    pub fn for_cluster(cluster: Cluster) -> Self {
        Self {
            cluster,
            rpc_url: cluster.default_rpc_url().to_string(),
            program_id: default_program_id(),
            encoding: InstructionEncoding::Anchor,
        }
    }

    /// Override the RPC endpoint.
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }

    /// Override the program id.
    pub fn with_program_id(mut self, program_id: Pubkey) -> Self {
        self.program_id = program_id;
        self
    }

    /// Override the instruction encoding.
    pub fn with_encoding(mut self, encoding: InstructionEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self::localnet()
    }
}

fn default_program_id() -> Pubkey {
    Pubkey::from_str(DEFAULT_PROGRAM_ID).unwrap_or_default()
}

/// An amount in lamports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Lamports(u64);

impl Lamports {
    pub const fn new(lamports: u64) -> Self {
        Self(lamports)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Parse a decimal SOL amount (e.g. `"0.05"`) into lamports.
    ///
    /// Digits past the ninth decimal place are truncated, never rounded.
    pub fn from_sol_str(s: &str) -> Result<Self, String> {
        let s = s.trim();
        let s = s.strip_prefix('+').unwrap_or(s);
        if s.starts_with('-') {
            return Err("amount must be positive".into());
        }
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err("amount is empty".into());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err("amount is not a decimal number".into());
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| "amount is too large".to_string())?
        };

        let mut frac_digits: String = frac.chars().take(SOL_DECIMALS).collect();
        while frac_digits.len() < SOL_DECIMALS {
            frac_digits.push('0');
        }
        let frac: u64 = frac_digits
            .parse()
            .map_err(|_| "amount is not a decimal number".to_string())?;

        whole
            .checked_mul(LAMPORTS_PER_SOL)
            .and_then(|l| l.checked_add(frac))
            .map(Lamports)
            .ok_or_else(|| "amount is too large".to_string())
    }
}

impl fmt::Display for Lamports {
    /// Render as a SOL amount without trailing zeros.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / LAMPORTS_PER_SOL;
        let frac = self.0 % LAMPORTS_PER_SOL;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let frac = format!("{:09}", frac);
        write!(f, "{}.{}", whole, frac.trim_end_matches('0'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sol_to_lamports_truncates() {
        assert_eq!(Lamports::from_sol_str("0.05").unwrap().get(), 50_000_000);
        assert_eq!(Lamports::from_sol_str("1").unwrap().get(), LAMPORTS_PER_SOL);
        assert_eq!(Lamports::from_sol_str("0.1").unwrap().get(), 100_000_000);
        assert_eq!(Lamports::from_sol_str(".5").unwrap().get(), 500_000_000);
        assert_eq!(Lamports::from_sol_str("0.0000000019").unwrap().get(), 1);
        assert_eq!(Lamports::from_sol_str("0.0000000009").unwrap().get(), 0);
    }

    #[test]
    fn test_sol_parse_rejects_garbage() {
        assert!(Lamports::from_sol_str("").is_err());
        assert!(Lamports::from_sol_str(".").is_err());
        assert!(Lamports::from_sol_str("1e3").is_err());
        assert!(Lamports::from_sol_str("-0.5").is_err());
        assert!(Lamports::from_sol_str("99999999999999999999").is_err());
    }

    #[test]
    fn test_lamports_display() {
        assert_eq!(Lamports::new(1_500_000_000).to_string(), "1.5");
        assert_eq!(Lamports::new(10_000_000).to_string(), "0.01");
        assert_eq!(Lamports::new(2 * LAMPORTS_PER_SOL).to_string(), "2");
    }

    #[test]
    fn test_cluster_parse() {
        assert_eq!("devnet".parse::<Cluster>().unwrap(), Cluster::Devnet);
        assert_eq!("mainnet".parse::<Cluster>().unwrap(), Cluster::MainnetBeta);
        assert!("moon".parse::<Cluster>().is_err());
        assert_eq!(Cluster::Localnet.default_rpc_url(), "http://127.0.0.1:8899");
    }

    #[test]
    fn test_default_program_id() {
        let config = ClusterConfig::default();
        assert_eq!(config.program_id.to_string(), DEFAULT_PROGRAM_ID);
        assert_eq!(config.encoding, InstructionEncoding::Anchor);
    }
}
