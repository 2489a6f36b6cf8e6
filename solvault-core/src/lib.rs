//! solvault-core
//!
//! Everything the solvault Action service needs below the HTTP layer:
//!
//! - reading and decoding the on-chain vault record
//! - the round sequencer deciding which operation is legal
//! - payout winner selection
//! - building unsigned transactions for the vault program
//!
//! Nothing in this crate signs or submits transactions.

pub mod builder;
pub mod error;
pub mod instruction;
pub mod rpc;
pub mod sequencer;
pub mod state;
pub mod types;
pub mod winner;

pub use builder::{BuiltTransaction, TransactionBuilder, TransferParams};
pub use error::{validation, VaultRailError};
pub use instruction::{vault_address, InstructionFactory, VaultInstruction};
pub use rpc::{LedgerClient, SolanaRpcClient};
pub use sequencer::{
    icon_number, offers_distribute, offers_reset, select_branch, Branch, RoundGuard,
    RoundSequencer,
};
pub use state::{Contributor, VaultRecord, VaultStateReader, VaultSummary};
pub use types::{
    Cluster, ClusterConfig, InstructionEncoding, Lamports, DEFAULT_PROGRAM_ID, LAMPORTS_PER_SOL,
    VAULT_SEED,
};
pub use winner::{FirstContributor, WinnerSelector};

/// Identifier reported by the service's health and status endpoints.
pub const SERVICE_ID: &str = "solvault";
