//! Unsigned transaction construction for each execution branch.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use solana_sdk::{
    instruction::Instruction, message::Message, pubkey::Pubkey, transaction::Transaction,
};
use tracing::{debug, info};

use crate::error::VaultRailError;
use crate::instruction::{vault_address, InstructionFactory};
use crate::rpc::LedgerClient;
use crate::sequencer::Branch;
use crate::state::VaultStateReader;
use crate::types::{ClusterConfig, Lamports};
use crate::winner::WinnerSelector;

/// Validated parameters of one execution request.
#[derive(Clone, Debug)]
pub struct TransferParams {
    /// Fee payer and depositing user.
    pub payer: Pubkey,
    /// Recipient named in the request; only used in messages.
    pub recipient: Pubkey,
    pub amount: Lamports,
}

/// A built, unsigned transaction and what went into it.
#[derive(Clone, Debug)]
pub struct BuiltTransaction {
    pub branch: Branch,
    pub transaction: Transaction,
    /// Payout recipient, for payout branches.
    pub winner: Option<Pubkey>,
    /// Whether an `initialize` instruction was prepended.
    pub initializes_vault: bool,
}

impl BuiltTransaction {
    /// Wire bytes with zeroed signature slots.
    pub fn serialize(&self) -> Result<Vec<u8>, VaultRailError> {
        bincode::serialize(&self.transaction)
            .map_err(|e| VaultRailError::Decode(format!("failed to serialize transaction: {}", e)))
    }

    /// Base64 of [`serialize`](Self::serialize), as returned to wallets.
    pub fn to_base64(&self) -> Result<String, VaultRailError> {
        Ok(BASE64_STANDARD.encode(self.serialize()?))
    }

    pub fn instructions(&self) -> usize {
        self.transaction.message.instructions.len()
    }
}

/// Assembles vault transactions against one cluster and program.
pub struct TransactionBuilder {
    factory: InstructionFactory,
    vault: Pubkey,
    ledger: Arc<dyn LedgerClient>,
    selector: Arc<dyn WinnerSelector>,
}

impl TransactionBuilder {
    pub fn new(
        config: &ClusterConfig,
        ledger: Arc<dyn LedgerClient>,
        selector: Arc<dyn WinnerSelector>,
    ) -> Self {
        let (vault, _bump) = vault_address(&config.program_id);
        Self {
            factory: InstructionFactory::new(config.program_id, config.encoding),
            vault,
            ledger,
            selector,
        }
    }

    /// The derived vault address.
    pub fn vault_address(&self) -> Pubkey {
        self.vault
    }

    /// Build the unsigned transaction for `branch`.
    pub async fn build(
        &self,
        branch: Branch,
        params: &TransferParams,
    ) -> Result<BuiltTransaction, VaultRailError> {
        let blockhash = self.ledger.get_latest_blockhash().await?;
        let reader = VaultStateReader::new(self.ledger.as_ref());
        let vault_record = reader.fetch(&self.vault).await?;

        let mut instructions: Vec<Instruction> = Vec::with_capacity(2);
        let mut winner = None;
        let mut initializes_vault = false;

        match branch {
            Branch::Deposit => {
                if vault_record.is_none() {
                    info!(vault = %self.vault, "vault missing, prepending initialize");
                    instructions.push(self.factory.initialize(self.vault, params.payer));
                    initializes_vault = true;
                }
                instructions.push(self.factory.deposit_sol(
                    self.vault,
                    params.payer,
                    params.amount.get(),
                ));
            }
            Branch::PartialPayout | Branch::FullPayout => {
                let record = vault_record.ok_or(VaultRailError::VaultUninitialized)?;
                if record.contributors.is_empty() {
                    return Err(VaultRailError::EmptyVault);
                }
                let selected = self.selector.select(&record.contributors)?;
                info!(winner = %selected, total = record.total_amount, ?branch, "selected payout winner");
                let ix = if branch == Branch::PartialPayout {
                    self.factory.distribute_50(self.vault, selected)
                } else {
                    self.factory.distribute_100(self.vault, selected)
                };
                instructions.push(ix);
                winner = Some(selected);
            }
            Branch::Reset => {
                return Err(VaultRailError::Config(
                    "reset does not produce a transaction".into(),
                ));
            }
        }

        let message = Message::new_with_blockhash(&instructions, Some(&params.payer), &blockhash);
        let transaction = Transaction::new_unsigned(message);
        debug!(
            ?branch,
            instructions = instructions.len(),
            payer = %params.payer,
            "built unsigned transaction"
        );

        Ok(BuiltTransaction {
            branch,
            transaction,
            winner,
            initializes_vault,
        })
    }
}
