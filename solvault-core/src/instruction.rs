//! Vault program instructions and their wire encodings.

use sha2::{Digest, Sha256};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};

use crate::types::{InstructionEncoding, VAULT_SEED};

/// Derive the vault's program address and bump.
pub fn vault_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_SEED.as_bytes()], program_id)
}

/// Anchor instruction discriminator: first 8 bytes of `sha256("global:<name>")`.
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("global:{}", name).as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// Instructions exposed by the vault program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VaultInstruction {
    /// Create the vault account.
    ///
    /// Accounts: `[writable] vault`, `[signer, writable] user`, `[] system_program`.
    Initialize,
    /// Move `amount` lamports from the user into the vault.
    ///
    /// Accounts: same as `Initialize`.
    DepositSol { amount: u64 },
    /// Pay half of the vault to `winner`.
    ///
    /// Accounts: `[writable] vault`, `[writable] winner`.
    Distribute50,
    /// Pay the whole vault to `winner`.
    ///
    /// Accounts: `[writable] vault`, `[writable] winner`.
    Distribute100,
}

impl VaultInstruction {
    /// Program-side name, as hashed into the Anchor discriminator.
    pub fn name(&self) -> &'static str {
        match self {
            VaultInstruction::Initialize => "initialize",
            VaultInstruction::DepositSol { .. } => "deposit_sol",
            VaultInstruction::Distribute50 => "distribute_50",
            VaultInstruction::Distribute100 => "distribute_100",
        }
    }

    /// One-byte tag for the raw encoding.
    pub fn opcode(&self) -> u8 {
        match self {
            VaultInstruction::Initialize => 0,
            VaultInstruction::DepositSol { .. } => 1,
            VaultInstruction::Distribute50 => 2,
            VaultInstruction::Distribute100 => 3,
        }
    }

    /// Instruction data under `encoding`.
    pub fn data(&self, encoding: InstructionEncoding) -> Vec<u8> {
        let mut data = match encoding {
            InstructionEncoding::Anchor => instruction_discriminator(self.name()).to_vec(),
            InstructionEncoding::Raw => vec![self.opcode()],
        };
        if let VaultInstruction::DepositSol { amount } = self {
            data.extend_from_slice(&amount.to_le_bytes());
        }
        data
    }
}

/// Builds [`Instruction`]s for one program id and encoding.
#[derive(Clone, Copy, Debug)]
pub struct InstructionFactory {
    program_id: Pubkey,
    encoding: InstructionEncoding,
}

impl InstructionFactory {
    pub fn new(program_id: Pubkey, encoding: InstructionEncoding) -> Self {
        Self {
            program_id,
            encoding,
        }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn initialize(&self, vault: Pubkey, user: Pubkey) -> Instruction {
        self.with_user_accounts(&VaultInstruction::Initialize, vault, user)
    }

    pub fn deposit_sol(&self, vault: Pubkey, user: Pubkey, amount: u64) -> Instruction {
        self.with_user_accounts(&VaultInstruction::DepositSol { amount }, vault, user)
    }

    pub fn distribute_50(&self, vault: Pubkey, winner: Pubkey) -> Instruction {
        self.with_winner_accounts(&VaultInstruction::Distribute50, vault, winner)
    }

    pub fn distribute_100(&self, vault: Pubkey, winner: Pubkey) -> Instruction {
        self.with_winner_accounts(&VaultInstruction::Distribute100, vault, winner)
    }

    fn with_user_accounts(&self, ix: &VaultInstruction, vault: Pubkey, user: Pubkey) -> Instruction {
        Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(vault, false),
                AccountMeta::new(user, true),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
            data: ix.data(self.encoding),
        }
    }

    fn with_winner_accounts(&self, ix: &VaultInstruction, vault: Pubkey, winner: Pubkey) -> Instruction {
        Instruction {
            program_id: self.program_id,
            accounts: vec![AccountMeta::new(vault, false), AccountMeta::new(winner, false)],
            data: ix.data(self.encoding),
        }
    }
}
