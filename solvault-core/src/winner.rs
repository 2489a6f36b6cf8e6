//! Payout recipient selection.

use solana_sdk::pubkey::Pubkey;

use crate::error::VaultRailError;
use crate::state::Contributor;

/// Picks the recipient of a payout from the vault's contributors.
pub trait WinnerSelector: Send + Sync {
    fn select(&self, contributors: &[Contributor]) -> Result<Pubkey, VaultRailError>;
}

/// Always pays the earliest contributor.
#[derive(Clone, Copy, Debug, Default)]
pub struct FirstContributor;

impl WinnerSelector for FirstContributor {
    fn select(&self, contributors: &[Contributor]) -> Result<Pubkey, VaultRailError> {
        contributors
            .first()
            .map(Contributor::address)
            .ok_or(VaultRailError::EmptyVault)
    }
}
