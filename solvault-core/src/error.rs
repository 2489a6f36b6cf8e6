//! Error types for the solvault Action service.
//!
//! Every error raised while handling a request ends up as one of these
//! variants; the HTTP layer maps them to status codes via
//! [`VaultRailError::suggested_status_code`].

use thiserror::Error;

/// Aggregated error type for vault operations.
#[derive(Debug, Error)]
pub enum VaultRailError {
    /// A query or body address did not parse as a Solana public key.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Amount was non-positive, unparsable, or below the rent-exempt minimum.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The request body carried no payer account.
    #[error("Invalid \"account\" provided")]
    MissingPayer,

    /// A payout was requested but the vault account does not exist yet.
    #[error("Vault is not initialized.")]
    VaultUninitialized,

    /// A payout was requested but the vault has no contributors.
    #[error("No contributors found in the vault.")]
    EmptyVault,

    /// Transport or protocol failure while talking to the Solana RPC node.
    #[error("solana rpc error: {0}")]
    Rpc(String),

    /// Vault account data could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Invalid service configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl VaultRailError {
    /// Get a machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            VaultRailError::InvalidAddress(_) => "INVALID_ADDRESS",
            VaultRailError::InvalidAmount(_) => "INVALID_AMOUNT",
            VaultRailError::MissingPayer => "MISSING_PAYER",
            VaultRailError::VaultUninitialized => "VAULT_UNINITIALIZED",
            VaultRailError::EmptyVault => "EMPTY_VAULT",
            VaultRailError::Rpc(_) => "RPC_ERROR",
            VaultRailError::Decode(_) => "DECODE_ERROR",
            VaultRailError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Get HTTP status code suggestion.
    pub fn suggested_status_code(&self) -> u16 {
        match self {
            VaultRailError::InvalidAddress(_) => 400,
            VaultRailError::InvalidAmount(_) => 400,
            VaultRailError::MissingPayer => 400,
            VaultRailError::VaultUninitialized => 400,
            VaultRailError::EmptyVault => 400,
            VaultRailError::Rpc(_) => 502,
            VaultRailError::Decode(_) => 502,
            VaultRailError::Config(_) => 500,
        }
    }
}

/// Validation error builder for query and body parameters.
pub struct ValidationError {
    field: String,
    message: String,
    value: Option<String>,
}

impl ValidationError {
    /// Create a new validation error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }

    /// Add the invalid value to the error.
    pub fn with_value(mut self, value: impl std::fmt::Display) -> Self {
        self.value = Some(value.to_string());
        self
    }

    fn render(self) -> String {
        match self.value {
            Some(value) => format!("{}: {} (got: {})", self.field, self.message, value),
            None => format!("{}: {}", self.field, self.message),
        }
    }

    /// Convert to an address error.
    pub fn into_address_error(self) -> VaultRailError {
        VaultRailError::InvalidAddress(self.render())
    }

    /// Convert to an amount error.
    pub fn into_amount_error(self) -> VaultRailError {
        VaultRailError::InvalidAmount(self.render())
    }
}

/// Common validation functions.
pub mod validation {
    use std::str::FromStr;

    use solana_sdk::pubkey::Pubkey;

    use super::*;
    use crate::types::Lamports;

    /// Parse a base58 Solana address.
    pub fn require_valid_address(field: &str, address: &str) -> Result<Pubkey, VaultRailError> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::new(field, "address is empty").into_address_error());
        }
        Pubkey::from_str(trimmed).map_err(|e| {
            ValidationError::new(field, e.to_string())
                .with_value(trimmed)
                .into_address_error()
        })
    }

    /// Parse a strictly positive SOL amount into lamports.
    pub fn require_positive_amount(field: &str, amount: &str) -> Result<Lamports, VaultRailError> {
        let lamports = Lamports::from_sol_str(amount)
            .map_err(|msg| ValidationError::new(field, msg).with_value(amount).into_amount_error())?;
        if lamports.get() == 0 {
            return Err(ValidationError::new(field, "amount is too small")
                .with_value(amount)
                .into_amount_error());
        }
        Ok(lamports)
    }

    /// Require the amount to cover the rent-exempt minimum.
    pub fn require_rent_exempt(
        amount: Lamports,
        minimum_balance: u64,
        recipient: &Pubkey,
    ) -> Result<(), VaultRailError> {
        if amount.get() < minimum_balance {
            return Err(VaultRailError::InvalidAmount(format!(
                "Account may not be rent exempt: {}",
                recipient
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Lamports;
    use solana_sdk::pubkey::Pubkey;

    #[test]
    fn test_error_codes() {
        assert_eq!(VaultRailError::Rpc("test".into()).error_code(), "RPC_ERROR");
        assert_eq!(VaultRailError::EmptyVault.error_code(), "EMPTY_VAULT");
        assert_eq!(VaultRailError::MissingPayer.error_code(), "MISSING_PAYER");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(VaultRailError::InvalidAmount("x".into()).suggested_status_code(), 400);
        assert_eq!(VaultRailError::Rpc("down".into()).suggested_status_code(), 502);
    }

    #[test]
    fn test_validation_address() {
        let key = Pubkey::new_unique();
        let parsed = validation::require_valid_address("to", &key.to_string()).unwrap();
        assert_eq!(parsed, key);
        assert!(validation::require_valid_address("to", "").is_err());
        assert!(validation::require_valid_address("to", "not-a-key").is_err());
    }

    #[test]
    fn test_validation_amount() {
        assert_eq!(
            validation::require_positive_amount("amount", "0.05").unwrap().get(),
            50_000_000
        );
        assert!(validation::require_positive_amount("amount", "0").is_err());
        assert!(validation::require_positive_amount("amount", "-1").is_err());
        assert!(validation::require_positive_amount("amount", "abc").is_err());
    }

    #[test]
    fn test_rent_exempt_message() {
        let to = Pubkey::new_unique();
        let err = validation::require_rent_exempt(Lamports::new(1_000), 890_880, &to).unwrap_err();
        assert!(err.to_string().contains("rent exempt"));
        assert!(err.to_string().contains(&to.to_string()));
        assert!(validation::require_rent_exempt(Lamports::new(890_880), 890_880, &to).is_ok());
    }
}
