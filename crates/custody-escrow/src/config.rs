//! Escrow service configuration.
//!
//! Names the token type every custody account must hold, the custodian
//! principal the service acts as when moving tokens out of custody, and the
//! upper bound on any single ledger call. Override via environment
//! variables or explicit construction for tests.

use std::time::Duration;

use custody_core::{PrincipalId, TokenType};

/// Default ledger call timeout.
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for an [`EscrowService`](crate::EscrowService).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowConfig {
    /// Token type every custody account must hold.
    pub token: TokenType,
    /// Principal that holds custody accounts on the ledger.
    pub custodian: PrincipalId,
    /// Upper bound on a single ledger call.
    pub transfer_timeout: Duration,
}

impl EscrowConfig {
    /// Build a configuration with the default transfer timeout.
    pub fn new(token: TokenType, custodian: PrincipalId) -> Self {
        Self {
            token,
            custodian,
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
        }
    }

    /// Replace the transfer timeout.
    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CUSTODY_CUSTODIAN_ID` (required, UUID)
    /// - `CUSTODY_TOKEN_TYPE` (default: `SPL`)
    /// - `CUSTODY_TRANSFER_TIMEOUT_MS` (default: 30000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let custodian = std::env::var("CUSTODY_CUSTODIAN_ID")
            .map_err(|_| ConfigError::MissingCustodian)?
            .parse::<PrincipalId>()
            .map_err(|e| ConfigError::InvalidValue("CUSTODY_CUSTODIAN_ID".to_string(), e.to_string()))?;

        let token = std::env::var("CUSTODY_TOKEN_TYPE")
            .unwrap_or_else(|_| "SPL".to_string())
            .parse::<TokenType>()
            .map_err(|e| ConfigError::InvalidValue("CUSTODY_TOKEN_TYPE".to_string(), e.to_string()))?;

        let transfer_timeout = match std::env::var("CUSTODY_TRANSFER_TIMEOUT_MS") {
            Ok(raw) => parse_timeout_ms("CUSTODY_TRANSFER_TIMEOUT_MS", &raw)?,
            Err(_) => DEFAULT_TRANSFER_TIMEOUT,
        };

        Ok(Self {
            token,
            custodian,
            transfer_timeout,
        })
    }
}

fn parse_timeout_ms(var: &str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidValue(
            var.to_string(),
            "timeout must be positive".to_string(),
        )),
        Ok(ms) => Ok(Duration::from_millis(ms)),
        Err(e) => Err(ConfigError::InvalidValue(var.to_string(), e.to_string())),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `CUSTODY_CUSTODIAN_ID` is not set.
    #[error("CUSTODY_CUSTODIAN_ID environment variable is required")]
    MissingCustodian,
    /// A variable is set but cannot be parsed: variable name, then the
    /// parse failure.
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}
