//! # Campaign Client Configuration
//!
//! Configuration for the client service and the JSON-RPC ledger adapter.

use crate::domain::{Address, NATIVE_DECIMALS, SEPOLIA_CHAIN_ID};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// How the repository is brought up to date after a settled write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshStrategy {
    /// Re-read every campaign.
    #[default]
    Full,
    /// Re-read only the affected campaign. Creation still refreshes fully.
    Targeted,
}

impl fmt::Display for RefreshStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshStrategy::Full => write!(f, "full"),
            RefreshStrategy::Targeted => write!(f, "targeted"),
        }
    }
}

impl FromStr for RefreshStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(RefreshStrategy::Full),
            "targeted" => Ok(RefreshStrategy::Targeted),
            other => Err(ConfigError::Invalid(format!(
                "unknown refresh strategy '{}'",
                other
            ))),
        }
    }
}

/// Client service configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignClientConfig {
    /// Chain id the contract is deployed on. A mismatch is reported on connect.
    pub expected_network_id: u64,

    /// Refresh performed after a settled write.
    pub refresh_strategy: RefreshStrategy,

    /// Capacity of the action event broadcast channel.
    pub event_channel_capacity: usize,

    /// Decimals of the native currency.
    pub native_decimals: u8,

    /// Symbol of the native currency.
    pub native_symbol: String,
}

impl Default for CampaignClientConfig {
    fn default() -> Self {
        Self {
            expected_network_id: SEPOLIA_CHAIN_ID,
            refresh_strategy: RefreshStrategy::Full,
            event_channel_capacity: 64,
            native_decimals: NATIVE_DECIMALS,
            native_symbol: "ETH".to_string(),
        }
    }
}

impl CampaignClientConfig {
    /// Create a config for testing.
    pub fn for_testing() -> Self {
        Self {
            event_channel_capacity: 16,
            ..Self::default()
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_channel_capacity == 0 {
            return Err(ConfigError::InvalidLimit(
                "event_channel_capacity cannot be 0".into(),
            ));
        }
        if self.native_decimals > 77 {
            // 10^78 overflows U256
            return Err(ConfigError::InvalidLimit(
                "native_decimals must be at most 77".into(),
            ));
        }
        if self.native_symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("native_symbol cannot be empty".into()));
        }
        Ok(())
    }
}

/// JSON-RPC ledger adapter configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonRpcConfig {
    /// Node endpoint URL.
    pub endpoint: String,

    /// Crowdfunding contract address.
    pub contract_address: Address,

    /// Optional ERC-20 token shown in the balance panel.
    #[serde(default)]
    pub token_address: Option<Address>,

    /// Send writes from this account instead of the node's first account.
    #[serde(default)]
    pub from: Option<Address>,

    /// Per-request timeout.
    pub request_timeout_ms: u64,

    /// Connect timeout.
    pub connect_timeout_ms: u64,

    /// Interval between receipt polls while awaiting settlement.
    pub receipt_poll_interval_ms: u64,

    /// Consecutive receipt poll transport failures tolerated before the
    /// settlement wait gives up with a gateway error.
    pub max_receipt_poll_failures: u32,
}

impl Default for JsonRpcConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8545".to_string(),
            contract_address: Address::zero(),
            token_address: None,
            from: None,
            request_timeout_ms: 10_000,
            connect_timeout_ms: 2_000,
            receipt_poll_interval_ms: 2_000,
            max_receipt_poll_failures: 5,
        }
    }
}

impl JsonRpcConfig {
    /// Create a config for testing (short intervals).
    pub fn for_testing() -> Self {
        Self {
            contract_address: Address::repeat_byte(0xC0),
            request_timeout_ms: 1_000,
            connect_timeout_ms: 500,
            receipt_poll_interval_ms: 10,
            max_receipt_poll_failures: 2,
            ..Self::default()
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(ConfigError::InvalidEndpoint(self.endpoint.clone()));
        }
        if self.contract_address.is_zero() {
            return Err(ConfigError::Invalid(
                "contract_address must be set".into(),
            ));
        }
        if self.request_timeout_ms == 0 || self.connect_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "request and connect timeouts cannot be 0".into(),
            ));
        }
        if self.receipt_poll_interval_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "receipt_poll_interval_ms cannot be 0".into(),
            ));
        }
        Ok(())
    }

    /// Request timeout as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Connect timeout as a duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Receipt poll interval as a duration.
    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Endpoint is not an HTTP(S) URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// Invalid size or count limit.
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value.
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// General configuration error.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
