//! Escrow and relay configuration

use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::env;

use crate::types::{Address, ChainId};

/// Identity of one escrow instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowConfig {
    /// Chain this instance runs on
    pub chain_id: ChainId,
    /// Address of the escrow itself; custody is held under this account
    pub escrow_address: Address,
    /// Account allowed to manage peers
    pub admin: Address,
}

impl EscrowConfig {
    pub fn new(chain_id: ChainId, escrow_address: Address, admin: Address) -> Self {
        Self {
            chain_id,
            escrow_address,
            admin,
        }
    }

    /// Load configuration from environment
    ///
    /// - `ESCROW_CHAIN_ID` - decimal or `0x`-prefixed 4-byte hex
    /// - `ESCROW_ADDRESS` - 20- or 32-byte hex
    /// - `ESCROW_ADMIN` - 20- or 32-byte hex
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded .env from {:?}", path);
        }

        let chain_id = parse_chain_id(
            &env::var("ESCROW_CHAIN_ID").map_err(|_| eyre!("ESCROW_CHAIN_ID required"))?,
        )?;
        let escrow_address = Address::from_hex(
            &env::var("ESCROW_ADDRESS").map_err(|_| eyre!("ESCROW_ADDRESS required"))?,
        )
        .map_err(|e| eyre!("Invalid ESCROW_ADDRESS: {}", e))?;
        let admin = Address::from_hex(
            &env::var("ESCROW_ADMIN").map_err(|_| eyre!("ESCROW_ADMIN required"))?,
        )
        .map_err(|e| eyre!("Invalid ESCROW_ADMIN: {}", e))?;

        let config = Self {
            chain_id,
            escrow_address,
            admin,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chain_id.to_u32() == 0 {
            return Err(eyre!("chain_id must be non-zero"));
        }
        if self.escrow_address.is_zero() {
            return Err(eyre!("escrow_address must be non-zero"));
        }
        if self.admin.is_zero() {
            return Err(eyre!("admin must be non-zero"));
        }
        if self.admin == self.escrow_address {
            return Err(eyre!("admin cannot be the escrow itself"));
        }
        Ok(())
    }
}

/// Parse a chain ID given as decimal ("2") or 4-byte hex ("0x00000002")
fn parse_chain_id(raw: &str) -> Result<ChainId> {
    let raw = raw.trim();
    if raw.starts_with("0x") {
        return ChainId::from_hex(raw);
    }
    raw.parse::<u32>()
        .map(ChainId::from_u32)
        .map_err(|_| eyre!("Invalid chain ID: {}", raw))
}

/// Settings for the in-process relay loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Delay between delivery rounds
    pub poll_interval_ms: u64,
    /// Maximum packets delivered per round
    pub max_batch: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            max_batch: 64,
        }
    }
}

impl RelayConfig {
    /// Load from `RELAY_POLL_INTERVAL_MS` and `RELAY_MAX_BATCH`, falling back
    /// to defaults when unset
    pub fn load() -> Result<Self> {
        let defaults = Self::default();
        let poll_interval_ms = match env::var("RELAY_POLL_INTERVAL_MS") {
            Ok(v) => v
                .parse()
                .map_err(|_| eyre!("Invalid RELAY_POLL_INTERVAL_MS: {}", v))?,
            Err(_) => defaults.poll_interval_ms,
        };
        let max_batch = match env::var("RELAY_MAX_BATCH") {
            Ok(v) => v
                .parse()
                .map_err(|_| eyre!("Invalid RELAY_MAX_BATCH: {}", v))?,
            Err(_) => defaults.max_batch,
        };

        if max_batch == 0 {
            return Err(eyre!("RELAY_MAX_BATCH must be greater than zero"));
        }
        Ok(Self {
            poll_interval_ms,
            max_batch,
        })
    }
}
