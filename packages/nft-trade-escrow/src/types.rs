//! Common types for the trade escrow
//!
//! Identifiers, asset references and the ledger records shared by the
//! initiating half and the destination half of the protocol.

use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Chain ID (4 bytes)
// ============================================================================

/// Represents a 4-byte chain (endpoint) ID
///
/// Every escrow instance lives on exactly one chain; peers and outbound
/// messages are keyed by the remote chain's ID.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct ChainId(pub [u8; 4]);

impl ChainId {
    /// Create from u32
    pub fn from_u32(id: u32) -> Self {
        ChainId(id.to_be_bytes())
    }

    /// Convert to u32
    pub fn to_u32(&self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Create from hex string (with or without 0x prefix)
    pub fn from_hex(hex: &str) -> Result<Self> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes = hex::decode(hex)?;
        if bytes.len() != 4 {
            return Err(eyre!("ChainId must be 4 bytes, got {}", bytes.len()));
        }
        let mut result = [0u8; 4];
        result.copy_from_slice(&bytes);
        Ok(ChainId(result))
    }

    /// Convert to hex string with 0x prefix
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_u32())
    }
}

impl From<u32> for ChainId {
    fn from(id: u32) -> Self {
        ChainId::from_u32(id)
    }
}

// ============================================================================
// Universal Address (32 bytes)
// ============================================================================

/// Account or contract address, stored as 32 bytes
///
/// EVM addresses are left-padded with 12 zero bytes, which is also how peer
/// addresses are registered on the remote side.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// The zero address. Never a valid owner, peer or counterparty.
    pub const ZERO: Address = Address([0u8; 32]);

    /// Create from a raw 20-byte EVM address (left-padded with zeros)
    pub fn from_evm(raw: [u8; 20]) -> Self {
        let mut result = [0u8; 32];
        result[12..].copy_from_slice(&raw);
        Address(result)
    }

    /// Create from hex string (with or without 0x prefix)
    ///
    /// Accepts both 20-byte addresses (40 hex chars) and 32-byte addresses
    /// (64 hex chars).
    pub fn from_hex(hex: &str) -> Result<Self> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes = hex::decode(hex)?;

        match bytes.len() {
            20 => {
                let mut raw = [0u8; 20];
                raw.copy_from_slice(&bytes);
                Ok(Address::from_evm(raw))
            }
            32 => {
                let mut result = [0u8; 32];
                result.copy_from_slice(&bytes);
                Ok(Address(result))
            }
            len => Err(eyre!("Address must be 20 or 32 bytes, got {} bytes", len)),
        }
    }

    /// The 20-byte EVM form, if the first 12 bytes are zero padding
    pub fn as_evm(&self) -> Option<[u8; 20]> {
        if self.0[..12].iter().any(|&b| b != 0) {
            return None;
        }
        let mut raw = [0u8; 20];
        raw.copy_from_slice(&self.0[12..]);
        Some(raw)
    }

    /// Convert to the full 32-byte hex string with 0x prefix
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_evm() {
            Some(raw) => write!(f, "0x{}", hex::encode(raw)),
            None => write!(f, "{}", self.to_hex()),
        }
    }
}

// ============================================================================
// Assets
// ============================================================================

/// Identifies one non-fungible unit: a collection contract and a token ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef {
    /// Collection (token contract) address on the chain holding the asset
    pub collection: Address,
    /// Token ID within the collection
    pub token_id: u128,
}

impl AssetRef {
    pub fn new(collection: Address, token_id: u128) -> Self {
        Self {
            collection,
            token_id,
        }
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.collection, self.token_id)
    }
}

// ============================================================================
// Trade ID
// ============================================================================

/// Identifier of one trade, derived identically on both chains
///
/// See [`crate::hash::compute_trade_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradeId(pub [u8; 32]);

impl TradeId {
    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// ============================================================================
// Lifecycle States
// ============================================================================

/// Handshake state of a trade on the initiating chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TradeState {
    #[default]
    None,
    Proposed,
    Locked,
    Fulfilled,
}

impl TradeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeState::None => "none",
            TradeState::Proposed => "proposed",
            TradeState::Locked => "locked",
            TradeState::Fulfilled => "fulfilled",
        }
    }
}

impl fmt::Display for TradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State of a counterparty commitment on the destination chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CommitmentState {
    #[default]
    None,
    Committed,
    Released,
}

impl CommitmentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitmentState::None => "none",
            CommitmentState::Committed => "committed",
            CommitmentState::Released => "released",
        }
    }
}

impl fmt::Display for CommitmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Ledger Records
// ============================================================================

/// Initiator-keyed trade record on the initiating chain
///
/// While a record exists its `offered` asset is held by the escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Trade ID shared with the destination chain
    pub id: TradeId,
    /// Account that proposed the trade (ledger key)
    pub initiator: Address,
    /// Per-initiator sequence number carried by every message of this trade
    pub sequence: u64,
    /// Asset held in local custody
    pub offered: AssetRef,
    /// Asset wanted in exchange, on the remote chain
    pub desired: AssetRef,
    /// Chain hosting the desired asset
    pub remote_chain: ChainId,
    /// Account that locked the desired asset (set on lock confirmation)
    pub counterparty: Option<Address>,
    /// Expected holder of the desired asset, if the initiator named one
    pub counterparty_hint: Option<Address>,
    pub state: TradeState,
}

/// Destination-side record of an asset locked against a remote trade
///
/// Keyed by `(initiator, remote_chain)`; while it exists `locked` is held by
/// the escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterpartyCommitment {
    /// Trade ID shared with the initiating chain
    pub id: TradeId,
    /// Initiator on the remote chain
    pub initiator: Address,
    /// Chain the trade was proposed on
    pub remote_chain: ChainId,
    /// Sequence of the remote trade
    pub sequence: u64,
    /// Asset held in local custody
    pub locked: AssetRef,
    /// Account that locked the asset and receives the offered asset remotely
    pub committer: Address,
    pub state: CommitmentState,
}

/// Inbound `Interest` cached on the destination chain until someone locks in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingInterest {
    pub id: TradeId,
    pub initiator: Address,
    pub remote_chain: ChainId,
    pub sequence: u64,
    /// Asset the initiator holds in custody on the remote chain
    pub offered: AssetRef,
    /// Asset that must be locked here
    pub desired: AssetRef,
    pub counterparty_hint: Option<Address>,
}

// ============================================================================
// Call Context
// ============================================================================

/// Caller identity and native funds attached to a local call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageInfo {
    /// The account making the call
    pub sender: Address,
    /// Native funds attached to pay for message dispatch
    pub value: u128,
}

impl MessageInfo {
    pub fn new(sender: Address, value: u128) -> Self {
        Self { sender, value }
    }
}
