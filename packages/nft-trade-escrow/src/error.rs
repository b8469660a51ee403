//! Error types for the trade escrow
//!
//! Local calls surface [`EscrowError`]. Inbound messages never produce an
//! error for anyone; they are dropped and reported as
//! [`crate::escrow::DropReason`].

use thiserror::Error;

use crate::msg::CodecError;
use crate::options::OptionsError;
use crate::types::{Address, AssetRef, ChainId, TradeState};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscrowError {
    // ========================================================================
    // Authorization Errors
    // ========================================================================

    #[error("Unauthorized: only admin can perform this action")]
    Unauthorized,

    #[error("Caller {caller} does not own {asset}")]
    NotOwner { asset: AssetRef, caller: Address },

    #[error("Escrow is not approved to transfer {asset}")]
    NotApproved { asset: AssetRef },

    #[error("Caller {caller} is not the counterparty named by the initiator ({expected})")]
    UnexpectedCounterparty { expected: Address, caller: Address },

    // ========================================================================
    // Ledger Errors
    // ========================================================================

    #[error("An active trade already exists for {initiator} (chain {remote_chain})")]
    DuplicateTrade {
        initiator: Address,
        remote_chain: ChainId,
    },

    #[error("Invalid state: {reason}")]
    InvalidState { reason: String },

    #[error("Asset mismatch: expected {expected}, got {got}")]
    AssetMismatch { expected: AssetRef, got: AssetRef },

    // ========================================================================
    // Messaging Errors
    // ========================================================================

    #[error("No peer registered for chain {chain_id}")]
    PeerNotSet { chain_id: ChainId },

    #[error("Insufficient fee: required {required}, attached {attached}")]
    InsufficientFee { required: u128, attached: u128 },

    #[error("Message dispatch failed: {reason}")]
    DispatchFailed { reason: String },

    #[error("Invalid execution options: {0}")]
    InvalidOptions(#[from] OptionsError),

    #[error("Message encoding error: {0}")]
    Codec(#[from] CodecError),

    // ========================================================================
    // Custody Errors
    // ========================================================================

    #[error("Custody error: {0}")]
    Custody(#[from] CustodyError),
}

impl EscrowError {
    pub(crate) fn invalid_state(reason: impl Into<String>) -> Self {
        EscrowError::InvalidState {
            reason: reason.into(),
        }
    }

    pub(crate) fn unexpected_trade_state(expected: TradeState, actual: TradeState) -> Self {
        EscrowError::InvalidState {
            reason: format!("trade is {}, expected {}", actual, expected),
        }
    }
}

/// Errors reported by an asset custodian
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CustodyError {
    #[error("Unknown asset: {0}")]
    UnknownAsset(AssetRef),

    #[error("{from} is not the owner of {asset}")]
    NotOwner { asset: AssetRef, from: Address },

    #[error("{operator} is not authorized to transfer {asset}")]
    NotAuthorized { asset: AssetRef, operator: Address },

    #[error("Invalid recipient for {asset}")]
    InvalidRecipient { asset: AssetRef },

    #[error("Transfer of {asset} rejected: {reason}")]
    Rejected { asset: AssetRef, reason: String },
}

/// Errors reported by a message endpoint
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("Insufficient fee: required {required}, attached {attached}")]
    InsufficientFee { required: u128, attached: u128 },

    #[error("Dispatch failed: {0}")]
    DispatchFailed(String),

    #[error("Unknown destination chain: {0}")]
    UnknownDestination(ChainId),
}

impl From<EndpointError> for EscrowError {
    fn from(err: EndpointError) -> Self {
        match err {
            EndpointError::InsufficientFee { required, attached } => {
                EscrowError::InsufficientFee { required, attached }
            }
            EndpointError::DispatchFailed(reason) => EscrowError::DispatchFailed { reason },
            EndpointError::UnknownDestination(chain_id) => EscrowError::DispatchFailed {
                reason: format!("unknown destination chain {}", chain_id),
            },
        }
    }
}
