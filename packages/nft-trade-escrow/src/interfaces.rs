//! Capabilities the escrow consumes from its chain
//!
//! - [`AssetCustodian`] - the NFT registry holding ownership of assets
//! - [`FeeQuoter`] - prices a message before it is sent
//! - [`MessageEndpointClient`] - sends messages to the peer escrow
//! - [`MessageReceiver`] - the callback a transport invokes on delivery
//!
//! Any implementation with these semantics can back an escrow; the
//! `testing` module provides in-process ones.

use serde::{Deserialize, Serialize};

use crate::error::{CustodyError, EndpointError};
use crate::options::ExecutionOptions;
use crate::types::{Address, AssetRef, ChainId};

/// Ownership registry for non-fungible assets
pub trait AssetCustodian: Send + Sync {
    /// Current owner of `asset`
    fn owner_of(&self, asset: &AssetRef) -> Result<Address, CustodyError>;

    /// Whether `operator` may transfer `asset` on behalf of its owner
    fn is_approved(&self, asset: &AssetRef, operator: &Address) -> Result<bool, CustodyError>;

    /// Move `asset` from `from` to `to`, acting as `operator`
    ///
    /// Must fail if `from` is not the current owner or `operator` is neither
    /// the owner nor approved.
    fn transfer_from(
        &self,
        operator: &Address,
        asset: &AssetRef,
        from: &Address,
        to: &Address,
    ) -> Result<(), CustodyError>;
}

/// Fee for one message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessagingFee {
    /// Fee payable in the chain's native currency
    pub native_fee: u128,
    /// Fee payable in the transport's own token (not used by the escrow)
    pub token_fee: u128,
}

/// Result of a successful send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagingReceipt {
    /// Globally unique packet ID
    pub guid: [u8; 32],
    /// Nonce of the packet on its path
    pub nonce: u64,
    /// Fee charged for the packet
    pub fee: MessagingFee,
}

/// Identifies where an inbound message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub src_chain: ChainId,
    pub sender: Address,
    pub nonce: u64,
}

/// Prices messages
///
/// Quotes depend on the exact payload and options, so callers must quote the
/// payload they are about to send.
pub trait FeeQuoter: Send + Sync {
    fn quote(
        &self,
        dst_chain: ChainId,
        payload: &[u8],
        options: &ExecutionOptions,
    ) -> Result<MessagingFee, EndpointError>;
}

/// Sends messages from one escrow to its peer on another chain
///
/// The sender identity is the endpoint's own binding; receivers recover it
/// from the delivered [`Origin`].
pub trait MessageEndpointClient: FeeQuoter {
    fn send(
        &self,
        dst_chain: ChainId,
        receiver: &Address,
        payload: &[u8],
        options: &ExecutionOptions,
        fee_attached: u128,
    ) -> Result<MessagingReceipt, EndpointError>;
}

/// Receive callback invoked by a transport for every delivered packet
pub trait MessageReceiver: Send + Sync {
    fn receive(&self, origin: &Origin, guid: &[u8; 32], payload: &[u8]);
}
