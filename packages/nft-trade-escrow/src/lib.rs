//! Cross-chain NFT trade escrow
//!
//! Two parties holding NFTs on different chains swap them through a pair of
//! escrow instances, one per chain, that talk over an authenticated message
//! channel:
//!
//! ```text
//! chain A (initiator)                        chain B (counterparty)
//! propose_trade   -- Interest ------------->  cache interest
//!                 <------- LockConfirmation -- lock_in_interest
//! fulfill_trade   -- FulfillNotice -------->  release to initiator
//! ```
//!
//! Each escrow holds the local asset in custody until the handshake
//! completes, and only honours messages from its registered peer.
//!
//! ## Modules
//!
//! - [`escrow`] - the per-chain state machine
//! - [`node`] - mutex-guarded handle that serializes calls and deliveries
//! - [`msg`] - wire format of the three messages
//! - [`options`] - executor gas options
//! - [`interfaces`] - custodian, fee quoter and endpoint traits
//! - `testing` - in-process registry, channel and relay (feature `testing`)

pub mod config;
pub mod error;
pub mod escrow;
mod execute;
pub mod hash;
pub mod interfaces;
pub mod ledger;
pub mod msg;
pub mod node;
pub mod options;
pub mod peers;
pub mod types;

#[cfg(feature = "testing")]
pub mod testing;

pub use config::{EscrowConfig, RelayConfig};
pub use error::{CustodyError, EndpointError, EscrowError};
pub use escrow::{
    DropReason, EscrowStats, FulfillResponse, InboundOutcome, LockInInterest, LockInResponse,
    ProposeResponse, ProposeTrade, TradeEscrow,
};
pub use interfaces::{
    AssetCustodian, FeeQuoter, MessageEndpointClient, MessageReceiver, MessagingFee,
    MessagingReceipt, Origin,
};
pub use node::EscrowNode;
pub use options::ExecutionOptions;
pub use types::{
    Address, AssetRef, ChainId, CommitmentState, CounterpartyCommitment, MessageInfo,
    PendingInterest, Trade, TradeId, TradeState,
};
