//! Trade escrow state machine
//!
//! One [`TradeEscrow`] runs per chain. It holds both halves of the protocol:
//!
//! - initiating half: `propose_trade` -> inbound `LockConfirmation` ->
//!   `fulfill_trade`
//! - destination half: inbound `Interest` -> `lock_in_interest` -> inbound
//!   `FulfillNotice`
//!
//! Local calls validate every precondition (including the fee quote) before
//! moving custody, and send their message last. A send that fails after
//! custody was taken hands the asset back, so a failed call leaves nothing
//! behind. Inbound messages never fail; anything unexpected is dropped and
//! reported as [`InboundOutcome::Dropped`].
//!
//! The escrow itself is not synchronized. Wrap it in
//! [`crate::node::EscrowNode`] to share it between callers and a transport.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::EscrowConfig;
use crate::error::EscrowError;
use crate::execute;
use crate::interfaces::{
    AssetCustodian, MessageEndpointClient, MessagingFee, MessagingReceipt, Origin,
};
use crate::ledger::{CommitmentKey, TradeLedger};
use crate::options::ExecutionOptions;
use crate::peers::PeerRegistry;
use crate::types::{
    Address, AssetRef, ChainId, CommitmentState, CounterpartyCommitment, MessageInfo,
    PendingInterest, Trade, TradeId, TradeState,
};

// ============================================================================
// Call Parameters
// ============================================================================

/// Parameters of `propose_trade`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposeTrade {
    /// Local asset put up for trade
    pub offered: AssetRef,
    /// Asset wanted in exchange on `remote_chain`
    pub desired: AssetRef,
    pub remote_chain: ChainId,
    /// Only this account may lock in the desired asset, if set
    pub counterparty_hint: Option<Address>,
    pub options: ExecutionOptions,
}

/// Parameters of `lock_in_interest`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInInterest {
    /// Chain the trade was proposed on
    pub remote_chain: ChainId,
    /// Initiator of the trade on `remote_chain`
    pub initiator: Address,
    /// Local asset locked against the trade
    pub locked: AssetRef,
    pub options: ExecutionOptions,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposeResponse {
    pub trade_id: TradeId,
    pub sequence: u64,
    pub receipt: MessagingReceipt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInResponse {
    pub trade_id: TradeId,
    pub initiator: Address,
    pub remote_chain: ChainId,
    pub receipt: MessagingReceipt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillResponse {
    pub trade_id: TradeId,
    /// Account that received the offered asset
    pub counterparty: Address,
    pub receipt: MessagingReceipt,
}

/// Why an inbound message was ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    /// Sender is not the registered peer for its chain
    UnauthorizedSender,
    /// Payload could not be decoded
    MalformedPayload,
    /// Sequence not newer than one already accepted
    StaleSequence,
    /// No trade or commitment the message refers to
    NoMatchingRecord,
    /// The record exists but is not in the state the message advances
    UnexpectedState,
    AssetMismatch,
    CounterpartyMismatch,
    /// The custodian refused to release the asset
    CustodyFailed,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::UnauthorizedSender => "unauthorized_sender",
            DropReason::MalformedPayload => "malformed_payload",
            DropReason::StaleSequence => "stale_sequence",
            DropReason::NoMatchingRecord => "no_matching_record",
            DropReason::UnexpectedState => "unexpected_state",
            DropReason::AssetMismatch => "asset_mismatch",
            DropReason::CounterpartyMismatch => "counterparty_mismatch",
            DropReason::CustodyFailed => "custody_failed",
        }
    }
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of handling one inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InboundOutcome {
    /// An `Interest` was cached for lock-in
    InterestCached { trade_id: TradeId },
    /// A proposed trade moved to `Locked`
    TradeLocked { trade_id: TradeId },
    /// A commitment released its asset to the initiator
    CommitmentReleased { trade_id: TradeId },
    Dropped(DropReason),
}

/// Lifetime counters of one escrow instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EscrowStats {
    pub trades_proposed: u64,
    pub trades_locked: u64,
    pub trades_fulfilled: u64,
    pub commitments_created: u64,
    pub commitments_released: u64,
    pub messages_dropped: u64,
}

// ============================================================================
// Escrow
// ============================================================================

pub struct TradeEscrow {
    pub(crate) config: EscrowConfig,
    pub(crate) peers: PeerRegistry,
    pub(crate) ledger: TradeLedger,
    pub(crate) stats: EscrowStats,
    pub(crate) custodian: Arc<dyn AssetCustodian>,
    pub(crate) endpoint: Arc<dyn MessageEndpointClient>,
}

impl TradeEscrow {
    pub fn new(
        config: EscrowConfig,
        custodian: Arc<dyn AssetCustodian>,
        endpoint: Arc<dyn MessageEndpointClient>,
    ) -> Self {
        tracing::info!(
            chain_id = %config.chain_id,
            escrow = %config.escrow_address,
            admin = %config.admin,
            "Trade escrow created"
        );
        Self {
            config,
            peers: PeerRegistry::new(),
            ledger: TradeLedger::new(),
            stats: EscrowStats::default(),
            custodian,
            endpoint,
        }
    }

    // ------------------------------------------------------------------------
    // Admin
    // ------------------------------------------------------------------------

    /// Bind `chain_id` to the remote escrow at `peer` (zero address unbinds)
    pub fn set_peer(
        &mut self,
        info: &MessageInfo,
        chain_id: ChainId,
        peer: Address,
    ) -> Result<Option<Address>, EscrowError> {
        execute::execute_set_peer(self, info, chain_id, peer)
    }

    pub fn transfer_admin(
        &mut self,
        info: &MessageInfo,
        new_admin: Address,
    ) -> Result<(), EscrowError> {
        execute::execute_transfer_admin(self, info, new_admin)
    }

    // ------------------------------------------------------------------------
    // Initiating half
    // ------------------------------------------------------------------------

    pub fn propose_trade(
        &mut self,
        info: &MessageInfo,
        params: ProposeTrade,
    ) -> Result<ProposeResponse, EscrowError> {
        execute::execute_propose_trade(self, info, params)
    }

    pub fn fulfill_trade(
        &mut self,
        info: &MessageInfo,
        remote_chain: ChainId,
        options: ExecutionOptions,
    ) -> Result<FulfillResponse, EscrowError> {
        execute::execute_fulfill_trade(self, info, remote_chain, options)
    }

    // ------------------------------------------------------------------------
    // Destination half
    // ------------------------------------------------------------------------

    pub fn lock_in_interest(
        &mut self,
        info: &MessageInfo,
        params: LockInInterest,
    ) -> Result<LockInResponse, EscrowError> {
        execute::execute_lock_in_interest(self, info, params)
    }

    // ------------------------------------------------------------------------
    // Inbound
    // ------------------------------------------------------------------------

    /// Authenticate, decode and apply one delivered message
    pub fn handle_message(
        &mut self,
        origin: &Origin,
        guid: &[u8; 32],
        payload: &[u8],
    ) -> InboundOutcome {
        execute::handle_message(self, origin, guid, payload)
    }

    // ------------------------------------------------------------------------
    // Quotes
    // ------------------------------------------------------------------------

    /// Fee `propose_trade` would need when called by `initiator`
    pub fn quote_propose_trade(
        &self,
        initiator: &Address,
        params: &ProposeTrade,
    ) -> Result<MessagingFee, EscrowError> {
        execute::quote_propose_trade(self, initiator, params)
    }

    /// Fee `lock_in_interest` would need when called by `committer`
    pub fn quote_lock_in(
        &self,
        committer: &Address,
        params: &LockInInterest,
    ) -> Result<MessagingFee, EscrowError> {
        execute::quote_lock_in(self, committer, params)
    }

    /// Fee `fulfill_trade` would need for the locked trade of `initiator`
    pub fn quote_fulfill_trade(
        &self,
        initiator: &Address,
        remote_chain: ChainId,
        options: &ExecutionOptions,
    ) -> Result<MessagingFee, EscrowError> {
        execute::quote_fulfill_trade(self, initiator, remote_chain, options)
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn config(&self) -> &EscrowConfig {
        &self.config
    }

    pub fn chain_id(&self) -> ChainId {
        self.config.chain_id
    }

    pub fn address(&self) -> Address {
        self.config.escrow_address
    }

    pub fn peer(&self, chain_id: &ChainId) -> Option<Address> {
        self.peers.get(chain_id).copied()
    }

    pub fn peers(&self) -> Vec<(ChainId, Address)> {
        self.peers.iter().map(|(c, a)| (*c, *a)).collect()
    }

    pub fn trade(&self, initiator: &Address) -> Option<Trade> {
        self.ledger.trade(initiator).cloned()
    }

    /// `None` when the initiator has no active trade
    pub fn trade_state(&self, initiator: &Address) -> TradeState {
        self.ledger
            .trade(initiator)
            .map(|t| t.state)
            .unwrap_or_default()
    }

    pub fn commitment(
        &self,
        initiator: &Address,
        remote_chain: ChainId,
    ) -> Option<CounterpartyCommitment> {
        self.ledger
            .commitment(&CommitmentKey::new(*initiator, remote_chain))
            .cloned()
    }

    pub fn commitment_state(&self, initiator: &Address, remote_chain: ChainId) -> CommitmentState {
        self.ledger
            .commitment(&CommitmentKey::new(*initiator, remote_chain))
            .map(|c| c.state)
            .unwrap_or_default()
    }

    pub fn pending_interest(
        &self,
        initiator: &Address,
        remote_chain: ChainId,
    ) -> Option<PendingInterest> {
        self.ledger
            .interest(&CommitmentKey::new(*initiator, remote_chain))
            .cloned()
    }

    /// Sequence the next trade proposed by `initiator` will carry
    pub fn next_sequence(&self, initiator: &Address) -> u64 {
        self.ledger.next_sequence(initiator)
    }

    pub fn stats(&self) -> EscrowStats {
        self.stats
    }

    // ------------------------------------------------------------------------
    // Shared helpers
    // ------------------------------------------------------------------------

    /// `caller` owns `asset` and the escrow may move it
    pub(crate) fn check_custody_preconditions(
        &self,
        caller: &Address,
        asset: &AssetRef,
    ) -> Result<(), EscrowError> {
        let owner = self.custodian.owner_of(asset)?;
        if owner != *caller {
            return Err(EscrowError::NotOwner {
                asset: *asset,
                caller: *caller,
            });
        }
        if !self.custodian.is_approved(asset, &self.config.escrow_address)? {
            return Err(EscrowError::NotApproved { asset: *asset });
        }
        Ok(())
    }

    /// Quote `payload` and check the attached value covers it
    pub(crate) fn check_fee(
        &self,
        info: &MessageInfo,
        dst_chain: ChainId,
        payload: &[u8],
        options: &ExecutionOptions,
    ) -> Result<MessagingFee, EscrowError> {
        let fee = self.endpoint.quote(dst_chain, payload, options)?;
        tracing::debug!(
            dst_chain = %dst_chain,
            native_fee = fee.native_fee,
            attached = info.value,
            payload_len = payload.len(),
            "Quoted message fee"
        );
        if info.value < fee.native_fee {
            return Err(EscrowError::InsufficientFee {
                required: fee.native_fee,
                attached: info.value,
            });
        }
        Ok(fee)
    }

    /// Send `payload` to `peer`, forwarding the whole attached value
    pub(crate) fn send(
        &self,
        info: &MessageInfo,
        dst_chain: ChainId,
        peer: &Address,
        payload: &[u8],
        options: &ExecutionOptions,
    ) -> Result<MessagingReceipt, EscrowError> {
        Ok(self
            .endpoint
            .send(dst_chain, peer, payload, options, info.value)?)
    }

    /// Take custody of `asset` from `owner`
    pub(crate) fn take_custody(
        &self,
        asset: &AssetRef,
        owner: &Address,
    ) -> Result<(), EscrowError> {
        let escrow = self.config.escrow_address;
        self.custodian.transfer_from(&escrow, asset, owner, &escrow)?;
        Ok(())
    }

    /// Hand `asset` back to `owner` after the send that should have followed
    /// custody failed
    pub(crate) fn return_custody(
        &self,
        asset: &AssetRef,
        owner: &Address,
        cause: &EscrowError,
    ) {
        let escrow = self.config.escrow_address;
        match self.custodian.transfer_from(&escrow, asset, &escrow, owner) {
            Ok(()) => tracing::warn!(
                asset = %asset,
                owner = %owner,
                cause = %cause,
                "Send failed, custody returned"
            ),
            Err(e) => tracing::error!(
                asset = %asset,
                owner = %owner,
                cause = %cause,
                error = %e,
                "Send failed and custody could not be returned"
            ),
        }
    }

    pub(crate) fn record_drop(&mut self, reason: DropReason) -> InboundOutcome {
        self.stats.messages_dropped += 1;
        InboundOutcome::Dropped(reason)
    }
}

impl std::fmt::Debug for TradeEscrow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradeEscrow")
            .field("config", &self.config)
            .field("peers", &self.peers)
            .field("ledger", &self.ledger)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
