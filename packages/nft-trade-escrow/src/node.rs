//! Thread-safe escrow handle
//!
//! A chain executes one transaction at a time. [`EscrowNode`] reproduces that
//! by holding the escrow behind a single mutex: every local call and every
//! inbound delivery runs its whole transition under the lock.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::EscrowError;
use crate::escrow::{
    EscrowStats, FulfillResponse, InboundOutcome, LockInInterest, LockInResponse,
    ProposeResponse, ProposeTrade, TradeEscrow,
};
use crate::interfaces::{MessageReceiver, MessagingFee, Origin};
use crate::options::ExecutionOptions;
use crate::types::{
    Address, ChainId, CommitmentState, CounterpartyCommitment, MessageInfo, PendingInterest,
    Trade, TradeState,
};

#[derive(Debug)]
pub struct EscrowNode {
    chain_id: ChainId,
    address: Address,
    escrow: Mutex<TradeEscrow>,
}

impl EscrowNode {
    pub fn new(escrow: TradeEscrow) -> Self {
        Self {
            chain_id: escrow.chain_id(),
            address: escrow.address(),
            escrow: Mutex::new(escrow),
        }
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn lock(&self) -> MutexGuard<'_, TradeEscrow> {
        // Handlers write the ledger last, so a poisoned lock still holds
        // consistent state
        self.escrow.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the escrow
    pub fn with_escrow<R>(&self, f: impl FnOnce(&mut TradeEscrow) -> R) -> R {
        f(&mut *self.lock())
    }

    pub fn set_peer(
        &self,
        info: &MessageInfo,
        chain_id: ChainId,
        peer: Address,
    ) -> Result<Option<Address>, EscrowError> {
        self.lock().set_peer(info, chain_id, peer)
    }

    pub fn transfer_admin(
        &self,
        info: &MessageInfo,
        new_admin: Address,
    ) -> Result<(), EscrowError> {
        self.lock().transfer_admin(info, new_admin)
    }

    pub fn propose_trade(
        &self,
        info: &MessageInfo,
        params: ProposeTrade,
    ) -> Result<ProposeResponse, EscrowError> {
        self.lock().propose_trade(info, params)
    }

    pub fn lock_in_interest(
        &self,
        info: &MessageInfo,
        params: LockInInterest,
    ) -> Result<LockInResponse, EscrowError> {
        self.lock().lock_in_interest(info, params)
    }

    pub fn fulfill_trade(
        &self,
        info: &MessageInfo,
        remote_chain: ChainId,
        options: ExecutionOptions,
    ) -> Result<FulfillResponse, EscrowError> {
        self.lock().fulfill_trade(info, remote_chain, options)
    }

    pub fn handle_message(
        &self,
        origin: &Origin,
        guid: &[u8; 32],
        payload: &[u8],
    ) -> InboundOutcome {
        self.lock().handle_message(origin, guid, payload)
    }

    pub fn quote_propose_trade(
        &self,
        initiator: &Address,
        params: &ProposeTrade,
    ) -> Result<MessagingFee, EscrowError> {
        self.lock().quote_propose_trade(initiator, params)
    }

    pub fn quote_lock_in(
        &self,
        committer: &Address,
        params: &LockInInterest,
    ) -> Result<MessagingFee, EscrowError> {
        self.lock().quote_lock_in(committer, params)
    }

    pub fn quote_fulfill_trade(
        &self,
        initiator: &Address,
        remote_chain: ChainId,
        options: &ExecutionOptions,
    ) -> Result<MessagingFee, EscrowError> {
        self.lock()
            .quote_fulfill_trade(initiator, remote_chain, options)
    }

    pub fn peer(&self, chain_id: &ChainId) -> Option<Address> {
        self.lock().peer(chain_id)
    }

    pub fn trade(&self, initiator: &Address) -> Option<Trade> {
        self.lock().trade(initiator)
    }

    pub fn trade_state(&self, initiator: &Address) -> TradeState {
        self.lock().trade_state(initiator)
    }

    pub fn commitment(
        &self,
        initiator: &Address,
        remote_chain: ChainId,
    ) -> Option<CounterpartyCommitment> {
        self.lock().commitment(initiator, remote_chain)
    }

    pub fn commitment_state(&self, initiator: &Address, remote_chain: ChainId) -> CommitmentState {
        self.lock().commitment_state(initiator, remote_chain)
    }

    pub fn pending_interest(
        &self,
        initiator: &Address,
        remote_chain: ChainId,
    ) -> Option<PendingInterest> {
        self.lock().pending_interest(initiator, remote_chain)
    }

    pub fn stats(&self) -> EscrowStats {
        self.lock().stats()
    }
}

impl MessageReceiver for EscrowNode {
    fn receive(&self, origin: &Origin, guid: &[u8; 32], payload: &[u8]) {
        // Outcome is already logged and counted by the escrow
        let _ = self.handle_message(origin, guid, payload);
    }
}
