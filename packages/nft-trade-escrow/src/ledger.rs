//! Trade ledger
//!
//! Keyed tables owned by one escrow instance:
//!
//! - `trades` - initiator -> [`Trade`] (initiating-chain half)
//! - `commitments` - (initiator, remote chain) -> [`CounterpartyCommitment`]
//! - `interests` - (initiator, remote chain) -> [`PendingInterest`]
//! - outbound sequence counters per initiator
//! - highest inbound `Interest` sequence per (initiator, remote chain)
//!
//! Inserts never overwrite an existing trade or commitment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EscrowError;
use crate::types::{Address, ChainId, CounterpartyCommitment, PendingInterest, Trade};

/// Key of destination-side records: a remote initiator on its chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommitmentKey {
    pub initiator: Address,
    pub remote_chain: ChainId,
}

impl CommitmentKey {
    pub fn new(initiator: Address, remote_chain: ChainId) -> Self {
        Self {
            initiator,
            remote_chain,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TradeLedger {
    trades: BTreeMap<Address, Trade>,
    commitments: BTreeMap<CommitmentKey, CounterpartyCommitment>,
    interests: BTreeMap<CommitmentKey, PendingInterest>,
    outbound_sequences: BTreeMap<Address, u64>,
    inbound_sequences: BTreeMap<CommitmentKey, u64>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Trades
    // ------------------------------------------------------------------------

    pub fn trade(&self, initiator: &Address) -> Option<&Trade> {
        self.trades.get(initiator)
    }

    pub fn trade_mut(&mut self, initiator: &Address) -> Option<&mut Trade> {
        self.trades.get_mut(initiator)
    }

    pub fn has_trade(&self, initiator: &Address) -> bool {
        self.trades.contains_key(initiator)
    }

    pub fn insert_trade(&mut self, trade: Trade) -> Result<(), EscrowError> {
        if self.trades.contains_key(&trade.initiator) {
            return Err(EscrowError::DuplicateTrade {
                initiator: trade.initiator,
                remote_chain: trade.remote_chain,
            });
        }
        self.trades.insert(trade.initiator, trade);
        Ok(())
    }

    pub fn remove_trade(&mut self, initiator: &Address) -> Option<Trade> {
        self.trades.remove(initiator)
    }

    pub fn trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.values()
    }

    // ------------------------------------------------------------------------
    // Commitments
    // ------------------------------------------------------------------------

    pub fn commitment(&self, key: &CommitmentKey) -> Option<&CounterpartyCommitment> {
        self.commitments.get(key)
    }

    pub fn has_commitment(&self, key: &CommitmentKey) -> bool {
        self.commitments.contains_key(key)
    }

    pub fn insert_commitment(
        &mut self,
        commitment: CounterpartyCommitment,
    ) -> Result<(), EscrowError> {
        let key = CommitmentKey::new(commitment.initiator, commitment.remote_chain);
        if self.commitments.contains_key(&key) {
            return Err(EscrowError::DuplicateTrade {
                initiator: key.initiator,
                remote_chain: key.remote_chain,
            });
        }
        self.commitments.insert(key, commitment);
        Ok(())
    }

    pub fn remove_commitment(&mut self, key: &CommitmentKey) -> Option<CounterpartyCommitment> {
        self.commitments.remove(key)
    }

    pub fn commitments(&self) -> impl Iterator<Item = &CounterpartyCommitment> {
        self.commitments.values()
    }

    // ------------------------------------------------------------------------
    // Cached interests
    // ------------------------------------------------------------------------

    pub fn interest(&self, key: &CommitmentKey) -> Option<&PendingInterest> {
        self.interests.get(key)
    }

    /// Cache an inbound interest, returning the one it replaces
    pub fn cache_interest(&mut self, interest: PendingInterest) -> Option<PendingInterest> {
        let key = CommitmentKey::new(interest.initiator, interest.remote_chain);
        self.interests.insert(key, interest)
    }

    pub fn take_interest(&mut self, key: &CommitmentKey) -> Option<PendingInterest> {
        self.interests.remove(key)
    }

    // ------------------------------------------------------------------------
    // Sequences
    // ------------------------------------------------------------------------

    /// Sequence the next trade of `initiator` will use (starts at 1)
    pub fn next_sequence(&self, initiator: &Address) -> u64 {
        self.outbound_sequences.get(initiator).copied().unwrap_or(0) + 1
    }

    /// Consume the next sequence of `initiator`
    pub fn advance_sequence(&mut self, initiator: &Address) -> u64 {
        let sequence = self.next_sequence(initiator);
        self.outbound_sequences.insert(*initiator, sequence);
        sequence
    }

    /// Highest interest sequence accepted from `key` (0 if none)
    pub fn last_inbound_sequence(&self, key: &CommitmentKey) -> u64 {
        self.inbound_sequences.get(key).copied().unwrap_or(0)
    }

    /// Record an inbound interest sequence
    ///
    /// Returns `false` (and records nothing) when `sequence` is not newer than
    /// the last one accepted for `key`.
    pub fn observe_inbound_sequence(&mut self, key: CommitmentKey, sequence: u64) -> bool {
        if sequence <= self.last_inbound_sequence(&key) {
            return false;
        }
        self.inbound_sequences.insert(key, sequence);
        true
    }
}
