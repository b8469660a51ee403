//! Peer registry
//!
//! Maps each remote chain to the single escrow address whose messages this
//! instance honours. Every inbound message is checked against it.

use std::collections::BTreeMap;

use crate::error::EscrowError;
use crate::interfaces::Origin;
use crate::types::{Address, ChainId};

#[derive(Debug, Clone, Default)]
pub struct PeerRegistry {
    peers: BTreeMap<ChainId, Address>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `chain_id` to `address`, replacing any previous binding
    ///
    /// Binding the zero address removes the peer.
    pub fn set(&mut self, chain_id: ChainId, address: Address) -> Option<Address> {
        if address.is_zero() {
            return self.peers.remove(&chain_id);
        }
        self.peers.insert(chain_id, address)
    }

    pub fn get(&self, chain_id: &ChainId) -> Option<&Address> {
        self.peers.get(chain_id)
    }

    /// The peer for `chain_id`, or `PeerNotSet`
    pub fn require(&self, chain_id: &ChainId) -> Result<Address, EscrowError> {
        self.peers
            .get(chain_id)
            .copied()
            .ok_or(EscrowError::PeerNotSet {
                chain_id: *chain_id,
            })
    }

    /// Whether `origin` is the registered peer for its source chain
    pub fn is_peer(&self, origin: &Origin) -> bool {
        self.peers
            .get(&origin.src_chain)
            .is_some_and(|peer| *peer == origin.sender)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChainId, &Address)> {
        self.peers.iter()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
