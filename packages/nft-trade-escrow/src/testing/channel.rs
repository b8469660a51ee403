//! In-memory message channel shared by every chain of a simulation
//!
//! Sends are queued in order; nothing is delivered until a caller (or the
//! relay loop) asks for it, which keeps the asynchronous gap between chains
//! visible to tests. Fault controls cover redelivery, forged packets and
//! failed dispatches.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::EndpointError;
use crate::hash::{bytes32_to_hex, compute_guid};
use crate::interfaces::{
    FeeQuoter, MessageEndpointClient, MessageReceiver, MessagingFee, MessagingReceipt, Origin,
};
use crate::options::ExecutionOptions;
use crate::types::{Address, ChainId};

/// Fee model: `base + per_byte * payload_len + per_gas * gas_limit`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub base: u128,
    pub per_byte: u128,
    pub per_gas: u128,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            base: 10_000,
            per_byte: 10,
            per_gas: 1,
        }
    }
}

impl FeeSchedule {
    /// A schedule under which every message is free
    pub fn free() -> Self {
        Self {
            base: 0,
            per_byte: 0,
            per_gas: 0,
        }
    }

    pub fn native_fee(&self, payload_len: usize, options: &ExecutionOptions) -> u128 {
        self.base
            .saturating_add(self.per_byte.saturating_mul(payload_len as u128))
            .saturating_add(self.per_gas.saturating_mul(options.gas_limit))
            .saturating_add(options.msg_value)
    }
}

/// One message in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub guid: [u8; 32],
    pub origin: Origin,
    pub dst_chain: ChainId,
    pub receiver: Address,
    pub payload: Vec<u8>,
    pub options: ExecutionOptions,
    pub fee: MessagingFee,
}

type PathKey = (ChainId, Address, ChainId, Address);

#[derive(Default)]
struct ChannelState {
    receivers: HashMap<(ChainId, Address), Weak<dyn MessageReceiver>>,
    nonces: HashMap<PathKey, u64>,
    queue: VecDeque<Packet>,
    delivered: Vec<Packet>,
    fail_next_send: Option<String>,
    fees_paid: u128,
}

pub struct InMemoryChannel {
    schedule: FeeSchedule,
    state: Mutex<ChannelState>,
}

impl std::fmt::Debug for InMemoryChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("InMemoryChannel")
            .field("schedule", &self.schedule)
            .field("receivers", &state.receivers.len())
            .field("queued", &state.queue.len())
            .field("delivered", &state.delivered.len())
            .finish()
    }
}

impl Default for InMemoryChannel {
    fn default() -> Self {
        Self::new(FeeSchedule::default())
    }
}

impl InMemoryChannel {
    pub fn new(schedule: FeeSchedule) -> Self {
        Self {
            schedule,
            state: Mutex::new(ChannelState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn schedule(&self) -> FeeSchedule {
        self.schedule
    }

    /// Route packets for `address` on `chain_id` to `receiver`
    ///
    /// Only a weak reference is kept; a dropped receiver stops receiving.
    pub fn register<R: MessageReceiver + 'static>(
        &self,
        chain_id: ChainId,
        address: Address,
        receiver: &Arc<R>,
    ) {
        let receiver: Arc<dyn MessageReceiver> = receiver.clone();
        self.lock()
            .receivers
            .insert((chain_id, address), Arc::downgrade(&receiver));
    }

    /// Endpoint that sends as `address` on `chain_id`
    pub fn endpoint(self: &Arc<Self>, chain_id: ChainId, address: Address) -> ChannelEndpoint {
        ChannelEndpoint {
            channel: Arc::clone(self),
            chain_id,
            address,
        }
    }

    fn knows_chain(state: &ChannelState, chain_id: &ChainId) -> bool {
        state.receivers.keys().any(|(chain, _)| chain == chain_id)
    }

    fn quote_from(
        &self,
        dst_chain: ChainId,
        payload: &[u8],
        options: &ExecutionOptions,
    ) -> Result<MessagingFee, EndpointError> {
        if !Self::knows_chain(&self.lock(), &dst_chain) {
            return Err(EndpointError::UnknownDestination(dst_chain));
        }
        Ok(MessagingFee {
            native_fee: self.schedule.native_fee(payload.len(), options),
            token_fee: 0,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn send_from(
        &self,
        src_chain: ChainId,
        sender: Address,
        dst_chain: ChainId,
        receiver: &Address,
        payload: &[u8],
        options: &ExecutionOptions,
        fee_attached: u128,
    ) -> Result<MessagingReceipt, EndpointError> {
        let native_fee = self.schedule.native_fee(payload.len(), options);
        let mut state = self.lock();

        if let Some(reason) = state.fail_next_send.take() {
            return Err(EndpointError::DispatchFailed(reason));
        }
        if !Self::knows_chain(&state, &dst_chain) {
            return Err(EndpointError::UnknownDestination(dst_chain));
        }
        if fee_attached < native_fee {
            return Err(EndpointError::InsufficientFee {
                required: native_fee,
                attached: fee_attached,
            });
        }

        let nonce = {
            let entry = state
                .nonces
                .entry((src_chain, sender, dst_chain, *receiver))
                .or_insert(0);
            *entry += 1;
            *entry
        };
        let guid = compute_guid(nonce, &src_chain, &sender, &dst_chain, receiver);
        let fee = MessagingFee {
            native_fee: fee_attached,
            token_fee: 0,
        };

        state.queue.push_back(Packet {
            guid,
            origin: Origin {
                src_chain,
                sender,
                nonce,
            },
            dst_chain,
            receiver: *receiver,
            payload: payload.to_vec(),
            options: *options,
            fee,
        });
        state.fees_paid = state.fees_paid.saturating_add(fee_attached);

        debug!(
            guid = %bytes32_to_hex(&guid),
            src_chain = %src_chain,
            dst_chain = %dst_chain,
            nonce,
            fee = fee_attached,
            "Packet queued"
        );

        Ok(MessagingReceipt { guid, nonce, fee })
    }

    /// Hand `packet` to its receiver without holding the channel lock, so the
    /// receiver may send in turn
    fn dispatch(&self, packet: &Packet) -> bool {
        let receiver = self
            .lock()
            .receivers
            .get(&(packet.dst_chain, packet.receiver))
            .and_then(Weak::upgrade);

        match receiver {
            Some(receiver) => {
                receiver.receive(&packet.origin, &packet.guid, &packet.payload);
                true
            }
            None => {
                warn!(
                    guid = %bytes32_to_hex(&packet.guid),
                    dst_chain = %packet.dst_chain,
                    receiver = %packet.receiver,
                    "No live receiver for packet"
                );
                false
            }
        }
    }

    /// Deliver the oldest queued packet, returning its GUID
    ///
    /// A packet with no live receiver stays at the head of the queue and
    /// `None` is returned; it is retried once a receiver is registered.
    pub fn deliver_next(&self) -> Option<[u8; 32]> {
        let packet = self.lock().queue.pop_front()?;
        if !self.dispatch(&packet) {
            self.lock().queue.push_front(packet);
            return None;
        }
        let guid = packet.guid;
        self.lock().delivered.push(packet);
        Some(guid)
    }

    /// Deliver up to `max` queued packets in order
    pub fn deliver_batch(&self, max: usize) -> usize {
        let mut count = 0;
        while count < max && self.deliver_next().is_some() {
            count += 1;
        }
        count
    }

    /// Deliver until the queue is empty, including packets sent by receivers
    pub fn deliver_all(&self) -> usize {
        self.deliver_batch(usize::MAX)
    }

    /// Deliver an already delivered packet again
    pub fn replay(&self, guid: &[u8; 32]) -> bool {
        let packet = self
            .lock()
            .delivered
            .iter()
            .find(|p| p.guid == *guid)
            .cloned();
        match packet {
            Some(packet) => self.dispatch(&packet),
            None => false,
        }
    }

    /// Deliver a packet that was never sent, claiming to come from `origin`
    pub fn inject(
        &self,
        origin: Origin,
        dst_chain: ChainId,
        receiver: Address,
        payload: Vec<u8>,
    ) -> [u8; 32] {
        let guid = compute_guid(
            origin.nonce,
            &origin.src_chain,
            &origin.sender,
            &dst_chain,
            &receiver,
        );
        let packet = Packet {
            guid,
            origin,
            dst_chain,
            receiver,
            payload,
            options: ExecutionOptions::default(),
            fee: MessagingFee::default(),
        };
        self.dispatch(&packet);
        guid
    }

    /// Make the next send fail with `DispatchFailed(reason)`
    pub fn fail_next_send(&self, reason: impl Into<String>) {
        self.lock().fail_next_send = Some(reason.into());
    }

    /// Number of queued, undelivered packets
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    /// Copy of the queued packets, oldest first
    pub fn queued(&self) -> Vec<Packet> {
        self.lock().queue.iter().cloned().collect()
    }

    /// Packets delivered so far, oldest first
    pub fn delivered(&self) -> Vec<Packet> {
        self.lock().delivered.clone()
    }

    /// Total native value attached to successful sends
    pub fn fees_paid(&self) -> u128 {
        self.lock().fees_paid
    }
}

/// [`MessageEndpointClient`] bound to one escrow on one chain
#[derive(Debug, Clone)]
pub struct ChannelEndpoint {
    channel: Arc<InMemoryChannel>,
    chain_id: ChainId,
    address: Address,
}

impl ChannelEndpoint {
    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

impl FeeQuoter for ChannelEndpoint {
    fn quote(
        &self,
        dst_chain: ChainId,
        payload: &[u8],
        options: &ExecutionOptions,
    ) -> Result<MessagingFee, EndpointError> {
        self.channel.quote_from(dst_chain, payload, options)
    }
}

impl MessageEndpointClient for ChannelEndpoint {
    fn send(
        &self,
        dst_chain: ChainId,
        receiver: &Address,
        payload: &[u8],
        options: &ExecutionOptions,
        fee_attached: u128,
    ) -> Result<MessagingReceipt, EndpointError> {
        self.channel.send_from(
            self.chain_id,
            self.address,
            dst_chain,
            receiver,
            payload,
            options,
            fee_attached,
        )
    }
}
