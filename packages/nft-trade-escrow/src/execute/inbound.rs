//! Inbound message handling.

use crate::escrow::{DropReason, InboundOutcome, TradeEscrow};
use crate::hash::bytes32_to_hex;
use crate::interfaces::Origin;
use crate::msg::TradeMessage;

use super::counterparty::{handle_fulfill_notice, handle_interest};
use super::initiator::handle_lock_confirmation;

/// Authenticate the sender, decode the payload and apply it
///
/// Never fails: anything that cannot be applied is dropped, counted and
/// logged, so redelivery by the transport is harmless.
pub fn handle_message(
    escrow: &mut TradeEscrow,
    origin: &Origin,
    guid: &[u8; 32],
    payload: &[u8],
) -> InboundOutcome {
    if !escrow.peers.is_peer(origin) {
        tracing::warn!(
            guid = %bytes32_to_hex(guid),
            src_chain = %origin.src_chain,
            sender = %origin.sender,
            reason = %DropReason::UnauthorizedSender,
            "Dropping inbound message"
        );
        return escrow.record_drop(DropReason::UnauthorizedSender);
    }

    let message = match TradeMessage::decode(payload) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(
                guid = %bytes32_to_hex(guid),
                src_chain = %origin.src_chain,
                error = %e,
                reason = %DropReason::MalformedPayload,
                "Dropping inbound message"
            );
            return escrow.record_drop(DropReason::MalformedPayload);
        }
    };

    let kind = message.kind();
    let sequence = message.sequence();
    let initiator = *message.initiator();
    tracing::debug!(
        guid = %bytes32_to_hex(guid),
        src_chain = %origin.src_chain,
        nonce = origin.nonce,
        kind = kind.as_str(),
        sequence,
        initiator = %initiator,
        "Inbound message"
    );

    let result = match message {
        TradeMessage::Interest(msg) => handle_interest(escrow, origin, msg),
        TradeMessage::LockConfirmation(msg) => handle_lock_confirmation(escrow, origin, msg),
        TradeMessage::FulfillNotice(msg) => handle_fulfill_notice(escrow, origin, msg),
    };

    match result {
        Ok(outcome) => outcome,
        Err(reason) => {
            tracing::warn!(
                guid = %bytes32_to_hex(guid),
                src_chain = %origin.src_chain,
                kind = kind.as_str(),
                sequence,
                initiator = %initiator,
                reason = %reason,
                "Dropping inbound message"
            );
            escrow.record_drop(reason)
        }
    }
}
