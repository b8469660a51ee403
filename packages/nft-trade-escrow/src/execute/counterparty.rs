//! Destination-chain handlers (Interest, LockIn, FulfillNotice).
//!
//! An inbound `Interest` is cached until a holder of the desired asset locks
//! it in. The locked asset stays in custody until the initiator's
//! `FulfillNotice` arrives, then goes to the initiator.

use crate::error::EscrowError;
use crate::escrow::{DropReason, InboundOutcome, LockInInterest, LockInResponse, TradeEscrow};
use crate::hash::compute_trade_id;
use crate::interfaces::{MessagingFee, Origin};
use crate::ledger::CommitmentKey;
use crate::msg::{FulfillNotice, Interest, LockConfirmation, TradeMessage};
use crate::types::{
    Address, CommitmentState, CounterpartyCommitment, MessageInfo, PendingInterest,
};

/// Inbound `Interest`: cache it for lock-in
pub(super) fn handle_interest(
    escrow: &mut TradeEscrow,
    origin: &Origin,
    msg: Interest,
) -> Result<InboundOutcome, DropReason> {
    let key = CommitmentKey::new(msg.initiator, origin.src_chain);
    if !escrow.ledger.observe_inbound_sequence(key, msg.sequence) {
        return Err(DropReason::StaleSequence);
    }

    let trade_id = compute_trade_id(
        &origin.src_chain,
        &escrow.config.chain_id,
        &msg.initiator,
        msg.sequence,
    );
    let replaced = escrow.ledger.cache_interest(PendingInterest {
        id: trade_id,
        initiator: msg.initiator,
        remote_chain: origin.src_chain,
        sequence: msg.sequence,
        offered: msg.offered,
        desired: msg.desired,
        counterparty_hint: msg.counterparty_hint,
    });
    if let Some(old) = replaced {
        tracing::debug!(
            initiator = %msg.initiator,
            old_sequence = old.sequence,
            new_sequence = msg.sequence,
            "Replaced cached interest"
        );
    }

    tracing::info!(
        trade_id = %trade_id,
        initiator = %msg.initiator,
        src_chain = %origin.src_chain,
        sequence = msg.sequence,
        offered = %msg.offered,
        desired = %msg.desired,
        "Interest cached"
    );

    Ok(InboundOutcome::InterestCached { trade_id })
}

fn lock_confirmation_payload(
    interest: &PendingInterest,
    committer: &Address,
    params: &LockInInterest,
) -> Vec<u8> {
    TradeMessage::LockConfirmation(LockConfirmation {
        sequence: interest.sequence,
        initiator: interest.initiator,
        counterparty: *committer,
        locked: params.locked,
    })
    .encode()
}

fn pending_interest(
    escrow: &TradeEscrow,
    key: &CommitmentKey,
) -> Result<PendingInterest, EscrowError> {
    escrow.ledger.interest(key).cloned().ok_or_else(|| {
        EscrowError::invalid_state(format!(
            "no pending interest from {} on chain {}",
            key.initiator, key.remote_chain
        ))
    })
}

/// Execute handler for locking an asset against a cached interest
///
/// Takes custody of `locked`, records the commitment and confirms back to the
/// initiating chain.
pub fn execute_lock_in_interest(
    escrow: &mut TradeEscrow,
    info: &MessageInfo,
    params: LockInInterest,
) -> Result<LockInResponse, EscrowError> {
    let committer = info.sender;
    let key = CommitmentKey::new(params.initiator, params.remote_chain);

    // One commitment per (initiator, chain)
    if escrow.ledger.has_commitment(&key) {
        return Err(EscrowError::DuplicateTrade {
            initiator: key.initiator,
            remote_chain: key.remote_chain,
        });
    }

    let interest = pending_interest(escrow, &key)?;
    if params.locked != interest.desired {
        return Err(EscrowError::AssetMismatch {
            expected: interest.desired,
            got: params.locked,
        });
    }
    if let Some(expected) = interest.counterparty_hint {
        if expected != committer {
            return Err(EscrowError::UnexpectedCounterparty {
                expected,
                caller: committer,
            });
        }
    }

    let peer = escrow.peers.require(&params.remote_chain)?;
    params.options.validate()?;
    escrow.check_custody_preconditions(&committer, &params.locked)?;

    let payload = lock_confirmation_payload(&interest, &committer, &params);
    escrow.check_fee(info, params.remote_chain, &payload, &params.options)?;

    // The confirmation goes out only once the asset is held
    escrow.take_custody(&params.locked, &committer)?;
    let receipt = match escrow.send(
        info,
        params.remote_chain,
        &peer,
        &payload,
        &params.options,
    ) {
        Ok(receipt) => receipt,
        Err(e) => {
            escrow.return_custody(&params.locked, &committer, &e);
            return Err(e);
        }
    };

    escrow.ledger.take_interest(&key);
    escrow.ledger.insert_commitment(CounterpartyCommitment {
        id: interest.id,
        initiator: interest.initiator,
        remote_chain: interest.remote_chain,
        sequence: interest.sequence,
        locked: params.locked,
        committer,
        state: CommitmentState::Committed,
    })?;
    escrow.stats.commitments_created += 1;

    tracing::info!(
        trade_id = %interest.id,
        initiator = %interest.initiator,
        committer = %committer,
        locked = %params.locked,
        remote_chain = %params.remote_chain,
        nonce = receipt.nonce,
        "Interest locked in"
    );

    Ok(LockInResponse {
        trade_id: interest.id,
        initiator: interest.initiator,
        remote_chain: interest.remote_chain,
        receipt,
    })
}

pub fn quote_lock_in(
    escrow: &TradeEscrow,
    committer: &Address,
    params: &LockInInterest,
) -> Result<MessagingFee, EscrowError> {
    params.options.validate()?;
    let key = CommitmentKey::new(params.initiator, params.remote_chain);
    let interest = pending_interest(escrow, &key)?;
    let payload = lock_confirmation_payload(&interest, committer, params);
    Ok(escrow
        .endpoint
        .quote(params.remote_chain, &payload, &params.options)?)
}

/// Inbound `FulfillNotice`: release the locked asset to the initiator
pub(super) fn handle_fulfill_notice(
    escrow: &mut TradeEscrow,
    origin: &Origin,
    msg: FulfillNotice,
) -> Result<InboundOutcome, DropReason> {
    let key = CommitmentKey::new(msg.initiator, origin.src_chain);
    let commitment = escrow
        .ledger
        .commitment(&key)
        .cloned()
        .ok_or(DropReason::NoMatchingRecord)?;

    if msg.sequence < commitment.sequence {
        return Err(DropReason::StaleSequence);
    }
    if msg.sequence != commitment.sequence {
        return Err(DropReason::NoMatchingRecord);
    }
    if commitment.state != CommitmentState::Committed {
        return Err(DropReason::UnexpectedState);
    }
    if msg.counterparty != commitment.committer {
        return Err(DropReason::CounterpartyMismatch);
    }

    let escrow_address = escrow.config.escrow_address;
    if let Err(e) = escrow.custodian.transfer_from(
        &escrow_address,
        &commitment.locked,
        &escrow_address,
        &commitment.initiator,
    ) {
        tracing::error!(
            trade_id = %commitment.id,
            asset = %commitment.locked,
            initiator = %commitment.initiator,
            error = %e,
            "Release to initiator failed; commitment kept"
        );
        return Err(DropReason::CustodyFailed);
    }

    escrow.ledger.remove_commitment(&key);
    escrow.stats.commitments_released += 1;

    tracing::info!(
        trade_id = %commitment.id,
        initiator = %commitment.initiator,
        committer = %commitment.committer,
        asset = %commitment.locked,
        state = %CommitmentState::Released,
        "Commitment released"
    );

    Ok(InboundOutcome::CommitmentReleased {
        trade_id: commitment.id,
    })
}
