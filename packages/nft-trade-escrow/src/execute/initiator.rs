//! Initiating-chain handlers (Propose, LockConfirmation, Fulfill).
//!
//! The initiator puts an asset into custody and announces the trade with an
//! `Interest`. Once the destination confirms the desired asset is locked, the
//! initiator fulfills: the offered asset goes to the counterparty and a
//! `FulfillNotice` tells the destination to release the other side.

use crate::error::EscrowError;
use crate::escrow::{
    DropReason, FulfillResponse, InboundOutcome, ProposeResponse, ProposeTrade, TradeEscrow,
};
use crate::hash::compute_trade_id;
use crate::interfaces::{MessagingFee, Origin};
use crate::msg::{FulfillNotice, Interest, LockConfirmation, TradeMessage};
use crate::options::ExecutionOptions;
use crate::types::{Address, ChainId, MessageInfo, Trade, TradeState};

fn interest_payload(sequence: u64, initiator: &Address, params: &ProposeTrade) -> Vec<u8> {
    TradeMessage::Interest(Interest {
        sequence,
        initiator: *initiator,
        offered: params.offered,
        desired: params.desired,
        counterparty_hint: params.counterparty_hint,
    })
    .encode()
}

/// A zero hint means "anyone may lock in"
fn normalize_hint(hint: Option<Address>) -> Option<Address> {
    hint.filter(|h| !h.is_zero())
}

/// Execute handler for proposing a trade
///
/// Takes custody of `offered` and sends an `Interest` to the peer on
/// `remote_chain`.
pub fn execute_propose_trade(
    escrow: &mut TradeEscrow,
    info: &MessageInfo,
    mut params: ProposeTrade,
) -> Result<ProposeResponse, EscrowError> {
    let initiator = info.sender;
    let remote_chain = params.remote_chain;
    params.counterparty_hint = normalize_hint(params.counterparty_hint);

    // One active trade per initiator
    if let Some(existing) = escrow.ledger.trade(&initiator) {
        return Err(EscrowError::DuplicateTrade {
            initiator,
            remote_chain: existing.remote_chain,
        });
    }

    let peer = escrow.peers.require(&remote_chain)?;
    params.options.validate()?;
    escrow.check_custody_preconditions(&initiator, &params.offered)?;

    let sequence = escrow.ledger.next_sequence(&initiator);
    let payload = interest_payload(sequence, &initiator, &params);
    escrow.check_fee(info, remote_chain, &payload, &params.options)?;

    // Custody first, the Interest last: a send cannot be taken back
    escrow.take_custody(&params.offered, &initiator)?;
    let receipt = match escrow.send(info, remote_chain, &peer, &payload, &params.options) {
        Ok(receipt) => receipt,
        Err(e) => {
            escrow.return_custody(&params.offered, &initiator, &e);
            return Err(e);
        }
    };

    escrow.ledger.advance_sequence(&initiator);
    let trade_id = compute_trade_id(&escrow.config.chain_id, &remote_chain, &initiator, sequence);
    escrow.ledger.insert_trade(Trade {
        id: trade_id,
        initiator,
        sequence,
        offered: params.offered,
        desired: params.desired,
        remote_chain,
        counterparty: None,
        counterparty_hint: params.counterparty_hint,
        state: TradeState::Proposed,
    })?;
    escrow.stats.trades_proposed += 1;

    tracing::info!(
        trade_id = %trade_id,
        initiator = %initiator,
        sequence,
        offered = %params.offered,
        desired = %params.desired,
        remote_chain = %remote_chain,
        nonce = receipt.nonce,
        "Trade proposed"
    );

    Ok(ProposeResponse {
        trade_id,
        sequence,
        receipt,
    })
}

pub fn quote_propose_trade(
    escrow: &TradeEscrow,
    initiator: &Address,
    params: &ProposeTrade,
) -> Result<MessagingFee, EscrowError> {
    params.options.validate()?;
    let mut params = params.clone();
    params.counterparty_hint = normalize_hint(params.counterparty_hint);

    let sequence = escrow.ledger.next_sequence(initiator);
    let payload = interest_payload(sequence, initiator, &params);
    Ok(escrow
        .endpoint
        .quote(params.remote_chain, &payload, &params.options)?)
}

/// Trade of `initiator` bound for `remote_chain` that may be fulfilled, with
/// its counterparty
///
/// A `Fulfilled` record has already released its asset and still owes the
/// remote chain its `FulfillNotice`.
fn fulfillable_trade(
    escrow: &TradeEscrow,
    initiator: &Address,
    remote_chain: ChainId,
) -> Result<(Trade, Address), EscrowError> {
    let trade = escrow
        .ledger
        .trade(initiator)
        .cloned()
        .ok_or_else(|| EscrowError::invalid_state("no active trade for caller"))?;

    if trade.remote_chain != remote_chain {
        return Err(EscrowError::invalid_state(format!(
            "trade targets chain {}, not {}",
            trade.remote_chain, remote_chain
        )));
    }
    if !matches!(trade.state, TradeState::Locked | TradeState::Fulfilled) {
        return Err(EscrowError::unexpected_trade_state(
            TradeState::Locked,
            trade.state,
        ));
    }
    let counterparty = trade
        .counterparty
        .ok_or_else(|| EscrowError::invalid_state("locked trade has no counterparty"))?;
    Ok((trade, counterparty))
}

fn fulfill_payload(trade: &Trade, counterparty: &Address) -> Vec<u8> {
    TradeMessage::FulfillNotice(FulfillNotice {
        sequence: trade.sequence,
        initiator: trade.initiator,
        counterparty: *counterparty,
    })
    .encode()
}

/// Execute handler for fulfilling a locked trade
///
/// Releases the offered asset to the counterparty, notifies the destination
/// and clears the trade. If the notice cannot be sent after the release, the
/// trade is kept as `Fulfilled` and calling again only resends the notice.
pub fn execute_fulfill_trade(
    escrow: &mut TradeEscrow,
    info: &MessageInfo,
    remote_chain: ChainId,
    options: ExecutionOptions,
) -> Result<FulfillResponse, EscrowError> {
    let initiator = info.sender;
    let (trade, counterparty) = fulfillable_trade(escrow, &initiator, remote_chain)?;

    let peer = escrow.peers.require(&remote_chain)?;
    options.validate()?;

    let payload = fulfill_payload(&trade, &counterparty);
    escrow.check_fee(info, remote_chain, &payload, &options)?;

    if trade.state == TradeState::Locked {
        let escrow_address = escrow.config.escrow_address;
        let holder = escrow.custodian.owner_of(&trade.offered)?;
        if holder != escrow_address {
            return Err(EscrowError::invalid_state(format!(
                "escrow does not hold {} (owner {})",
                trade.offered, holder
            )));
        }
        escrow.custodian.transfer_from(
            &escrow_address,
            &trade.offered,
            &escrow_address,
            &counterparty,
        )?;
        if let Some(record) = escrow.ledger.trade_mut(&initiator) {
            record.state = TradeState::Fulfilled;
        }
    }

    let receipt = match escrow.send(info, remote_chain, &peer, &payload, &options) {
        Ok(receipt) => receipt,
        Err(e) => {
            tracing::error!(
                trade_id = %trade.id,
                asset = %trade.offered,
                counterparty = %counterparty,
                error = %e,
                "FulfillNotice not sent after release; trade kept for resend"
            );
            return Err(e);
        }
    };

    escrow.ledger.remove_trade(&initiator);
    escrow.stats.trades_fulfilled += 1;

    tracing::info!(
        trade_id = %trade.id,
        initiator = %initiator,
        counterparty = %counterparty,
        asset = %trade.offered,
        state = %TradeState::Fulfilled,
        nonce = receipt.nonce,
        "Trade fulfilled"
    );

    Ok(FulfillResponse {
        trade_id: trade.id,
        counterparty,
        receipt,
    })
}

pub fn quote_fulfill_trade(
    escrow: &TradeEscrow,
    initiator: &Address,
    remote_chain: ChainId,
    options: &ExecutionOptions,
) -> Result<MessagingFee, EscrowError> {
    options.validate()?;
    let (trade, counterparty) = fulfillable_trade(escrow, initiator, remote_chain)?;
    let payload = fulfill_payload(&trade, &counterparty);
    Ok(escrow.endpoint.quote(remote_chain, &payload, options)?)
}

/// Inbound `LockConfirmation`: the desired asset is locked on the remote chain
pub(super) fn handle_lock_confirmation(
    escrow: &mut TradeEscrow,
    origin: &Origin,
    msg: LockConfirmation,
) -> Result<InboundOutcome, DropReason> {
    let trade = escrow
        .ledger
        .trade_mut(&msg.initiator)
        .ok_or(DropReason::NoMatchingRecord)?;

    if trade.remote_chain != origin.src_chain {
        return Err(DropReason::NoMatchingRecord);
    }
    if msg.sequence < trade.sequence {
        return Err(DropReason::StaleSequence);
    }
    if msg.sequence != trade.sequence {
        return Err(DropReason::NoMatchingRecord);
    }
    if trade.state != TradeState::Proposed {
        return Err(DropReason::UnexpectedState);
    }
    if msg.locked != trade.desired {
        return Err(DropReason::AssetMismatch);
    }
    if trade
        .counterparty_hint
        .is_some_and(|hint| hint != msg.counterparty)
    {
        return Err(DropReason::CounterpartyMismatch);
    }

    trade.counterparty = Some(msg.counterparty);
    trade.state = TradeState::Locked;
    let trade_id = trade.id;
    escrow.stats.trades_locked += 1;

    tracing::info!(
        trade_id = %trade_id,
        initiator = %msg.initiator,
        counterparty = %msg.counterparty,
        locked = %msg.locked,
        "Trade locked"
    );

    Ok(InboundOutcome::TradeLocked { trade_id })
}
