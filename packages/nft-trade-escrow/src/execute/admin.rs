//! Admin handlers.

use crate::error::EscrowError;
use crate::escrow::TradeEscrow;
use crate::types::{Address, ChainId, MessageInfo};

fn ensure_admin(escrow: &TradeEscrow, info: &MessageInfo) -> Result<(), EscrowError> {
    if info.sender != escrow.config.admin {
        return Err(EscrowError::Unauthorized);
    }
    Ok(())
}

/// Bind a remote chain to its escrow, returning the previous binding
pub fn execute_set_peer(
    escrow: &mut TradeEscrow,
    info: &MessageInfo,
    chain_id: ChainId,
    peer: Address,
) -> Result<Option<Address>, EscrowError> {
    ensure_admin(escrow, info)?;

    if chain_id == escrow.config.chain_id {
        return Err(EscrowError::invalid_state(
            "cannot register a peer on the local chain",
        ));
    }

    let previous = escrow.peers.set(chain_id, peer);
    if peer.is_zero() {
        tracing::info!(chain_id = %chain_id, "Peer removed");
    } else {
        tracing::info!(
            chain_id = %chain_id,
            peer = %peer,
            previous = ?previous.map(|p| p.to_string()),
            "Peer set"
        );
    }
    Ok(previous)
}

pub fn execute_transfer_admin(
    escrow: &mut TradeEscrow,
    info: &MessageInfo,
    new_admin: Address,
) -> Result<(), EscrowError> {
    ensure_admin(escrow, info)?;

    if new_admin.is_zero() {
        return Err(EscrowError::invalid_state(
            "admin cannot be the zero address",
        ));
    }

    tracing::info!(
        old_admin = %escrow.config.admin,
        new_admin = %new_admin,
        "Admin transferred"
    );
    escrow.config.admin = new_admin;
    Ok(())
}
