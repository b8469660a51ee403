//! Hash computation for trade IDs and packet GUIDs
//!
//! Both layouts are `abi.encodePacked` style: fixed-width big-endian fields,
//! no padding between them.

use tiny_keccak::{Hasher, Keccak};

use crate::types::{Address, ChainId, TradeId};

/// Compute keccak256 hash of data
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// Compute the ID of a trade
///
/// ```text
/// keccak256(srcChain(4) | dstChain(4) | initiator(32) | sequence(8))
/// ```
///
/// `src_chain` is always the initiating chain, so the initiating escrow and
/// the destination escrow derive the same ID for the same trade.
pub fn compute_trade_id(
    src_chain: &ChainId,
    dst_chain: &ChainId,
    initiator: &Address,
    sequence: u64,
) -> TradeId {
    // 4 + 4 + 32 + 8 = 48 bytes
    let mut data = [0u8; 48];
    data[0..4].copy_from_slice(src_chain.as_bytes());
    data[4..8].copy_from_slice(dst_chain.as_bytes());
    data[8..40].copy_from_slice(initiator.as_bytes());
    data[40..48].copy_from_slice(&sequence.to_be_bytes());
    TradeId(keccak256(&data))
}

/// Compute the GUID of a packet on a channel path
///
/// ```text
/// keccak256(nonce(8) | srcChain(4) | sender(32) | dstChain(4) | receiver(32))
/// ```
pub fn compute_guid(
    nonce: u64,
    src_chain: &ChainId,
    sender: &Address,
    dst_chain: &ChainId,
    receiver: &Address,
) -> [u8; 32] {
    // 8 + 4 + 32 + 4 + 32 = 80 bytes
    let mut data = [0u8; 80];
    data[0..8].copy_from_slice(&nonce.to_be_bytes());
    data[8..12].copy_from_slice(src_chain.as_bytes());
    data[12..44].copy_from_slice(sender.as_bytes());
    data[44..48].copy_from_slice(dst_chain.as_bytes());
    data[48..80].copy_from_slice(receiver.as_bytes());
    keccak256(&data)
}

/// Convert bytes to hex string with 0x prefix
pub fn bytes32_to_hex(bytes: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}
