//! Cross-chain message payloads
//!
//! ## Wire Format
//!
//! Every payload is a sequence of 32-byte big-endian words:
//!
//! ```text
//! | kind | sequence | fields... |
//! ```
//!
//! | Kind | Tag | Fields after `sequence`                                          | Words |
//! |------|-----|------------------------------------------------------------------|-------|
//! | Interest         | 1 | initiator, offered (2), desired (2), counterparty hint | 8 |
//! | LockConfirmation | 2 | initiator, counterparty, locked (2)                    | 6 |
//! | FulfillNotice    | 3 | initiator, counterparty                                | 4 |
//!
//! An asset takes two words: collection address, then token ID. A missing
//! counterparty hint is encoded as the zero address.

use thiserror::Error;

use crate::types::{Address, AssetRef};

/// Size of one encoded word
pub const WORD: usize = 32;

/// Message decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Empty payload")]
    Empty,

    #[error("Unknown message kind: {0}")]
    UnknownKind(u64),

    #[error("Invalid payload length for {kind}: expected {expected} bytes, got {got}")]
    InvalidLength {
        kind: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Non-canonical encoding in word {index}")]
    NonCanonical { index: usize },
}

/// Message kind tag (word 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Interest,
    LockConfirmation,
    FulfillNotice,
}

impl MessageKind {
    pub fn tag(&self) -> u8 {
        match self {
            MessageKind::Interest => 1,
            MessageKind::LockConfirmation => 2,
            MessageKind::FulfillNotice => 3,
        }
    }

    pub fn from_tag(tag: u64) -> Result<Self, CodecError> {
        match tag {
            1 => Ok(MessageKind::Interest),
            2 => Ok(MessageKind::LockConfirmation),
            3 => Ok(MessageKind::FulfillNotice),
            other => Err(CodecError::UnknownKind(other)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Interest => "interest",
            MessageKind::LockConfirmation => "lock_confirmation",
            MessageKind::FulfillNotice => "fulfill_notice",
        }
    }

    /// Total encoded length in bytes
    pub fn encoded_len(&self) -> usize {
        let words = match self {
            MessageKind::Interest => 8,
            MessageKind::LockConfirmation => 6,
            MessageKind::FulfillNotice => 4,
        };
        words * WORD
    }
}

/// A trade was proposed; the offered asset is in custody on the sending chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interest {
    pub sequence: u64,
    pub initiator: Address,
    pub offered: AssetRef,
    pub desired: AssetRef,
    pub counterparty_hint: Option<Address>,
}

/// The desired asset was locked on the sending chain by `counterparty`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockConfirmation {
    pub sequence: u64,
    pub initiator: Address,
    pub counterparty: Address,
    pub locked: AssetRef,
}

/// The initiator released the offered asset to `counterparty`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillNotice {
    pub sequence: u64,
    pub initiator: Address,
    pub counterparty: Address,
}

/// Any message exchanged between two escrow peers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeMessage {
    Interest(Interest),
    LockConfirmation(LockConfirmation),
    FulfillNotice(FulfillNotice),
}

impl TradeMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            TradeMessage::Interest(_) => MessageKind::Interest,
            TradeMessage::LockConfirmation(_) => MessageKind::LockConfirmation,
            TradeMessage::FulfillNotice(_) => MessageKind::FulfillNotice,
        }
    }

    pub fn sequence(&self) -> u64 {
        match self {
            TradeMessage::Interest(m) => m.sequence,
            TradeMessage::LockConfirmation(m) => m.sequence,
            TradeMessage::FulfillNotice(m) => m.sequence,
        }
    }

    pub fn initiator(&self) -> &Address {
        match self {
            TradeMessage::Interest(m) => &m.initiator,
            TradeMessage::LockConfirmation(m) => &m.initiator,
            TradeMessage::FulfillNotice(m) => &m.initiator,
        }
    }

    /// Encode into the wire format
    pub fn encode(&self) -> Vec<u8> {
        let kind = self.kind();
        let mut out = Vec::with_capacity(kind.encoded_len());
        put_uint(&mut out, kind.tag() as u128);
        put_uint(&mut out, self.sequence() as u128);

        match self {
            TradeMessage::Interest(m) => {
                put_address(&mut out, &m.initiator);
                put_asset(&mut out, &m.offered);
                put_asset(&mut out, &m.desired);
                put_address(&mut out, &m.counterparty_hint.unwrap_or(Address::ZERO));
            }
            TradeMessage::LockConfirmation(m) => {
                put_address(&mut out, &m.initiator);
                put_address(&mut out, &m.counterparty);
                put_asset(&mut out, &m.locked);
            }
            TradeMessage::FulfillNotice(m) => {
                put_address(&mut out, &m.initiator);
                put_address(&mut out, &m.counterparty);
            }
        }

        debug_assert_eq!(out.len(), kind.encoded_len());
        out
    }

    /// Decode from the wire format, consuming the payload entirely
    pub fn decode(payload: &[u8]) -> Result<Self, CodecError> {
        if payload.is_empty() {
            return Err(CodecError::Empty);
        }
        if payload.len() < WORD {
            return Err(CodecError::InvalidLength {
                kind: "header",
                expected: WORD,
                got: payload.len(),
            });
        }

        let mut reader = WordReader::new(payload);
        let kind = MessageKind::from_tag(reader.uint(8)? as u64)?;
        if payload.len() != kind.encoded_len() {
            return Err(CodecError::InvalidLength {
                kind: kind.as_str(),
                expected: kind.encoded_len(),
                got: payload.len(),
            });
        }
        let sequence = reader.uint(64)? as u64;

        let message = match kind {
            MessageKind::Interest => {
                let initiator = reader.address();
                let offered = reader.asset()?;
                let desired = reader.asset()?;
                let hint = reader.address();
                TradeMessage::Interest(Interest {
                    sequence,
                    initiator,
                    offered,
                    desired,
                    counterparty_hint: (!hint.is_zero()).then_some(hint),
                })
            }
            MessageKind::LockConfirmation => TradeMessage::LockConfirmation(LockConfirmation {
                sequence,
                initiator: reader.address(),
                counterparty: reader.address(),
                locked: reader.asset()?,
            }),
            MessageKind::FulfillNotice => TradeMessage::FulfillNotice(FulfillNotice {
                sequence,
                initiator: reader.address(),
                counterparty: reader.address(),
            }),
        };

        Ok(message)
    }
}

// ============================================================================
// Word helpers
// ============================================================================

fn put_uint(out: &mut Vec<u8>, value: u128) {
    out.extend_from_slice(&[0u8; 16]);
    out.extend_from_slice(&value.to_be_bytes());
}

fn put_address(out: &mut Vec<u8>, address: &Address) {
    out.extend_from_slice(address.as_bytes());
}

fn put_asset(out: &mut Vec<u8>, asset: &AssetRef) {
    put_address(out, &asset.collection);
    put_uint(out, asset.token_id);
}

/// Sequential reader over a payload whose length was already checked
struct WordReader<'a> {
    payload: &'a [u8],
    index: usize,
}

impl<'a> WordReader<'a> {
    fn new(payload: &'a [u8]) -> Self {
        Self { payload, index: 0 }
    }

    fn next_word(&mut self) -> [u8; 32] {
        let start = self.index * WORD;
        let mut word = [0u8; 32];
        word.copy_from_slice(&self.payload[start..start + WORD]);
        self.index += 1;
        word
    }

    /// Read an unsigned integer that must fit in `bits` bits
    fn uint(&mut self, bits: u32) -> Result<u128, CodecError> {
        let index = self.index;
        let word = self.next_word();
        let value_bytes = (bits / 8) as usize;
        if word[..WORD - value_bytes].iter().any(|&b| b != 0) {
            return Err(CodecError::NonCanonical { index });
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&word[16..]);
        Ok(u128::from_be_bytes(low))
    }

    fn address(&mut self) -> Address {
        Address(self.next_word())
    }

    fn asset(&mut self) -> Result<AssetRef, CodecError> {
        let collection = self.address();
        let token_id = self.uint(128)?;
        Ok(AssetRef::new(collection, token_id))
    }
}
