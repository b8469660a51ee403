//! Executor options (the gas-execution budget attached to a message)
//!
//! Options use the "type 3" executor layout:
//!
//! ```text
//! | type = 0x0003 (2) | worker = 0x01 (1) | size (2) | option = 0x01 (1) | gas (16) [| value (16)] |
//! ```
//!
//! `size` counts the option byte plus its data, so a gas-only option has
//! size `0x11` and a gas-plus-value option has size `0x21`. Repeated
//! lzReceive options are summed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Options type understood by this module
pub const OPTIONS_TYPE_3: u16 = 3;

/// Worker ID of the executor
pub const EXECUTOR_WORKER_ID: u8 = 1;

/// Executor option: gas (and optional value) for the receive call
pub const OPTION_TYPE_LZRECEIVE: u8 = 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionsError {
    #[error("Unsupported options type: {0}")]
    UnsupportedType(u16),

    #[error("Options truncated at byte {offset}")]
    Truncated { offset: usize },

    #[error("Unsupported worker: {0}")]
    UnsupportedWorker(u8),

    #[error("Unsupported executor option: {0}")]
    UnsupportedOption(u8),

    #[error("Invalid executor option size: {0}")]
    InvalidSize(u16),

    #[error("Gas limit must be greater than zero")]
    ZeroGas,

    #[error("Invalid hex: {0}")]
    InvalidHex(String),
}

/// Gas and value the executor must supply when delivering a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionOptions {
    /// Gas budget for executing the receive handler on the destination chain
    pub gas_limit: u128,
    /// Native value forwarded with the receive call
    pub msg_value: u128,
}

impl ExecutionOptions {
    /// Options carrying only a gas budget
    pub fn lz_receive(gas_limit: u128) -> Self {
        Self {
            gas_limit,
            msg_value: 0,
        }
    }

    /// Reject budgets the executor could never honour
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.gas_limit == 0 {
            return Err(OptionsError::ZeroGas);
        }
        Ok(())
    }

    /// Encode as type 3 options bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(38);
        out.extend_from_slice(&OPTIONS_TYPE_3.to_be_bytes());
        out.push(EXECUTOR_WORKER_ID);

        let size: u16 = if self.msg_value == 0 { 17 } else { 33 };
        out.extend_from_slice(&size.to_be_bytes());
        out.push(OPTION_TYPE_LZRECEIVE);
        out.extend_from_slice(&self.gas_limit.to_be_bytes());
        if self.msg_value != 0 {
            out.extend_from_slice(&self.msg_value.to_be_bytes());
        }
        out
    }

    /// Decode type 3 options bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, OptionsError> {
        let header = bytes
            .get(0..2)
            .ok_or(OptionsError::Truncated { offset: 0 })?;
        let options_type = u16::from_be_bytes([header[0], header[1]]);
        if options_type != OPTIONS_TYPE_3 {
            return Err(OptionsError::UnsupportedType(options_type));
        }

        let mut result = ExecutionOptions::default();
        let mut cursor = 2;
        while cursor < bytes.len() {
            let worker = bytes[cursor];
            if worker != EXECUTOR_WORKER_ID {
                return Err(OptionsError::UnsupportedWorker(worker));
            }
            let size_bytes = bytes
                .get(cursor + 1..cursor + 3)
                .ok_or(OptionsError::Truncated { offset: cursor + 1 })?;
            let size = u16::from_be_bytes([size_bytes[0], size_bytes[1]]);
            let body_start = cursor + 3;
            let body = bytes
                .get(body_start..body_start + size as usize)
                .ok_or(OptionsError::Truncated { offset: body_start })?;

            match body.first() {
                Some(&OPTION_TYPE_LZRECEIVE) => {}
                Some(&other) => return Err(OptionsError::UnsupportedOption(other)),
                None => return Err(OptionsError::InvalidSize(size)),
            }
            match size {
                17 => {
                    result.gas_limit = result.gas_limit.saturating_add(read_u128(&body[1..17]));
                }
                33 => {
                    result.gas_limit = result.gas_limit.saturating_add(read_u128(&body[1..17]));
                    result.msg_value = result.msg_value.saturating_add(read_u128(&body[17..33]));
                }
                other => return Err(OptionsError::InvalidSize(other)),
            }

            cursor = body_start + size as usize;
        }

        Ok(result)
    }

    /// Decode from a hex string (with or without 0x prefix)
    pub fn from_hex(hex: &str) -> Result<Self, OptionsError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes = hex::decode(hex).map_err(|e| OptionsError::InvalidHex(e.to_string()))?;
        Self::decode(&bytes)
    }

    /// Encode as hex string with 0x prefix
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.encode()))
    }
}

fn read_u128(bytes: &[u8]) -> u128 {
    let mut buf = [0u8; 16];
    buf.copy_from_slice(bytes);
    u128::from_be_bytes(buf)
}
