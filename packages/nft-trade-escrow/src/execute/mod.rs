//! Execute handlers for the trade escrow
//!
//! Organized by role:
//! - `admin` - peer management and admin transfer
//! - `initiator` - propose, fulfill, and inbound lock confirmations
//! - `counterparty` - inbound interests, lock-in, and inbound fulfill notices
//! - `inbound` - sender authentication and message dispatch

mod admin;
mod counterparty;
mod inbound;
mod initiator;

pub use admin::*;
pub use counterparty::{execute_lock_in_interest, quote_lock_in};
pub use inbound::*;
pub use initiator::{
    execute_fulfill_trade, execute_propose_trade, quote_fulfill_trade, quote_propose_trade,
};
