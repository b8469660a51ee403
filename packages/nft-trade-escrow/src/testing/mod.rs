//! In-process collaborators for tests and local simulations
//!
//! - [`InMemoryNftRegistry`] - per-chain NFT ownership
//! - [`InMemoryChannel`] - message transport shared by all chains, with fault
//!   injection
//! - [`relay::run`] - background delivery loop

mod channel;
mod nft;
pub mod relay;

pub use channel::{ChannelEndpoint, FeeSchedule, InMemoryChannel, Packet};
pub use nft::InMemoryNftRegistry;
