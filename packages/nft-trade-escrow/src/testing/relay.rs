//! Background relay loop
//!
//! Stands in for the executor network: every poll interval it delivers up to
//! `max_batch` queued packets, until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::RelayConfig;

use super::InMemoryChannel;

/// Run until `shutdown` receives a message (or its sender is dropped),
/// returning the number of packets delivered
pub async fn run(
    channel: Arc<InMemoryChannel>,
    config: RelayConfig,
    mut shutdown: mpsc::Receiver<()>,
) -> usize {
    info!(
        poll_interval_ms = config.poll_interval_ms,
        max_batch = config.max_batch,
        "Relay starting"
    );

    let poll_interval = Duration::from_millis(config.poll_interval_ms);
    let mut delivered = 0;

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                info!(delivered, "Shutdown signal received");
                break;
            }
            _ = tokio::time::sleep(poll_interval) => {
                let count = channel.deliver_batch(config.max_batch);
                if count > 0 {
                    debug!(count, pending = channel.pending(), "Relayed packets");
                }
                delivered += count;
            }
        }
    }

    delivered
}
