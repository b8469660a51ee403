//! Relay loop driving a full trade in the background.

mod common;

use std::time::Duration;

use common::{setup, CHAIN_A};
use nft_trade_escrow::testing::relay;
use nft_trade_escrow::{CommitmentState, RelayConfig, TradeState};
use tokio::sync::mpsc;

async fn wait_for(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_relay_completes_trade() {
    let env = setup();
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let handle = tokio::spawn(relay::run(
        env.channel.clone(),
        RelayConfig {
            poll_interval_ms: 5,
            max_batch: 8,
        },
        shutdown_rx,
    ));

    env.propose(env.alice, env.propose_params()).unwrap();
    wait_for(|| env.b.node.pending_interest(&env.alice, CHAIN_A).is_some()).await;

    env.lock_in(env.bob, env.lock_in_params()).unwrap();
    wait_for(|| env.a.node.trade_state(&env.alice) == TradeState::Locked).await;

    env.fulfill(env.alice).unwrap();
    wait_for(|| env.b.node.commitment_state(&env.alice, CHAIN_A) == CommitmentState::None)
        .await;

    assert_eq!(env.b.owner_of(&env.desired), env.alice);
    assert_eq!(env.a.owner_of(&env.offered), env.bob);

    shutdown_tx.send(()).await.unwrap();
    let delivered = handle.await.unwrap();
    assert_eq!(delivered, 3);
    assert_eq!(env.channel.pending(), 0);
}

#[tokio::test]
async fn test_relay_respects_batch_size() {
    let env = setup();

    // Three trades in flight from three initiators
    env.propose(env.alice, env.propose_params()).unwrap();
    for initiator in [env.bob, env.carol] {
        let offered = env.a.mint_approved(initiator);
        let mut params = env.propose_params();
        params.offered = offered;
        env.propose(initiator, params).unwrap();
    }
    assert_eq!(env.channel.pending(), 3);

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let handle = tokio::spawn(relay::run(
        env.channel.clone(),
        RelayConfig {
            poll_interval_ms: 50,
            max_batch: 1,
        },
        shutdown_rx,
    ));

    wait_for(|| env.channel.pending() < 3).await;
    assert!(env.channel.pending() >= 1, "one packet per round");
    wait_for(|| env.channel.pending() == 0).await;

    drop(shutdown_tx);
    assert_eq!(handle.await.unwrap(), 3);
}
