//! Destination-chain lock-in tests.

mod common;

use common::{gas, setup, CHAIN_A};
use nft_trade_escrow::{
    AssetCustodian, CommitmentState, CustodyError, EscrowError, LockInInterest, MessageInfo,
    ProposeTrade, TradeState,
};

const PLENTY: u128 = 10_000_000;

#[test]
fn test_lock_in_requires_cached_interest() {
    let env = setup();
    env.propose(env.alice, env.propose_params()).unwrap();

    // Interest still in flight
    let err = env
        .b
        .node
        .lock_in_interest(&MessageInfo::new(env.bob, PLENTY), env.lock_in_params())
        .unwrap_err();
    assert!(matches!(err, EscrowError::InvalidState { .. }));
    assert_eq!(env.b.owner_of(&env.desired), env.bob);

    let err = env
        .b
        .node
        .quote_lock_in(&env.bob, &env.lock_in_params())
        .unwrap_err();
    assert!(matches!(err, EscrowError::InvalidState { .. }));
}

#[test]
fn test_no_double_lock() {
    let env = setup();
    env.propose_and_lock_in();

    // Carol holds another token of the same collection and tries to lock it
    // against the same trade
    let carols = env.b.mint_approved(env.carol);
    let err = env
        .b
        .node
        .lock_in_interest(
            &MessageInfo::new(env.carol, PLENTY),
            LockInInterest {
                locked: carols,
                ..env.lock_in_params()
            },
        )
        .unwrap_err();
    assert_eq!(
        err,
        EscrowError::DuplicateTrade {
            initiator: env.alice,
            remote_chain: CHAIN_A
        }
    );

    assert_eq!(env.b.owner_of(&carols), env.carol);
    assert_eq!(
        env.b.node.commitment(&env.alice, CHAIN_A).unwrap().committer,
        env.bob
    );
    assert_eq!(env.channel.pending(), 1, "single LockConfirmation queued");
}

#[test]
fn test_lock_in_rejects_wrong_asset() {
    let env = setup();
    env.propose(env.alice, env.propose_params()).unwrap();
    env.channel.deliver_all();

    let other = env.b.mint_approved(env.bob);
    let err = env
        .b
        .node
        .lock_in_interest(
            &MessageInfo::new(env.bob, PLENTY),
            LockInInterest {
                locked: other,
                ..env.lock_in_params()
            },
        )
        .unwrap_err();
    assert_eq!(
        err,
        EscrowError::AssetMismatch {
            expected: env.desired,
            got: other
        }
    );
    assert_eq!(env.b.owner_of(&other), env.bob);
    assert!(
        env.b.node.pending_interest(&env.alice, CHAIN_A).is_some(),
        "interest stays cached"
    );
}

#[test]
fn test_lock_in_rejects_non_owner() {
    let env = setup();
    env.propose(env.alice, env.propose_params()).unwrap();
    env.channel.deliver_all();

    let err = env
        .b
        .node
        .lock_in_interest(&MessageInfo::new(env.carol, PLENTY), env.lock_in_params())
        .unwrap_err();
    assert_eq!(
        err,
        EscrowError::NotOwner {
            asset: env.desired,
            caller: env.carol
        }
    );
    assert_eq!(
        env.b.node.commitment_state(&env.alice, CHAIN_A),
        CommitmentState::None
    );
}

#[test]
fn test_lock_in_underfunded_fails_atomically() {
    let env = setup();
    env.propose(env.alice, env.propose_params()).unwrap();
    env.channel.deliver_all();

    let fee = env
        .b
        .node
        .quote_lock_in(&env.bob, &env.lock_in_params())
        .unwrap()
        .native_fee;
    let err = env
        .b
        .node
        .lock_in_interest(&MessageInfo::new(env.bob, fee - 1), env.lock_in_params())
        .unwrap_err();
    assert!(matches!(err, EscrowError::InsufficientFee { .. }));

    assert_eq!(env.b.owner_of(&env.desired), env.bob);
    assert!(env.b.node.commitment(&env.alice, CHAIN_A).is_none());
    assert!(env.b.node.pending_interest(&env.alice, CHAIN_A).is_some());
    assert_eq!(env.channel.pending(), 0);

    env.lock_in(env.bob, env.lock_in_params()).unwrap();
}

#[test]
fn test_counterparty_hint_restricts_lock_in() {
    let env = setup();
    env.propose(
        env.alice,
        ProposeTrade {
            counterparty_hint: Some(env.carol),
            ..env.propose_params()
        },
    )
    .unwrap();
    env.channel.deliver_all();
    assert_eq!(
        env.b
            .node
            .pending_interest(&env.alice, CHAIN_A)
            .unwrap()
            .counterparty_hint,
        Some(env.carol)
    );

    let err = env
        .b
        .node
        .lock_in_interest(&MessageInfo::new(env.bob, PLENTY), env.lock_in_params())
        .unwrap_err();
    assert_eq!(
        err,
        EscrowError::UnexpectedCounterparty {
            expected: env.carol,
            caller: env.bob
        }
    );

    // Bob hands the token to Carol, who may lock it in
    env.b
        .nft
        .transfer_from(&env.bob, &env.desired, &env.bob, &env.carol)
        .unwrap();
    env.b
        .nft
        .approve(&env.carol, &env.desired, &env.b.escrow)
        .unwrap();

    env.lock_in(env.carol, env.lock_in_params()).unwrap();
    env.channel.deliver_all();
    assert_eq!(env.a.node.trade_state(&env.alice), TradeState::Locked);
    assert_eq!(
        env.a.node.trade(&env.alice).unwrap().counterparty,
        Some(env.carol)
    );
}

#[test]
fn test_lock_in_rejects_zero_gas() {
    let env = setup();
    env.propose(env.alice, env.propose_params()).unwrap();
    env.channel.deliver_all();

    let err = env
        .b
        .node
        .lock_in_interest(
            &MessageInfo::new(env.bob, PLENTY),
            LockInInterest {
                options: nft_trade_escrow::ExecutionOptions::lz_receive(0),
                ..env.lock_in_params()
            },
        )
        .unwrap_err();
    assert!(matches!(err, EscrowError::InvalidOptions(_)));
    assert_eq!(env.b.owner_of(&env.desired), env.bob);

    // A valid budget still works
    let params = LockInInterest {
        options: gas(),
        ..env.lock_in_params()
    };
    env.lock_in(env.bob, params).unwrap();
}

#[test]
fn test_lock_in_custody_failure_sends_no_confirmation() {
    let env = setup();
    env.propose(env.alice, env.propose_params()).unwrap();
    env.channel.deliver_all();

    env.b.nft.fail_next_transfer("collection paused");
    let err = env.lock_in(env.bob, env.lock_in_params()).unwrap_err();
    assert!(matches!(err, EscrowError::Custody(CustodyError::Rejected { .. })));
    assert_eq!(env.channel.pending(), 0, "no LockConfirmation queued");
    assert_eq!(env.b.owner_of(&env.desired), env.bob);
    assert!(env.b.node.commitment(&env.alice, CHAIN_A).is_none());

    // Alice cannot fulfill against an asset that was never locked
    env.channel.deliver_all();
    assert_eq!(env.a.node.trade_state(&env.alice), TradeState::Proposed);
    assert!(env.fulfill(env.alice).is_err());
    assert_eq!(env.a.owner_of(&env.offered), env.a.escrow);

    // Bob retries and the trade completes normally
    env.lock_in(env.bob, env.lock_in_params()).unwrap();
    env.channel.deliver_all();
    env.fulfill(env.alice).unwrap();
    env.channel.deliver_all();
    assert_eq!(env.a.owner_of(&env.offered), env.bob);
    assert_eq!(env.b.owner_of(&env.desired), env.alice);
}

#[test]
fn test_lock_in_dispatch_failure_returns_custody() {
    let env = setup();
    env.propose(env.alice, env.propose_params()).unwrap();
    env.channel.deliver_all();

    env.channel.fail_next_send("executor unavailable");
    let err = env.lock_in(env.bob, env.lock_in_params()).unwrap_err();
    assert!(matches!(err, EscrowError::DispatchFailed { .. }));
    assert_eq!(env.b.owner_of(&env.desired), env.bob);
    assert!(env.b.node.commitment(&env.alice, CHAIN_A).is_none());
    assert!(env.b.node.pending_interest(&env.alice, CHAIN_A).is_some());
    assert_eq!(env.channel.pending(), 0);
    assert_eq!(env.b.node.stats().commitments_created, 0);

    env.b
        .nft
        .approve(&env.bob, &env.desired, &env.b.escrow)
        .unwrap();
    env.lock_in(env.bob, env.lock_in_params()).unwrap();
    assert_eq!(env.b.owner_of(&env.desired), env.b.escrow);
}
