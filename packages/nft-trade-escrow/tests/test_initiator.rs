//! Initiating-chain precondition tests.
//!
//! Every rejected call must leave custody, the ledger and the outbound queue
//! exactly as they were.

mod common;

use common::{addr, gas, setup, TestEnv, CHAIN_A, CHAIN_B};
use nft_trade_escrow::error::CustodyError;
use nft_trade_escrow::options::OptionsError;
use nft_trade_escrow::{
    ChainId, EscrowError, ExecutionOptions, MessageInfo, ProposeTrade, TradeState,
};

/// Attached value large enough for any message
const PLENTY: u128 = 10_000_000;

fn assert_nothing_happened(env: &TestEnv) {
    assert_eq!(env.a.owner_of(&env.offered), env.alice);
    assert!(env.a.node.trade(&env.alice).is_none());
    assert_eq!(env.channel.pending(), 0);
    assert_eq!(env.channel.fees_paid(), 0);
    assert_eq!(
        env.a.node.with_escrow(|escrow| escrow.next_sequence(&env.alice)),
        1
    );
    assert_eq!(env.a.node.stats().trades_proposed, 0);
}

#[test]
fn test_propose_rejects_non_owner() {
    let env = setup();

    let err = env
        .a
        .node
        .propose_trade(&MessageInfo::new(env.bob, PLENTY), env.propose_params())
        .unwrap_err();
    assert_eq!(
        err,
        EscrowError::NotOwner {
            asset: env.offered,
            caller: env.bob
        }
    );
    assert_nothing_happened(&env);
}

#[test]
fn test_propose_rejects_unapproved_asset() {
    let env = setup();
    let unapproved = env.a.nft.mint(env.a.collection, env.alice).unwrap();

    let err = env
        .a
        .node
        .propose_trade(
            &MessageInfo::new(env.alice, PLENTY),
            ProposeTrade {
                offered: unapproved,
                ..env.propose_params()
            },
        )
        .unwrap_err();
    assert_eq!(err, EscrowError::NotApproved { asset: unapproved });
    assert_eq!(env.channel.pending(), 0);
}

#[test]
fn test_propose_rejects_second_active_trade() {
    let env = setup();
    env.propose(env.alice, env.propose_params()).unwrap();

    let another = env.a.mint_approved(env.alice);
    let err = env
        .a
        .node
        .propose_trade(
            &MessageInfo::new(env.alice, PLENTY),
            ProposeTrade {
                offered: another,
                ..env.propose_params()
            },
        )
        .unwrap_err();
    assert_eq!(
        err,
        EscrowError::DuplicateTrade {
            initiator: env.alice,
            remote_chain: CHAIN_B
        }
    );
    assert_eq!(env.a.owner_of(&another), env.alice);
    assert_eq!(env.channel.pending(), 1, "only the first interest is queued");
}

#[test]
fn test_propose_requires_peer() {
    let env = setup();

    let err = env
        .a
        .node
        .propose_trade(
            &MessageInfo::new(env.alice, PLENTY),
            ProposeTrade {
                remote_chain: ChainId::from_u32(99),
                ..env.propose_params()
            },
        )
        .unwrap_err();
    assert_eq!(
        err,
        EscrowError::PeerNotSet {
            chain_id: ChainId::from_u32(99)
        }
    );
    assert_nothing_happened(&env);
}

#[test]
fn test_propose_underfunded_fails_atomically() {
    let env = setup();
    let fee = env
        .a
        .node
        .quote_propose_trade(&env.alice, &env.propose_params())
        .unwrap()
        .native_fee;

    let err = env
        .a
        .node
        .propose_trade(
            &MessageInfo::new(env.alice, fee - 1),
            env.propose_params(),
        )
        .unwrap_err();
    assert_eq!(
        err,
        EscrowError::InsufficientFee {
            required: fee,
            attached: fee - 1
        }
    );
    assert_nothing_happened(&env);
}

#[test]
fn test_quote_depends_on_gas_budget() {
    let env = setup();
    let small = env
        .a
        .node
        .quote_propose_trade(&env.alice, &env.propose_params())
        .unwrap();
    let large = env
        .a
        .node
        .quote_propose_trade(
            &env.alice,
            &ProposeTrade {
                options: ExecutionOptions::lz_receive(200_000),
                ..env.propose_params()
            },
        )
        .unwrap();
    assert!(large.native_fee > small.native_fee);

    // Paying the small quote for the large budget is rejected
    let err = env
        .a
        .node
        .propose_trade(
            &MessageInfo::new(env.alice, small.native_fee),
            ProposeTrade {
                options: ExecutionOptions::lz_receive(200_000),
                ..env.propose_params()
            },
        )
        .unwrap_err();
    assert!(matches!(err, EscrowError::InsufficientFee { .. }));
    assert_nothing_happened(&env);
}

#[test]
fn test_propose_dispatch_failure_fails_atomically() {
    let env = setup();
    env.channel.fail_next_send("executor unavailable");

    let err = env
        .a
        .node
        .propose_trade(&MessageInfo::new(env.alice, PLENTY), env.propose_params())
        .unwrap_err();
    assert_eq!(
        err,
        EscrowError::DispatchFailed {
            reason: "executor unavailable".to_string()
        }
    );
    assert_nothing_happened(&env);

    // Handing the token back clears its approval, so Alice approves again
    env.a
        .nft
        .approve(&env.alice, &env.offered, &env.a.escrow)
        .unwrap();
    let proposed = env.propose(env.alice, env.propose_params()).unwrap();
    assert_eq!(proposed.sequence, 1);
}

#[test]
fn test_propose_custody_failure_sends_nothing() {
    let env = setup();
    env.a.nft.fail_next_transfer("collection paused");

    let err = env.propose(env.alice, env.propose_params()).unwrap_err();
    assert!(matches!(err, EscrowError::Custody(CustodyError::Rejected { .. })));
    assert_nothing_happened(&env);

    // The retry is the first Interest the destination sees
    let proposed = env.propose(env.alice, env.propose_params()).unwrap();
    assert_eq!(proposed.sequence, 1);
    assert_eq!(env.channel.deliver_all(), 1);
    assert_eq!(
        env.b
            .node
            .pending_interest(&env.alice, CHAIN_A)
            .unwrap()
            .id,
        proposed.trade_id
    );
    assert_eq!(env.b.node.stats().messages_dropped, 0);
}

#[test]
fn test_propose_rejects_zero_gas() {
    let env = setup();

    let err = env
        .a
        .node
        .propose_trade(
            &MessageInfo::new(env.alice, PLENTY),
            ProposeTrade {
                options: ExecutionOptions::lz_receive(0),
                ..env.propose_params()
            },
        )
        .unwrap_err();
    assert_eq!(err, EscrowError::InvalidOptions(OptionsError::ZeroGas));
    assert_nothing_happened(&env);
}

#[test]
fn test_excess_fee_is_forwarded() {
    let env = setup();
    let fee = env
        .a
        .node
        .quote_propose_trade(&env.alice, &env.propose_params())
        .unwrap()
        .native_fee;

    let proposed = env
        .a
        .node
        .propose_trade(
            &MessageInfo::new(env.alice, fee + 500),
            env.propose_params(),
        )
        .unwrap();
    assert_eq!(proposed.receipt.fee.native_fee, fee + 500);
    assert_eq!(env.channel.fees_paid(), fee + 500);
}

#[test]
fn test_zero_hint_means_anyone() {
    let env = setup();
    env.propose(
        env.alice,
        ProposeTrade {
            counterparty_hint: Some(nft_trade_escrow::Address::ZERO),
            ..env.propose_params()
        },
    )
    .unwrap();
    assert_eq!(env.a.node.trade(&env.alice).unwrap().counterparty_hint, None);
}

#[test]
fn test_premature_fulfill_rejected() {
    let env = setup();
    env.propose(env.alice, env.propose_params()).unwrap();

    let err = env
        .a
        .node
        .fulfill_trade(&MessageInfo::new(env.alice, PLENTY), CHAIN_B, gas())
        .unwrap_err();
    assert!(matches!(err, EscrowError::InvalidState { .. }));
    assert!(err.to_string().contains("proposed"));

    assert_eq!(env.a.owner_of(&env.offered), env.a.escrow);
    assert_eq!(env.a.node.trade_state(&env.alice), TradeState::Proposed);
    assert_eq!(env.channel.pending(), 1, "no FulfillNotice queued");
}

#[test]
fn test_fulfill_requires_trade_on_that_chain() {
    let env = setup();

    let err = env
        .a
        .node
        .fulfill_trade(&MessageInfo::new(env.alice, PLENTY), CHAIN_B, gas())
        .unwrap_err();
    assert!(matches!(err, EscrowError::InvalidState { .. }));

    env.propose_and_lock_in();
    env.channel.deliver_all();
    assert_eq!(env.a.node.trade_state(&env.alice), TradeState::Locked);

    let err = env
        .a
        .node
        .fulfill_trade(
            &MessageInfo::new(env.alice, PLENTY),
            ChainId::from_u32(7),
            gas(),
        )
        .unwrap_err();
    assert!(matches!(err, EscrowError::InvalidState { .. }));

    // Only the initiator's own record is consulted
    let err = env
        .a
        .node
        .fulfill_trade(&MessageInfo::new(env.bob, PLENTY), CHAIN_B, gas())
        .unwrap_err();
    assert!(matches!(err, EscrowError::InvalidState { .. }));
    assert_eq!(env.a.owner_of(&env.offered), env.a.escrow);
}

#[test]
fn test_fulfill_underfunded_keeps_trade_locked() {
    let env = setup();
    env.propose_and_lock_in();
    env.channel.deliver_all();

    let err = env
        .a
        .node
        .fulfill_trade(&MessageInfo::new(env.alice, 1), CHAIN_B, gas())
        .unwrap_err();
    assert!(matches!(err, EscrowError::InsufficientFee { .. }));
    assert_eq!(env.a.node.trade_state(&env.alice), TradeState::Locked);
    assert_eq!(env.a.owner_of(&env.offered), env.a.escrow);

    env.fulfill(env.alice).unwrap();
    assert_eq!(env.a.owner_of(&env.offered), env.bob);
}

#[test]
fn test_fulfill_release_failure_keeps_trade_locked() {
    let env = setup();
    env.propose_and_lock_in();
    env.channel.deliver_all();

    env.a.nft.fail_next_transfer("collection paused");
    let err = env.fulfill(env.alice).unwrap_err();
    assert!(matches!(err, EscrowError::Custody(CustodyError::Rejected { .. })));
    assert_eq!(env.a.node.trade_state(&env.alice), TradeState::Locked);
    assert_eq!(env.a.owner_of(&env.offered), env.a.escrow);
    assert_eq!(env.channel.pending(), 0, "no FulfillNotice queued");

    env.fulfill(env.alice).unwrap();
    assert_eq!(env.a.owner_of(&env.offered), env.bob);
    assert_eq!(env.channel.deliver_all(), 1);
    assert_eq!(env.b.owner_of(&env.desired), env.alice);
}

#[test]
fn test_fulfill_resends_notice_after_dispatch_failure() {
    let env = setup();
    env.propose_and_lock_in();
    env.channel.deliver_all();

    env.channel.fail_next_send("executor unavailable");
    let err = env.fulfill(env.alice).unwrap_err();
    assert!(matches!(err, EscrowError::DispatchFailed { .. }));

    // Released, but the notice is still owed
    assert_eq!(env.a.owner_of(&env.offered), env.bob);
    assert_eq!(env.a.node.trade_state(&env.alice), TradeState::Fulfilled);
    assert_eq!(env.channel.pending(), 0);
    assert_eq!(env.a.node.stats().trades_fulfilled, 0);

    let resent = env.fulfill(env.alice).unwrap();
    assert_eq!(resent.counterparty, env.bob);
    assert_eq!(env.a.node.trade_state(&env.alice), TradeState::None);
    assert_eq!(env.a.node.stats().trades_fulfilled, 1);

    assert_eq!(env.channel.deliver_all(), 1);
    assert_eq!(env.b.owner_of(&env.desired), env.alice);
    assert_eq!(env.a.owner_of(&env.offered), env.bob);
}

#[test]
fn test_admin_operations_require_admin() {
    let env = setup();
    let outsider = MessageInfo::new(env.alice, 0);

    assert_eq!(
        env.a.node.set_peer(&outsider, CHAIN_B, addr(0x99)),
        Err(EscrowError::Unauthorized)
    );
    assert_eq!(env.a.node.peer(&CHAIN_B), Some(env.b.escrow));

    assert_eq!(
        env.a.node.transfer_admin(&outsider, env.alice),
        Err(EscrowError::Unauthorized)
    );

    let admin = MessageInfo::new(env.admin, 0);
    env.a.node.transfer_admin(&admin, env.carol).unwrap();
    assert_eq!(
        env.a.node.set_peer(&admin, CHAIN_B, addr(0x99)),
        Err(EscrowError::Unauthorized),
        "old admin lost its rights"
    );

    let carol = MessageInfo::new(env.carol, 0);
    assert_eq!(
        env.a.node.set_peer(&carol, CHAIN_B, addr(0x99)),
        Ok(Some(env.b.escrow))
    );
    assert_eq!(env.a.node.peer(&CHAIN_B), Some(addr(0x99)));
}

#[test]
fn test_unset_peer_blocks_new_trades() {
    let env = setup();
    let admin = MessageInfo::new(env.admin, 0);
    env.a
        .node
        .set_peer(&admin, CHAIN_B, nft_trade_escrow::Address::ZERO)
        .unwrap();
    assert_eq!(env.a.node.peer(&CHAIN_B), None);

    let err = env
        .a
        .node
        .propose_trade(&MessageInfo::new(env.alice, PLENTY), env.propose_params())
        .unwrap_err();
    assert_eq!(err, EscrowError::PeerNotSet { chain_id: CHAIN_B });
    assert_nothing_happened(&env);
}
