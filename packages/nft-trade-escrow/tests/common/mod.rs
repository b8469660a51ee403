//! Two-chain fixture shared by the scenario tests.
//!
//! Chain A (id 1) hosts Alice's NFT, chain B (id 2) hosts Bob's. Both escrows
//! are deployed, peered with each other and approved for the minted tokens.

#![allow(dead_code)]

use std::sync::Arc;

use nft_trade_escrow::testing::{FeeSchedule, InMemoryChannel, InMemoryNftRegistry};
use nft_trade_escrow::{
    Address, AssetCustodian, AssetRef, ChainId, EscrowConfig, EscrowError, EscrowNode,
    ExecutionOptions, FulfillResponse, LockInInterest, LockInResponse, MessageInfo,
    ProposeResponse, ProposeTrade, TradeEscrow,
};
use tracing_subscriber::EnvFilter;

pub const CHAIN_A: ChainId = ChainId([0, 0, 0, 1]);
pub const CHAIN_B: ChainId = ChainId([0, 0, 0, 2]);

pub fn addr(byte: u8) -> Address {
    Address::from_evm([byte; 20])
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// 60k gas for the receive call
pub fn gas() -> ExecutionOptions {
    ExecutionOptions::from_hex("0x0003010011010000000000000000000000000000ea60").unwrap()
}

pub struct Chain {
    pub id: ChainId,
    pub escrow: Address,
    pub collection: Address,
    pub nft: Arc<InMemoryNftRegistry>,
    pub node: Arc<EscrowNode>,
}

impl Chain {
    fn deploy(
        channel: &Arc<InMemoryChannel>,
        id: ChainId,
        escrow: Address,
        admin: Address,
    ) -> Self {
        let nft = Arc::new(InMemoryNftRegistry::new());
        let endpoint = Arc::new(channel.endpoint(id, escrow));
        let node = Arc::new(EscrowNode::new(TradeEscrow::new(
            EscrowConfig::new(id, escrow, admin),
            nft.clone(),
            endpoint,
        )));
        channel.register(id, escrow, &node);

        Self {
            id,
            escrow,
            collection: addr(0xc0 + id.to_u32() as u8),
            nft,
            node,
        }
    }

    /// Mint the next token to `owner` and approve the escrow for it
    pub fn mint_approved(&self, owner: Address) -> AssetRef {
        let asset = self.nft.mint(self.collection, owner).unwrap();
        self.nft.approve(&owner, &asset, &self.escrow).unwrap();
        asset
    }

    pub fn owner_of(&self, asset: &AssetRef) -> Address {
        self.nft.owner_of(asset).unwrap()
    }
}

pub struct TestEnv {
    pub channel: Arc<InMemoryChannel>,
    pub a: Chain,
    pub b: Chain,
    pub admin: Address,
    pub alice: Address,
    pub bob: Address,
    pub carol: Address,
    /// Alice's token on chain A
    pub offered: AssetRef,
    /// Bob's token on chain B
    pub desired: AssetRef,
}

pub fn setup() -> TestEnv {
    setup_with_schedule(FeeSchedule::default())
}

pub fn setup_with_schedule(schedule: FeeSchedule) -> TestEnv {
    init_tracing();

    let channel = Arc::new(InMemoryChannel::new(schedule));
    let admin = addr(0xad);
    let a = Chain::deploy(&channel, CHAIN_A, addr(0xea), admin);
    let b = Chain::deploy(&channel, CHAIN_B, addr(0xeb), admin);

    a.node
        .set_peer(&MessageInfo::new(admin, 0), CHAIN_B, b.escrow)
        .unwrap();
    b.node
        .set_peer(&MessageInfo::new(admin, 0), CHAIN_A, a.escrow)
        .unwrap();

    let alice = addr(0x11);
    let bob = addr(0x22);
    let carol = addr(0x33);
    let offered = a.mint_approved(alice);
    let desired = b.mint_approved(bob);

    TestEnv {
        channel,
        a,
        b,
        admin,
        alice,
        bob,
        carol,
        offered,
        desired,
    }
}

impl TestEnv {
    pub fn propose_params(&self) -> ProposeTrade {
        ProposeTrade {
            offered: self.offered,
            desired: self.desired,
            remote_chain: CHAIN_B,
            counterparty_hint: None,
            options: gas(),
        }
    }

    pub fn lock_in_params(&self) -> LockInInterest {
        LockInInterest {
            remote_chain: CHAIN_A,
            initiator: self.alice,
            locked: self.desired,
            options: gas(),
        }
    }

    /// Propose on chain A, attaching exactly the quoted fee
    pub fn propose(
        &self,
        initiator: Address,
        params: ProposeTrade,
    ) -> Result<ProposeResponse, EscrowError> {
        let fee = self.a.node.quote_propose_trade(&initiator, &params)?;
        self.a
            .node
            .propose_trade(&MessageInfo::new(initiator, fee.native_fee), params)
    }

    /// Lock in on chain B, attaching exactly the quoted fee
    pub fn lock_in(
        &self,
        committer: Address,
        params: LockInInterest,
    ) -> Result<LockInResponse, EscrowError> {
        let fee = self.b.node.quote_lock_in(&committer, &params)?;
        self.b
            .node
            .lock_in_interest(&MessageInfo::new(committer, fee.native_fee), params)
    }

    /// Fulfill on chain A, attaching exactly the quoted fee
    pub fn fulfill(&self, initiator: Address) -> Result<FulfillResponse, EscrowError> {
        let fee = self
            .a
            .node
            .quote_fulfill_trade(&initiator, CHAIN_B, &gas())?;
        self.a.node.fulfill_trade(
            &MessageInfo::new(initiator, fee.native_fee),
            CHAIN_B,
            gas(),
        )
    }

    /// Propose, deliver the interest and lock in; the lock confirmation is
    /// left queued
    pub fn propose_and_lock_in(&self) -> (ProposeResponse, LockInResponse) {
        let proposed = self.propose(self.alice, self.propose_params()).unwrap();
        assert_eq!(self.channel.deliver_all(), 1);
        let locked = self.lock_in(self.bob, self.lock_in_params()).unwrap();
        (proposed, locked)
    }
}
