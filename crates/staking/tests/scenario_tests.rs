//! # Integration Tests: Staking Ledger Scenarios
//!
//! Drives the ledger through its public API only, with an
//! [`InMemoryToken`] standing in for the token contract.
//!
//! ## Coverage
//!
//! - Full node life: register, run, delegate, claim, unregister, withdraw
//! - Token conservation across the ledger account and the reward vault
//! - Event stream ordering
//! - Claim timing never changes the total paid (proptest)
//! - Owner plus delegator rewards reconstruct the gross reward (proptest)

use dsdn_common::{Address, InMemoryToken, LedgerConfig, TokenLedger};
use dsdn_staking::apr::accrue;
use dsdn_staking::{LedgerEvent, NodeStatus, SharedLedger, StakingError, StakingLedger};
use proptest::prelude::*;

// ════════════════════════════════════════════════════════════════════════════════
// HELPERS
// ════════════════════════════════════════════════════════════════════════════════

const TOKEN: u128 = 1_000_000_000_000_000_000;
const DAY: u64 = 86_400;
const LOCK: u64 = 7 * DAY;
const T0: u64 = 1_700_000_000;

struct World {
    ledger: StakingLedger<InMemoryToken>,
    reporter: Address,
    vault: Address,
    ledger_account: Address,
}

fn world(accounts: &[(&Address, u128)]) -> World {
    let cfg = LedgerConfig::default();
    let reporter = cfg.health_reporter;
    let vault = cfg.reward_vault;
    let ledger_account = cfg.ledger_account;

    let mut token = InMemoryToken::new();
    token
        .mint(&vault, 1_000_000_000 * TOKEN)
        .unwrap_or_else(|e| panic!("test setup: mint vault: {}", e));
    token.approve(&vault, &ledger_account, u128::MAX);
    for (who, amount) in accounts {
        token
            .mint(who, *amount)
            .unwrap_or_else(|e| panic!("test setup: mint: {}", e));
        token.approve(who, &ledger_account, u128::MAX);
    }

    World {
        ledger: StakingLedger::new(cfg, token),
        reporter,
        vault,
        ledger_account,
    }
}

fn addr(label: &str) -> Address {
    Address::from_label(label)
}

// ════════════════════════════════════════════════════════════════════════════════
// SCENARIOS
// ════════════════════════════════════════════════════════════════════════════════

#[test]
fn full_node_lifecycle_conserves_tokens() {
    let owner = addr("owner");
    let node = addr("node");
    let alice = addr("alice");
    let bob = addr("bob");
    let mut w = world(&[
        (&owner, 500_000 * TOKEN),
        (&alice, 300_000 * TOKEN),
        (&bob, 200_000 * TOKEN),
    ]);
    let reporter = w.reporter;
    let vault_start = w.ledger.token().balance_of(&w.vault);

    w.ledger
        .register(&owner, &node, 500_000 * TOKEN, 500, "edge-sg-1", T0)
        .expect("register");
    w.ledger.start(&reporter, &node, T0).expect("start");
    w.ledger.delegate(&alice, &node, 300_000 * TOKEN, T0 + DAY).expect("alice");
    w.ledger.delegate(&bob, &node, 200_000 * TOKEN, T0 + 2 * DAY).expect("bob");
    assert_eq!(w.ledger.total_active_stake(), 1_000_000 * TOKEN);
    assert_eq!(w.ledger.token().balance_of(&w.ledger_account), 1_000_000 * TOKEN);

    w.ledger.stop(&reporter, &node, T0 + 30 * DAY).expect("stop");
    w.ledger.start(&reporter, &node, T0 + 40 * DAY).expect("restart");
    assert_eq!(w.ledger.node_uptime(&node, T0 + 50 * DAY), 40 * DAY);

    let at = T0 + 90 * DAY;
    w.ledger.unregister(&owner, &node, at).expect("unregister");
    assert_eq!(w.ledger.node_status(&node), Some(NodeStatus::Unregistered));
    assert_eq!(w.ledger.total_active_stake(), 0);

    let mut rewards = w.ledger.node_claim_reward(&owner, &node, at).expect("owner claim");
    for d in [&alice, &bob] {
        let amount = w.ledger.delegation(&node, d).expect("delegation").amount;
        w.ledger.unbond(d, &node, amount, at).expect("unbond");
        rewards += w.ledger.delegator_claim_reward(d, &node, at).expect("claim");
    }
    assert!(rewards > 0);

    w.ledger.node_withdraw(&owner, &node, at + LOCK).expect("owner withdraw");
    w.ledger.delegator_withdraw(&alice, &node, at + LOCK).expect("alice withdraw");
    w.ledger.delegator_withdraw(&bob, &node, at + LOCK).expect("bob withdraw");

    let token = w.ledger.token();
    assert_eq!(token.balance_of(&w.ledger_account), 0);
    assert_eq!(token.balance_of(&w.vault), vault_start - rewards);
    let paid_out = token.balance_of(&owner) + token.balance_of(&alice) + token.balance_of(&bob);
    assert_eq!(paid_out, 1_000_000 * TOKEN + rewards);
    assert!(w.ledger.node(&node).is_none());
    assert!(w.ledger.node_ids().is_empty());
}

#[test]
fn event_stream_follows_operation_order() {
    let owner = addr("owner");
    let node = addr("node");
    let alice = addr("alice");
    let mut w = world(&[(&owner, 100 * TOKEN), (&alice, 10 * TOKEN)]);
    let reporter = w.reporter;

    w.ledger.register(&owner, &node, 100 * TOKEN, 0, "", T0).expect("register");
    w.ledger.start(&reporter, &node, T0).expect("start");
    w.ledger.delegate(&alice, &node, 10 * TOKEN, T0 + 1).expect("delegate");
    // rejected operations leave no trace
    assert!(matches!(
        w.ledger.delegate(&alice, &node, 10 * TOKEN, T0 + 2),
        Err(StakingError::InsufficientFunds(_))
    ));
    w.ledger.stop(&reporter, &node, T0 + DAY).expect("stop");

    let kinds: Vec<&str> = w.ledger.drain_events().iter().map(LedgerEvent::kind).collect();
    assert_eq!(kinds, vec!["NodeRegistered", "NodeStarted", "Delegated", "NodeStopped"]);
    assert!(w.ledger.drain_events().is_empty());
}

#[test]
fn shared_handle_serves_reporter_and_owner_threads() {
    let owner = addr("owner");
    let node = addr("node");
    let w = world(&[(&owner, 1_000_000 * TOKEN)]);
    let reporter = w.reporter;
    let shared = SharedLedger::new(w.ledger);

    shared
        .with(|l| l.register(&owner, &node, 1_000_000 * TOKEN, 0, "", T0))
        .expect("register");

    let health = shared.clone();
    std::thread::spawn(move || {
        health
            .with(|l| l.start(&reporter, &node, T0))
            .expect("start");
        health
            .with(|l| l.stop(&reporter, &node, T0 + 73 * DAY))
            .expect("stop");
    })
    .join()
    .expect("reporter thread");

    let paid = shared
        .with(|l| l.node_claim_reward(&owner, &node, T0 + 100 * DAY))
        .expect("claim");
    assert_eq!(paid, 160_000 * TOKEN);
    assert_eq!(shared.read(|l| l.node_claimable(&node, T0 + 200 * DAY)), 0);
}

// ════════════════════════════════════════════════════════════════════════════════
// PROPERTIES
// ════════════════════════════════════════════════════════════════════════════════

/// Owner and one delegator, node running from `T0`.
fn running_pair(self_stake: u128, delegated: u128, commission_bps: u64) -> (World, Address, Address, Address) {
    let owner = addr("owner");
    let node = addr("node");
    let delegator = addr("delegator");
    let mut w = world(&[(&owner, self_stake), (&delegator, delegated)]);
    let reporter = w.reporter;
    w.ledger
        .register(&owner, &node, self_stake, commission_bps, "", T0)
        .expect("register");
    w.ledger.start(&reporter, &node, T0).expect("start");
    w.ledger.delegate(&delegator, &node, delegated, T0).expect("delegate");
    (w, owner, node, delegator)
}

proptest! {
    #[test]
    fn proptest_claim_timing_does_not_change_total(
        self_stake in 1u128..10_000_000 * TOKEN,
        delegated in 1u128..10_000_000 * TOKEN,
        commission_bps in 0u64..=10_000,
        mut checkpoints in prop::collection::vec(1u64..365 * DAY, 1..8),
    ) {
        let end = T0 + 365 * DAY;
        checkpoints.sort_unstable();

        let (mut once, owner, node, delegator) = running_pair(self_stake, delegated, commission_bps);
        let owner_once = once.ledger.node_claim_reward(&owner, &node, end).expect("claim");
        let delegator_once = once.ledger.delegator_claim_reward(&delegator, &node, end).expect("claim");

        let (mut often, owner, node, delegator) = running_pair(self_stake, delegated, commission_bps);
        let (mut owner_often, mut delegator_often) = (0u128, 0u128);
        for at in checkpoints.iter().map(|c| T0 + c).chain(std::iter::once(end)) {
            owner_often += often.ledger.node_claim_reward(&owner, &node, at).expect("claim");
            delegator_often += often.ledger.delegator_claim_reward(&delegator, &node, at).expect("claim");
        }

        prop_assert_eq!(owner_once, owner_often);
        prop_assert_eq!(delegator_once, delegator_often);
    }

    #[test]
    fn proptest_owner_and_delegator_split_gross_reward(
        self_stake in 1u128..10_000_000,
        delegated in 1u128..10_000_000,
        commission_bps in 0u64..=10_000,
        days in 1u64..=365,
    ) {
        let (self_stake, delegated) = (self_stake * TOKEN, delegated * TOKEN);
        let at = T0 + days * DAY;
        let (mut w, owner, node, delegator) = running_pair(self_stake, delegated, commission_bps);
        let apr = w.ledger.current_apr();

        let owner_paid = w.ledger.node_claim_reward(&owner, &node, at).expect("claim");
        let delegator_paid = w.ledger.delegator_claim_reward(&delegator, &node, at).expect("claim");

        let own = accrue(self_stake, apr, days * DAY);
        let delegated_gross = accrue(delegated, apr, days * DAY);
        // two floors on each side
        prop_assert!((owner_paid + delegator_paid).abs_diff(own + delegated_gross) <= 1);
        prop_assert!(owner_paid >= own);
    }
}
