//! Ledger scenario tests.
//!
//! - `lifecycle_tests`: register / start / stop / unregister / update_stake
//! - `reward_tests`: accrual, commission split, claims
//! - `bonding_tests`: delegate, unbond, withdraw, cleanup


use dsdn_common::{Address, InMemoryToken, LedgerConfig, TokenLedger};

use super::StakingLedger;

pub(crate) const TOKEN: u128 = 1_000_000_000_000_000_000;
pub(crate) const DAY: u64 = 86_400;
pub(crate) const YEAR: u64 = 365 * DAY;
pub(crate) const LOCK: u64 = 604_800;
/// Arbitrary genesis timestamp
pub(crate) const T0: u64 = 1_700_000_000;

// ════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ════════════════════════════════════════════════════════════

pub(crate) struct Fixture {
    pub ledger: StakingLedger<InMemoryToken>,
    pub reporter: Address,
    pub admin: Address,
    pub vault: Address,
    pub ledger_account: Address,
}

pub(crate) fn owner(n: u8) -> Address {
    Address::from_label(&format!("owner-{}", n))
}

pub(crate) fn node(n: u8) -> Address {
    Address::from_label(&format!("node-{}", n))
}

pub(crate) fn delegator(n: u8) -> Address {
    Address::from_label(&format!("delegator-{}", n))
}

/// Fresh ledger with a funded reward vault.
pub(crate) fn fixture() -> Fixture {
    let cfg = LedgerConfig::default();
    let reporter = cfg.health_reporter;
    let admin = cfg.admin;
    let vault = cfg.reward_vault;
    let ledger_account = cfg.ledger_account;

    let mut token = InMemoryToken::new();
    token.mint(&vault, 100_000_000 * TOKEN).expect("mint vault");
    token.approve(&vault, &ledger_account, u128::MAX);

    Fixture {
        ledger: StakingLedger::new(cfg, token),
        reporter,
        admin,
        vault,
        ledger_account,
    }
}

impl Fixture {
    /// Mint `amount` to `who` and approve the ledger without limit.
    pub fn fund(&mut self, who: &Address, amount: u128) {
        let ledger_account = self.ledger_account;
        let token = self.ledger.token_mut();
        token.mint(who, amount).expect("mint");
        token.approve(who, &ledger_account, u128::MAX);
    }

    pub fn balance(&self, who: &Address) -> u128 {
        self.ledger.token().balance_of(who)
    }

    /// Fund owner `n`, register node `n` with `stake` and start it at `at`.
    pub fn register_running(&mut self, n: u8, stake: u128, commission_bps: u64, at: u64) -> (Address, Address) {
        let (o, nd) = (owner(n), node(n));
        self.fund(&o, stake);
        self.ledger
            .register(&o, &nd, stake, commission_bps, format!("node {}", n), at)
            .expect("register");
        let reporter = self.reporter;
        self.ledger.start(&reporter, &nd, at).expect("start");
        (o, nd)
    }

    /// Fund delegators `1..=count` with `amount` each and delegate to `nd`.
    pub fn delegate_many(&mut self, nd: &Address, count: u8, amount: u128, at: u64) -> Vec<Address> {
        (1..=count)
            .map(|i| {
                let d = delegator(i);
                self.fund(&d, amount);
                self.ledger.delegate(&d, nd, amount, at).expect("delegate");
                d
            })
            .collect()
    }

    pub fn assert_stake_invariant(&self) {
        assert_eq!(
            self.ledger.total_active_stake(),
            self.ledger.computed_active_stake(),
            "total active stake drifted from node records"
        );
    }
}
