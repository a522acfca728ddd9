//! # Staking Ledger State
//!
//! Entry point and facade for the staking ledger. The `StakingLedger`
//! struct is defined here; its operations are split across `internal_*`
//! files as separate `impl` blocks.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         mod.rs (FACADE)                         │
//! │  - StakingLedger struct definition                              │
//! │  - Constructors, clock guard, event buffer                      │
//! └─────────────────────────────────────────────────────────────────┘
//!                                    │
//!          ┌─────────────────────────┼─────────────────────────┐
//!          ▼                         ▼                         ▼
//!  ┌──────────────┐         ┌──────────────┐         ┌──────────────┐
//!  │  Lifecycle   │         │  Delegation  │         │   Bonding    │
//!  │ register/... │         │   Ledger     │         │    Queue     │
//!  └──────────────┘         └──────────────┘         └──────────────┘
//!          │                         │                         │
//!          └─────────────┬───────────┴─────────────┬───────────┘
//!                        ▼                         ▼
//!                ┌──────────────┐          ┌──────────────┐
//!                │   Rewards    │◄─────────│    Uptime    │
//!                │  settlement  │          │   Tracker    │
//!                └──────────────┘          └──────────────┘
//! ```
//!
//! ## Module Structure
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `internal_model` | NodeStatus, NodeRecord, Delegation, UnbondRequest |
//! | `internal_uptime` | Cumulative uptime counter |
//! | `internal_delegation` | DelegationLedger, delegate |
//! | `internal_unbond_queue` | BondingQueue, unbond, withdraw |
//! | `internal_rewards` | settlement, settle_then_mutate, claims |
//! | `internal_lifecycle` | register, start, stop, unregister, update_stake |
//! | `internal_queries` | read-only views |
//!
//! ## Time
//!
//! Every operation takes `now` (Unix seconds) from the caller. A mutation
//! older than the newest committed one fails with `ClockRegression`.
//!
//! ## Atomicity
//!
//! Operations stage their changes on copies, make at most one token call,
//! then commit. A rejected token call leaves the ledger untouched.

use dsdn_common::{Address, LedgerConfig, TokenLedger};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::trace;

use crate::apr::{AprPolicy, SaturatingInverseCurve};
use crate::error::{InvalidStateReason, StakingResult};
use crate::events::LedgerEvent;

// ════════════════════════════════════════════════════════════════════════════
// INTERNAL MODULES
// ════════════════════════════════════════════════════════════════════════════

/// NodeStatus, NodeRecord, Delegation, UnbondRequest, DEFAULT_LOCK_PERIOD_SECS
mod internal_model;

/// UptimeTracker: live cumulative uptime per node
mod internal_uptime;

/// DelegationLedger + delegate
mod internal_delegation;

/// BondingQueue + unbond, node_withdraw, delegator_withdraw
mod internal_unbond_queue;

/// settle_node, settle_delegation, settle_then_mutate, claims
mod internal_rewards;

/// register, start, stop, unregister, update_stake, set_circulating_supply
mod internal_lifecycle;

/// Read-only queries
mod internal_queries;

#[cfg(test)]
mod tests;

// ════════════════════════════════════════════════════════════════════════════
// PUBLIC RE-EXPORTS
// ════════════════════════════════════════════════════════════════════════════

pub use internal_delegation::DelegationLedger;
pub use internal_model::{
    Delegation, NodeRecord, NodeStatus, UnbondRequest, DEFAULT_LOCK_PERIOD_SECS,
};
pub use internal_unbond_queue::BondingQueue;
pub use internal_uptime::UptimeTracker;

pub(crate) use internal_rewards::Staged;

// ════════════════════════════════════════════════════════════════════════════
// STAKING LEDGER
// ════════════════════════════════════════════════════════════════════════════

pub struct StakingLedger<T: TokenLedger> {
    pub(crate) config: LedgerConfig,
    pub(crate) token: T,
    pub(crate) apr_policy: Box<dyn AprPolicy>,
    pub(crate) nodes: BTreeMap<Address, NodeRecord>,
    pub(crate) delegations: DelegationLedger,
    /// Active-node set in registration order.
    pub(crate) node_ids: Vec<Address>,
    /// Identities whose drained records were dropped.
    pub(crate) retired: BTreeSet<Address>,
    pub(crate) total_active_stake: u128,
    pub(crate) circulating_supply: u128,
    pub(crate) events: Vec<LedgerEvent>,
    /// Newest committed timestamp.
    pub(crate) last_ts: u64,
}

impl<T: TokenLedger> fmt::Debug for StakingLedger<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StakingLedger")
            .field("nodes", &self.nodes.len())
            .field("delegations", &self.delegations.len())
            .field("total_active_stake", &self.total_active_stake)
            .field("circulating_supply", &self.circulating_supply)
            .field("apr_policy", &self.apr_policy)
            .field("last_ts", &self.last_ts)
            .finish()
    }
}

impl<T: TokenLedger> StakingLedger<T> {
    /// Ledger with the default APR curve built from `config.apr`.
    pub fn new(config: LedgerConfig, token: T) -> Self {
        let curve = SaturatingInverseCurve::from(config.apr);
        Self::with_policy(config, token, Box::new(curve))
    }

    pub fn with_policy(config: LedgerConfig, token: T, apr_policy: Box<dyn AprPolicy>) -> Self {
        let circulating_supply = config.circulating_supply;
        Self {
            config,
            token,
            apr_policy,
            nodes: BTreeMap::new(),
            delegations: DelegationLedger::default(),
            node_ids: Vec::new(),
            retired: BTreeSet::new(),
            total_active_stake: 0,
            circulating_supply,
            events: Vec::new(),
            last_ts: 0,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn token(&self) -> &T {
        &self.token
    }

    /// Direct access to the token backend, for funding accounts and approvals.
    pub fn token_mut(&mut self) -> &mut T {
        &mut self.token
    }

    /// Take every buffered event, oldest first.
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn emit(&mut self, event: LedgerEvent) {
        trace!(kind = event.kind(), "event buffered");
        self.events.push(event);
    }

    pub(crate) fn check_clock(&self, now: u64) -> StakingResult<()> {
        if now < self.last_ts {
            return Err(InvalidStateReason::ClockRegression {
                last: self.last_ts,
                now,
            }
            .into());
        }
        Ok(())
    }

    pub(crate) fn node_record(&self, node: &Address) -> StakingResult<&NodeRecord> {
        self.nodes
            .get(node)
            .ok_or_else(|| InvalidStateReason::NodeNotFound(*node).into())
    }
}
