//! Data structures of the staking ledger: node status, node records,
//! delegations and unbond requests.

use dsdn_common::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::internal_unbond_queue::BondingQueue;
use super::internal_uptime::UptimeTracker;

pub use dsdn_common::DEFAULT_LOCK_PERIOD_SECS;

// ════════════════════════════════════════════════════════════════════════════
// NODE STATUS
// ════════════════════════════════════════════════════════════════════════════

/// Lifecycle status of a staked node.
///
/// ```text
/// From          → To             Trigger
/// ─────────────── ────────────── ─────────────────────────────
/// Registered    → Running        Start
/// Registered    → Unregistered   Unregister
/// Running       → Stopped        Stop
/// Running       → Unregistered   Unregister (implicit stop)
/// Stopped       → Running        Start
/// Stopped       → Unregistered   Unregister
/// Unregistered  → Registered     Register (after drain)
/// ```
///
/// Start while Running and Stop outside Running are no-ops, not transitions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeStatus {
    Registered,
    Running,
    Stopped,
    Unregistered,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeStatus::Registered => write!(f, "registered"),
            NodeStatus::Running => write!(f, "running"),
            NodeStatus::Stopped => write!(f, "stopped"),
            NodeStatus::Unregistered => write!(f, "unregistered"),
        }
    }
}

impl NodeStatus {
    #[must_use]
    #[inline]
    pub const fn can_transition_to(&self, target: NodeStatus) -> bool {
        matches!(
            (self, &target),
            (NodeStatus::Registered, NodeStatus::Running)
                | (NodeStatus::Registered, NodeStatus::Unregistered)
                | (NodeStatus::Running, NodeStatus::Stopped)
                | (NodeStatus::Running, NodeStatus::Unregistered)
                | (NodeStatus::Stopped, NodeStatus::Running)
                | (NodeStatus::Stopped, NodeStatus::Unregistered)
                | (NodeStatus::Unregistered, NodeStatus::Registered)
        )
    }

    /// Counts toward total active stake.
    #[must_use]
    #[inline]
    pub const fn is_active(&self) -> bool {
        !matches!(self, NodeStatus::Unregistered)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// UNBOND REQUEST
// ════════════════════════════════════════════════════════════════════════════

/// One time-locked withdrawal claim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnbondRequest {
    #[serde(with = "dsdn_common::types::amount_serde")]
    pub amount: u128,
    pub requested_at: u64,
    /// `requested_at + lock period`
    pub unlock_at: u64,
    pub withdrawn: bool,
}

impl UnbondRequest {
    pub fn new(amount: u128, requested_at: u64, lock_period_secs: u64) -> Self {
        Self {
            amount,
            requested_at,
            unlock_at: requested_at.saturating_add(lock_period_secs),
            withdrawn: false,
        }
    }

    pub fn is_matured(&self, now: u64) -> bool {
        now >= self.unlock_at
    }

    /// Matured and not yet paid out.
    pub fn is_withdrawable(&self, now: u64) -> bool {
        !self.withdrawn && self.is_matured(now)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// NODE RECORD
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeRecord {
    pub node: Address,
    /// Account that owns the self-stake. May be the node identity itself.
    pub owner: Address,
    #[serde(with = "dsdn_common::types::amount_serde")]
    pub self_stake: u128,
    #[serde(with = "dsdn_common::types::amount_serde")]
    pub total_delegated: u128,
    pub commission_bps: u64,
    pub description: String,
    pub status: NodeStatus,
    pub uptime: UptimeTracker,
    /// Uptime counter value at the owner's last settlement.
    pub reward_watermark: u64,
    /// Settled, not yet paid.
    #[serde(with = "dsdn_common::types::amount_serde")]
    pub pending_reward: u128,
    /// Sub-unit accrual remainder carried into the next settlement.
    #[serde(default, with = "dsdn_common::types::amount_serde")]
    pub reward_carry: u128,
    pub last_transition_at: u64,
    pub unbonds: BondingQueue,
}

impl NodeRecord {
    pub fn new(
        node: Address,
        owner: Address,
        self_stake: u128,
        commission_bps: u64,
        description: String,
        now: u64,
    ) -> Self {
        Self {
            node,
            owner,
            self_stake,
            total_delegated: 0,
            commission_bps,
            description,
            status: NodeStatus::Registered,
            uptime: UptimeTracker::default(),
            reward_watermark: 0,
            pending_reward: 0,
            reward_carry: 0,
            last_transition_at: now,
            unbonds: BondingQueue::default(),
        }
    }

    /// Self-stake plus delegated stake.
    pub fn total_stake(&self) -> u128 {
        self.self_stake.saturating_add(self.total_delegated)
    }

    /// Nothing left to pay the owner and nothing delegated.
    pub fn is_drained(&self) -> bool {
        self.unbonds.outstanding() == 0 && self.pending_reward == 0 && self.total_delegated == 0
    }
}

// ════════════════════════════════════════════════════════════════════════════
// DELEGATION
// ════════════════════════════════════════════════════════════════════════════

/// Stake from one delegator on one node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Delegation {
    pub delegator: Address,
    pub node: Address,
    #[serde(with = "dsdn_common::types::amount_serde")]
    pub amount: u128,
    /// Node uptime counter value at this delegator's last settlement.
    pub watermark: u64,
    #[serde(with = "dsdn_common::types::amount_serde")]
    pub pending_reward: u128,
    #[serde(default, with = "dsdn_common::types::amount_serde")]
    pub reward_carry: u128,
    pub unbonds: BondingQueue,
}

impl Delegation {
    pub fn new(delegator: Address, node: Address, watermark: u64) -> Self {
        Self {
            delegator,
            node,
            amount: 0,
            watermark,
            pending_reward: 0,
            reward_carry: 0,
            unbonds: BondingQueue::default(),
        }
    }

    /// Record no longer carries stake, queued withdrawals or reward.
    pub fn is_retired(&self) -> bool {
        self.amount == 0 && self.unbonds.outstanding() == 0 && self.pending_reward == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions() {
        use NodeStatus::*;
        assert!(Registered.can_transition_to(Running));
        assert!(Stopped.can_transition_to(Running));
        assert!(Running.can_transition_to(Unregistered));
        assert!(Unregistered.can_transition_to(Registered));
        assert!(!Running.can_transition_to(Running));
        assert!(!Registered.can_transition_to(Stopped));
        assert!(!Unregistered.can_transition_to(Running));
        assert!(!Unregistered.can_transition_to(Unregistered));
    }

    #[test]
    fn delegation_with_reward_is_not_retired() {
        let mut d = Delegation::new(Address::from_bytes([1; 20]), Address::from_bytes([2; 20]), 0);
        assert!(d.is_retired());
        d.pending_reward = 1;
        assert!(!d.is_retired());
    }
}
