//! Read-only views. None of these fail on business grounds; unknown nodes
//! and delegators read as zero.

use dsdn_common::{Address, TokenLedger};

use super::internal_rewards::{settle_delegation, settle_node};
use super::{Delegation, NodeRecord, NodeStatus, StakingLedger};

impl<T: TokenLedger> StakingLedger<T> {
    /// APR (bps) the next settlement would apply.
    pub fn current_apr(&self) -> u64 {
        self.apr_policy
            .apr_bps(self.total_active_stake, self.circulating_supply)
    }

    pub fn total_active_stake(&self) -> u128 {
        self.total_active_stake
    }

    pub fn circulating_supply(&self) -> u128 {
        self.circulating_supply
    }

    /// Active-node set in registration order.
    pub fn node_ids(&self) -> &[Address] {
        &self.node_ids
    }

    pub fn node(&self, node: &Address) -> Option<&NodeRecord> {
        self.nodes.get(node)
    }

    pub fn node_status(&self, node: &Address) -> Option<NodeStatus> {
        self.nodes.get(node).map(|r| r.status)
    }

    pub fn delegation(&self, node: &Address, delegator: &Address) -> Option<&Delegation> {
        self.delegations.get(node, delegator)
    }

    pub fn delegations_for(&self, node: &Address) -> Vec<&Delegation> {
        self.delegations.for_node(node).collect()
    }

    /// Every delegation held by `delegator`, ordered by node.
    pub fn delegations_of<'a>(&'a self, delegator: &'a Address) -> Vec<&'a Delegation> {
        self.delegations.of_delegator(delegator).collect()
    }

    /// What `node_withdraw` would pay at `now`.
    pub fn node_withdrawable(&self, node: &Address, now: u64) -> u128 {
        self.nodes
            .get(node)
            .map(|r| r.unbonds.withdrawable(now))
            .unwrap_or(0)
    }

    /// What `delegator_withdraw` would pay at `now`.
    pub fn delegator_withdrawable(&self, node: &Address, delegator: &Address, now: u64) -> u128 {
        self.delegations
            .get(node, delegator)
            .map(|d| d.unbonds.withdrawable(now))
            .unwrap_or(0)
    }

    /// What `node_claim_reward` would pay at `now`.
    pub fn node_claimable(&self, node: &Address, now: u64) -> u128 {
        match self.nodes.get(node) {
            Some(record) => {
                let mut record = record.clone();
                settle_node(&mut record, self.current_apr(), now);
                record.pending_reward
            }
            None => 0,
        }
    }

    /// What `delegator_claim_reward` would pay at `now`.
    pub fn delegator_claimable(&self, node: &Address, delegator: &Address, now: u64) -> u128 {
        let (Some(record), Some(d)) = (self.nodes.get(node), self.delegations.get(node, delegator)) else {
            return 0;
        };
        let mut d = d.clone();
        settle_delegation(&mut d, record, self.current_apr(), now);
        d.pending_reward
    }

    /// Cumulative uptime counter, including a running session.
    pub fn node_uptime(&self, node: &Address, now: u64) -> u64 {
        self.nodes
            .get(node)
            .map(|r| r.uptime.effective(now))
            .unwrap_or(0)
    }

    /// Length of the current running session; 0 while stopped.
    pub fn current_session_uptime(&self, node: &Address, now: u64) -> u64 {
        self.nodes
            .get(node)
            .map(|r| r.uptime.session(now))
            .unwrap_or(0)
    }

    /// Σ(self + delegated) over non-unregistered nodes, recomputed from records.
    pub fn computed_active_stake(&self) -> u128 {
        self.nodes
            .values()
            .filter(|r| r.status.is_active())
            .fold(0u128, |acc, r| acc.saturating_add(r.total_stake()))
    }

    pub fn last_timestamp(&self) -> u64 {
        self.last_ts
    }
}
