//! Reward settlement and claims.
//!
//! Settlement converts uptime accrued since a staker's watermark into
//! `pending_reward` and moves the watermark to the current counter.
//! Every mutator that changes a stake amount goes through
//! [`StakingLedger::settle_then_mutate`], so a window is always valued at
//! the amount that was bonded during it.

use dsdn_common::{Address, TokenLedger, BPS_DENOMINATOR};
use tracing::{debug, info};

use super::{Delegation, NodeRecord, StakingLedger};
use crate::apr::{accrue_weighted, weighted_stake};
use crate::error::{InvalidStateReason, Role, StakingError, StakingResult};
use crate::events::LedgerEvent;

// ════════════════════════════════════════════════════════════════════════════
// SETTLEMENT
// ════════════════════════════════════════════════════════════════════════════

/// Settle the owner's component: reward on self-stake plus commission on
/// delegated stake. Returns the amount added to `pending_reward`.
pub(crate) fn settle_node(node: &mut NodeRecord, apr_bps: u64, now: u64) -> u128 {
    let current = node.uptime.effective(now);
    let delta = current.saturating_sub(node.reward_watermark);
    let weighted = weighted_stake(node.self_stake, BPS_DENOMINATOR)
        .saturating_add(weighted_stake(node.total_delegated, node.commission_bps));
    let earned = accrue_weighted(weighted, apr_bps, delta, &mut node.reward_carry);
    node.pending_reward = node.pending_reward.saturating_add(earned);
    node.reward_watermark = current;
    earned
}

/// Settle one delegator's component net of the node's commission.
pub(crate) fn settle_delegation(
    delegation: &mut Delegation,
    node: &NodeRecord,
    apr_bps: u64,
    now: u64,
) -> u128 {
    let current = node.uptime.effective(now);
    let delta = current.saturating_sub(delegation.watermark);
    let keep_bps = BPS_DENOMINATOR.saturating_sub(node.commission_bps);
    let net = accrue_weighted(
        weighted_stake(delegation.amount, keep_bps),
        apr_bps,
        delta,
        &mut delegation.reward_carry,
    );
    delegation.pending_reward = delegation.pending_reward.saturating_add(net);
    delegation.watermark = current;
    net
}

/// Working copies of everything one operation may change. Nothing here is
/// visible until [`StakingLedger::commit`].
#[derive(Debug, Clone)]
pub(crate) struct Staged {
    pub node: NodeRecord,
    /// The caller's delegation, when the caller is a delegator.
    pub delegation: Option<Delegation>,
    /// Other delegations of the node touched by the operation.
    pub siblings: Vec<Delegation>,
    pub total_active_stake: u128,
}

impl<T: TokenLedger> StakingLedger<T> {
    /// Clone the node (and the delegator's record, created empty on first
    /// use), settle both at the current APR, then apply `mutate` to the
    /// copies. The caller performs its token call and then commits.
    pub(crate) fn settle_then_mutate<R, F>(
        &self,
        node: &Address,
        delegator: Option<&Address>,
        now: u64,
        mutate: F,
    ) -> StakingResult<(Staged, R)>
    where
        F: FnOnce(&mut Staged) -> StakingResult<R>,
    {
        let apr = self.current_apr();
        let mut record = self.node_record(node)?.clone();

        let delegation = delegator.map(|who| {
            let mut d = self
                .delegations
                .get(node, who)
                .cloned()
                .unwrap_or_else(|| Delegation::new(*who, *node, record.uptime.effective(now)));
            let earned = settle_delegation(&mut d, &record, apr, now);
            debug!(delegator = %who, %node, earned, apr, "delegation settled");
            d
        });
        let earned = settle_node(&mut record, apr, now);
        debug!(%node, earned, apr, "node settled");

        let mut staged = Staged {
            node: record,
            delegation,
            siblings: Vec::new(),
            total_active_stake: self.total_active_stake,
        };
        let out = mutate(&mut staged)?;
        Ok((staged, out))
    }

    /// Settle every delegation of `node` except the caller's, at the rate
    /// in force before the operation.
    pub(crate) fn settle_siblings(&self, staged: &mut Staged, now: u64) {
        let apr = self.current_apr();
        let skip = staged.delegation.as_ref().map(|d| d.delegator);
        staged.siblings = self
            .delegations
            .for_node(&staged.node.node)
            .filter(|d| Some(d.delegator) != skip)
            .cloned()
            .map(|mut d| {
                settle_delegation(&mut d, &staged.node, apr, now);
                d
            })
            .collect();
    }

    /// Publish staged copies.
    pub(crate) fn commit(&mut self, staged: Staged, now: u64) {
        let Staged {
            node,
            delegation,
            siblings,
            total_active_stake,
        } = staged;
        if let Some(d) = delegation {
            self.delegations.put(d);
        }
        for d in siblings {
            self.delegations.put(d);
        }
        self.nodes.insert(node.node, node);
        self.total_active_stake = total_active_stake;
        self.last_ts = now;
    }

    // ════════════════════════════════════════════════════════════════════════
    // CLAIMS
    // ════════════════════════════════════════════════════════════════════════

    /// Settle and pay the owner's reward from the reward vault.
    /// Returns the amount paid; zero accrued uptime pays 0.
    pub fn node_claim_reward(&mut self, caller: &Address, node: &Address, now: u64) -> StakingResult<u128> {
        self.check_clock(now)?;
        let owner = self.node_record(node)?.owner;
        if owner != *caller {
            return Err(StakingError::unauthorized(caller, Role::NodeOwner));
        }

        let (staged, payout) = self.settle_then_mutate(node, None, now, |s| {
            let payout = s.node.pending_reward;
            s.node.pending_reward = 0;
            Ok(payout)
        })?;
        self.pay_reward(&owner, payout)?;
        self.commit(staged, now);
        self.retire_node_if_drained(node);

        info!(%node, %owner, payout, "node reward claimed");
        self.emit(LedgerEvent::NodeRewardClaimed {
            node: *node,
            owner,
            amount: payout,
            timestamp: now,
        });
        Ok(payout)
    }

    /// Settle and pay `delegator`'s reward on `node`.
    pub fn delegator_claim_reward(
        &mut self,
        delegator: &Address,
        node: &Address,
        now: u64,
    ) -> StakingResult<u128> {
        self.check_clock(now)?;
        self.node_record(node)?;
        if self.delegations.get(node, delegator).is_none() {
            return Err(InvalidStateReason::NoDelegation {
                delegator: *delegator,
                node: *node,
            }
            .into());
        }

        let (staged, payout) = self.settle_then_mutate(node, Some(delegator), now, |s| {
            let d = s.delegation.as_mut().ok_or(InvalidStateReason::NoDelegation {
                delegator: *delegator,
                node: *node,
            })?;
            let payout = d.pending_reward;
            d.pending_reward = 0;
            Ok(payout)
        })?;
        self.pay_reward(delegator, payout)?;
        self.commit(staged, now);
        self.prune_node_record(node);

        info!(%delegator, %node, payout, "delegator reward claimed");
        self.emit(LedgerEvent::DelegatorRewardClaimed {
            delegator: *delegator,
            node: *node,
            amount: payout,
            timestamp: now,
        });
        Ok(payout)
    }

    fn pay_reward(&mut self, to: &Address, amount: u128) -> StakingResult<()> {
        if amount == 0 {
            return Ok(());
        }
        let ledger = self.config.ledger_account;
        let vault = self.config.reward_vault;
        self.token.transfer_from(&ledger, &vault, to, amount)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::NodeStatus;

    const TOKEN: u128 = 1_000_000_000_000_000_000;
    const DAY: u64 = 86_400;

    fn running_node(self_stake: u128, delegated: u128, commission_bps: u64) -> NodeRecord {
        let mut node = NodeRecord::new(
            Address::from_bytes([9; 20]),
            Address::from_bytes([1; 20]),
            self_stake,
            commission_bps,
            String::new(),
            0,
        );
        node.total_delegated = delegated;
        node.status = NodeStatus::Running;
        node.uptime.start(0);
        node
    }

    #[test]
    fn settle_node_pays_self_stake_and_commission() {
        let mut node = running_node(1_000_000 * TOKEN, 9_000_000 * TOKEN, 1_000);
        let earned = settle_node(&mut node, 8_000, 365 * DAY);
        assert_eq!(earned, 1_520_000 * TOKEN);
        assert_eq!(node.pending_reward, earned);
        assert_eq!(node.reward_watermark, 365 * DAY);
    }

    #[test]
    fn settle_twice_at_same_time_adds_nothing() {
        let mut node = running_node(1_000_000 * TOKEN, 0, 0);
        settle_node(&mut node, 8_000, 73 * DAY);
        assert_eq!(settle_node(&mut node, 8_000, 73 * DAY), 0);
        assert_eq!(node.pending_reward, 160_000 * TOKEN);
    }

    #[test]
    fn settle_delegation_is_net_of_commission() {
        let node = running_node(1_000_000 * TOKEN, 1_000_000 * TOKEN, 1_000);
        let mut d = Delegation::new(Address::from_bytes([2; 20]), node.node, 0);
        d.amount = 1_000_000 * TOKEN;
        assert_eq!(settle_delegation(&mut d, &node, 8_000, 365 * DAY), 720_000 * TOKEN);
        assert_eq!(d.watermark, 365 * DAY);
    }

    #[test]
    fn daily_settlement_matches_one_settlement() {
        // 8 units a year: each day alone rounds to nothing
        let mut daily = running_node(10, 0, 0);
        let mut once = daily.clone();
        let mut total = 0;
        for day in 1..=365 {
            total += settle_node(&mut daily, 8_000, day * DAY);
        }
        assert_eq!(total, settle_node(&mut once, 8_000, 365 * DAY));
        assert_eq!(total, 8);
    }

    #[test]
    fn stopped_time_is_not_rewarded() {
        let mut node = running_node(1_000_000 * TOKEN, 0, 0);
        node.uptime.stop(73 * DAY);
        node.status = NodeStatus::Stopped;
        assert_eq!(settle_node(&mut node, 8_000, 365 * DAY), 160_000 * TOKEN);
    }
}
