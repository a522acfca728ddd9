//! Node lifecycle: Register, Start, Stop, Unregister, UpdateStake and the
//! admin supply setter.

use dsdn_common::{Address, TokenLedger};
use tracing::{debug, info};

use super::{NodeRecord, NodeStatus, StakingLedger};
use crate::apr::MAX_COMMISSION_BPS;
use crate::error::{InvalidStateReason, Role, StakingError, StakingResult};
use crate::events::LedgerEvent;

fn check_commission(commission_bps: u64) -> StakingResult<()> {
    if commission_bps > MAX_COMMISSION_BPS {
        return Err(StakingError::InvalidParameter(format!(
            "commission {} bps exceeds {}",
            commission_bps, MAX_COMMISSION_BPS
        )));
    }
    Ok(())
}

impl<T: TokenLedger> StakingLedger<T> {
    // ============================================================
    // REGISTRATION
    // ============================================================

    /// Register `node` with `amount` of self-stake pulled from `owner`.
    ///
    /// A node whose previous registration ended in Unregistered may come
    /// back once its old self-stake and reward have been paid out. Its
    /// uptime counter and surviving delegations carry over.
    pub fn register(
        &mut self,
        owner: &Address,
        node: &Address,
        amount: u128,
        commission_bps: u64,
        description: impl Into<String>,
        now: u64,
    ) -> StakingResult<()> {
        self.check_clock(now)?;
        if amount == 0 {
            return Err(StakingError::InvalidParameter("stake amount must be > 0".into()));
        }
        check_commission(commission_bps)?;

        let mut record = NodeRecord::new(*node, *owner, amount, commission_bps, description.into(), now);
        if let Some(previous) = self.nodes.get(node) {
            if previous.status.is_active() {
                return Err(InvalidStateReason::AlreadyRegistered(*node).into());
            }
            let outstanding = previous.unbonds.outstanding();
            if outstanding > 0 || previous.pending_reward > 0 {
                return Err(InvalidStateReason::PendingWithdrawal {
                    node: *node,
                    outstanding,
                    pending_reward: previous.pending_reward,
                }
                .into());
            }
            if self.delegations.get(node, owner).is_some() {
                return Err(InvalidStateReason::SelfDelegation {
                    owner: *owner,
                    node: *node,
                }
                .into());
            }
            record.uptime.accumulated = previous.uptime.effective(now);
            record.reward_watermark = record.uptime.accumulated;
            record.total_delegated = previous.total_delegated;
        }

        let contribution = record.total_stake();
        let total = self
            .total_active_stake
            .checked_add(contribution)
            .ok_or_else(|| StakingError::InvalidParameter("total stake overflow".into()))?;

        let ledger = self.config.ledger_account;
        self.token.transfer_from(&ledger, owner, &ledger, amount)?;

        self.nodes.insert(*node, record);
        self.total_active_stake = total;
        if !self.node_ids.contains(node) {
            self.node_ids.push(*node);
        }
        self.retired.remove(node);
        self.last_ts = now;

        info!(%node, %owner, amount, commission_bps, "node registered");
        self.emit(LedgerEvent::NodeRegistered {
            node: *node,
            owner: *owner,
            amount,
            commission_bps,
            timestamp: now,
        });
        Ok(())
    }

    // ============================================================
    // HEALTH REPORTING
    // ============================================================

    /// Mark `node` running. On an unregistered node, or one whose record
    /// was already dropped, this only drops it from the active set, which
    /// is safe to repeat.
    pub fn start(&mut self, caller: &Address, node: &Address, now: u64) -> StakingResult<()> {
        self.check_clock(now)?;
        self.require_health_reporter(caller)?;
        let status = match self.nodes.get(node) {
            Some(record) => record.status,
            None if self.retired.contains(node) => NodeStatus::Unregistered,
            None => return Err(InvalidStateReason::NodeNotFound(*node).into()),
        };

        match status {
            NodeStatus::Unregistered => {
                self.node_ids.retain(|id| id != node);
                self.prune_node_record(node);
                self.last_ts = now;
                debug!(%node, "start on unregistered node, removed from active set");
            }
            status if status.can_transition_to(NodeStatus::Running) => {
                let record = self
                    .nodes
                    .get_mut(node)
                    .ok_or(InvalidStateReason::NodeNotFound(*node))?;
                record.uptime.start(now);
                record.status = NodeStatus::Running;
                record.last_transition_at = now;
                self.last_ts = now;
                info!(%node, "node started");
                self.emit(LedgerEvent::NodeStarted {
                    node: *node,
                    timestamp: now,
                });
            }
            status => {
                self.last_ts = now;
                debug!(%node, %status, "start ignored");
            }
        }
        Ok(())
    }

    /// Mark `node` stopped, folding the session into its uptime counter.
    /// Anything but Running is left alone.
    pub fn stop(&mut self, caller: &Address, node: &Address, now: u64) -> StakingResult<()> {
        self.check_clock(now)?;
        self.require_health_reporter(caller)?;
        if !self.nodes.contains_key(node) && self.retired.contains(node) {
            self.last_ts = now;
            debug!(%node, "stop on retired node ignored");
            return Ok(());
        }
        let record = self
            .nodes
            .get_mut(node)
            .ok_or(InvalidStateReason::NodeNotFound(*node))?;
        self.last_ts = now;
        if !record.status.can_transition_to(NodeStatus::Stopped) {
            debug!(%node, status = %record.status, "stop ignored");
            return Ok(());
        }
        let session_secs = record.uptime.stop(now);
        record.status = NodeStatus::Stopped;
        record.last_transition_at = now;

        info!(%node, session_secs, "node stopped");
        self.emit(LedgerEvent::NodeStopped {
            node: *node,
            session_secs,
            timestamp: now,
        });
        Ok(())
    }

    // ============================================================
    // UNREGISTER
    // ============================================================

    /// Stop, settle, and move the whole self-stake into one unbond request.
    /// Delegations stay in place and unwind on their own.
    pub fn unregister(&mut self, caller: &Address, node: &Address, now: u64) -> StakingResult<()> {
        self.check_clock(now)?;
        let record = self.node_record(node)?;
        if record.owner != *caller {
            return Err(StakingError::unauthorized(caller, Role::NodeOwner));
        }
        if !record.status.can_transition_to(NodeStatus::Unregistered) {
            return Err(InvalidStateReason::AlreadyUnregistered(*node).into());
        }
        let owner = record.owner;
        let lock = self.config.lock_period_secs;

        let (staged, amount) = self.settle_then_mutate(node, None, now, |s| {
            s.node.uptime.stop(now);
            let amount = s.node.self_stake;
            if amount > 0 {
                s.node.unbonds.push(amount, now, lock);
            }
            s.total_active_stake = s.total_active_stake.saturating_sub(s.node.total_stake());
            s.node.self_stake = 0;
            s.node.status = NodeStatus::Unregistered;
            s.node.last_transition_at = now;
            Ok(amount)
        })?;
        self.commit(staged, now);

        info!(%node, %owner, amount, "node unregistered");
        self.emit(LedgerEvent::NodeUnregistered {
            node: *node,
            owner,
            amount,
            timestamp: now,
        });
        Ok(())
    }

    // ============================================================
    // UPDATE STAKE
    // ============================================================

    /// Set the self-stake to `new_amount` (absolute), pulling or returning
    /// the difference immediately, and replace description and commission.
    pub fn update_stake(
        &mut self,
        caller: &Address,
        node: &Address,
        new_amount: u128,
        description: impl Into<String>,
        new_commission_bps: u64,
        now: u64,
    ) -> StakingResult<()> {
        self.check_clock(now)?;
        if new_amount == 0 {
            return Err(StakingError::InvalidParameter(
                "stake amount must be > 0, unregister instead".into(),
            ));
        }
        check_commission(new_commission_bps)?;
        let record = self.node_record(node)?;
        if record.owner != *caller {
            return Err(StakingError::unauthorized(caller, Role::NodeOwner));
        }
        if !record.status.is_active() {
            return Err(InvalidStateReason::NodeUnregistered(*node).into());
        }
        let owner = record.owner;
        let commission_changed = record.commission_bps != new_commission_bps;
        let description = description.into();

        let (mut staged, old_amount) = self.settle_then_mutate(node, None, now, |s| {
            let old = s.node.self_stake;
            let total = s.total_active_stake.saturating_sub(old);
            s.total_active_stake = total
                .checked_add(new_amount)
                .ok_or_else(|| StakingError::InvalidParameter("total stake overflow".into()))?;
            s.node.self_stake = new_amount;
            s.node.description = description;
            Ok(old)
        })?;
        if commission_changed {
            // siblings settle at the old rate before it changes
            self.settle_siblings(&mut staged, now);
            staged.node.commission_bps = new_commission_bps;
        }

        let ledger = self.config.ledger_account;
        if new_amount > old_amount {
            self.token
                .transfer_from(&ledger, &owner, &ledger, new_amount - old_amount)?;
        } else if new_amount < old_amount {
            self.token.transfer(&ledger, &owner, old_amount - new_amount)?;
        }
        self.commit(staged, now);

        info!(%node, old_amount, new_amount, commission_bps = new_commission_bps, "stake updated");
        self.emit(LedgerEvent::StakeUpdated {
            node: *node,
            owner,
            old_amount,
            new_amount,
            commission_bps: new_commission_bps,
            timestamp: now,
        });
        Ok(())
    }

    // ============================================================
    // ADMIN
    // ============================================================

    pub fn set_circulating_supply(&mut self, caller: &Address, supply: u128, now: u64) -> StakingResult<()> {
        self.check_clock(now)?;
        if *caller != self.config.admin {
            return Err(StakingError::unauthorized(caller, Role::Admin));
        }
        self.circulating_supply = supply;
        self.last_ts = now;
        info!(supply, apr = self.current_apr(), "circulating supply updated");
        self.emit(LedgerEvent::CirculatingSupplyUpdated {
            supply,
            timestamp: now,
        });
        Ok(())
    }

    // ============================================================
    // CLEANUP
    // ============================================================

    /// Unregistered and owed nothing: leave the active set.
    pub(crate) fn retire_node_if_drained(&mut self, node: &Address) {
        let drained = self
            .nodes
            .get(node)
            .map(|r| !r.status.is_active() && r.is_drained())
            .unwrap_or(false);
        if drained {
            self.node_ids.retain(|id| id != node);
            debug!(%node, "node left active set");
        }
        self.prune_node_record(node);
    }

    /// Drop the record of a retired node once no delegation refers to it.
    /// The identity is remembered so health reports on it stay no-ops.
    pub(crate) fn prune_node_record(&mut self, node: &Address) {
        let removable = self
            .nodes
            .get(node)
            .map(|r| !r.status.is_active() && r.is_drained())
            .unwrap_or(false)
            && !self.node_ids.contains(node)
            && self.delegations.count_for_node(node) == 0;
        if removable {
            self.nodes.remove(node);
            self.retired.insert(*node);
            debug!(%node, "node record dropped");
        }
    }

    fn require_health_reporter(&self, caller: &Address) -> StakingResult<()> {
        if *caller != self.config.health_reporter {
            return Err(StakingError::unauthorized(caller, Role::HealthReporter));
        }
        Ok(())
    }
}
