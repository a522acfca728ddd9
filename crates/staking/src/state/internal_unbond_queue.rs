//! Time-locked unbond queue and the Unbond / Withdraw operations.

use dsdn_common::{Address, TokenLedger};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Staged, StakingLedger, UnbondRequest};
use crate::error::{InvalidStateReason, Role, StakingError, StakingResult};
use crate::events::LedgerEvent;

// ════════════════════════════════════════════════════════════════════════════
// BONDING QUEUE
// ════════════════════════════════════════════════════════════════════════════

/// Per-staker list of unbond requests. Each matures on its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BondingQueue {
    requests: Vec<UnbondRequest>,
}

impl BondingQueue {
    pub fn push(&mut self, amount: u128, now: u64, lock_period_secs: u64) -> &UnbondRequest {
        self.requests.push(UnbondRequest::new(amount, now, lock_period_secs));
        let last = self.requests.len() - 1;
        &self.requests[last]
    }

    /// What a withdraw at `now` would pay.
    pub fn withdrawable(&self, now: u64) -> u128 {
        self.requests
            .iter()
            .filter(|r| r.is_withdrawable(now))
            .fold(0u128, |acc, r| acc.saturating_add(r.amount))
    }

    /// Mark matured requests withdrawn and return their sum.
    pub fn take_matured(&mut self, now: u64) -> u128 {
        let mut total: u128 = 0;
        for req in self.requests.iter_mut().filter(|r| r.is_withdrawable(now)) {
            req.withdrawn = true;
            total = total.saturating_add(req.amount);
        }
        total
    }

    /// Sum of requests not yet withdrawn, matured or not.
    pub fn outstanding(&self) -> u128 {
        self.requests
            .iter()
            .filter(|r| !r.withdrawn)
            .fold(0u128, |acc, r| acc.saturating_add(r.amount))
    }

    pub fn requests(&self) -> &[UnbondRequest] {
        &self.requests
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LEDGER OPERATIONS
// ════════════════════════════════════════════════════════════════════════════

impl<T: TokenLedger> StakingLedger<T> {
    /// Move `amount` of `staker`'s active stake on `node` into a new unbond
    /// request. The owner unbonds self-stake, anyone else unbonds their
    /// delegation. Returns the request's unlock time.
    pub fn unbond(
        &mut self,
        staker: &Address,
        node: &Address,
        amount: u128,
        now: u64,
    ) -> StakingResult<u64> {
        self.check_clock(now)?;
        if amount == 0 {
            return Err(StakingError::InvalidParameter("unbond amount must be > 0".into()));
        }
        let owner = self.node_record(node)?.owner;
        let lock = self.config.lock_period_secs;
        let delegator = if *staker == owner { None } else { Some(staker) };

        let (staged, unlock_at) = self.settle_then_mutate(node, delegator, now, |s: &mut Staged| {
            let counts = s.node.status.is_active();
            let unlock_at = match s.delegation.as_mut() {
                None => {
                    if amount > s.node.self_stake {
                        return Err(StakingError::InsufficientStake {
                            requested: amount,
                            available: s.node.self_stake,
                        });
                    }
                    s.node.self_stake -= amount;
                    s.node.unbonds.push(amount, now, lock).unlock_at
                }
                Some(d) => {
                    if amount > d.amount {
                        return Err(StakingError::InsufficientStake {
                            requested: amount,
                            available: d.amount,
                        });
                    }
                    d.amount -= amount;
                    s.node.total_delegated = s.node.total_delegated.saturating_sub(amount);
                    d.unbonds.push(amount, now, lock).unlock_at
                }
            };
            if counts {
                s.total_active_stake = s.total_active_stake.saturating_sub(amount);
            }
            Ok(unlock_at)
        })?;

        self.commit(staged, now);
        info!(%staker, %node, amount, unlock_at, "unbonded");
        self.emit(LedgerEvent::Unbonded {
            staker: *staker,
            node: *node,
            amount,
            unlock_at,
            timestamp: now,
        });
        Ok(unlock_at)
    }

    /// Pay out the owner's matured self-stake requests.
    pub fn node_withdraw(&mut self, caller: &Address, node: &Address, now: u64) -> StakingResult<u128> {
        self.check_clock(now)?;
        let mut record = self.node_record(node)?.clone();
        if record.owner != *caller {
            return Err(StakingError::unauthorized(caller, Role::NodeOwner));
        }
        let amount = record.unbonds.take_matured(now);
        if amount > 0 {
            let ledger = self.config.ledger_account;
            self.token.transfer(&ledger, &record.owner, amount)?;
        }
        let owner = record.owner;
        self.nodes.insert(*node, record);
        self.last_ts = now;

        self.retire_node_if_drained(node);
        info!(%node, %owner, amount, "node stake withdrawn");
        self.emit(LedgerEvent::NodeWithdrawn {
            node: *node,
            owner,
            amount,
            timestamp: now,
        });
        Ok(amount)
    }

    /// Pay out a delegator's matured requests on `node`.
    pub fn delegator_withdraw(
        &mut self,
        delegator: &Address,
        node: &Address,
        now: u64,
    ) -> StakingResult<u128> {
        self.check_clock(now)?;
        let mut delegation = self
            .delegations
            .get(node, delegator)
            .cloned()
            .ok_or(InvalidStateReason::NoDelegation {
                delegator: *delegator,
                node: *node,
            })?;
        let amount = delegation.unbonds.take_matured(now);
        if amount > 0 {
            let ledger = self.config.ledger_account;
            self.token.transfer(&ledger, delegator, amount)?;
        }
        self.delegations.put(delegation);
        self.last_ts = now;

        self.prune_node_record(node);
        debug!(%delegator, %node, amount, "delegator withdraw");
        self.emit(LedgerEvent::DelegatorWithdrawn {
            delegator: *delegator,
            node: *node,
            amount,
            timestamp: now,
        });
        Ok(amount)
    }
}
