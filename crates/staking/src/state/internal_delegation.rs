//! Delegation bookkeeping: node → delegator → [`Delegation`], plus the
//! Delegate operation.
//!
//! Each record carries its own reward watermark. Nothing about a
//! delegator's settlement lives in global state.

use dsdn_common::{Address, TokenLedger};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use super::{Delegation, StakingLedger};
use crate::error::{InvalidStateReason, StakingError, StakingResult};
use crate::events::LedgerEvent;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DelegationLedger {
    by_node: BTreeMap<Address, BTreeMap<Address, Delegation>>,
}

impl DelegationLedger {
    pub fn get(&self, node: &Address, delegator: &Address) -> Option<&Delegation> {
        self.by_node.get(node).and_then(|m| m.get(delegator))
    }

    /// Store `delegation`, or drop it if it is retired.
    pub fn put(&mut self, delegation: Delegation) {
        if delegation.is_retired() {
            self.remove(&delegation.node, &delegation.delegator);
            return;
        }
        self.by_node
            .entry(delegation.node)
            .or_default()
            .insert(delegation.delegator, delegation);
    }

    pub fn remove(&mut self, node: &Address, delegator: &Address) -> Option<Delegation> {
        let map = self.by_node.get_mut(node)?;
        let removed = map.remove(delegator);
        if map.is_empty() {
            self.by_node.remove(node);
        }
        removed
    }

    /// Delegations on `node`, ordered by delegator.
    pub fn for_node(&self, node: &Address) -> impl Iterator<Item = &Delegation> {
        self.by_node.get(node).into_iter().flat_map(|m| m.values())
    }

    pub fn count_for_node(&self, node: &Address) -> usize {
        self.by_node.get(node).map(|m| m.len()).unwrap_or(0)
    }

    /// Every delegation held by `delegator`, across nodes.
    pub fn of_delegator<'a>(&'a self, delegator: &'a Address) -> impl Iterator<Item = &'a Delegation> + 'a {
        self.by_node.values().filter_map(move |m| m.get(delegator))
    }

    /// Sum of active delegated amounts on `node`.
    pub fn delegated_to(&self, node: &Address) -> u128 {
        self.for_node(node)
            .fold(0u128, |acc, d| acc.saturating_add(d.amount))
    }

    pub fn len(&self) -> usize {
        self.by_node.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }
}

impl<T: TokenLedger> StakingLedger<T> {
    /// Bond `amount` from `delegator` onto `node`, creating the delegation
    /// on first use.
    pub fn delegate(
        &mut self,
        delegator: &Address,
        node: &Address,
        amount: u128,
        now: u64,
    ) -> StakingResult<()> {
        self.check_clock(now)?;
        if amount == 0 {
            return Err(StakingError::InvalidParameter("delegation amount must be > 0".into()));
        }
        let record = self.node_record(node)?;
        if !record.status.is_active() {
            return Err(InvalidStateReason::NodeUnregistered(*node).into());
        }
        if record.owner == *delegator {
            return Err(InvalidStateReason::SelfDelegation {
                owner: *delegator,
                node: *node,
            }
            .into());
        }

        let (staged, ()) = self.settle_then_mutate(node, Some(delegator), now, |s| {
            if let Some(d) = s.delegation.as_mut() {
                d.amount = d
                    .amount
                    .checked_add(amount)
                    .ok_or_else(|| StakingError::InvalidParameter("delegation overflow".into()))?;
            }
            s.node.total_delegated = s.node.total_delegated.saturating_add(amount);
            s.total_active_stake = s.total_active_stake.saturating_add(amount);
            Ok(())
        })?;

        let ledger = self.config.ledger_account;
        self.token.transfer_from(&ledger, delegator, &ledger, amount)?;
        self.commit(staged, now);

        info!(%delegator, %node, amount, "delegated");
        self.emit(LedgerEvent::Delegated {
            delegator: *delegator,
            node: *node,
            amount,
            timestamp: now,
        });
        Ok(())
    }
}
