//! Ledger events.
//!
//! Events are buffered in commit order inside the ledger and handed out
//! through `StakingLedger::drain_events`. Only committed operations emit;
//! a rejected operation leaves the buffer as it was.

use dsdn_common::types::amount_serde;
use dsdn_common::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    NodeRegistered {
        node: Address,
        owner: Address,
        #[serde(with = "amount_serde")]
        amount: u128,
        commission_bps: u64,
        timestamp: u64,
    },
    NodeStarted {
        node: Address,
        timestamp: u64,
    },
    NodeStopped {
        node: Address,
        /// Seconds folded into the uptime counter by this stop.
        session_secs: u64,
        timestamp: u64,
    },
    NodeUnregistered {
        node: Address,
        owner: Address,
        /// Self-stake moved into the unbond queue.
        #[serde(with = "amount_serde")]
        amount: u128,
        timestamp: u64,
    },
    NodeWithdrawn {
        node: Address,
        owner: Address,
        #[serde(with = "amount_serde")]
        amount: u128,
        timestamp: u64,
    },
    Delegated {
        delegator: Address,
        node: Address,
        #[serde(with = "amount_serde")]
        amount: u128,
        timestamp: u64,
    },
    NodeRewardClaimed {
        node: Address,
        owner: Address,
        #[serde(with = "amount_serde")]
        amount: u128,
        timestamp: u64,
    },
    DelegatorRewardClaimed {
        delegator: Address,
        node: Address,
        #[serde(with = "amount_serde")]
        amount: u128,
        timestamp: u64,
    },
    StakeUpdated {
        node: Address,
        owner: Address,
        #[serde(with = "amount_serde")]
        old_amount: u128,
        #[serde(with = "amount_serde")]
        new_amount: u128,
        commission_bps: u64,
        timestamp: u64,
    },
    Unbonded {
        staker: Address,
        node: Address,
        #[serde(with = "amount_serde")]
        amount: u128,
        unlock_at: u64,
        timestamp: u64,
    },
    DelegatorWithdrawn {
        delegator: Address,
        node: Address,
        #[serde(with = "amount_serde")]
        amount: u128,
        timestamp: u64,
    },
    CirculatingSupplyUpdated {
        #[serde(with = "amount_serde")]
        supply: u128,
        timestamp: u64,
    },
}

impl LedgerEvent {
    /// Variant name, used as the log label.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerEvent::NodeRegistered { .. } => "NodeRegistered",
            LedgerEvent::NodeStarted { .. } => "NodeStarted",
            LedgerEvent::NodeStopped { .. } => "NodeStopped",
            LedgerEvent::NodeUnregistered { .. } => "NodeUnregistered",
            LedgerEvent::NodeWithdrawn { .. } => "NodeWithdrawn",
            LedgerEvent::Delegated { .. } => "Delegated",
            LedgerEvent::NodeRewardClaimed { .. } => "NodeRewardClaimed",
            LedgerEvent::DelegatorRewardClaimed { .. } => "DelegatorRewardClaimed",
            LedgerEvent::StakeUpdated { .. } => "StakeUpdated",
            LedgerEvent::Unbonded { .. } => "Unbonded",
            LedgerEvent::DelegatorWithdrawn { .. } => "DelegatorWithdrawn",
            LedgerEvent::CirculatingSupplyUpdated { .. } => "CirculatingSupplyUpdated",
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            LedgerEvent::NodeRegistered { timestamp, .. }
            | LedgerEvent::NodeStarted { timestamp, .. }
            | LedgerEvent::NodeStopped { timestamp, .. }
            | LedgerEvent::NodeUnregistered { timestamp, .. }
            | LedgerEvent::NodeWithdrawn { timestamp, .. }
            | LedgerEvent::Delegated { timestamp, .. }
            | LedgerEvent::NodeRewardClaimed { timestamp, .. }
            | LedgerEvent::DelegatorRewardClaimed { timestamp, .. }
            | LedgerEvent::StakeUpdated { timestamp, .. }
            | LedgerEvent::Unbonded { timestamp, .. }
            | LedgerEvent::DelegatorWithdrawn { timestamp, .. }
            | LedgerEvent::CirculatingSupplyUpdated { timestamp, .. } => *timestamp,
        }
    }
}
