//! # Staking Error Types
//!
//! | Category | Variant | Raised when |
//! |----------|---------|-------------|
//! | Capability | `Unauthorized` | caller is not the owner / health reporter / admin |
//! | Lifecycle | `InvalidState` | operation not allowed in the node's current state |
//! | Token | `InsufficientFunds` | the token collaborator rejected a transfer |
//! | Stake | `InsufficientStake` | unbond exceeds the staker's active stake |
//! | Input | `InvalidParameter` | zero amount, commission above 100% |
//!
//! Every failing operation leaves the ledger untouched.

use dsdn_common::{Address, TokenError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// ROLE
// ════════════════════════════════════════════════════════════════════════════

/// Capability an operation requires from its caller.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    NodeOwner,
    Delegator,
    HealthReporter,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::NodeOwner => write!(f, "node owner"),
            Role::Delegator => write!(f, "delegator"),
            Role::HealthReporter => write!(f, "health reporter"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// INVALID STATE REASONS
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvalidStateReason {
    #[error("node {0} not found")]
    NodeNotFound(Address),
    #[error("node {0} is already registered")]
    AlreadyRegistered(Address),
    #[error("node {0} is already unregistered")]
    AlreadyUnregistered(Address),
    #[error("node {0} is unregistered")]
    NodeUnregistered(Address),
    /// Re-registration blocked until the previous self-stake and reward are drained.
    #[error("node {node} still has {outstanding} unwithdrawn stake and {pending_reward} unclaimed reward")]
    PendingWithdrawal {
        node: Address,
        outstanding: u128,
        pending_reward: u128,
    },
    #[error("owner {owner} cannot delegate to own node {node}")]
    SelfDelegation { owner: Address, node: Address },
    #[error("no delegation from {delegator} to node {node}")]
    NoDelegation { delegator: Address, node: Address },
    #[error("timestamp {now} is older than last committed {last}")]
    ClockRegression { last: u64, now: u64 },
}

// ════════════════════════════════════════════════════════════════════════════
// STAKING ERROR
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StakingError {
    #[error("unauthorized: {caller} is not the {required}")]
    Unauthorized { caller: Address, required: Role },

    #[error("invalid state: {0}")]
    InvalidState(#[from] InvalidStateReason),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(#[from] TokenError),

    #[error("insufficient stake: requested {requested}, available {available}")]
    InsufficientStake { requested: u128, available: u128 },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl StakingError {
    pub(crate) fn unauthorized(caller: &Address, required: Role) -> Self {
        StakingError::Unauthorized {
            caller: *caller,
            required,
        }
    }
}

pub type StakingResult<T> = Result<T, StakingError>;
