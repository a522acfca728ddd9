//! # DSDN Staking Ledger
//!
//! Tracks staked nodes, their self-stake and delegated stake, the uptime
//! reported by the health reporter, and an uptime-weighted reward derived
//! from an APR curve. Tokens never live here: stake, withdrawals and
//! rewards move through a [`dsdn_common::TokenLedger`] collaborator.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `apr` | APR policy trait, default curve, accrual and commission math |
//! | `state` | `StakingLedger` and its operations |
//! | `events` | `LedgerEvent` buffer entries |
//! | `error` | `StakingError` |
//! | `shared` | `SharedLedger` (`Arc<Mutex<_>>` handle) |
//! | `cli` | replay tool behind the `dsdn-staking` binary |
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut ledger = StakingLedger::new(LedgerConfig::default(), token);
//! ledger.register(&owner, &node, stake, 1_000, "edge-1", now)?;
//! ledger.start(&reporter, &node, now)?;
//! let paid = ledger.node_claim_reward(&owner, &node, now + YEAR)?;
//! ```

pub mod apr;
pub mod cli;
pub mod error;
pub mod events;
pub mod shared;
pub mod state;

pub use apr::{AprPolicy, FixedApr, SaturatingInverseCurve, SECONDS_PER_YEAR};
pub use error::{InvalidStateReason, Role, StakingError, StakingResult};
pub use events::LedgerEvent;
pub use shared::SharedLedger;
pub use state::{
    BondingQueue, Delegation, DelegationLedger, NodeRecord, NodeStatus, StakingLedger,
    UnbondRequest, UptimeTracker, DEFAULT_LOCK_PERIOD_SECS,
};
