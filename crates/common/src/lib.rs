//! # DSDN Common Crate
//!
//! Shared building blocks for the staking ledger.
//!
//! ## Modules
//! - `types`: `Address` (20-byte account identifier, hex serde)
//! - `token`: `TokenLedger` collaborator trait + `InMemoryToken` backend
//! - `config`: `LedgerConfig` TOML loading
//!
//! ## Layout
//! ```text
//! ┌──────────────┐     ┌──────────────┐
//! │ LedgerConfig │     │ TokenLedger  │  <- collaborator trait
//! └──────┬───────┘     └──────┬───────┘
//!        │                    │
//!        │             ┌──────▼────────┐
//!        │             │ InMemoryToken │
//!        │             └───────────────┘
//!    ┌───▼────┐
//!    │Address │
//!    └────────┘
//! ```

pub mod config;
pub mod token;
pub mod types;

pub use config::{AprCurveConfig, ConfigError, LedgerConfig, BPS_DENOMINATOR, DEFAULT_LOCK_PERIOD_SECS};
pub use token::{InMemoryToken, TokenError, TokenLedger};
pub use types::{Address, AddressParseError};
