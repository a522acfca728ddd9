//! Ledger config loader using TOML and serde.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working ledger. Accounts are hex addresses.
//!
//! ```toml
//! ledger_account = "…40 hex chars…"
//! reward_vault = "…"
//! health_reporter = "…"
//! admin = "…"
//! lock_period_secs = 604800
//! circulating_supply = "263900000000000000000000000"
//!
//! [apr]
//! max_bps = 8000
//! min_bps = 400
//! saturation_ratio_bps = 1000
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::types::Address;

/// Bonding lock: 7 days in seconds (7 * 24 * 60 * 60).
pub const DEFAULT_LOCK_PERIOD_SECS: u64 = 604_800;

/// Basis points denominator (100% = 10000).
pub const BPS_DENOMINATOR: u64 = 10_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Bounds of the default APR curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AprCurveConfig {
    /// Ceiling, reached while the stake ratio is at or below saturation.
    pub max_bps: u64,
    /// Floor, never undercut however large the stake ratio gets.
    pub min_bps: u64,
    /// Stake-to-supply ratio (bps) up to which the ceiling applies.
    pub saturation_ratio_bps: u64,
}

impl Default for AprCurveConfig {
    fn default() -> Self {
        Self {
            max_bps: 8_000,
            min_bps: 400,
            saturation_ratio_bps: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Account that custodies bonded stake.
    pub ledger_account: Address,
    /// Account rewards are paid from. Must have approved `ledger_account`.
    pub reward_vault: Address,
    /// Only identity allowed to drive Start/Stop.
    pub health_reporter: Address,
    /// Only identity allowed to change the circulating supply.
    pub admin: Address,
    /// Seconds between an unbond request and its maturity.
    pub lock_period_secs: u64,
    /// Circulating supply fed to the APR curve; 0 means unset.
    #[serde(with = "crate::types::amount_serde")]
    pub circulating_supply: u128,
    pub apr: AprCurveConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            ledger_account: Address::from_label("staking-ledger"),
            reward_vault: Address::from_label("reward-vault"),
            health_reporter: Address::from_label("health-reporter"),
            admin: Address::from_label("admin"),
            lock_period_secs: DEFAULT_LOCK_PERIOD_SECS,
            circulating_supply: 0,
            apr: AprCurveConfig::default(),
        }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.apr.max_bps > BPS_DENOMINATOR {
            return Err(ConfigError::Invalid(format!(
                "apr.max_bps {} exceeds {}",
                self.apr.max_bps, BPS_DENOMINATOR
            )));
        }
        if self.apr.min_bps > self.apr.max_bps {
            return Err(ConfigError::Invalid(format!(
                "apr.min_bps {} exceeds apr.max_bps {}",
                self.apr.min_bps, self.apr.max_bps
            )));
        }
        if self.apr.saturation_ratio_bps == 0 {
            return Err(ConfigError::Invalid("apr.saturation_ratio_bps must be > 0".into()));
        }
        if self.lock_period_secs == 0 {
            return Err(ConfigError::Invalid("lock_period_secs must be > 0".into()));
        }
        if self.ledger_account == self.reward_vault {
            return Err(ConfigError::Invalid(
                "ledger_account and reward_vault must differ".into(),
            ));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Load config from a TOML file path.
/// If file is missing, fails to parse, or fails validation, an error is returned.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<LedgerConfig, ConfigError> {
    let s = fs::read_to_string(path.as_ref())?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<LedgerConfig, ConfigError> {
    let cfg: LedgerConfig = toml::from_str(s)?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let def = LedgerConfig::default();
        def.validate().expect("default config must validate");
        assert_eq!(def.lock_period_secs, 604_800);
        assert_eq!(def.apr.max_bps, 8_000);
        assert_eq!(def.circulating_supply, 0);
    }

    #[test]
    fn test_load_from_file_roundtrip() {
        use std::io::Write;
        let tmp = tempfile::NamedTempFile::new().expect("temp file");
        let admin = Address::from_bytes([0x11; 20]);
        let toml = format!(
            r#"
            admin = "{}"
            lock_period_secs = 3600
            circulating_supply = 263900000

            [apr]
            max_bps = 9000
        "#,
            admin.to_hex()
        );
        let mut f = tmp.reopen().expect("reopen");
        write!(f, "{}", toml).expect("write");
        let cfg = load_from_file(tmp.path()).expect("load");
        assert_eq!(cfg.admin, admin);
        assert_eq!(cfg.lock_period_secs, 3600);
        assert_eq!(cfg.circulating_supply, 263_900_000);
        assert_eq!(cfg.apr.max_bps, 9000);
        // untouched fields fall back to defaults
        assert_eq!(cfg.apr.min_bps, 400);
        assert_eq!(cfg.reward_vault, LedgerConfig::default().reward_vault);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(load_from_str("").expect("empty"), LedgerConfig::default());
    }

    #[test]
    fn test_large_supply_as_string() {
        let cfg = load_from_str(r#"circulating_supply = "263900000000000000000000000""#)
            .expect("string supply");
        assert_eq!(cfg.circulating_supply, 263_900_000 * 10u128.pow(18));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_from_file(dir.path().join("nope.toml")).expect_err("missing");
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_rejects_inverted_apr_bounds() {
        let err = load_from_str("[apr]\nmax_bps = 100\nmin_bps = 200\n").expect_err("inverted");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_zero_lock_period() {
        assert!(load_from_str("lock_period_secs = 0").is_err());
    }

    #[test]
    fn test_render_then_parse() {
        let cfg = LedgerConfig::default();
        let rendered = cfg.to_toml().expect("render");
        assert_eq!(load_from_str(&rendered).expect("parse"), cfg);
    }
}
