//! # APR Policy & Accrual Math
//!
//! Reward for one staker over one settlement window:
//!
//! ```text
//! reward = floor(stake × apr_bps × Δuptime / (10_000 × SECONDS_PER_YEAR))
//! ```
//!
//! `Δuptime` is node uptime since the staker's watermark, never wall-clock
//! time since the last claim. The APR is looked up once per settlement from
//! an injected [`AprPolicy`], keyed by the stake ratio
//! `ρ = total_active_stake / circulating_supply`.
//!
//! ## Default Curve (`SaturatingInverseCurve`)
//!
//! ```text
//!  apr
//!  max ┤────────────╮
//!      │             ╲
//!      │               ╲___
//!  min ┤                   ‾‾‾‾‾‾‾‾────
//!      └────────────┬──────────────── ρ
//!               saturation
//! ```
//!
//! | Range | APR |
//! |-------|-----|
//! | supply unset (0) | `max_bps` |
//! | `ρ ≤ saturation` | `max_bps` |
//! | `ρ > saturation` | `max_bps × saturation / ρ`, clamped to `[min_bps, max_bps]` |
//!
//! ## Commission
//!
//! | Staker | Receives |
//! |--------|----------|
//! | Delegator | reward on `amount × (10_000 − c)` |
//! | Node owner | reward on `self_stake × 10_000 + total_delegated × c` |
//!
//! Both are weighted accruals over `10_000 × 10_000 × SECONDS_PER_YEAR`.
//! Each staker carries its own division remainder between settlements.

use dsdn_common::{AprCurveConfig, BPS_DENOMINATOR};
use std::fmt;

/// 365 × 86 400.
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Upper bound for a commission rate (100%).
pub const MAX_COMMISSION_BPS: u64 = BPS_DENOMINATOR;

// ════════════════════════════════════════════════════════════════════════════
// POLICY
// ════════════════════════════════════════════════════════════════════════════

/// APR lookup. Implementations must be monotonically non-increasing in
/// `total_active_stake / circulating_supply` and stay within `0..=10_000`.
pub trait AprPolicy: fmt::Debug + Send + Sync {
    fn apr_bps(&self, total_active_stake: u128, circulating_supply: u128) -> u64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaturatingInverseCurve {
    pub max_bps: u64,
    pub min_bps: u64,
    pub saturation_ratio_bps: u64,
}

impl From<AprCurveConfig> for SaturatingInverseCurve {
    fn from(cfg: AprCurveConfig) -> Self {
        Self {
            max_bps: cfg.max_bps,
            min_bps: cfg.min_bps,
            saturation_ratio_bps: cfg.saturation_ratio_bps,
        }
    }
}

impl Default for SaturatingInverseCurve {
    fn default() -> Self {
        AprCurveConfig::default().into()
    }
}

impl AprPolicy for SaturatingInverseCurve {
    fn apr_bps(&self, total_active_stake: u128, circulating_supply: u128) -> u64 {
        if circulating_supply == 0 {
            return self.max_bps;
        }
        let ratio_bps = mul_div(total_active_stake, BPS_DENOMINATOR as u128, circulating_supply);
        let saturation = self.saturation_ratio_bps as u128;
        if ratio_bps <= saturation {
            return self.max_bps;
        }
        let apr = mul_div(self.max_bps as u128, saturation, ratio_bps);
        (apr.min(self.max_bps as u128) as u64).max(self.min_bps).min(self.max_bps)
    }
}

/// Flat rate regardless of stake ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedApr(pub u64);

impl AprPolicy for FixedApr {
    fn apr_bps(&self, _total_active_stake: u128, _circulating_supply: u128) -> u64 {
        self.0.min(BPS_DENOMINATOR)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ARITHMETIC
// ════════════════════════════════════════════════════════════════════════════

/// `floor(a × b / d)` without the intermediate product overflowing.
/// Saturates at `u128::MAX` when the true result does not fit; `d == 0` yields 0.
pub fn mul_div(a: u128, b: u128, d: u128) -> u128 {
    if d == 0 {
        return 0;
    }
    match a.checked_mul(b) {
        Some(p) => p / d,
        None => mul_add_div(a, b, 0, d).0,
    }
}

/// `(a × b + c) / d` as (quotient, remainder) over a 256-bit intermediate.
/// Expects `c < d`; saturates to `(u128::MAX, 0)`.
fn mul_add_div(a: u128, b: u128, c: u128, d: u128) -> (u128, u128) {
    let (hi, lo) = wide_mul(a, b);
    let (lo, carried) = lo.overflowing_add(c);
    // hi ≤ 2^128 − 2 for any u128 product, so this cannot wrap
    let hi = hi + carried as u128;
    div_wide(hi, lo, d)
}

/// Full 256-bit product as (high, low) halves.
fn wide_mul(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = u64::MAX as u128;
    let (a1, a0) = (a >> 64, a & MASK);
    let (b1, b0) = (b >> 64, b & MASK);
    let ll = a0 * b0;
    let lh = a0 * b1;
    let hl = a1 * b0;
    let hh = a1 * b1;
    let mid = (ll >> 64) + (lh & MASK) + (hl & MASK);
    let lo = (ll & MASK) | (mid << 64);
    let hi = hh + (lh >> 64) + (hl >> 64) + (mid >> 64);
    (hi, lo)
}

/// Shift-subtract division of a 256-bit value by `d`.
fn div_wide(hi: u128, lo: u128, d: u128) -> (u128, u128) {
    if hi >= d {
        return (u128::MAX, 0);
    }
    let mut rem = hi;
    let mut quotient = 0u128;
    for bit in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> bit) & 1);
        quotient <<= 1;
        if carry == 1 || rem >= d {
            rem = rem.wrapping_sub(d);
            quotient |= 1;
        }
    }
    (quotient, rem)
}

/// Raw (pre-commission) reward for `stake` over `uptime_secs` at `apr_bps`.
pub fn accrue(stake: u128, apr_bps: u64, uptime_secs: u64) -> u128 {
    if stake == 0 || apr_bps == 0 || uptime_secs == 0 {
        return 0;
    }
    let num = apr_bps as u128 * uptime_secs as u128;
    let denom = BPS_DENOMINATOR as u128 * SECONDS_PER_YEAR as u128;
    mul_div(stake, num, denom)
}

/// Denominator of [`accrue_weighted`]: share bps × APR bps × seconds per year.
const WEIGHTED_DENOMINATOR: u128 =
    BPS_DENOMINATOR as u128 * BPS_DENOMINATOR as u128 * SECONDS_PER_YEAR as u128;

/// Stake weighted by the share of its reward a staker keeps:
/// `stake × share_bps`. A delegator keeps `10_000 − commission`, the owner
/// keeps all of its self-stake reward and `commission` of the delegated one.
pub fn weighted_stake(stake: u128, share_bps: u64) -> u128 {
    stake.saturating_mul(share_bps.min(BPS_DENOMINATOR) as u128)
}

/// Reward on a weighted stake, carrying the sub-unit remainder in `carry`.
///
/// Successive windows settled through the same `carry` sum to exactly what
/// one window of the combined length pays, so claim timing never loses
/// rounding dust.
pub fn accrue_weighted(weighted: u128, apr_bps: u64, uptime_secs: u64, carry: &mut u128) -> u128 {
    if weighted == 0 || apr_bps == 0 || uptime_secs == 0 {
        return 0;
    }
    let rate = apr_bps as u128 * uptime_secs as u128;
    let (reward, rem) = mul_add_div(weighted, rate, *carry % WEIGHTED_DENOMINATOR, WEIGHTED_DENOMINATOR);
    *carry = rem;
    reward
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: u128 = 1_000_000_000_000_000_000;
    const DAY: u64 = 86_400;

    #[test]
    fn full_year_at_max_apr() {
        assert_eq!(accrue(1_000_000 * TOKEN, 8_000, 365 * DAY), 800_000 * TOKEN);
    }

    #[test]
    fn seventy_three_days() {
        assert_eq!(accrue(1_000_000 * TOKEN, 8_000, 73 * DAY), 160_000 * TOKEN);
    }

    #[test]
    fn zero_inputs_accrue_nothing() {
        assert_eq!(accrue(0, 8_000, 365 * DAY), 0);
        assert_eq!(accrue(TOKEN, 0, 365 * DAY), 0);
        assert_eq!(accrue(TOKEN, 8_000, 0), 0);
    }

    #[test]
    fn accrue_floors() {
        // 1 unit for one year at 80% is 0.8 units
        assert_eq!(accrue(1, 8_000, SECONDS_PER_YEAR), 0);
        assert_eq!(accrue(10, 8_000, SECONDS_PER_YEAR), 8);
    }

    #[test]
    fn mul_div_handles_overflowing_product() {
        let big = u128::MAX / 3;
        assert_eq!(mul_div(big, 6, 6), big);
        assert_eq!(mul_div(big, 3, 3), big);
        assert_eq!(mul_div(u128::MAX, 2, 4), u128::MAX / 2);
        assert_eq!(mul_div(u128::MAX, u128::MAX, u128::MAX), u128::MAX);
        assert_eq!(mul_div(u128::MAX, u128::MAX, 1), u128::MAX);
        assert_eq!(mul_div(7, 3, 0), 0);
    }

    #[test]
    fn weighted_accrual_matches_commission_split() {
        let mut carry = 0;
        let stake = 1_000_000 * TOKEN;
        let net = accrue_weighted(weighted_stake(stake, 9_000), 8_000, 365 * DAY, &mut carry);
        assert_eq!(net, 720_000 * TOKEN);
        assert_eq!(carry, 0);
        let owner = weighted_stake(stake, 10_000) + weighted_stake(9 * stake, 1_000);
        assert_eq!(accrue_weighted(owner, 8_000, 365 * DAY, &mut carry), 1_520_000 * TOKEN);
        assert_eq!(weighted_stake(stake, 20_000), weighted_stake(stake, 10_000));
    }

    #[test]
    fn carried_remainder_makes_windows_additive() {
        // 10 units at 80% for a year is 8 units, a single day is a fraction
        let weighted = weighted_stake(10, 10_000);
        let mut carry = 0;
        let mut paid = 0;
        for _ in 0..365 {
            paid += accrue_weighted(weighted, 8_000, DAY, &mut carry);
        }
        assert_eq!(paid, 8);
        assert_eq!(carry, 0);

        let mut carry = 0;
        let daily = accrue_weighted(weighted, 8_000, DAY, &mut carry);
        assert_eq!(daily, 0);
        assert!(carry > 0);
    }

    #[test]
    fn carried_remainder_survives_large_stakes() {
        let weighted = weighted_stake(1_000_000 * TOKEN + 1, 10_000);
        let once = accrue_weighted(weighted, 8_000, 365 * DAY, &mut 0);
        let mut carry = 0;
        let split: u128 = [30u64, 43, 127, 165]
            .iter()
            .map(|d| accrue_weighted(weighted, 8_000, d * DAY, &mut carry))
            .sum();
        assert_eq!(split, once);
        assert_eq!(once, accrue(1_000_000 * TOKEN + 1, 8_000, 365 * DAY));
    }

    // ── curve ──────────────────────────────────────────────────────────────

    #[test]
    fn curve_unset_supply_pays_max() {
        let curve = SaturatingInverseCurve::default();
        assert_eq!(curve.apr_bps(1_000_000 * TOKEN, 0), 8_000);
    }

    #[test]
    fn curve_saturated_up_to_ratio() {
        let curve = SaturatingInverseCurve::default();
        let supply = 100_000_000 * TOKEN;
        for pct in [1u128, 2, 5, 10] {
            assert_eq!(curve.apr_bps(supply * pct / 100, supply), 8_000, "ratio {}%", pct);
        }
    }

    #[test]
    fn curve_decays_then_floors() {
        let curve = SaturatingInverseCurve::default();
        let supply = 100_000_000 * TOKEN;
        assert_eq!(curve.apr_bps(supply / 5, supply), 4_000);
        assert_eq!(curve.apr_bps(supply / 2, supply), 1_600);
        assert_eq!(curve.apr_bps(supply, supply), 800);
        assert_eq!(curve.apr_bps(supply * 10, supply), 400);
    }

    #[test]
    fn curve_is_non_increasing() {
        let curve = SaturatingInverseCurve::default();
        let supply = 1_000_000 * TOKEN;
        let mut last = u64::MAX;
        for step in 0..=400u128 {
            let apr = curve.apr_bps(supply * step / 100, supply);
            assert!(apr <= last);
            assert!((400..=8_000).contains(&apr));
            last = apr;
        }
    }

    #[test]
    fn fixed_apr_is_capped() {
        assert_eq!(FixedApr(12_000).apr_bps(1, 1), 10_000);
        assert_eq!(FixedApr(500).apr_bps(1, 0), 500);
    }
}
