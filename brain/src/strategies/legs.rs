//! Leg construction: expiration/strike selection by DTE and delta targets,
//! OCC symbol encoding (spec §4.E "Leg construction").

use crate::broker::client::ChainEntry;
use chrono::NaiveDate;
use options_engine_core::occ;
use options_engine_core::types::{Leg, LegSide, OptionType};

/// The listed expiration whose DTE is closest to `target_dte`.
pub fn pick_expiration(chain: &[ChainEntry], today: NaiveDate, target_dte: i64) -> Option<NaiveDate> {
    chain
        .iter()
        .map(|c| c.expiration)
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .min_by_key(|exp| ((*exp - today).num_days() - target_dte).abs())
}

/// The chain entry, restricted to `expiration` and `option_type`, whose
/// delta is closest in magnitude to `target_delta`.
pub fn pick_by_delta<'a>(
    chain: &'a [ChainEntry],
    expiration: NaiveDate,
    option_type: OptionType,
    target_delta: f64,
) -> Option<&'a ChainEntry> {
    chain
        .iter()
        .filter(|c| c.expiration == expiration && c.option_type == option_type)
        .min_by(|a, b| {
            (a.delta.abs() - target_delta)
                .abs()
                .partial_cmp(&(b.delta.abs() - target_delta).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

/// The chain entry, restricted to `expiration` and `option_type`, whose
/// strike is closest to `target_strike` (used for symmetric condor/
/// butterfly wings around the POC).
pub fn pick_by_strike<'a>(
    chain: &'a [ChainEntry],
    expiration: NaiveDate,
    option_type: OptionType,
    target_strike: f64,
) -> Option<&'a ChainEntry> {
    chain
        .iter()
        .filter(|c| c.expiration == expiration && c.option_type == option_type)
        .min_by(|a, b| {
            (a.strike - target_strike)
                .abs()
                .partial_cmp(&(b.strike - target_strike).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

pub fn build_leg(root: &str, entry: &ChainEntry, side: LegSide, quantity: u32) -> Leg {
    let option_symbol = occ::encode(root, entry.expiration, entry.option_type, entry.strike);
    Leg {
        option_symbol,
        expiration: entry.expiration,
        strike: entry.strike,
        option_type: entry.option_type,
        quantity,
        side,
    }
}

/// Short leg chosen by delta target, long (protective) leg chosen by
/// strike `width` points further out of the money.
pub fn build_vertical_credit(
    root: &str,
    chain: &[ChainEntry],
    expiration: NaiveDate,
    option_type: OptionType,
    short_delta_target: f64,
    width: f64,
    quantity: u32,
) -> Option<(Leg, Leg)> {
    let short_entry = pick_by_delta(chain, expiration, option_type, short_delta_target)?;
    let long_target_strike = match option_type {
        OptionType::Put => short_entry.strike - width,
        OptionType::Call => short_entry.strike + width,
    };
    let long_entry = pick_by_strike(chain, expiration, option_type, long_target_strike)?;
    Some((
        build_leg(root, short_entry, LegSide::Sell, quantity),
        build_leg(root, long_entry, LegSide::Buy, quantity),
    ))
}

/// Put credit spread below the market plus a call credit spread above it,
/// symmetric wings (spec §4.E "condor/butterfly wings symmetric around
/// POC").
pub fn build_iron_condor(
    root: &str,
    chain: &[ChainEntry],
    expiration: NaiveDate,
    short_delta_target: f64,
    width: f64,
    quantity: u32,
) -> Option<Vec<Leg>> {
    let (put_short, put_long) =
        build_vertical_credit(root, chain, expiration, OptionType::Put, short_delta_target, width, quantity)?;
    let (call_short, call_long) =
        build_vertical_credit(root, chain, expiration, OptionType::Call, short_delta_target, width, quantity)?;
    Some(vec![put_short, put_long, call_short, call_long])
}

/// Short straddle at the strike nearest `center_strike` plus protective
/// wings `width` points out on each side.
pub fn build_iron_butterfly(
    root: &str,
    chain: &[ChainEntry],
    expiration: NaiveDate,
    center_strike: f64,
    width: f64,
    quantity: u32,
) -> Option<Vec<Leg>> {
    let short_put = pick_by_strike(chain, expiration, OptionType::Put, center_strike)?;
    let short_call = pick_by_strike(chain, expiration, OptionType::Call, center_strike)?;
    let long_put = pick_by_strike(chain, expiration, OptionType::Put, center_strike - width)?;
    let long_call = pick_by_strike(chain, expiration, OptionType::Call, center_strike + width)?;
    Some(vec![
        build_leg(root, short_put, LegSide::Sell, quantity),
        build_leg(root, short_call, LegSide::Sell, quantity),
        build_leg(root, long_put, LegSide::Buy, quantity),
        build_leg(root, long_call, LegSide::Buy, quantity),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(expiration: NaiveDate, strike: f64, option_type: OptionType, delta: f64) -> ChainEntry {
        ChainEntry {
            option_symbol: String::new(),
            expiration,
            strike,
            option_type,
            delta,
            bid: 1.0,
            ask: 1.1,
            iv: 0.2,
        }
    }

    #[test]
    fn picks_closest_expiration() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let chain = vec![
            entry(NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(), 100.0, OptionType::Put, -0.3),
            entry(NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(), 100.0, OptionType::Put, -0.3),
        ];
        // target 30 DTE -> Jan 31 (30 days) beats Jan 10 (9 days)
        let picked = pick_expiration(&chain, today, 30).unwrap();
        assert_eq!(picked, NaiveDate::from_ymd_opt(2026, 1, 31).unwrap());
    }

    #[test]
    fn picks_closest_delta() {
        let exp = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        let chain = vec![
            entry(exp, 420.0, OptionType::Put, -0.20),
            entry(exp, 428.0, OptionType::Put, -0.32),
            entry(exp, 432.0, OptionType::Put, -0.45),
        ];
        let picked = pick_by_delta(&chain, exp, OptionType::Put, 0.30).unwrap();
        assert_eq!(picked.strike, 428.0);
    }

    #[test]
    fn builds_occ_symbol() {
        let exp = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
        let e = entry(exp, 416.0, OptionType::Put, -0.3);
        let leg = build_leg("SPY", &e, LegSide::Sell, 10);
        assert_eq!(leg.option_symbol, "SPY240116P00416000");
    }
}
