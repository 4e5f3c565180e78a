//! Deterministic market-regime classification (spec §4.B).

use options_engine_core::types::Regime;
use std::collections::HashSet;

/// Inputs the classifier needs, gathered by the caller from the Indicator
/// Store / restricted-dates set.
pub struct RegimeInputs {
    pub vix: Option<f64>,
    pub adx_spy: Option<f64>,
    pub today_is_restricted: bool,
}

pub fn classify(inputs: &RegimeInputs) -> Regime {
    let (Some(vix), Some(adx_spy)) = (inputs.vix, inputs.adx_spy) else {
        return Regime::InsufficientData;
    };

    if inputs.today_is_restricted || vix >= 30.0 {
        return Regime::EventRisk;
    }
    if vix >= 22.0 && adx_spy >= 25.0 {
        return Regime::HighVolExpansion;
    }
    if adx_spy >= 20.0 && vix < 22.0 {
        return Regime::Trending;
    }
    Regime::LowVolChop
}

pub fn is_date_restricted(date: chrono::NaiveDate, restricted: &HashSet<chrono::NaiveDate>) -> bool {
    restricted.contains(&date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(vix: Option<f64>, adx: Option<f64>, restricted: bool) -> RegimeInputs {
        RegimeInputs {
            vix,
            adx_spy: adx,
            today_is_restricted: restricted,
        }
    }

    #[test]
    fn insufficient_data_when_vix_absent() {
        assert_eq!(classify(&inputs(None, Some(25.0), false)), Regime::InsufficientData);
    }

    #[test]
    fn insufficient_data_when_adx_absent() {
        assert_eq!(classify(&inputs(Some(18.0), None, false)), Regime::InsufficientData);
    }

    #[test]
    fn restricted_date_is_event_risk_regardless_of_vix() {
        assert_eq!(classify(&inputs(Some(10.0), Some(10.0), true)), Regime::EventRisk);
    }

    #[test]
    fn vix_30_or_above_is_event_risk() {
        assert_eq!(classify(&inputs(Some(30.0), Some(10.0), false)), Regime::EventRisk);
        assert_eq!(classify(&inputs(Some(29.99), Some(10.0), false)), Regime::LowVolChop);
    }

    #[test]
    fn high_vol_expansion_boundary() {
        assert_eq!(classify(&inputs(Some(22.0), Some(25.0), false)), Regime::HighVolExpansion);
        assert_ne!(classify(&inputs(Some(21.99), Some(25.0), false)), Regime::HighVolExpansion);
    }

    #[test]
    fn trending_boundary() {
        assert_eq!(classify(&inputs(Some(21.9), Some(20.0), false)), Regime::Trending);
        assert_eq!(classify(&inputs(Some(21.9), Some(19.9), false)), Regime::LowVolChop);
    }

    #[test]
    fn low_vol_chop_is_the_default() {
        assert_eq!(classify(&inputs(Some(15.0), Some(10.0), false)), Regime::LowVolChop);
    }
}
