//! The Constitution: immutable risk-rule configuration loaded once at
//! startup from a JSON document (spec §3 "Constitution", §6
//! "Configuration"). Unlike `config::settings::Settings`'s flat env vars,
//! this is a nested document, so it follows the teacher's other default
//! for semi-structured data (`serde_json`) rather than inventing a new
//! format.

use chrono::NaiveTime;
use options_engine_core::types::Strategy;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Constitution {
    pub allowed_symbols: Vec<String>,
    pub allowed_strategies: Vec<Strategy>,
    pub max_open_positions: u32,
    pub max_concentration_per_symbol: u32,
    pub max_daily_loss_percent: f64,
    pub min_dte: i64,
    pub max_dte: i64,
    /// symbol -> correlation group names it belongs to.
    pub correlation_groups: HashMap<String, Vec<String>>,
    pub max_correlated_positions: u32,
    pub max_total_positions: u32,
    pub stale_proposal_ms: i64,
    /// `HH:MM` in America/New_York, or absent to disable the forced close.
    #[serde(default, deserialize_with = "deserialize_optional_time")]
    pub force_eod_close_et: Option<NaiveTime>,
}

fn deserialize_optional_time<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) => NaiveTime::parse_from_str(&s, "%H:%M")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

impl Constitution {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn allows_symbol(&self, symbol: &str) -> bool {
        self.allowed_symbols.iter().any(|s| s == symbol)
    }

    pub fn allows_strategy(&self, strategy: Strategy) -> bool {
        self.allowed_strategies.contains(&strategy)
    }

    pub fn groups_for(&self, symbol: &str) -> &[String] {
        self.correlation_groups
            .get(symbol)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// All symbols that share membership in `group` (reverse index over
    /// `correlation_groups`, used by the correlation guard).
    pub fn symbols_in_group(&self, group: &str) -> std::collections::HashSet<&str> {
        self.correlation_groups
            .iter()
            .filter(|(_, groups)| groups.iter().any(|g| g == group))
            .map(|(symbol, _)| symbol.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "allowed_symbols": ["SPY", "QQQ"],
            "allowed_strategies": ["CREDIT_SPREAD", "IRON_CONDOR"],
            "max_open_positions": 8,
            "max_concentration_per_symbol": 3,
            "max_daily_loss_percent": 0.02,
            "min_dte": 0,
            "max_dte": 45,
            "correlation_groups": {"SPY": ["US_INDICES"], "QQQ": ["US_INDICES"]},
            "max_correlated_positions": 2,
            "max_total_positions": 15,
            "stale_proposal_ms": 5000,
            "force_eod_close_et": "15:55"
        }"#
    }

    #[test]
    fn parses_full_document() {
        let c: Constitution = serde_json::from_str(sample_json()).unwrap();
        assert!(c.allows_symbol("SPY"));
        assert!(!c.allows_symbol("DIA"));
        assert!(c.allows_strategy(Strategy::CreditSpread));
        assert!(!c.allows_strategy(Strategy::RatioSpread));
        assert_eq!(c.groups_for("SPY"), &["US_INDICES".to_string()]);
        assert_eq!(c.force_eod_close_et, NaiveTime::from_hms_opt(15, 55, 0));
    }

    #[test]
    fn absent_force_eod_close_disables_it() {
        let mut v: serde_json::Value = serde_json::from_str(sample_json()).unwrap();
        v.as_object_mut().unwrap().remove("force_eod_close_et");
        let c: Constitution = serde_json::from_value(v).unwrap();
        assert!(c.force_eod_close_et.is_none());
    }
}
