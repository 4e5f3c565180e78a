//! The Tracked Position map and its atomic on-disk mirror (spec §4.F
//! "Persistence", §5 "restart contract").

use chrono::{DateTime, Utc};
use options_engine_core::types::{Bias, Leg, PositionStatus, Strategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

/// State of whatever order is currently open against a tracked position
/// (the OPEN fill, or a CLOSE in flight). Drives the order-chasing loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOrder {
    pub broker_order_id: String,
    pub submitted_limit: f64,
    pub submitted_at: DateTime<Utc>,
    /// Cooldown after a cancel/reject; no resubmission before this time.
    pub cooldown_until: Option<DateTime<Utc>>,
}

/// Which strategy gate (spec §4.E) opened a position. Recorded at track
/// time so the exit rule set (spec §4.F step 5) doesn't have to be
/// reconstructed later from strategy + expiration, which is ambiguous:
/// ORB and Scalper can both emit a same-day `CREDIT_SPREAD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyGate {
    Orb,
    RangeFarmer,
    Scalper,
    TrendEngine,
    IronButterfly,
    RatioHedge,
    WeekendWarrior,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedPosition {
    pub id: String,
    pub symbol: String,
    pub strategy: Strategy,
    pub bias: Bias,
    pub legs: Vec<Leg>,
    pub quantity: u32,
    /// Computed after final leg quantities are set, never before (spec §9
    /// "Per-strategy quantity scaling").
    pub entry_price: f64,
    pub status: PositionStatus,
    pub highest_pnl_seen: f64,
    pub opened_at: DateTime<Utc>,
    pub pending_order: Option<PendingOrder>,
    pub opened_by: StrategyGate,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PositionMap {
    positions: HashMap<String, TrackedPosition>,
}

impl PositionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::new());
        }
        Ok(serde_json::from_str(&data)?)
    }

    /// Full overwrite, written via a temp file + rename so a crash never
    /// leaves a partially-written mirror (spec §4.F "Persistence").
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        {
            let mut f = std::fs::File::create(&tmp_path)?;
            f.write_all(json.as_bytes())?;
            f.sync_all()?;
        }
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    pub fn insert(&mut self, position: TrackedPosition) {
        self.positions.insert(position.id.clone(), position);
    }

    pub fn remove(&mut self, id: &str) -> Option<TrackedPosition> {
        self.positions.remove(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut TrackedPosition> {
        self.positions.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedPosition> {
        self.positions.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TrackedPosition> {
        self.positions.values_mut()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Positions whose legs are no longer present among the broker's own
    /// option symbols ("ghost position" handling, spec §4.F
    /// Reconciliation).
    pub fn ghost_ids(&self, broker_option_symbols: &std::collections::HashSet<String>) -> Vec<String> {
        self.positions
            .values()
            .filter(|p| !p.legs.iter().any(|l| broker_option_symbols.contains(&l.option_symbol)))
            .map(|p| p.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use options_engine_core::types::{LegSide, OptionType};

    fn sample_position(id: &str) -> TrackedPosition {
        TrackedPosition {
            id: id.to_string(),
            symbol: "SPY".to_string(),
            strategy: Strategy::CreditSpread,
            bias: Bias::Bullish,
            legs: vec![Leg {
                option_symbol: "SPY240116P00416000".to_string(),
                expiration: chrono::NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
                strike: 416.0,
                option_type: OptionType::Put,
                quantity: 10,
                side: LegSide::Sell,
            }],
            quantity: 10,
            entry_price: 9.50,
            status: PositionStatus::Open,
            highest_pnl_seen: 0.0,
            opened_at: Utc.timestamp_opt(0, 0).unwrap(),
            pending_order: None,
            opened_by: StrategyGate::TrendEngine,
        }
    }

    #[test]
    fn round_trips_through_save_and_load_byte_identical_on_reserialize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("positions.json");

        let mut map = PositionMap::new();
        map.insert(sample_position("p1"));
        map.save(&path).unwrap();

        let loaded = PositionMap::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);

        let first_write = std::fs::read_to_string(&path).unwrap();
        loaded.save(&path).unwrap();
        let second_write = std::fs::read_to_string(&path).unwrap();
        assert_eq!(first_write, second_write);
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonexistent.json");
        let map = PositionMap::load(&path).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn ghost_position_detected_when_legs_absent_from_broker() {
        let mut map = PositionMap::new();
        map.insert(sample_position("p1"));
        let broker_symbols = std::collections::HashSet::new();
        assert_eq!(map.ghost_ids(&broker_symbols), vec!["p1".to_string()]);
    }
}
