//! The Gate's single-writer actor state (spec §3 "Ownership": the Gate
//! exclusively owns Lock State, Restricted Dates, Position Metadata, and
//! Heartbeat State; spec §5 "single-writer actor").
//!
//! Grounded on `services/scheduler.rs::TASKS` (a process-wide
//! concurrency-safe map guarding mutable state) generalized to the single
//! `tokio::sync::Mutex<GateState>` the spec calls for, shared the same
//! way the teacher shares `PgPool`/`RedisPool` through `web::Data`.

use crate::broker::client::BrokerClient;
use crate::constitution::Constitution;
use crate::notifier::Notifier;
use chrono::{DateTime, NaiveDate, Utc};
use options_engine_core::types::{Bias, Strategy};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LockStatus {
    Normal,
    Locked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockState {
    pub status: LockStatus,
    pub reason: Option<String>,
}

impl Default for LockState {
    fn default() -> Self {
        Self {
            status: LockStatus::Normal,
            reason: None,
        }
    }
}

/// Position Metadata (spec §3): keyed by broker order id, used solely for
/// correlation-group accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionMetadata {
    pub symbol: String,
    pub bias: Bias,
    pub strategy: Strategy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeartbeatRecord {
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    pub brain_state: Option<serde_json::Value>,
}

/// Everything the Gate's single-writer actor owns. One instance, wrapped
/// in `tokio::sync::Mutex` and shared via `web::Data` (spec §5: "All
/// mutating operations ... serialise on the actor. Reads ... must also go
/// through the actor to observe committed state.").
#[derive(Debug, Default)]
pub struct GateState {
    pub lock: LockState,
    pub restricted_dates: HashSet<NaiveDate>,
    pub position_metadata: HashMap<String, PositionMetadata>,
    pub heartbeat: HeartbeatRecord,
    pub start_of_day_equity: Option<f64>,
}

impl GateState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&mut self, reason: Option<String>) {
        self.lock = LockState {
            status: LockStatus::Locked,
            reason,
        };
    }

    pub fn unlock(&mut self) {
        self.lock = LockState {
            status: LockStatus::Normal,
            reason: None,
        };
    }

    pub fn is_locked(&self) -> bool {
        self.lock.status == LockStatus::Locked
    }

    pub fn is_restricted(&self, date: NaiveDate) -> bool {
        self.restricted_dates.contains(&date)
    }

    pub fn set_restricted_dates(&mut self, dates: HashSet<NaiveDate>) {
        self.restricted_dates = dates;
    }

    /// Distinct symbols with at least one open position (spec §4.H step
    /// 12, "Position cap").
    pub fn distinct_open_symbols(&self) -> HashSet<&str> {
        self.position_metadata.values().map(|m| m.symbol.as_str()).collect()
    }

    pub fn open_count_for_symbol(&self, symbol: &str) -> u32 {
        self.position_metadata.values().filter(|m| m.symbol == symbol).count() as u32
    }

    /// Count of open positions sharing a bias whose symbol is one of
    /// `group_symbols` (spec §4.H step 13, "Correlation guard"). Group
    /// membership itself lives in the Constitution, not here — this keeps
    /// Position Metadata the single source of truth for "what's open".
    pub fn correlated_count(&self, group_symbols: &HashSet<&str>, bias: Bias) -> u32 {
        self.position_metadata
            .values()
            .filter(|m| m.bias == bias && group_symbols.contains(m.symbol.as_str()))
            .count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(symbol: &str, bias: Bias) -> PositionMetadata {
        PositionMetadata {
            symbol: symbol.to_string(),
            bias,
            strategy: Strategy::CreditSpread,
        }
    }

    #[test]
    fn lock_and_unlock_round_trip() {
        let mut state = GateState::new();
        assert!(!state.is_locked());
        state.lock(Some("daily loss breach".to_string()));
        assert!(state.is_locked());
        assert_eq!(state.lock.reason.as_deref(), Some("daily loss breach"));
        state.unlock();
        assert!(!state.is_locked());
        assert!(state.lock.reason.is_none());
    }

    #[test]
    fn distinct_open_symbols_counts_unique_symbols_only() {
        let mut state = GateState::new();
        state.position_metadata.insert("ord-1".into(), meta("SPY", Bias::Bullish));
        state.position_metadata.insert("ord-2".into(), meta("SPY", Bias::Bearish));
        state.position_metadata.insert("ord-3".into(), meta("QQQ", Bias::Neutral));
        assert_eq!(state.distinct_open_symbols().len(), 2);
        assert_eq!(state.open_count_for_symbol("SPY"), 2);
        assert_eq!(state.open_count_for_symbol("DIA"), 0);
    }

    #[test]
    fn correlated_count_only_matches_same_bias_within_group() {
        let mut state = GateState::new();
        state.position_metadata.insert("ord-1".into(), meta("SPY", Bias::Bullish));
        state.position_metadata.insert("ord-2".into(), meta("QQQ", Bias::Bullish));
        state.position_metadata.insert("ord-3".into(), meta("IWM", Bias::Bearish));

        let group: HashSet<&str> = ["SPY", "QQQ"].into_iter().collect();
        assert_eq!(state.correlated_count(&group, Bias::Bullish), 2);
        assert_eq!(state.correlated_count(&group, Bias::Bearish), 0);

        let other_group: HashSet<&str> = ["IWM"].into_iter().collect();
        assert_eq!(state.correlated_count(&other_group, Bias::Bearish), 1);
    }

    #[test]
    fn restricted_dates_track_membership() {
        let mut state = GateState::new();
        let day = NaiveDate::from_ymd_opt(2024, 12, 24).unwrap();
        assert!(!state.is_restricted(day));
        state.set_restricted_dates([day].into_iter().collect());
        assert!(state.is_restricted(day));
    }
}

/// Everything a route handler needs, shared via `web::Data<AppState>` the
/// same way the teacher shares `Settings`/`PgPool`/`RedisPool` (spec §5:
/// the Gate's actor mutex plus its read-only collaborators).
pub struct AppState {
    pub gate: Mutex<GateState>,
    pub constitution: Constitution,
    pub pool: PgPool,
    pub broker: BrokerClient,
    pub hmac_secret: String,
    pub notifier: Arc<dyn Notifier>,
}

