//! Preconditions and shared derived signals for the strategy gates
//! (spec §4.E "Common preconditions").

use crate::indicators::candle::Candle;
use crate::indicators::store::IndicatorStore;
use chrono::{DateTime, Utc};
use options_engine_core::types::{Context, ContextValue, FlowState, Leg, Proposal, ProposalSide, Regime, Strategy};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use uuid::Uuid;

/// Minimum time between two proposals for the same symbol (spec §4.E).
pub const PROPOSAL_THROTTLE: Duration = Duration::from_secs(60);
/// Minimum time before the same named signal may fire again for a symbol
/// (spec §4.E "signal replay guard").
pub const SIGNAL_REPLAY_GUARD: Duration = Duration::from_secs(300);

/// Per-symbol / per-signal timestamps used to enforce the throttle and
/// replay guard. Owned by whoever drives the ingest loop and shared across
/// all strategy evaluations for a tick.
#[derive(Default)]
pub struct ThrottleState {
    last_proposal_at: HashMap<String, DateTime<Utc>>,
    last_signal_at: HashMap<(String, &'static str), DateTime<Utc>>,
}

impl ThrottleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn proposal_eligible(&self, symbol: &str, now: DateTime<Utc>) -> bool {
        match self.last_proposal_at.get(symbol) {
            Some(last) => (now - *last).to_std().unwrap_or_default() >= PROPOSAL_THROTTLE,
            None => true,
        }
    }

    pub fn record_proposal(&mut self, symbol: &str, now: DateTime<Utc>) {
        self.last_proposal_at.insert(symbol.to_string(), now);
    }

    pub fn signal_eligible(&self, symbol: &str, signal: &'static str, now: DateTime<Utc>) -> bool {
        match self.last_signal_at.get(&(symbol.to_string(), signal)) {
            Some(last) => (now - *last).to_std().unwrap_or_default() >= SIGNAL_REPLAY_GUARD,
            None => true,
        }
    }

    pub fn record_signal(&mut self, symbol: &str, signal: &'static str, now: DateTime<Utc>) {
        self.last_signal_at.insert((symbol.to_string(), signal), now);
    }
}

/// True once warm-up is done and the regime classifier has enough data to
/// classify — the two gates every strategy shares before its own extra
/// gates are checked.
pub fn base_preconditions_ok(store: &IndicatorStore, regime: Regime) -> bool {
    store.is_warmed_up() && regime != Regime::InsufficientData
}

/// Ratio of the most recently closed bar's volume to the mean volume of
/// the preceding window. Absent below the window size.
pub fn volume_velocity(bars: &VecDeque<Candle>, window: usize) -> Option<f64> {
    if bars.len() < window + 1 {
        return None;
    }
    let last = bars.back()?.volume;
    let preceding: f64 = bars
        .iter()
        .rev()
        .skip(1)
        .take(window)
        .map(|b| b.volume)
        .sum();
    let mean = preceding / window as f64;
    if mean <= 0.0 {
        None
    } else {
        Some(last / mean)
    }
}

/// Derives `flow_state` from price-vs-VWAP and volume velocity (glossary:
/// "a categorical signal derived from price vs VWAP and volume
/// velocity").
pub fn flow_state(price: Option<f64>, vwap: Option<f64>, vol_velocity: Option<f64>) -> FlowState {
    let (Some(price), Some(vwap), Some(vv)) = (price, vwap, vol_velocity) else {
        return FlowState::Unknown;
    };
    if vv <= 1.0 {
        return FlowState::Neutral;
    }
    if price > vwap {
        FlowState::RiskOn
    } else if price < vwap {
        FlowState::RiskOff
    } else {
        FlowState::Neutral
    }
}

/// Assembles the wire `Proposal`. Called only after sizing, pricing and
/// leg construction have all used the final scaled quantities (spec §9).
#[allow(clippy::too_many_arguments)]
pub fn build_proposal(
    symbol: &str,
    strategy: Strategy,
    side: ProposalSide,
    quantity: u32,
    price: f64,
    legs: Vec<Leg>,
    vix: Option<f64>,
    flow: FlowState,
    now: DateTime<Utc>,
) -> Proposal {
    let mut context: Context = Context::new();
    if let Some(vix) = vix {
        context.insert("vix".to_string(), ContextValue::Number(vix));
    }
    let flow_str = match flow {
        FlowState::RiskOn => "RISK_ON",
        FlowState::RiskOff => "RISK_OFF",
        FlowState::Neutral => "NEUTRAL",
        FlowState::Unknown => "UNKNOWN",
    };
    context.insert("flow_state".to_string(), ContextValue::String(flow_str.to_string()));

    Proposal {
        id: Uuid::new_v4().to_string(),
        timestamp_ms: now.timestamp_millis(),
        symbol: symbol.to_string(),
        strategy,
        side,
        quantity,
        price,
        legs,
        context,
        signature: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(volume: f64) -> Candle {
        Candle {
            open_time: Utc.timestamp_opt(0, 0).unwrap(),
            open: 100.0,
            high: 100.0,
            low: 100.0,
            close: 100.0,
            volume,
        }
    }

    #[test]
    fn throttle_blocks_within_window() {
        let mut st = ThrottleState::new();
        let t0 = Utc.timestamp_opt(0, 0).unwrap();
        assert!(st.proposal_eligible("SPY", t0));
        st.record_proposal("SPY", t0);
        let t1 = Utc.timestamp_opt(30, 0).unwrap();
        assert!(!st.proposal_eligible("SPY", t1));
        let t2 = Utc.timestamp_opt(61, 0).unwrap();
        assert!(st.proposal_eligible("SPY", t2));
    }

    #[test]
    fn signal_replay_guard_blocks_within_window() {
        let mut st = ThrottleState::new();
        let t0 = Utc.timestamp_opt(0, 0).unwrap();
        st.record_signal("SPY", "orb_break", t0);
        let t1 = Utc.timestamp_opt(299, 0).unwrap();
        assert!(!st.signal_eligible("SPY", "orb_break", t1));
        let t2 = Utc.timestamp_opt(301, 0).unwrap();
        assert!(st.signal_eligible("SPY", "orb_break", t2));
    }

    #[test]
    fn volume_velocity_absent_below_window() {
        let bars: VecDeque<Candle> = (0..5).map(|_| bar(100.0)).collect();
        assert!(volume_velocity(&bars, 20).is_none());
    }

    #[test]
    fn volume_velocity_above_one_means_above_average() {
        let mut bars: VecDeque<Candle> = (0..20).map(|_| bar(100.0)).collect();
        bars.push_back(bar(200.0));
        assert_eq!(volume_velocity(&bars, 20), Some(2.0));
    }

    #[test]
    fn flow_state_unknown_without_inputs() {
        assert_eq!(flow_state(None, Some(1.0), Some(2.0)), FlowState::Unknown);
    }

    #[test]
    fn flow_state_risk_on_when_above_vwap_with_velocity() {
        assert_eq!(flow_state(Some(101.0), Some(100.0), Some(1.5)), FlowState::RiskOn);
    }
}
