//! The Indicator Store: owns every symbol's candle ring, VWAP, RSI/ADX
//! trackers, volume profile and IV history (spec §4.A).
//!
//! Locking discipline: one `RwLock` per symbol, short critical sections,
//! no I/O taken while holding a lock (spec §5).

use super::adx::AdxTracker;
use super::candle::{Candle, CandleRing};
use super::iv::IvHistory;
use super::rsi::RsiTracker;
use super::volume_profile::{self, VolumeProfile};
use super::vwap::VwapTracker;
use chrono::{DateTime, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use options_engine_core::types::UNIVERSE;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

pub const RSI_SHORT_PERIOD: usize = 2;
pub const RSI_LONG_PERIOD: usize = 14;
pub const ADX_PERIOD: usize = 14;

struct SymbolState {
    ring: CandleRing,
    vwap: VwapTracker,
    rsi14: RsiTracker,
    rsi2: RsiTracker,
    adx: AdxTracker,
    iv_history: IvHistory,
    last_quote: Option<(f64, f64, DateTime<Utc>)>,
}

impl Default for SymbolState {
    fn default() -> Self {
        Self {
            ring: CandleRing::new(),
            vwap: VwapTracker::new(),
            rsi14: RsiTracker::new(RSI_LONG_PERIOD),
            rsi2: RsiTracker::new(RSI_SHORT_PERIOD),
            adx: AdxTracker::new(ADX_PERIOD),
            iv_history: IvHistory::new(),
            last_quote: None,
        }
    }
}

pub struct IndicatorStore {
    symbols: HashMap<String, RwLock<SymbolState>>,
    vix: RwLock<Option<(f64, DateTime<Utc>)>>,
    warmed_up: AtomicBool,
}

/// How long a stale VIX reading is still served before becoming absent
/// (spec §4.C).
const VIX_STALE_AFTER_SECS: i64 = 180;

impl IndicatorStore {
    pub fn new() -> Self {
        let mut symbols = HashMap::new();
        for sym in UNIVERSE {
            symbols.insert(sym.to_string(), RwLock::new(SymbolState::default()));
        }
        Self {
            symbols,
            vix: RwLock::new(None),
            warmed_up: AtomicBool::new(false),
        }
    }

    pub fn is_warmed_up(&self) -> bool {
        self.warmed_up.load(Ordering::Acquire)
    }

    pub fn mark_warmed_up(&self) {
        self.warmed_up.store(true, Ordering::Release);
    }

    fn with_symbol<R>(&self, symbol: &str, f: impl FnOnce(&SymbolState) -> R) -> Option<R> {
        self.symbols.get(symbol).map(|lock| {
            let guard = lock.read().expect("indicator lock poisoned");
            f(&guard)
        })
    }

    fn with_symbol_mut<R>(&self, symbol: &str, f: impl FnOnce(&mut SymbolState) -> R) -> Option<R> {
        self.symbols.get(symbol).map(|lock| {
            let mut guard = lock.write().expect("indicator lock poisoned");
            f(&mut guard)
        })
    }

    /// Dispatch a trade print. Feeds the ring; on bar close, feeds the
    /// bar-close-only indicators (RSI, ADX). VWAP updates on every print.
    pub fn on_trade(&self, symbol: &str, price: f64, size: f64, ts: DateTime<Utc>) {
        self.with_symbol_mut(symbol, |st| {
            st.vwap.on_trade(price, size, ts);
            if let Some(closed) = st.ring.on_trade(price, size, ts) {
                st.rsi14.on_close(closed.close);
                st.rsi2.on_close(closed.close);
                st.adx.on_close(closed);
            }
        });
    }

    pub fn on_quote(&self, symbol: &str, bid: f64, ask: f64, ts: DateTime<Utc>) {
        self.with_symbol_mut(symbol, |st| {
            st.last_quote = Some((bid, ask, ts));
        });
    }

    /// Last trade price; absent if warm-up hasn't completed or no trade has
    /// ever been seen.
    pub fn price(&self, symbol: &str) -> Option<f64> {
        if !self.is_warmed_up() {
            return None;
        }
        self.with_symbol(symbol, |st| st.ring.last_price()).flatten()
    }

    /// Simple moving average of the last `n` closes. Absent below `n`
    /// closed bars — never a partial-window average.
    pub fn sma(&self, symbol: &str, n: usize) -> Option<f64> {
        if !self.is_warmed_up() {
            return None;
        }
        self.with_symbol(symbol, |st| {
            let bars = st.ring.closed_bars();
            if bars.len() < n || n == 0 {
                None
            } else {
                let sum: f64 = bars.iter().rev().take(n).map(|b| b.close).sum();
                Some(sum / n as f64)
            }
        })
        .flatten()
    }

    pub fn rsi(&self, symbol: &str, n: usize) -> Option<f64> {
        if !self.is_warmed_up() {
            return None;
        }
        self.with_symbol(symbol, |st| match n {
            RSI_SHORT_PERIOD => st.rsi2.value(),
            RSI_LONG_PERIOD => st.rsi14.value(),
            _ => None,
        })
        .flatten()
    }

    pub fn adx(&self, symbol: &str, _n: usize) -> Option<f64> {
        if !self.is_warmed_up() {
            return None;
        }
        self.with_symbol(symbol, |st| st.adx.value()).flatten()
    }

    pub fn vwap(&self, symbol: &str) -> Option<f64> {
        self.with_symbol(symbol, |st| st.vwap.value()).flatten()
    }

    pub fn volume_profile(&self, symbol: &str) -> Option<VolumeProfile> {
        self.with_symbol(symbol, |st| {
            let bars: Vec<Candle> = st.ring.closed_bars().iter().copied().collect();
            volume_profile::compute(&bars)
        })
        .flatten()
    }

    pub fn iv_rank(&self, symbol: &str) -> Option<f64> {
        self.with_symbol(symbol, |st| st.iv_history.rank()).flatten()
    }

    pub fn push_iv_reading(&self, symbol: &str, atm_iv: f64) {
        self.with_symbol_mut(symbol, |st| st.iv_history.push(atm_iv));
    }

    pub fn last_quote(&self, symbol: &str) -> Option<(f64, f64, DateTime<Utc>)> {
        self.with_symbol(symbol, |st| st.last_quote).flatten()
    }

    pub fn closed_bar_count(&self, symbol: &str) -> usize {
        self.with_symbol(symbol, |st| st.ring.len()).unwrap_or(0)
    }

    /// A snapshot clone of all retained closed bars for `symbol`.
    pub fn closed_bars(&self, symbol: &str) -> Option<std::collections::VecDeque<Candle>> {
        self.with_symbol(symbol, |st| st.ring.closed_bars().clone())
    }

    /// Closed bars whose open time, converted to `today_et`'s zone, falls
    /// on the same date and within `[start, end]` (used to compute the
    /// opening range).
    pub fn closed_bars_today(
        &self,
        symbol: &str,
        today_et: DateTime<Tz>,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Option<Vec<Candle>> {
        self.with_symbol(symbol, |st| {
            st.ring
                .closed_bars()
                .iter()
                .filter(|b| {
                    let local = b.open_time.with_timezone(&today_et.timezone());
                    local.date_naive() == today_et.date_naive() && {
                        let t = NaiveTime::from_hms_opt(local.hour(), local.minute(), local.second()).unwrap();
                        t >= start && t <= end
                    }
                })
                .copied()
                .collect()
        })
    }

    pub fn seed_history(&self, symbol: &str, bars: Vec<Candle>) {
        self.with_symbol_mut(symbol, |st| {
            for bar in &bars {
                st.rsi14.on_close(bar.close);
                st.rsi2.on_close(bar.close);
                st.adx.on_close(*bar);
            }
            st.ring.seed(bars);
        });
    }

    // --- VIX: shared across symbols, fed by the VIX poller -------------

    pub fn set_vix(&self, value: f64, ts: DateTime<Utc>) {
        *self.vix.write().expect("vix lock poisoned") = Some((value, ts));
    }

    /// Absent if never set, or stale for more than `VIX_STALE_AFTER_SECS`.
    pub fn vix(&self, now: DateTime<Utc>) -> Option<f64> {
        let guard = self.vix.read().expect("vix lock poisoned");
        let (value, ts) = (*guard)?;
        if (now - ts).num_seconds() > VIX_STALE_AFTER_SECS {
            None
        } else {
            Some(value)
        }
    }
}

impl Default for IndicatorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn price_is_absent_before_warmup() {
        let store = IndicatorStore::new();
        store.on_trade("SPY", 430.0, 100.0, Utc.timestamp_opt(0, 0).unwrap());
        assert!(store.price("SPY").is_none());
    }

    #[test]
    fn price_is_available_after_warmup() {
        let store = IndicatorStore::new();
        store.mark_warmed_up();
        store.on_trade("SPY", 430.0, 100.0, Utc.timestamp_opt(0, 0).unwrap());
        assert_eq!(store.price("SPY"), Some(430.0));
    }

    #[test]
    fn sma_absent_below_window() {
        let store = IndicatorStore::new();
        store.mark_warmed_up();
        for m in 0..5 {
            store.on_trade("SPY", 100.0, 1.0, Utc.timestamp_opt(m * 60, 0).unwrap());
        }
        assert!(store.sma("SPY", 10).is_none());
    }

    #[test]
    fn sma_matches_mean_of_last_n_closes() {
        let store = IndicatorStore::new();
        store.mark_warmed_up();
        for (m, price) in [10.0, 20.0, 30.0, 40.0].iter().enumerate() {
            store.on_trade("SPY", *price, 1.0, Utc.timestamp_opt(m as i64 * 60, 0).unwrap());
        }
        // close the last forming bar by advancing one more minute
        store.on_trade("SPY", 40.0, 1.0, Utc.timestamp_opt(4 * 60, 0).unwrap());
        let sma = store.sma("SPY", 3).unwrap();
        assert!((sma - (20.0 + 30.0 + 40.0) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn vix_absent_when_stale() {
        let store = IndicatorStore::new();
        store.set_vix(18.0, Utc.timestamp_opt(0, 0).unwrap());
        let later = Utc.timestamp_opt(VIX_STALE_AFTER_SECS + 1, 0).unwrap();
        assert!(store.vix(later).is_none());
    }

    #[test]
    fn vix_present_within_staleness_window() {
        let store = IndicatorStore::new();
        store.set_vix(18.0, Utc.timestamp_opt(0, 0).unwrap());
        let soon = Utc.timestamp_opt(VIX_STALE_AFTER_SECS - 1, 0).unwrap();
        assert_eq!(store.vix(soon), Some(18.0));
    }
}
