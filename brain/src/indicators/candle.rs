//! One-minute candle and the per-symbol ring that holds them.

use chrono::{DateTime, Timelike, Utc};
use std::collections::VecDeque;

/// Minimum number of closed minutes the ring is required to retain
/// (spec §3 "ring keeps at least 1500 minutes").
pub const MIN_RING_CAPACITY: usize = 1500;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// A minute-floor-keyed ring buffer of closed bars, plus the bar currently
/// being aggregated (not yet closed, not yet visible to indicators).
#[derive(Debug, Default)]
pub struct CandleRing {
    closed: VecDeque<Candle>,
    forming: Option<Candle>,
    capacity: usize,
}

impl CandleRing {
    pub fn new() -> Self {
        Self {
            closed: VecDeque::with_capacity(MIN_RING_CAPACITY),
            forming: None,
            capacity: MIN_RING_CAPACITY,
        }
    }

    /// Floor a timestamp to the start of its minute.
    fn minute_floor(ts: DateTime<Utc>) -> DateTime<Utc> {
        ts - chrono::Duration::nanoseconds(ts.timestamp_subsec_nanos() as i64)
            - chrono::Duration::seconds(ts.second() as i64)
    }

    /// Aggregate a trade print into the forming bar, closing and pushing
    /// the previous bar if the minute has rolled over. Invariant: strictly
    /// monotonic open-time — a trade older than the forming bar's minute
    /// is dropped rather than reopening a closed bar.
    /// Returns the bar that just closed, if this trade rolled the minute
    /// over. Callers that drive bar-close-only indicators (RSI, ADX) must
    /// feed them exactly when this returns `Some`.
    pub fn on_trade(&mut self, price: f64, size: f64, ts: DateTime<Utc>) -> Option<Candle> {
        let minute = Self::minute_floor(ts);
        let mut just_closed = None;

        match &mut self.forming {
            None => {
                self.forming = Some(Candle {
                    open_time: minute,
                    open: price,
                    high: price,
                    low: price,
                    close: price,
                    volume: size,
                });
            }
            Some(bar) if bar.open_time == minute => {
                bar.high = bar.high.max(price);
                bar.low = bar.low.min(price);
                bar.close = price;
                bar.volume += size;
            }
            Some(bar) if minute > bar.open_time => {
                let closed = *bar;
                self.push_closed(closed);
                just_closed = Some(closed);
                self.forming = Some(Candle {
                    open_time: minute,
                    open: price,
                    high: price,
                    low: price,
                    close: price,
                    volume: size,
                });
            }
            Some(_) => {
                // Late trade for an already-forming-or-past minute: ignored
                // to preserve strict monotonicity of open-time.
            }
        }

        just_closed
    }

    fn push_closed(&mut self, candle: Candle) {
        self.closed.push_back(candle);
        while self.closed.len() > self.capacity {
            self.closed.pop_front();
        }
    }

    /// Seed the ring directly from a history fetch (warm-up). Assumes
    /// `bars` is already sorted ascending by `open_time`.
    pub fn seed(&mut self, bars: Vec<Candle>) {
        for bar in bars {
            self.push_closed(bar);
        }
    }

    pub fn closed_bars(&self) -> &VecDeque<Candle> {
        &self.closed
    }

    pub fn last_closed(&self) -> Option<&Candle> {
        self.closed.back()
    }

    /// Last trade price, whether from a forming or last-closed bar.
    pub fn last_price(&self) -> Option<f64> {
        self.forming
            .as_ref()
            .map(|b| b.close)
            .or_else(|| self.closed.back().map(|b| b.close))
    }

    pub fn len(&self) -> usize {
        self.closed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(min: i64, sec: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + min * 60 + sec, 0).unwrap()
    }

    #[test]
    fn aggregates_within_the_same_minute() {
        let mut ring = CandleRing::new();
        ring.on_trade(100.0, 10.0, ts(0, 0));
        ring.on_trade(101.0, 5.0, ts(0, 30));
        ring.on_trade(99.0, 2.0, ts(0, 59));
        assert!(ring.closed_bars().is_empty());
        assert_eq!(ring.last_price(), Some(99.0));
    }

    #[test]
    fn closes_a_bar_on_minute_rollover() {
        let mut ring = CandleRing::new();
        ring.on_trade(100.0, 10.0, ts(0, 0));
        ring.on_trade(101.0, 5.0, ts(0, 30));
        ring.on_trade(102.0, 1.0, ts(1, 0));
        assert_eq!(ring.len(), 1);
        let closed = ring.last_closed().unwrap();
        assert_eq!(closed.open, 100.0);
        assert_eq!(closed.high, 101.0);
        assert_eq!(closed.low, 100.0);
        assert_eq!(closed.close, 101.0);
        assert_eq!(closed.volume, 15.0);
    }

    #[test]
    fn ring_never_drops_below_min_capacity_worth_of_history() {
        let mut ring = CandleRing::new();
        for m in 0..(MIN_RING_CAPACITY as i64 + 50) {
            ring.on_trade(100.0, 1.0, ts(m, 0));
        }
        assert_eq!(ring.len(), MIN_RING_CAPACITY);
    }

    #[test]
    fn late_trade_does_not_reopen_a_closed_bar() {
        let mut ring = CandleRing::new();
        ring.on_trade(100.0, 1.0, ts(5, 0));
        ring.on_trade(105.0, 1.0, ts(6, 0));
        // A trade timestamped before the forming bar's minute is dropped.
        ring.on_trade(999.0, 1.0, ts(4, 0));
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.last_closed().unwrap().close, 100.0);
    }
}
