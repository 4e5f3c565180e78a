//! Standard Wilder ADX(14), computed from closed bars (spec §4.A/§4.B).

use super::candle::Candle;

#[derive(Debug, Clone, Copy)]
struct WilderSmoothed {
    tr: f64,
    plus_dm: f64,
    minus_dm: f64,
}

#[derive(Debug, Clone, Default)]
pub struct AdxTracker {
    period: usize,
    prev: Option<Candle>,
    raw_seed_tr: Vec<f64>,
    raw_seed_plus: Vec<f64>,
    raw_seed_minus: Vec<f64>,
    smoothed: Option<WilderSmoothed>,
    dx_seed: Vec<f64>,
    adx: Option<f64>,
}

impl AdxTracker {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev: None,
            raw_seed_tr: Vec::with_capacity(period),
            raw_seed_plus: Vec::with_capacity(period),
            raw_seed_minus: Vec::with_capacity(period),
            smoothed: None,
            dx_seed: Vec::with_capacity(period),
            adx: None,
        }
    }

    pub fn on_close(&mut self, bar: Candle) {
        let Some(prev) = self.prev else {
            self.prev = Some(bar);
            return;
        };
        self.prev = Some(bar);

        let up_move = bar.high - prev.high;
        let down_move = prev.low - bar.low;
        let plus_dm = if up_move > down_move && up_move > 0.0 { up_move } else { 0.0 };
        let minus_dm = if down_move > up_move && down_move > 0.0 { down_move } else { 0.0 };
        let tr = (bar.high - bar.low)
            .max((bar.high - prev.close).abs())
            .max((bar.low - prev.close).abs());

        let updated = match &mut self.smoothed {
            None => {
                // Accumulate raw sums for the first `period` bars.
                self.dx_seed_push(tr, plus_dm, minus_dm);
                None
            }
            Some(sm) => {
                let n = self.period as f64;
                sm.tr = sm.tr - (sm.tr / n) + tr;
                sm.plus_dm = sm.plus_dm - (sm.plus_dm / n) + plus_dm;
                sm.minus_dm = sm.minus_dm - (sm.minus_dm / n) + minus_dm;
                Some(*sm)
            }
        };
        if let Some(sm) = updated {
            self.push_dx(sm);
        }
    }

    fn dx_seed_push(&mut self, tr: f64, plus_dm: f64, minus_dm: f64) {
        self.raw_seed_tr.push(tr);
        self.raw_seed_plus.push(plus_dm);
        self.raw_seed_minus.push(minus_dm);
        if self.raw_seed_tr.len() == self.period {
            let sm = WilderSmoothed {
                tr: self.raw_seed_tr.iter().sum(),
                plus_dm: self.raw_seed_plus.iter().sum(),
                minus_dm: self.raw_seed_minus.iter().sum(),
            };
            self.smoothed = Some(sm);
            self.push_dx(sm);
        }
    }

    fn push_dx(&mut self, sm: WilderSmoothed) {
        if sm.tr == 0.0 {
            self.dx_seed.push(0.0);
        } else {
            let plus_di = 100.0 * (sm.plus_dm / sm.tr);
            let minus_di = 100.0 * (sm.minus_dm / sm.tr);
            let denom = plus_di + minus_di;
            let dx = if denom == 0.0 { 0.0 } else { 100.0 * (plus_di - minus_di).abs() / denom };

            match self.adx {
                None => {
                    self.dx_seed.push(dx);
                    if self.dx_seed.len() == self.period {
                        self.adx = Some(self.dx_seed.iter().sum::<f64>() / self.period as f64);
                    }
                }
                Some(prev_adx) => {
                    let n = self.period as f64;
                    self.adx = Some((prev_adx * (n - 1.0) + dx) / n);
                }
            }
        }
    }

    pub fn value(&self) -> Option<f64> {
        self.adx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(h: f64, l: f64, c: f64) -> Candle {
        Candle {
            open_time: Utc.timestamp_opt(0, 0).unwrap(),
            open: c,
            high: h,
            low: l,
            close: c,
            volume: 0.0,
        }
    }

    #[test]
    fn absent_until_enough_bars() {
        let mut adx = AdxTracker::new(3);
        for _ in 0..3 {
            adx.on_close(bar(101.0, 99.0, 100.0));
        }
        assert!(adx.value().is_none());
    }

    #[test]
    fn strong_uptrend_yields_high_adx() {
        let mut adx = AdxTracker::new(5);
        let mut price = 100.0;
        for _ in 0..30 {
            price += 2.0;
            adx.on_close(bar(price + 1.0, price - 0.2, price));
        }
        let v = adx.value().unwrap();
        assert!(v > 20.0, "expected strong trend adx, got {v}");
    }
}
