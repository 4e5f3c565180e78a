//! Wilder's RSI, recomputed only on bar close (spec §4.A).
//!
//! First value is the simple mean of the first `n` gains/losses; every
//! subsequent closed bar updates `avg = (prev_avg*(n-1) + new)/n`. Once
//! seeded, the averages are never recomputed from scratch — only ever
//! updated incrementally.

#[derive(Debug, Clone, Copy)]
struct WilderState {
    avg_gain: f64,
    avg_loss: f64,
}

#[derive(Debug, Clone, Default)]
pub struct RsiTracker {
    period: usize,
    prev_close: Option<f64>,
    seed_changes: Vec<f64>,
    state: Option<WilderState>,
}

impl RsiTracker {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev_close: None,
            seed_changes: Vec::with_capacity(period),
            state: None,
        }
    }

    /// Feed one newly-closed bar's close price. Call only on bar close.
    pub fn on_close(&mut self, close: f64) {
        let Some(prev) = self.prev_close else {
            self.prev_close = Some(close);
            return;
        };
        let change = close - prev;
        self.prev_close = Some(close);

        match &mut self.state {
            None => {
                self.seed_changes.push(change);
                if self.seed_changes.len() == self.period {
                    let gains: f64 = self.seed_changes.iter().map(|c| c.max(0.0)).sum();
                    let losses: f64 = self.seed_changes.iter().map(|c| (-c).max(0.0)).sum();
                    self.state = Some(WilderState {
                        avg_gain: gains / self.period as f64,
                        avg_loss: losses / self.period as f64,
                    });
                }
            }
            Some(st) => {
                let n = self.period as f64;
                let gain = change.max(0.0);
                let loss = (-change).max(0.0);
                st.avg_gain = (st.avg_gain * (n - 1.0) + gain) / n;
                st.avg_loss = (st.avg_loss * (n - 1.0) + loss) / n;
            }
        }
    }

    /// Re-seed directly from precomputed averages (used by warm-up, which
    /// batch-loads history rather than replaying it tick by tick).
    pub fn seed_averages(&mut self, avg_gain: f64, avg_loss: f64, last_close: f64) {
        self.state = Some(WilderState { avg_gain, avg_loss });
        self.prev_close = Some(last_close);
    }

    /// `None` ("absent") until at least `period` closed bars have been seen.
    pub fn value(&self) -> Option<f64> {
        let st = self.state?;
        if st.avg_loss == 0.0 {
            return Some(100.0);
        }
        let rs = st.avg_gain / st.avg_loss;
        Some(100.0 - (100.0 / (1.0 + rs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_until_period_closes() {
        let mut r = RsiTracker::new(3);
        r.on_close(100.0);
        r.on_close(101.0);
        r.on_close(102.0);
        assert!(r.value().is_none());
        r.on_close(103.0);
        assert!(r.value().is_some());
    }

    #[test]
    fn all_gains_is_rsi_100() {
        let mut r = RsiTracker::new(3);
        for c in [100.0, 101.0, 102.0, 103.0] {
            r.on_close(c);
        }
        assert_eq!(r.value(), Some(100.0));
    }

    #[test]
    fn wilder_smoothing_matches_formula() {
        let mut r = RsiTracker::new(2);
        // changes: +1 (seed 1/2), +2 (seed 2/2 -> avg_gain=1.5, avg_loss=0)
        r.on_close(100.0);
        r.on_close(101.0); // change +1
        r.on_close(103.0); // change +2, seed complete avg_gain=(1+2)/2=1.5
        assert!((r.value().unwrap() - 100.0).abs() < 1e-9);

        r.on_close(102.0); // change -1 => update avg_gain=(1.5*1+0)/2=0.75, avg_loss=(0*1+1)/2=0.5
        let rs = 0.75 / 0.5;
        let expected = 100.0 - 100.0 / (1.0 + rs);
        assert!((r.value().unwrap() - expected).abs() < 1e-9);
    }
}
