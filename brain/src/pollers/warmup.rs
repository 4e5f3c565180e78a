//! One-time warm-up task (spec §4.C): fetches ~5 trading days of 1-minute
//! history per symbol before any strategy gate is allowed to fire.

use crate::broker::client::BrokerClient;
use crate::indicators::store::IndicatorStore;
use options_engine_core::types::UNIVERSE;
use std::sync::Arc;

/// ~5 trading days, padded slightly so the ring clears `MIN_RING_CAPACITY`
/// worth of closed minutes even accounting for partial sessions.
pub const WARMUP_DAYS: u32 = 6;

/// Retry delay if a symbol's history fetch fails; warm-up must eventually
/// succeed for every symbol before `IndicatorStore::mark_warmed_up` runs.
const RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(5);

pub async fn run(broker: Arc<BrokerClient>, store: Arc<IndicatorStore>) {
    for symbol in UNIVERSE {
        loop {
            match broker.history_1m(symbol, WARMUP_DAYS).await {
                Ok(bars) => {
                    log::info!("warm-up: seeded {} bars for {symbol}", bars.len());
                    store.seed_history(symbol, bars);
                    break;
                }
                Err(err) => {
                    log::warn!("warm-up fetch failed for {symbol}: {err}, retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }
    store.mark_warmed_up();
    log::info!("warm-up complete, strategy gates armed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warmup_days_clears_minimum_ring_capacity() {
        // ~390 regular-session minutes/day; 6 days comfortably exceeds the
        // 1500-minute floor the ring is required to retain.
        let minutes_per_day = 390;
        assert!(WARMUP_DAYS as usize * minutes_per_day >= crate::indicators::candle::MIN_RING_CAPACITY);
    }
}
