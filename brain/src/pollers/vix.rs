//! VIX poller: refreshes the shared VIX reading every 60s (spec §4.C).
//!
//! Mirrors the teacher's `services/risk.rs::spawn_guardian` shape: a
//! `tokio::time::interval` loop that never panics the task on a single
//! bad tick, just logs and tries again next time.

use crate::broker::client::BrokerClient;
use crate::indicators::store::IndicatorStore;
use std::sync::Arc;
use std::time::Duration;

pub const VIX_POLL_INTERVAL: Duration = Duration::from_secs(60);

pub async fn run(broker: Arc<BrokerClient>, store: Arc<IndicatorStore>) {
    let mut ticker = tokio::time::interval(VIX_POLL_INTERVAL);
    loop {
        ticker.tick().await;
        match broker.current_vix().await {
            Ok(value) => store.set_vix(value, chrono::Utc::now()),
            Err(err) => log::warn!("vix poll failed: {err}"),
        }
    }
}
