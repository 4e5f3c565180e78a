//! ATM IV poller: refreshes each symbol's IV-rank history every 15 minutes
//! (spec §4.C).

use crate::broker::client::BrokerClient;
use crate::indicators::store::IndicatorStore;
use options_engine_core::types::UNIVERSE;
use std::sync::Arc;
use std::time::Duration;

pub const IV_POLL_INTERVAL: Duration = Duration::from_secs(15 * 60);

pub async fn run(broker: Arc<BrokerClient>, store: Arc<IndicatorStore>) {
    let mut ticker = tokio::time::interval(IV_POLL_INTERVAL);
    loop {
        ticker.tick().await;
        for symbol in UNIVERSE {
            match broker.atm_iv(symbol).await {
                Ok(iv) => store.push_iv_reading(symbol, iv),
                Err(err) => log::warn!("iv poll failed for {symbol}: {err}"),
            }
        }
    }
}
