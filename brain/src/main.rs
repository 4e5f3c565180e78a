use brain::broker::client::BrokerClient;
use brain::config::settings::Settings;
use brain::gateclient::client::{GateClient, HeartbeatState};
use brain::gateclient::sync_state::GateSyncState;
use brain::indicators::store::IndicatorStore;
use brain::pollers::{iv, vix, warmup};
use brain::position::manager::PositionManager;
use brain::regime::{self, RegimeInputs};
use brain::strategies::common::ThrottleState;
use brain::stream::ingestor;
use brain::stream::session_window::now_eastern;
use options_engine_core::types::{Context, UNIVERSE};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let settings = Settings::new()?;

    let store = Arc::new(IndicatorStore::new());
    let broker = Arc::new(BrokerClient::new(&settings));
    let gate = Arc::new(GateClient::new(&settings));
    let gate_sync = Arc::new(GateSyncState::new());
    let throttle = Arc::new(Mutex::new(ThrottleState::new()));

    log::info!("starting warm-up");
    warmup::run(broker.clone(), store.clone()).await;

    let position_manager = Arc::new(Mutex::new(PositionManager::new(
        broker.clone(),
        store.clone(),
        gate_sync.clone(),
        PathBuf::from(&settings.positions_mirror_path),
    )?));

    let shutdown = tokio::signal::ctrl_c();

    let vix_task = tokio::spawn(vix::run(broker.clone(), store.clone()));
    let iv_task = tokio::spawn(iv::run(broker.clone(), store.clone()));
    let ingest_task = tokio::spawn(ingestor::run(
        broker.clone(),
        store.clone(),
        gate.clone(),
        gate_sync.clone(),
        throttle.clone(),
        position_manager.clone(),
        settings.broker_ws_base_url.clone(),
    ));
    let position_task = tokio::spawn(PositionManager::run(position_manager.clone()));
    let heartbeat_task = tokio::spawn(heartbeat_loop(gate.clone(), store.clone(), gate_sync.clone()));

    shutdown.await?;
    log::info!("shutdown signal received");
    vix_task.abort();
    iv_task.abort();
    ingest_task.abort();
    position_task.abort();
    heartbeat_task.abort();

    Ok(())
}

async fn heartbeat_loop(gate: Arc<GateClient>, store: Arc<IndicatorStore>, gate_sync: Arc<GateSyncState>) {
    let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
    loop {
        ticker.tick().await;
        let now = chrono::Utc::now();
        let inputs = RegimeInputs {
            vix: store.vix(now),
            adx_spy: store.adx("SPY", 14),
            today_is_restricted: gate_sync.is_restricted(now_eastern().date_naive()),
        };
        let regime = regime::classify(&inputs);

        let mut per_symbol_view = Context::new();
        for symbol in UNIVERSE {
            if let Some(price) = store.price(symbol) {
                per_symbol_view.insert(
                    symbol.to_string(),
                    options_engine_core::types::ContextValue::Number(price),
                );
            }
        }

        let state = HeartbeatState {
            regime,
            per_symbol_view,
            portfolio_greeks: Context::new(),
        };

        match gate.send_heartbeat(&state).await {
            Ok(ack) => gate_sync.apply(&ack),
            Err(err) => log::warn!("heartbeat failed: {err}"),
        }
    }
}
