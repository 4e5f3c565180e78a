use actix_web::{middleware::Logger, web, App, HttpServer};
use gate::broker::client::BrokerClient;
use gate::config::settings::Settings;
use gate::constitution::Constitution;
use gate::eod::run_eod_scheduler;
use gate::ledger::queries;
use gate::middleware::{metrics::Metrics, path_logger::PathLogger, signature::BufferBody};
use gate::notifier::LogNotifier;
use gate::routes::{admin, dashboard, health, heartbeat, proposal, status};
use gate::state::{AppState, GateState};
use sqlx::postgres::PgPoolOptions;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();
    log::info!("starting risk gate");

    let settings = Settings::new().unwrap_or_else(|e| {
        eprintln!("failed to load settings: {e}");
        std::process::exit(1);
    });

    let constitution = Constitution::load(Path::new(&settings.constitution_path)).unwrap_or_else(|e| {
        eprintln!("failed to load constitution from {}: {e}", settings.constitution_path);
        std::process::exit(1);
    });

    let port = settings.server_port;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await
        .expect("postgres");

    if let Err(err) = queries::upsert_system_status(&pool, "NORMAL").await {
        log::warn!("failed to seed system_status: {err}");
    }

    let broker = BrokerClient::new(&settings);

    let app_state = Arc::new(AppState {
        gate: Mutex::new(GateState::new()),
        constitution,
        pool,
        broker,
        hmac_secret: settings.gate_hmac_secret.clone(),
        notifier: Arc::new(LogNotifier),
    });

    {
        let eod_state = app_state.clone();
        tokio::spawn(run_eod_scheduler(eod_state));
    }

    let http_state = app_state.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(PathLogger)
            .wrap(Metrics)
            .wrap(BufferBody)
            .app_data(web::Data::from(http_state.clone()))
            .service(health::healthz)
            .service(dashboard::dashboard)
            .service(proposal::submit_proposal)
            .service(heartbeat::heartbeat)
            .service(status::status)
            .service(admin::lock)
            .service(admin::unlock)
            .service(admin::liquidate)
            .service(admin::calendar)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
