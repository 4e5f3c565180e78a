//! `GET /v1/status` (spec §4.H "Status"): the composite read the Brain
//! polls to reconcile its own state against the Gate's. Grounded on
//! `routes/health.rs`'s health-scope shape, widened into the aggregate
//! view the spec calls for.

use crate::ledger::queries;
use crate::middleware::metrics::COUNTERS;
use crate::state::AppState;
use crate::time::{start_of_trading_day_utc, today_et};
use actix_web::{get, web, HttpResponse};
use serde_json::json;

#[get("/v1/status")]
pub async fn status(app: web::Data<AppState>) -> HttpResponse {
    let gate = app.gate.lock().await;

    let current_equity = match app.broker.account_balance().await {
        Ok(balance) => Some(balance.equity),
        Err(err) => {
            log::warn!("status: account_balance unavailable: {err}");
            None
        }
    };

    let day_pnl = match (gate.start_of_day_equity, current_equity) {
        (Some(sod), Some(equity)) => Some(equity - sod),
        _ => None,
    };

    let positions = queries::get_positions_snapshot(&app.pool).await.unwrap_or_default();
    let recent_proposals = queries::recent_proposals(&app.pool, 10).await.unwrap_or_default();
    let (request_count, avg_latency_ms) = COUNTERS.snapshot();

    HttpResponse::Ok().json(json!({
        "lock": gate.lock,
        "start_of_day_equity": gate.start_of_day_equity,
        "current_equity": current_equity,
        "day_pnl": day_pnl,
        "today": today_et(),
        "trading_day_start_utc": start_of_trading_day_utc(today_et()),
        "positions": positions,
        "recent_proposals": recent_proposals,
        "open_position_count": gate.position_metadata.len(),
        "last_heartbeat_at": gate.heartbeat.last_heartbeat_at,
        "brain_state": gate.heartbeat.brain_state,
        "metrics": {
            "request_count": request_count,
            "avg_latency_ms": avg_latency_ms,
        },
    }))
}
