//! `POST /v1/heartbeat` (spec §4.H "Heartbeat"): the Brain's liveness
//! ping, recorded through the same single-writer actor as proposals so a
//! concurrent `/v1/status` read never observes a torn update.

use crate::state::AppState;
use actix_web::{post, web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize, Default)]
pub struct HeartbeatBody {
    #[serde(default)]
    pub state: Option<serde_json::Value>,
}

#[post("/v1/heartbeat")]
pub async fn heartbeat(app: web::Data<AppState>, body: Option<web::Json<HeartbeatBody>>) -> HttpResponse {
    let state = body.and_then(|b| b.into_inner().state);
    let mut gate = app.gate.lock().await;
    gate.heartbeat.last_heartbeat_at = Some(Utc::now());
    if state.is_some() {
        gate.heartbeat.brain_state = state;
    }
    let restricted_dates: Vec<chrono::NaiveDate> = gate.restricted_dates.iter().copied().collect();
    drop(gate);

    // Additive to the documented `{status: OK}` contract: the Brain owns
    // no calendar or EOD-close configuration of its own (spec §3
    // "Ownership"), so both are piggybacked here rather than requiring a
    // separate poll.
    let force_eod_close_et = app.constitution.force_eod_close_et.map(|t| t.format("%H:%M").to_string());
    HttpResponse::Ok().json(json!({
        "status": "OK",
        "restricted_dates": restricted_dates,
        "force_eod_close_et": force_eod_close_et,
    }))
}
