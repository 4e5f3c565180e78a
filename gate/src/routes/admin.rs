//! Admin endpoints (spec §4.H "Admin", §6 HTTP surface table): lock,
//! unlock, liquidate, and calendar maintenance. These bypass the
//! proposal evaluation chain entirely but still serialize through the
//! same actor mutex.

use crate::ledger::queries;
use crate::state::AppState;
use actix_web::{post, web, HttpResponse};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;

#[derive(Debug, Deserialize, Default)]
pub struct LockBody {
    #[serde(default)]
    pub reason: Option<String>,
}

#[post("/v1/admin/lock")]
pub async fn lock(app: web::Data<AppState>, body: Option<web::Json<LockBody>>) -> HttpResponse {
    let reason = body.and_then(|b| b.into_inner().reason);
    let mut gate = app.gate.lock().await;
    gate.lock(reason.clone());
    if let Err(err) = queries::upsert_system_status(&app.pool, "LOCKED").await {
        log::warn!("failed to persist system_status on manual lock: {err}");
    }
    app.notifier
        .notify(&format!("manually locked: {}", reason.as_deref().unwrap_or("no reason given")))
        .await;
    HttpResponse::Ok().json(json!({"status": "LOCKED", "reason": reason}))
}

#[post("/v1/admin/unlock")]
pub async fn unlock(app: web::Data<AppState>) -> HttpResponse {
    let mut gate = app.gate.lock().await;
    gate.unlock();
    if let Err(err) = queries::upsert_system_status(&app.pool, "NORMAL").await {
        log::warn!("failed to persist system_status on manual unlock: {err}");
    }
    app.notifier.notify("manually unlocked").await;
    HttpResponse::Ok().json(json!({"status": "UNLOCKED"}))
}

/// Cancels all pending orders for `symbol` and locks the system (spec
/// §4.H "Admin ... liquidate"): a human intervention, not a normal
/// trading-day action, so it always leaves the Gate locked afterward.
#[post("/v1/admin/liquidate")]
pub async fn liquidate(app: web::Data<AppState>) -> HttpResponse {
    let symbols: Vec<String> = {
        let gate = app.gate.lock().await;
        gate.distinct_open_symbols().into_iter().map(str::to_string).collect()
    };

    let mut results = Vec::new();
    for symbol in &symbols {
        match app.broker.cancel_pending_orders_for_symbol(symbol).await {
            Ok(cancelled) => results.push(json!({"symbol": symbol, "cancelled_orders": cancelled})),
            Err(err) => {
                let err: crate::utils::errors::GateError = err.into();
                log::error!("liquidate: failed to cancel pending orders for {symbol}: {err}");
                results.push(json!({"symbol": symbol, "error": err.to_string()}));
            }
        }
    }

    let mut gate = app.gate.lock().await;
    gate.position_metadata.clear();
    gate.lock(Some("liquidated".to_string()));
    drop(gate);

    if let Err(err) = queries::upsert_system_status(&app.pool, "LOCKED").await {
        log::warn!("failed to persist system_status after liquidate: {err}");
    }
    app.notifier.notify("liquidated all open positions").await;

    HttpResponse::Ok().json(json!({"status": "LOCKED", "results": results}))
}

#[derive(Debug, Deserialize)]
pub struct CalendarBody {
    pub dates: Vec<NaiveDate>,
}

#[post("/v1/admin/calendar")]
pub async fn calendar(app: web::Data<AppState>, body: web::Json<CalendarBody>) -> HttpResponse {
    let dates: HashSet<NaiveDate> = body.into_inner().dates.into_iter().collect();
    let mut gate = app.gate.lock().await;
    let count = dates.len();
    gate.set_restricted_dates(dates);
    HttpResponse::Ok().json(json!({"status": "UPDATED", "count": count}))
}
