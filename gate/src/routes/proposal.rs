//! `POST /v1/proposal` — the Gate's core evaluation and execution path
//! (spec §4.H). Grounded on `routes/trading.rs`'s handler shape
//! (`web::Data` extraction, `ApiResponse`-style JSON), but the body of
//! the function is the teacher has no analogue for: a strict, ordered,
//! first-failure-wins rule chain that spec §4.H numbers 1-15.

use crate::broker::client::broker_side;
use crate::ledger::{models::PositionRow, queries};
use crate::state::{AppState, PositionMetadata};
use crate::time::today_et;
use actix_web::{post, web, HttpMessage, HttpRequest, HttpResponse};
use chrono::Utc;
use options_engine_core::types::{ContextExt, ProposalSide};
use options_engine_core::{occ, signing};
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

#[post("/v1/proposal")]
pub async fn submit_proposal(req: HttpRequest, app: web::Data<AppState>) -> HttpResponse {
    let raw_bytes = req
        .extensions()
        .get::<Vec<u8>>()
        .cloned()
        .unwrap_or_default();

    let raw_value: serde_json::Value = match serde_json::from_slice(&raw_bytes) {
        Ok(v) => v,
        Err(_) => {
            return HttpResponse::BadRequest().json(json!({"status": "REJECTED", "reason": "malformed JSON body"}));
        }
    };
    let proposal: options_engine_core::types::Proposal = match serde_json::from_value(raw_value.clone()) {
        Ok(p) => p,
        Err(_) => {
            return HttpResponse::BadRequest().json(json!({"status": "REJECTED", "reason": "malformed proposal shape"}));
        }
    };

    // Single-writer actor: the whole evaluation runs under one lock,
    // acquired here and held to completion (spec §5).
    let mut gate = app.gate.lock().await;

    // --- steps 1-2: signature -------------------------------------------------
    let sig_header = req
        .headers()
        .get("X-GW-Signature")
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned);
    let sig = match sig_header {
        Some(s) => s,
        None => {
            return reject(&app, &proposal, "missing X-GW-Signature header").await;
        }
    };
    if !signing::verify(&app.hmac_secret, &raw_value, &sig) {
        return reject(&app, &proposal, "invalid signature").await;
    }

    // --- step 3: lock state -----------------------------------------------------
    if gate.is_locked() {
        return reject(&app, &proposal, "system is locked").await;
    }

    // --- step 4: staleness --------------------------------------------------
    let now_ms = Utc::now().timestamp_millis();
    let age_ms = now_ms - proposal.timestamp_ms;
    if age_ms > app.constitution.stale_proposal_ms {
        return reject(&app, &proposal, "proposal is stale").await;
    }

    // --- step 5: symbol / strategy allowlist -----------------------------------
    if !app.constitution.allows_symbol(&proposal.symbol) {
        return reject(&app, &proposal, "symbol not in allowed universe").await;
    }
    let is_open = proposal.side == ProposalSide::Open;
    if is_open && !app.constitution.allows_strategy(proposal.strategy) {
        return reject(&app, &proposal, "strategy not allowed").await;
    }

    // --- step 6: price ------------------------------------------------------
    if !(proposal.price > 0.0) {
        return reject(&app, &proposal, "price must be greater than zero").await;
    }

    if is_open {
        // --- step 7: structure validation --------------------------------
        let required = proposal.strategy.required_leg_count();
        if proposal.legs.len() != required {
            return reject(
                &app,
                &proposal,
                &format!("expected {required} legs for {:?}, got {}", proposal.strategy, proposal.legs.len()),
            )
            .await;
        }
        if proposal.strategy == options_engine_core::types::Strategy::RatioSpread
            && proposal.legs[0].quantity == proposal.legs[1].quantity
        {
            return reject(&app, &proposal, "ratio spread requires unequal leg quantities").await;
        }

        // --- step 8: DTE ----------------------------------------------------
        let Some(first_leg) = proposal.legs.first() else {
            return reject(&app, &proposal, "proposal has no legs").await;
        };
        let dte = (first_leg.expiration - today_et()).num_days();
        if dte < app.constitution.min_dte || dte > app.constitution.max_dte {
            return reject(&app, &proposal, &format!("dte {dte} outside [{}, {}]", app.constitution.min_dte, app.constitution.max_dte)).await;
        }

        // --- step 9: calendar lock -------------------------------------------
        if gate.is_restricted(today_et()) {
            return reject(&app, &proposal, "today is a restricted calendar date").await;
        }
    }

    // --- step 10: account reconciliation ----------------------------------
    let mut current_equity: Option<f64> = None;
    match app.broker.account_balance().await {
        Ok(balance) => {
            current_equity = Some(balance.equity);
            if let Ok(positions) = app.broker.broker_positions().await {
                let snapshot = aggregate_positions(&positions);
                if let Err(err) = queries::replace_positions_snapshot(&app.pool, &snapshot).await {
                    log::warn!("failed to persist positions snapshot: {err}");
                }
            }
            if gate.start_of_day_equity.is_none() {
                let day_start = crate::time::start_of_trading_day_utc(today_et());
                let sod = match queries::first_equity_snapshot_since(&app.pool, day_start).await {
                    Ok(Some(row)) => row.equity,
                    _ => {
                        if let Err(err) = queries::insert_equity_snapshot(&app.pool, balance.equity).await {
                            log::warn!("failed to record start-of-day equity snapshot: {err}");
                        }
                        balance.equity
                    }
                };
                gate.start_of_day_equity = Some(sod);
            }
        }
        Err(err) => {
            // Broker transient (spec §7 kind 3): continue with the cached
            // snapshot, do not block evaluation.
            log::warn!("account reconciliation failed, continuing with cached state: {err}");
        }
    }

    // --- step 11: daily loss --------------------------------------------------
    if let (Some(sod), Some(equity)) = (gate.start_of_day_equity, current_equity) {
        let loss_frac = (sod - equity) / sod;
        if loss_frac >= app.constitution.max_daily_loss_percent {
            let reason = format!("daily loss {:.2}% breached limit of {:.2}%", loss_frac * 100.0, app.constitution.max_daily_loss_percent * 100.0);
            gate.lock(Some(reason.clone()));
            if let Err(err) = queries::upsert_system_status(&app.pool, "LOCKED").await {
                log::warn!("failed to persist system_status: {err}");
            }
            return reject(&app, &proposal, &reason).await;
        }
    }

    if is_open {
        // --- step 12: position cap -------------------------------------------
        let distinct = gate.distinct_open_symbols().len() as u32;
        if distinct >= app.constitution.max_open_positions {
            return reject(
                &app,
                &proposal,
                &format!(
                    "position cap reached: {distinct}/{} open symbols (maxTotalPositions={})",
                    app.constitution.max_open_positions, app.constitution.max_total_positions
                ),
            )
            .await;
        }
        if gate.position_metadata.len() as u32 >= app.constitution.max_total_positions {
            return reject(
                &app,
                &proposal,
                &format!(
                    "total position ceiling reached: {}/{} (maxOpenPositions={})",
                    gate.position_metadata.len(),
                    app.constitution.max_total_positions,
                    app.constitution.max_open_positions
                ),
            )
            .await;
        }

        // --- step 13: correlation guard ---------------------------------------
        let bias = proposal.bias();
        if !bias.is_neutral() {
            for group in app.constitution.groups_for(&proposal.symbol) {
                let group_symbols = app.constitution.symbols_in_group(group);
                let count = gate.correlated_count(&group_symbols, bias);
                if count >= app.constitution.max_correlated_positions {
                    return reject(
                        &app,
                        &proposal,
                        &format!("correlation guard: group {group} already has {count} {bias:?} positions"),
                    )
                    .await;
                }
            }
        }

        // --- step 14: concentration -------------------------------------------
        let concentration = gate.open_count_for_symbol(&proposal.symbol);
        if concentration >= app.constitution.max_concentration_per_symbol {
            return reject(&app, &proposal, &format!("concentration cap reached for {}: {concentration}", proposal.symbol)).await;
        }

        // --- step 15: context ---------------------------------------------------
        match proposal.context.vix() {
            Some(vix) if vix <= 28.0 => {}
            Some(vix) => {
                return reject(&app, &proposal, &format!("VIX {vix} above gate threshold of 28")).await;
            }
            None => {
                return reject(&app, &proposal, "VIX missing from proposal context").await;
            }
        }
        if proposal.context.flow_state() == options_engine_core::types::FlowState::Unknown {
            return reject(&app, &proposal, "flow state is UNKNOWN").await;
        }
    }

    // --- approved: ledger write before execution, before the response ----------
    if let Err(err) = insert_proposal_row(&app, &proposal, "APPROVED", None).await {
        log::warn!("failed to write approved proposal to ledger: {err}");
    }

    let broker_sides: Vec<&str> = proposal.legs.iter().map(|l| broker_side(l.side, proposal.side)).collect();
    let order_type = match proposal.side {
        ProposalSide::Open => "credit",
        ProposalSide::Close => "debit",
    };

    match app
        .broker
        .submit_order(&proposal.symbol, &proposal.legs, &broker_sides, order_type, proposal.price)
        .await
    {
        Ok(broker_order_id) => {
            let order_id = Uuid::new_v4();
            if let Err(err) = queries::insert_order(
                &app.pool,
                order_id,
                Uuid::parse_str(&proposal.id).unwrap_or_else(|_| Uuid::new_v4()),
                &broker_order_id,
                &proposal.symbol,
                "pending",
                proposal.quantity as i32,
            )
            .await
            {
                log::warn!("failed to write order to ledger: {err}");
            }

            match proposal.side {
                ProposalSide::Open => {
                    gate.position_metadata.insert(
                        broker_order_id.clone(),
                        PositionMetadata {
                            symbol: proposal.symbol.clone(),
                            bias: proposal.bias(),
                            strategy: proposal.strategy,
                        },
                    );
                }
                ProposalSide::Close => {
                    let strategy_wire = strategy_wire_name(proposal.strategy);
                    if let Ok(Some(open_order)) =
                        queries::find_latest_order_for(&app.pool, &proposal.symbol, strategy_wire).await
                    {
                        gate.position_metadata.remove(&open_order.broker_order_id);
                    }
                }
            }

            app.notifier
                .notify(&format!(
                    "approved {} {:?} {:?} -> order {broker_order_id}",
                    proposal.symbol, proposal.side, proposal.strategy
                ))
                .await;

            HttpResponse::Ok().json(json!({"status": "APPROVED", "order_id": broker_order_id, "proposal_id": proposal.id}))
        }
        Err(err) => {
            let err: crate::utils::errors::GateError = err.into();
            log::error!("execution failed for proposal {}: {err}", proposal.id);
            app.notifier
                .notify(&format!("execution FAILED for proposal {}: {err}", proposal.id))
                .await;
            HttpResponse::InternalServerError().json(json!({"status": "APPROVED_BUT_EXECUTION_FAILED", "error": err.to_string()}))
        }
    }
}

async fn reject(app: &AppState, proposal: &options_engine_core::types::Proposal, reason: &str) -> HttpResponse {
    if let Err(err) = insert_proposal_row(app, proposal, "REJECTED", Some(reason)).await {
        log::warn!("failed to write rejected proposal to ledger: {err}");
    }
    HttpResponse::Forbidden().json(json!({"status": "REJECTED", "reason": reason}))
}

async fn insert_proposal_row(
    app: &AppState,
    proposal: &options_engine_core::types::Proposal,
    status: &str,
    rejection_reason: Option<&str>,
) -> sqlx::Result<()> {
    let id = Uuid::parse_str(&proposal.id).unwrap_or_else(|_| Uuid::new_v4());
    let context_json = serde_json::to_value(&proposal.context).unwrap_or(json!({}));
    queries::insert_proposal(
        &app.pool,
        id,
        proposal.timestamp_ms,
        &proposal.symbol,
        strategy_wire_name(proposal.strategy),
        side_wire_name(proposal.side),
        proposal.quantity as i32,
        context_json,
        status,
        rejection_reason,
    )
    .await
}

fn strategy_wire_name(s: options_engine_core::types::Strategy) -> &'static str {
    use options_engine_core::types::Strategy::*;
    match s {
        CreditSpread => "CREDIT_SPREAD",
        IronCondor => "IRON_CONDOR",
        IronButterfly => "IRON_BUTTERFLY",
        RatioSpread => "RATIO_SPREAD",
        CalendarSpread => "CALENDAR_SPREAD",
    }
}

fn side_wire_name(s: ProposalSide) -> &'static str {
    match s {
        ProposalSide::Open => "OPEN",
        ProposalSide::Close => "CLOSE",
    }
}

/// Collapses broker option-symbol positions down to an underlying-symbol
/// snapshot for the ledger's `positions` table (spec §6: "positions is a
/// snapshot ... truncated and rewritten on every reconciliation"). The
/// broker reports per-contract quantities; cost basis is not available
/// from this endpoint, so it is recorded as 0.0 — the ledger's positions
/// table is an audit snapshot, not the source of P&L truth (the broker
/// is, per spec §3).
fn aggregate_positions(positions: &[crate::broker::client::BrokerPosition]) -> Vec<PositionRow> {
    let mut by_symbol: HashMap<String, i32> = HashMap::new();
    for p in positions {
        let root = occ::decode(&p.option_symbol).map(|d| d.root).unwrap_or_else(|| p.option_symbol.clone());
        *by_symbol.entry(root).or_insert(0) += p.quantity as i32;
    }
    let now = Utc::now();
    let today = today_et();
    by_symbol
        .into_iter()
        .map(|(symbol, quantity)| PositionRow {
            symbol,
            quantity,
            cost_basis: 0.0,
            date_acquired: today,
            updated_at: now,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::client::BrokerPosition;
    use options_engine_core::types::OptionType;

    #[test]
    fn aggregates_multiple_contracts_by_underlying_root() {
        let exp = chrono::NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        let positions = vec![
            BrokerPosition {
                option_symbol: occ::encode("SPY", exp, OptionType::Put, 500.0),
                quantity: -2,
            },
            BrokerPosition {
                option_symbol: occ::encode("SPY", exp, OptionType::Put, 495.0),
                quantity: 2,
            },
            BrokerPosition {
                option_symbol: occ::encode("QQQ", exp, OptionType::Call, 430.0),
                quantity: 1,
            },
        ];

        let rows = aggregate_positions(&positions);
        assert_eq!(rows.len(), 2);
        let spy = rows.iter().find(|r| r.symbol == "SPY").unwrap();
        assert_eq!(spy.quantity, 0);
        assert_eq!(spy.cost_basis, 0.0);
        let qqq = rows.iter().find(|r| r.symbol == "QQQ").unwrap();
        assert_eq!(qqq.quantity, 1);
    }

    #[test]
    fn falls_back_to_raw_symbol_when_undecodable() {
        let positions = vec![BrokerPosition {
            option_symbol: "GARBAGE".to_string(),
            quantity: 5,
        }];
        let rows = aggregate_positions(&positions);
        assert_eq!(rows[0].symbol, "GARBAGE");
        assert_eq!(rows[0].quantity, 5);
    }

    #[test]
    fn strategy_wire_names_match_spec_vocabulary() {
        use options_engine_core::types::Strategy::*;
        assert_eq!(strategy_wire_name(CreditSpread), "CREDIT_SPREAD");
        assert_eq!(strategy_wire_name(IronCondor), "IRON_CONDOR");
        assert_eq!(strategy_wire_name(IronButterfly), "IRON_BUTTERFLY");
        assert_eq!(strategy_wire_name(RatioSpread), "RATIO_SPREAD");
        assert_eq!(strategy_wire_name(CalendarSpread), "CALENDAR_SPREAD");
    }

    #[test]
    fn side_wire_names_match_spec_vocabulary() {
        assert_eq!(side_wire_name(ProposalSide::Open), "OPEN");
        assert_eq!(side_wire_name(ProposalSide::Close), "CLOSE");
    }
}
