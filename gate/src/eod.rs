//! End-of-day report (spec §4.H "End-of-day report", triggered at 21:30
//! UTC on weekdays). Grounded on `services/scheduler.rs`'s
//! `tokio::time::interval`-driven background task: the main loop spawns
//! one long-lived task that ticks every minute and fires the report once
//! per crossing of the target time, rather than sleeping to an exact
//! instant (simpler, and tolerant of the process being started mid-day).
//!
//! This is a separate clock from `Constitution.force_eod_close_et`: that
//! field governs when the Brain's Position Manager force-closes tracked
//! positions (spec §4.F step 5), propagated over the heartbeat
//! acknowledgement (`routes::heartbeat`). This report's 21:30 UTC trigger
//! is the fixed "external scheduler" time the spec names and is not
//! configurable.

use crate::ledger::queries;
use crate::state::AppState;
use crate::time::today_et;
use chrono::{Datelike, Timelike, Utc, Weekday};
use std::collections::HashMap;
use std::sync::Arc;

/// Runs forever, checking once a minute whether this tick is the first to
/// cross 21:30 UTC on a weekday; sends the report and continues. A
/// failure here is logged and never brings down the server (spec §7:
/// background jobs must not be allowed to crash the Gate).
pub async fn run_eod_scheduler(app: Arc<AppState>) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
    let mut last_fired: Option<chrono::NaiveDate> = None;

    loop {
        interval.tick().await;
        let now = Utc::now();
        if now.weekday() == Weekday::Sat || now.weekday() == Weekday::Sun {
            continue;
        }
        if now.hour() != 21 || now.minute() != 30 {
            continue;
        }
        let today = now.date_naive();
        if last_fired == Some(today) {
            continue;
        }
        last_fired = Some(today);

        if let Err(err) = send_eod_report(&app).await {
            log::error!("eod report failed: {err}");
        }
    }
}

async fn send_eod_report(app: &AppState) -> anyhow::Result<()> {
    let gate = app.gate.lock().await;
    let sod = gate.start_of_day_equity;
    drop(gate);

    let current_equity = app.broker.account_balance().await.ok().map(|b| b.equity);
    let day_pnl = match (sod, current_equity) {
        (Some(sod), Some(equity)) => Some(equity - sod),
        _ => None,
    };

    let day_start = crate::time::start_of_trading_day_utc(today_et());
    let since_ts_s = day_start.timestamp();
    let proposals = queries::proposals_since(&app.pool, since_ts_s).await?;

    let mut by_symbol_status: HashMap<(String, String), u32> = HashMap::new();
    for p in &proposals {
        *by_symbol_status.entry((p.symbol.clone(), p.status.clone())).or_insert(0) += 1;
    }

    let mut summary = String::new();
    for ((symbol, status), count) in &by_symbol_status {
        summary.push_str(&format!("{symbol} {status}: {count}\n"));
    }

    let pnl_line = match day_pnl {
        Some(pnl) => format!("day P&L: {pnl:+.2}"),
        None => "day P&L: unavailable (broker reconciliation failed)".to_string(),
    };

    let message = format!(
        "EOD report {}\n{pnl_line}\n{} proposals evaluated\n{summary}",
        today_et(),
        proposals.len()
    );

    app.notifier.notify(&message).await;
    Ok(())
}
