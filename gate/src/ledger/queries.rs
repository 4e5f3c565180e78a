//! Runtime-checked queries against the ledger tables (spec §6 "Ledger
//! schema (logical)"). Grounded on `db/api_keys.rs::get_by_user_and_exchange`
//! (`sqlx::query_as::<_, T>(..).bind(..)`, one function per access
//! pattern) rather than the compile-time `query!`/`query_as!` macros,
//! since this workspace is never built against a live database here.

use crate::ledger::models::{
    EquitySnapshotRow, OrderRow, PositionRow, ProposalRow, SystemStatusRow,
};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/* ----------------------- PROPOSALS ----------------------- */

#[allow(clippy::too_many_arguments)]
pub async fn insert_proposal(
    pool: &PgPool,
    id: Uuid,
    ts_s: i64,
    symbol: &str,
    strategy: &str,
    side: &str,
    quantity: i32,
    context_json: serde_json::Value,
    status: &str,
    rejection_reason: Option<&str>,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"INSERT INTO proposals
               (id, ts_s, symbol, strategy, side, quantity, context_json, status, rejection_reason)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
    )
    .bind(id)
    .bind(ts_s)
    .bind(symbol)
    .bind(strategy)
    .bind(side)
    .bind(quantity)
    .bind(context_json)
    .bind(status)
    .bind(rejection_reason)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn recent_proposals(pool: &PgPool, limit: i64) -> sqlx::Result<Vec<ProposalRow>> {
    sqlx::query_as::<_, ProposalRow>(
        r#"SELECT id, ts_s, symbol, strategy, side, quantity, context_json, status, rejection_reason
             FROM proposals
            ORDER BY ts_s DESC
            LIMIT $1"#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn proposals_since(pool: &PgPool, since_ts_s: i64) -> sqlx::Result<Vec<ProposalRow>> {
    sqlx::query_as::<_, ProposalRow>(
        r#"SELECT id, ts_s, symbol, strategy, side, quantity, context_json, status, rejection_reason
             FROM proposals
            WHERE ts_s >= $1
            ORDER BY ts_s ASC"#,
    )
    .bind(since_ts_s)
    .fetch_all(pool)
    .await
}

/* ------------------------- ORDERS ------------------------- */

#[allow(clippy::too_many_arguments)]
pub async fn insert_order(
    pool: &PgPool,
    id: Uuid,
    proposal_id: Uuid,
    broker_order_id: &str,
    symbol: &str,
    status: &str,
    quantity: i32,
) -> sqlx::Result<()> {
    let now = now_utc();
    sqlx::query(
        r#"INSERT INTO orders (id, proposal_id, broker_order_id, symbol, status, filled_price, quantity, created_at, updated_at)
           VALUES ($1, $2, $3, $4, $5, NULL, $6, $7, $7)"#,
    )
    .bind(id)
    .bind(proposal_id)
    .bind(broker_order_id)
    .bind(symbol)
    .bind(status)
    .bind(quantity)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_latest_order_for(
    pool: &PgPool,
    symbol: &str,
    proposal_strategy: &str,
) -> sqlx::Result<Option<OrderRow>> {
    sqlx::query_as::<_, OrderRow>(
        r#"SELECT o.id, o.proposal_id, o.broker_order_id, o.symbol, o.status, o.filled_price, o.quantity, o.created_at, o.updated_at
             FROM orders o
             JOIN proposals p ON p.id = o.proposal_id
            WHERE o.symbol = $1 AND p.strategy = $2 AND p.side = 'OPEN'
            ORDER BY o.created_at DESC
            LIMIT 1"#,
    )
    .bind(symbol)
    .bind(proposal_strategy)
    .fetch_optional(pool)
    .await
}

/* ----------------------- POSITIONS ------------------------ */

/// Truncate-and-rewrite the positions snapshot (spec §6: "positions is a
/// snapshot, truncated and rewritten on every reconciliation").
pub async fn replace_positions_snapshot(pool: &PgPool, rows: &[PositionRow]) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM positions").execute(&mut *tx).await?;
    for row in rows {
        sqlx::query(
            r#"INSERT INTO positions (symbol, quantity, cost_basis, date_acquired, updated_at)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(&row.symbol)
        .bind(row.quantity)
        .bind(row.cost_basis)
        .bind(row.date_acquired)
        .bind(row.updated_at)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn get_positions_snapshot(pool: &PgPool) -> sqlx::Result<Vec<PositionRow>> {
    sqlx::query_as::<_, PositionRow>(
        r#"SELECT symbol, quantity, cost_basis, date_acquired, updated_at FROM positions"#,
    )
    .fetch_all(pool)
    .await
}

/* --------------------- SYSTEM STATUS ----------------------- */

pub async fn upsert_system_status(pool: &PgPool, status: &str) -> sqlx::Result<()> {
    sqlx::query(
        r#"INSERT INTO system_status (id, status, updated_at)
           VALUES ('singleton', $1, $2)
           ON CONFLICT (id) DO UPDATE SET status = EXCLUDED.status, updated_at = EXCLUDED.updated_at"#,
    )
    .bind(status)
    .bind(now_utc())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_system_status(pool: &PgPool) -> sqlx::Result<Option<SystemStatusRow>> {
    sqlx::query_as::<_, SystemStatusRow>(
        r#"SELECT id, status, updated_at FROM system_status WHERE id = 'singleton'"#,
    )
    .fetch_optional(pool)
    .await
}

/* ------------------- EQUITY SNAPSHOTS ----------------------- */

pub async fn insert_equity_snapshot(pool: &PgPool, equity: f64) -> sqlx::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(r#"INSERT INTO equity_snapshots (id, equity, captured_at) VALUES ($1, $2, $3)"#)
        .bind(id)
        .bind(equity)
        .bind(now_utc())
        .execute(pool)
        .await?;
    Ok(id)
}

/// First snapshot recorded on or after `day_start` — the start-of-day
/// equity reading used by the daily-loss check (spec §4.H step 10/11).
pub async fn first_equity_snapshot_since(
    pool: &PgPool,
    day_start: DateTime<Utc>,
) -> sqlx::Result<Option<EquitySnapshotRow>> {
    sqlx::query_as::<_, EquitySnapshotRow>(
        r#"SELECT id, equity, captured_at
             FROM equity_snapshots
            WHERE captured_at >= $1
            ORDER BY captured_at ASC
            LIMIT 1"#,
    )
    .bind(day_start)
    .fetch_optional(pool)
    .await
}

pub async fn latest_equity_snapshot(pool: &PgPool) -> sqlx::Result<Option<EquitySnapshotRow>> {
    sqlx::query_as::<_, EquitySnapshotRow>(
        r#"SELECT id, equity, captured_at FROM equity_snapshots ORDER BY captured_at DESC LIMIT 1"#,
    )
    .fetch_optional(pool)
    .await
}

fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

#[allow(dead_code)]
fn today() -> NaiveDate {
    Utc::now().date_naive()
}
