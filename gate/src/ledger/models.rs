use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProposalRow {
    pub id: Uuid,
    pub ts_s: i64,
    pub symbol: String,
    pub strategy: String,
    pub side: String,
    pub quantity: i32,
    pub context_json: serde_json::Value,
    pub status: String,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub proposal_id: Uuid,
    /// The broker's own order id, the authoritative key for Position
    /// Metadata (spec §3, §9 "Cycles and back-references").
    pub broker_order_id: String,
    pub symbol: String,
    pub status: String,
    pub filled_price: Option<f64>,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A snapshot row, truncated and rewritten on every reconciliation (spec
/// §6 "Ledger schema"). Not a time series — `positions` always reflects
/// broker truth as of the last evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PositionRow {
    pub symbol: String,
    pub quantity: i32,
    pub cost_basis: f64,
    pub date_acquired: NaiveDate,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SystemStatusRow {
    pub id: String,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

/// Daily equity snapshots, supplementing the spec's logical schema: the
/// daily-loss check (spec §4.H step 11) needs a start-of-day equity value
/// that survives a Gate restart, not just the in-memory actor field.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EquitySnapshotRow {
    pub id: Uuid,
    pub equity: f64,
    pub captured_at: DateTime<Utc>,
}
