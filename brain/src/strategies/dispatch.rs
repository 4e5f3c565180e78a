//! Runs every enabled strategy gate for a symbol on each trade event and
//! submits whatever fires to the Gate (spec §4.E, §5 "Strategy Gates
//! execute synchronously on the ingest task").

use crate::broker::client::BrokerClient;
use crate::gateclient::client::{GateClient, ProposalResponse};
use crate::indicators::store::IndicatorStore;
use crate::position::manager::PositionManager;
use crate::position::store::{PendingOrder, StrategyGate, TrackedPosition};
use crate::strategies::common::ThrottleState;
use crate::strategies::{iron_butterfly, orb, range_farmer, ratio_hedge, scalper, trend_engine, weekend_warrior};
use crate::stream::session_window::now_eastern;
use chrono::Utc;
use options_engine_core::types::{PositionStatus, Proposal, ProposalSide, Regime};
use std::sync::Arc;
use tokio::sync::Mutex;

#[allow(clippy::too_many_arguments)]
pub async fn evaluate_symbol(
    symbol: &str,
    regime: Regime,
    store: &IndicatorStore,
    broker: &BrokerClient,
    gate: &GateClient,
    throttle: &mut ThrottleState,
    positions: &Arc<Mutex<PositionManager>>,
) {
    let now_utc = Utc::now();
    let now_et = now_eastern();

    let equity = match broker.account_balance().await {
        Ok(bal) => bal.equity,
        Err(err) => {
            log::warn!("skipping strategy evaluation for {symbol}: equity fetch failed: {err}");
            return;
        }
    };

    macro_rules! try_strategy {
        ($module:ident, $gate_id:expr) => {
            if let Some(proposal) = $module::evaluate(symbol, regime, store, broker, throttle, equity, now_et, now_utc).await {
                submit(gate, positions, $gate_id, proposal).await;
            }
        };
    }

    try_strategy!(orb, StrategyGate::Orb);
    try_strategy!(range_farmer, StrategyGate::RangeFarmer);
    try_strategy!(scalper, StrategyGate::Scalper);
    try_strategy!(trend_engine, StrategyGate::TrendEngine);
    try_strategy!(iron_butterfly, StrategyGate::IronButterfly);
    try_strategy!(ratio_hedge, StrategyGate::RatioHedge);
    try_strategy!(weekend_warrior, StrategyGate::WeekendWarrior);
}

/// On an approved OPEN, builds the `TrackedPosition` the Position Manager
/// needs to take over P&L, exits and chasing (spec §4.F) — without this,
/// only positions pre-seeded in the disk mirror are ever managed.
async fn submit(gate: &GateClient, positions: &Arc<Mutex<PositionManager>>, strategy_gate: StrategyGate, proposal: Proposal) {
    let symbol = proposal.symbol.clone();
    match gate.send_proposal(&proposal).await {
        Ok(ProposalResponse::Approved { order_id, proposal_id }) => {
            log::info!("proposal for {symbol} approved: order {order_id} (proposal {proposal_id})");
            if proposal.side == ProposalSide::Open {
                let now = Utc::now();
                let position = TrackedPosition {
                    id: order_id.clone(),
                    symbol,
                    strategy: proposal.strategy,
                    bias: proposal.bias(),
                    legs: proposal.legs,
                    quantity: proposal.quantity,
                    // Already the net price computed from final scaled leg
                    // quantities (spec §4.E "Pricing", §9).
                    entry_price: proposal.price,
                    status: PositionStatus::Opening,
                    highest_pnl_seen: 0.0,
                    opened_at: now,
                    pending_order: Some(PendingOrder {
                        broker_order_id: order_id,
                        submitted_limit: proposal.price,
                        submitted_at: now,
                        cooldown_until: None,
                    }),
                    opened_by: strategy_gate,
                };
                positions.lock().await.track(position);
            }
        }
        Ok(resp) => log::info!("proposal for {symbol} resolved: {resp:?}"),
        Err(err) => log::warn!("proposal for {symbol} abandoned: {err}"),
    }
}
