//! Position Manager: the 5 s loop that prices, exits, chases and
//! reconciles every tracked position (spec §4.F).

use crate::broker::client::{broker_side, BrokerClient, OrderStatus};
use crate::gateclient::sync_state::GateSyncState;
use crate::indicators::store::IndicatorStore;
use crate::position::store::{PendingOrder, PositionMap, StrategyGate, TrackedPosition};
use crate::stream::session_window::{now_eastern, past_force_close_time_at};
use chrono::Utc;
use options_engine_core::types::{Bias, LegSide, PositionStatus, ProposalSide, Strategy};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const TICK_INTERVAL: Duration = Duration::from_secs(5);
const QUOTE_TIMEOUT: Duration = Duration::from_secs(5);
const RECONCILE_EVERY: Duration = Duration::from_secs(10 * 60);
/// SMA window for the directional credit-spread "trend break" exit (spec
/// §4.F step 5).
const TREND_SMA_PERIOD: usize = 200;

const DRIFT_THRESHOLD: f64 = 0.10;
const CHASE_AGGRESSIVENESS: f64 = 0.05;
const PENDING_TIMEOUT: Duration = Duration::from_secs(120);
const CANCEL_COOLDOWN: Duration = Duration::from_secs(5);

pub struct PositionManager {
    broker: Arc<BrokerClient>,
    store: Arc<IndicatorStore>,
    gate_sync: Arc<GateSyncState>,
    positions: PositionMap,
    mirror_path: PathBuf,
    last_reconcile: tokio::time::Instant,
}

impl PositionManager {
    pub fn new(
        broker: Arc<BrokerClient>,
        store: Arc<IndicatorStore>,
        gate_sync: Arc<GateSyncState>,
        mirror_path: PathBuf,
    ) -> std::io::Result<Self> {
        let positions = PositionMap::load(&mirror_path)?;
        Ok(Self {
            broker,
            store,
            gate_sync,
            positions,
            mirror_path,
            last_reconcile: tokio::time::Instant::now(),
        })
    }

    pub fn track(&mut self, position: TrackedPosition) {
        self.positions.insert(position);
        self.persist();
    }

    fn persist(&self) {
        if let Err(err) = self.positions.save(&self.mirror_path) {
            log::error!("failed to persist positions mirror: {err}");
        }
    }

    /// Driven from a shared handle (`Arc<Mutex<_>>`) rather than
    /// consuming `self`, so the strategy-dispatch path can also reach
    /// `track()` on the same instance after an approved OPEN proposal.
    pub async fn run(manager: Arc<Mutex<Self>>) {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        loop {
            ticker.tick().await;
            manager.lock().await.tick().await;
        }
    }

    async fn tick(&mut self) {
        let ids: Vec<String> = self.positions.iter().map(|p| p.id.clone()).collect();
        let mut mutated = false;

        for id in ids {
            match self.evaluate_position(&id).await {
                Ok(changed) => mutated |= changed,
                Err(err) => log::warn!("position {id} tick failed: {err}"),
            }
        }

        if self.last_reconcile.elapsed() >= RECONCILE_EVERY {
            self.reconcile().await;
            self.last_reconcile = tokio::time::Instant::now();
            mutated = true;
        }

        if mutated {
            self.persist();
        }
    }

    async fn evaluate_position(&mut self, id: &str) -> Result<bool, crate::utils::errors::ApiError> {
        let Some(position) = self.positions.get_mut(id) else {
            return Ok(false);
        };

        let quotes = match tokio::time::timeout(QUOTE_TIMEOUT, self.broker.quotes_for_legs(&position.legs)).await {
            Ok(res) => res?,
            Err(_) => {
                log::warn!("quote fetch for {id} timed out");
                return Ok(false);
            }
        };

        let cost_to_close: f64 = position
            .legs
            .iter()
            .filter_map(|leg| {
                let mid = quotes.iter().find(|q| q.option_symbol == leg.option_symbol)?.mid;
                let sign = match leg.side {
                    LegSide::Sell => 1.0,
                    LegSide::Buy => -1.0,
                };
                Some(sign * mid * leg.quantity as f64)
            })
            .sum();

        let (pnl, pnl_pct) = compute_pnl(position.strategy, position.entry_price, cost_to_close);
        position.highest_pnl_seen = position.highest_pnl_seen.max(pnl_pct);

        let adx = self.store.adx(&position.symbol, 14);
        let rsi14 = self.store.rsi(&position.symbol, 14);
        let price = self.store.price(&position.symbol);
        let sma200 = self.store.sma(&position.symbol, TREND_SMA_PERIOD);
        let now_et = now_eastern();
        let force_close = match self.gate_sync.force_close_time() {
            Some(threshold) => past_force_close_time_at(now_et, threshold),
            None => false,
        };

        let should_close = evaluate_exit(position, pnl_pct, adx, rsi14, price, sma200, force_close);

        if should_close && position.status == PositionStatus::Open {
            position.status = PositionStatus::Closing;
            return Ok(true);
        }

        let broker = self.broker.clone();

        if position.status == PositionStatus::Closing {
            return Self::chase_order(&broker, position, ProposalSide::Close, cost_to_close).await;
        }
        if position.status == PositionStatus::Opening {
            return Self::chase_order(&broker, position, ProposalSide::Open, cost_to_close).await;
        }

        Ok(false)
    }

    /// Order chasing: cancel and resubmit on drift > $0.10 or pending >
    /// 120 s, with a 5 s cooldown after any cancel/reject (spec §4.F).
    async fn chase_order(
        broker: &BrokerClient,
        position: &mut TrackedPosition,
        side: ProposalSide,
        current_mid_total: f64,
    ) -> Result<bool, crate::utils::errors::ApiError> {
        let now = Utc::now();

        if let Some(pending) = &position.pending_order {
            if let Some(cooldown_until) = pending.cooldown_until {
                if now < cooldown_until {
                    return Ok(false);
                }
            }

            let status = broker.order_status(&pending.broker_order_id).await?;
            match status {
                OrderStatus::Filled => {
                    position.pending_order = None;
                    if side == ProposalSide::Open {
                        position.status = PositionStatus::Open;
                    }
                    return Ok(true);
                }
                OrderStatus::Pending => {
                    let drift = (current_mid_total.abs() - pending.submitted_limit).abs();
                    let pending_for = now.signed_duration_since(pending.submitted_at).to_std().unwrap_or_default();
                    if drift > DRIFT_THRESHOLD || pending_for > PENDING_TIMEOUT {
                        broker.cancel_order(&pending.broker_order_id).await?;
                        let new_limit = current_mid_total.abs() + CHASE_AGGRESSIVENESS;
                        Self::resubmit(broker, position, side, new_limit, now).await?;
                        return Ok(true);
                    }
                    return Ok(false);
                }
                OrderStatus::Cancelled | OrderStatus::Rejected => {
                    let new_limit = current_mid_total.abs() + CHASE_AGGRESSIVENESS;
                    Self::resubmit(broker, position, side, new_limit, now).await?;
                    return Ok(true);
                }
            }
        }

        let limit = current_mid_total.abs();
        Self::resubmit(broker, position, side, limit, now).await?;
        Ok(true)
    }

    async fn resubmit(
        broker: &BrokerClient,
        position: &mut TrackedPosition,
        side: ProposalSide,
        limit: f64,
        now: chrono::DateTime<Utc>,
    ) -> Result<(), crate::utils::errors::ApiError> {
        let broker_sides: Vec<&str> = position.legs.iter().map(|l| broker_side(l.side, side)).collect();
        let order_type = match side {
            ProposalSide::Open => "credit",
            ProposalSide::Close => "debit",
        };
        match broker
            .submit_order(&position.symbol, &position.legs, &broker_sides, order_type, limit)
            .await
        {
            Ok(order_id) => {
                position.pending_order = Some(PendingOrder {
                    broker_order_id: order_id,
                    submitted_limit: limit,
                    submitted_at: now,
                    cooldown_until: None,
                });
            }
            Err(err) => {
                log::warn!("order resubmission failed for {}: {err}", position.id);
                if let Some(pending) = &mut position.pending_order {
                    pending.cooldown_until = Some(now + chrono::Duration::from_std(CANCEL_COOLDOWN).unwrap());
                }
            }
        }
        Ok(())
    }

    /// Every 10 minutes: fetch full broker positions, promote fills,
    /// remove ghosts, adjust quantities (spec §4.F "Reconciliation").
    async fn reconcile(&mut self) {
        let broker_positions = match self.broker.broker_positions().await {
            Ok(p) => p,
            Err(err) => {
                log::warn!("reconciliation fetch failed, skipping this cycle: {err}");
                return;
            }
        };
        let broker_symbols: std::collections::HashSet<String> =
            broker_positions.iter().map(|p| p.option_symbol.clone()).collect();

        for ghost_id in self.positions.ghost_ids(&broker_symbols) {
            log::info!("removing ghost position {ghost_id}");
            self.positions.remove(&ghost_id);
        }

        for position in self.positions.iter_mut() {
            if position.status == PositionStatus::Opening
                && position.legs.iter().all(|l| broker_symbols.contains(&l.option_symbol))
            {
                position.status = PositionStatus::Open;
            }
            for leg in &mut position.legs {
                if let Some(bp) = broker_positions.iter().find(|p| p.option_symbol == leg.option_symbol) {
                    leg.quantity = bp.quantity.unsigned_abs() as u32;
                }
            }
        }
    }
}

fn compute_pnl(strategy: Strategy, entry_price: f64, cost_to_close: f64) -> (f64, f64) {
    if strategy.is_credit() {
        let pnl = entry_price - cost_to_close.max(0.0);
        (pnl, pnl / entry_price * 100.0)
    } else {
        let pnl = if cost_to_close >= 0.0 {
            entry_price - cost_to_close
        } else {
            entry_price + cost_to_close.abs()
        };
        (pnl, pnl / entry_price * 100.0)
    }
}

#[allow(clippy::too_many_arguments)]
fn evaluate_exit(
    position: &TrackedPosition,
    pnl_pct: f64,
    adx: Option<f64>,
    rsi14: Option<f64>,
    price: Option<f64>,
    sma200: Option<f64>,
    force_close: bool,
) -> bool {
    if force_close {
        return true;
    }
    match position.bias {
        Bias::Neutral => {
            if let Some(adx) = adx {
                if adx > 30.0 {
                    return true;
                }
            }
            pnl_pct >= 50.0 || pnl_pct <= -100.0
        }
        _ if is_scalper(position) => {
            if let Some(rsi) = rsi14 {
                let bullish = position.bias == Bias::Bullish;
                if (bullish && rsi > 60.0) || (!bullish && rsi < 40.0) {
                    return true;
                }
            }
            pnl_pct <= -20.0
        }
        _ => {
            let trailing_stop = position.highest_pnl_seen >= 30.0 && position.highest_pnl_seen - pnl_pct >= 10.0;
            let trend_break = match (price, sma200) {
                (Some(price), Some(sma200)) => {
                    let bullish = position.bias == Bias::Bullish;
                    (bullish && price < sma200) || (!bullish && price > sma200)
                }
                _ => false,
            };
            trailing_stop || trend_break || pnl_pct >= 80.0 || pnl_pct <= -100.0
        }
    }
}

fn is_scalper(position: &TrackedPosition) -> bool {
    position.opened_by == StrategyGate::Scalper
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use options_engine_core::types::{LegSide, OptionType};

    #[test]
    fn credit_strategy_pnl_matches_spec_formula() {
        let (pnl, pnl_pct) = compute_pnl(Strategy::CreditSpread, 9.50, 3.0);
        assert!((pnl - 6.50).abs() < 1e-9);
        assert!((pnl_pct - (6.50 / 9.50 * 100.0)).abs() < 1e-9);
    }

    #[test]
    fn debit_strategy_closing_for_credit_matches_s4() {
        // spec §8 S4: entry 120 debit, cost_to_close = -30 -> pnl 150, pct 125.
        let (pnl, pnl_pct) = compute_pnl(Strategy::RatioSpread, 120.0, -30.0);
        assert!((pnl - 150.0).abs() < 1e-9);
        assert!((pnl_pct - 125.0).abs() < 1e-9);
    }

    fn directional_position(opened_by: StrategyGate) -> TrackedPosition {
        TrackedPosition {
            id: "p1".to_string(),
            symbol: "SPY".to_string(),
            strategy: Strategy::CreditSpread,
            bias: Bias::Bullish,
            legs: vec![options_engine_core::types::Leg {
                option_symbol: "SPY240116P00416000".to_string(),
                expiration: chrono::NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
                strike: 416.0,
                option_type: OptionType::Put,
                quantity: 10,
                side: LegSide::Sell,
            }],
            quantity: 10,
            entry_price: 9.50,
            status: PositionStatus::Open,
            highest_pnl_seen: 0.0,
            opened_at: Utc.timestamp_opt(0, 0).unwrap(),
            pending_order: None,
            opened_by,
        }
    }

    #[test]
    fn orb_same_day_credit_spread_is_not_routed_as_scalper() {
        let position = directional_position(StrategyGate::Orb);
        // RSI crossing the scalper exit threshold must not matter here.
        assert!(!evaluate_exit(&position, 0.0, None, Some(99.0), Some(430.0), Some(425.0), false));
    }

    #[test]
    fn scalper_same_day_credit_spread_exits_on_rsi() {
        let position = directional_position(StrategyGate::Scalper);
        assert!(evaluate_exit(&position, 0.0, None, Some(65.0), None, None, false));
    }

    #[test]
    fn directional_trend_break_closes_bullish_position_below_sma200() {
        let position = directional_position(StrategyGate::TrendEngine);
        assert!(evaluate_exit(&position, 0.0, None, None, Some(420.0), Some(425.0), false));
    }

    #[test]
    fn directional_position_holds_above_sma200() {
        let position = directional_position(StrategyGate::TrendEngine);
        assert!(!evaluate_exit(&position, 0.0, None, None, Some(430.0), Some(425.0), false));
    }
}
