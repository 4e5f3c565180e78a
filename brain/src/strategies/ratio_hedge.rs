//! Ratio Hedge (spec §4.E): any regime, checked on the :30 of each hour,
//! iv_rank < 20. Emits a 1x2 ratio spread (long near-ATM put, short two
//! further-OTM puts) — a cheap-vol downside hedge structure.

use crate::broker::client::BrokerClient;
use crate::indicators::store::IndicatorStore;
use crate::strategies::common::{self, ThrottleState};
use crate::strategies::{legs, pricing, sizing};
use chrono::{DateTime, Timelike};
use chrono_tz::Tz;
use options_engine_core::types::{Leg, OptionType, ProposalSide, Proposal, Regime, Strategy};

const IV_RANK_MAX: f64 = 20.0;
const LONG_DELTA_TARGET: f64 = 0.40;
const SHORT_DELTA_TARGET: f64 = 0.18;
const SPREAD_WIDTH: f64 = 2.0;
const TARGET_DTE: i64 = 45;
const SIGNAL_NAME: &str = "ratio_hedge";

#[allow(clippy::too_many_arguments)]
pub async fn evaluate(
    symbol: &str,
    regime: Regime,
    store: &IndicatorStore,
    broker: &BrokerClient,
    throttle: &mut ThrottleState,
    equity: f64,
    now_et: DateTime<Tz>,
    now_utc: DateTime<chrono::Utc>,
) -> Option<Proposal> {
    if !common::base_preconditions_ok(store, regime) {
        return None;
    }
    if now_et.minute() != 30 {
        return None;
    }
    if !throttle.proposal_eligible(symbol, now_utc) || !throttle.signal_eligible(symbol, SIGNAL_NAME, now_utc) {
        return None;
    }

    let iv_rank = store.iv_rank(symbol)?;
    if iv_rank >= IV_RANK_MAX {
        return None;
    }

    let chain = broker.option_chain(symbol).await.ok()?;
    let expiration = legs::pick_expiration(&chain, now_et.date_naive(), TARGET_DTE)?;
    let quantity = sizing::contracts(equity, SPREAD_WIDTH);

    let long_entry = legs::pick_by_delta(&chain, expiration, OptionType::Put, LONG_DELTA_TARGET)?;
    let short_entry = legs::pick_by_delta(&chain, expiration, OptionType::Put, SHORT_DELTA_TARGET)?;
    let long_leg: Leg = legs::build_leg(symbol, long_entry, options_engine_core::types::LegSide::Buy, quantity);
    let short_leg: Leg = legs::build_leg(symbol, short_entry, options_engine_core::types::LegSide::Sell, quantity * 2);

    let quotes = broker.quotes_for_legs(&[long_leg.clone(), short_leg.clone()]).await.ok()?;
    let mid = |sym: &str| quotes.iter().find(|q| q.option_symbol == sym).map(|q| q.mid);
    let price_net = pricing::net_price(&[
        pricing::LegMid { side: long_leg.side, mid: mid(&long_leg.option_symbol)?, quantity: long_leg.quantity },
        pricing::LegMid { side: short_leg.side, mid: mid(&short_leg.option_symbol)?, quantity: short_leg.quantity },
    ]);

    let vix = store.vix(now_utc);
    let price = store.price(symbol);
    let bars = store.closed_bars(symbol);
    let flow = common::flow_state(price, store.vwap(symbol), bars.and_then(|b| common::volume_velocity(&b, 20)));
    throttle.record_proposal(symbol, now_utc);
    throttle.record_signal(symbol, SIGNAL_NAME, now_utc);

    Some(common::build_proposal(
        symbol,
        Strategy::RatioSpread,
        ProposalSide::Open,
        quantity,
        price_net,
        vec![long_leg, short_leg],
        vix,
        flow,
        now_utc,
    ))
}
