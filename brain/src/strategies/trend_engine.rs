//! Trend Engine (spec §4.E): `TRENDING`, all day. Bullish: RSI(14) < 30
//! AND price > POC AND flow != NEUTRAL; bearish: mirror. Emits a ~30 DTE
//! credit spread.

use crate::broker::client::BrokerClient;
use crate::indicators::store::IndicatorStore;
use crate::strategies::common::{self, ThrottleState};
use crate::strategies::{legs, pricing, sizing};
use chrono::DateTime;
use chrono_tz::Tz;
use options_engine_core::types::{FlowState, OptionType, ProposalSide, Proposal, Regime, Strategy};

const RSI14_OVERSOLD: f64 = 30.0;
const RSI14_OVERBOUGHT: f64 = 70.0;
const SHORT_DELTA_TARGET: f64 = 0.30;
const SPREAD_WIDTH: f64 = 2.0;
const TARGET_DTE: i64 = 30;
const SIGNAL_NAME: &str = "trend_engine";

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
    if !common::base_preconditions_ok(store, regime) || regime != Regime::Trending {
        return None;
    }
    if !throttle.proposal_eligible(symbol, now_utc) || !throttle.signal_eligible(symbol, SIGNAL_NAME, now_utc) {
        return None;
    }

    let rsi14 = store.rsi(symbol, 14)?;
    let price = store.price(symbol)?;
    let profile = store.volume_profile(symbol)?;
    let bars = store.closed_bars(symbol)?;
    let flow = common::flow_state(Some(price), store.vwap(symbol), common::volume_velocity(&bars, 20));
    if flow == FlowState::Neutral || flow == FlowState::Unknown {
        return None;
    }

    let bullish = if rsi14 < RSI14_OVERSOLD && price > profile.poc {
        true
    } else if rsi14 > RSI14_OVERBOUGHT && price < profile.poc {
        false
    } else {
        return None;
    };

    let chain = broker.option_chain(symbol).await.ok()?;
    let expiration = legs::pick_expiration(&chain, now_et.date_naive(), TARGET_DTE)?;
    let option_type = if bullish { OptionType::Put } else { OptionType::Call };
    let quantity = sizing::contracts(equity, SPREAD_WIDTH);
    let (short_leg, long_leg) = legs::build_vertical_credit(
        symbol,
        &chain,
        expiration,
        option_type,
        SHORT_DELTA_TARGET,
        SPREAD_WIDTH,
        quantity,
    )?;

    let quotes = broker.quotes_for_legs(&[short_leg.clone(), long_leg.clone()]).await.ok()?;
    let mid = |sym: &str| quotes.iter().find(|q| q.option_symbol == sym).map(|q| q.mid);
    let price_net = pricing::net_price(&[
        pricing::LegMid { side: short_leg.side, mid: mid(&short_leg.option_symbol)?, quantity: short_leg.quantity },
        pricing::LegMid { side: long_leg.side, mid: mid(&long_leg.option_symbol)?, quantity: long_leg.quantity },
    ]);

    let vix = store.vix(now_utc);
    throttle.record_proposal(symbol, now_utc);
    throttle.record_signal(symbol, SIGNAL_NAME, now_utc);

    Some(common::build_proposal(
        symbol,
        Strategy::CreditSpread,
        ProposalSide::Open,
        quantity,
        price_net,
        vec![short_leg, long_leg],
        vix,
        flow,
        now_utc,
    ))
}
