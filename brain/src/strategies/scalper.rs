//! Scalper 0DTE (spec §4.E): `TRENDING` or `HIGH_VOL_EXPANSION`, all day,
//! RSI(2) < 5 (bullish) or > 95 (bearish). Emits a 0DTE credit spread.

use crate::broker::client::BrokerClient;
use crate::indicators::store::IndicatorStore;
use crate::strategies::common::{self, ThrottleState};
use crate::strategies::{legs, pricing, sizing};
use chrono::DateTime;
use chrono_tz::Tz;
use options_engine_core::types::{OptionType, ProposalSide, Proposal, Regime, Strategy};

const RSI2_OVERSOLD: f64 = 5.0;
const RSI2_OVERBOUGHT: f64 = 95.0;
const SHORT_DELTA_TARGET: f64 = 0.32;
const SPREAD_WIDTH: f64 = 1.0;
const TARGET_DTE: i64 = 0;
const SIGNAL_NAME: &str = "scalper_0dte";

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
    if !matches!(regime, Regime::Trending | Regime::HighVolExpansion) {
        return None;
    }
    if !throttle.proposal_eligible(symbol, now_utc) || !throttle.signal_eligible(symbol, SIGNAL_NAME, now_utc) {
        return None;
    }

    let rsi2 = store.rsi(symbol, 2)?;
    let bullish = if rsi2 < RSI2_OVERSOLD {
        true
    } else if rsi2 > RSI2_OVERBOUGHT {
        false
    } else {
        return None;
    };

    let price = store.price(symbol)?;
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
    let bars = store.closed_bars(symbol)?;
    let flow = common::flow_state(Some(price), store.vwap(symbol), common::volume_velocity(&bars, 20));
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
