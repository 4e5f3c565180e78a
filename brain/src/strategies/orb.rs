//! Opening Range Breakout (spec §4.E): not `EVENT_RISK`, 10:00-11:30 ET,
//! break of the opening range and volume velocity > 1.5.

use crate::broker::client::BrokerClient;
use crate::indicators::store::IndicatorStore;
use crate::strategies::common::{self, ThrottleState};
use crate::strategies::{legs, pricing, sizing};
use chrono::{DateTime, NaiveTime, Timelike};
use chrono_tz::Tz;
use options_engine_core::types::{OptionType, ProposalSide, Proposal, Regime, Strategy};

const WINDOW_START: NaiveTime = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
const WINDOW_END: NaiveTime = NaiveTime::from_hms_opt(11, 30, 0).unwrap();
/// Opening range is the first 15 minutes of the regular session
/// (09:30-09:45 ET); not specified further by the spec beyond "opening
/// range".
const OPENING_RANGE_START: NaiveTime = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
const OPENING_RANGE_END: NaiveTime = NaiveTime::from_hms_opt(9, 45, 0).unwrap();
const VOLUME_VELOCITY_THRESHOLD: f64 = 1.5;
const SHORT_DELTA_TARGET: f64 = 0.32;
const SPREAD_WIDTH: f64 = 2.0;
const TARGET_DTE: i64 = 0;
const SIGNAL_NAME: &str = "orb_breakout";

fn opening_range(store: &IndicatorStore, symbol: &str, today_et: DateTime<Tz>) -> Option<(f64, f64)> {
    let bars = store.closed_bars_today(symbol, today_et, OPENING_RANGE_START, OPENING_RANGE_END)?;
    if bars.is_empty() {
        return None;
    }
    let high = bars.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let low = bars.iter().map(|b| b.low).fold(f64::MAX, f64::min);
    Some((high, low))
}

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
    if !common::base_preconditions_ok(store, regime) || regime == Regime::EventRisk {
        return None;
    }
    let t = NaiveTime::from_hms_opt(now_et.hour(), now_et.minute(), now_et.second()).unwrap();
    if t < WINDOW_START || t > WINDOW_END {
        return None;
    }
    if !throttle.proposal_eligible(symbol, now_utc) || !throttle.signal_eligible(symbol, SIGNAL_NAME, now_utc) {
        return None;
    }

    let (range_high, range_low) = opening_range(store, symbol, now_et)?;
    let price = store.price(symbol)?;
    let bars = store.closed_bars(symbol)?;
    let vv = common::volume_velocity(&bars, 20)?;
    if vv <= VOLUME_VELOCITY_THRESHOLD {
        return None;
    }

    let bullish = if price > range_high {
        true
    } else if price < range_low {
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
    let flow = common::flow_state(Some(price), store.vwap(symbol), Some(vv));
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
