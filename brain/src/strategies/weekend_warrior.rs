//! Weekend Warrior (spec §4.E): any regime, Friday only, 15:55-16:00 ET,
//! VIX < 25. Emits a credit spread held over the weekend for theta decay.

use crate::broker::client::BrokerClient;
use crate::indicators::store::IndicatorStore;
use crate::strategies::common::{self, ThrottleState};
use crate::strategies::{legs, pricing, sizing};
use chrono::{DateTime, Datelike, NaiveTime, Timelike, Weekday};
use chrono_tz::Tz;
use options_engine_core::types::{OptionType, ProposalSide, Proposal, Regime, Strategy};

const WINDOW_START: NaiveTime = NaiveTime::from_hms_opt(15, 55, 0).unwrap();
const WINDOW_END: NaiveTime = NaiveTime::from_hms_opt(16, 0, 0).unwrap();
const VIX_MAX: f64 = 25.0;
const SHORT_DELTA_TARGET: f64 = 0.20;
const SPREAD_WIDTH: f64 = 2.0;
const TARGET_DTE: i64 = 2;
const SIGNAL_NAME: &str = "weekend_warrior";

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
    if now_et.weekday() != Weekday::Fri {
        return None;
    }
    let t = NaiveTime::from_hms_opt(now_et.hour(), now_et.minute(), now_et.second()).unwrap();
    if t < WINDOW_START || t > WINDOW_END {
        return None;
    }
    if !throttle.proposal_eligible(symbol, now_utc) || !throttle.signal_eligible(symbol, SIGNAL_NAME, now_utc) {
        return None;
    }

    let vix = store.vix(now_utc)?;
    if vix >= VIX_MAX {
        return None;
    }

    let price = store.price(symbol)?;
    let profile = store.volume_profile(symbol);
    let bullish = match profile {
        Some(p) => price >= p.poc,
        None => true,
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

    let bars = store.closed_bars(symbol);
    let flow = common::flow_state(Some(price), store.vwap(symbol), bars.and_then(|b| common::volume_velocity(&b, 20)));
    throttle.record_proposal(symbol, now_utc);
    throttle.record_signal(symbol, SIGNAL_NAME, now_utc);

    Some(common::build_proposal(
        symbol,
        Strategy::CreditSpread,
        ProposalSide::Open,
        quantity,
        price_net,
        vec![short_leg, long_leg],
        Some(vix),
        flow,
        now_utc,
    ))
}
