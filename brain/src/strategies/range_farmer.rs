//! Range Farmer (spec §4.E): `LOW_VOL_CHOP`, 13:00-13:05 ET, ADX < 20 and
//! price within 2.0 of the POC. Emits an iron condor.

use crate::broker::client::BrokerClient;
use crate::indicators::store::IndicatorStore;
use crate::strategies::common::{self, ThrottleState};
use crate::strategies::{legs, pricing, sizing};
use chrono::{DateTime, NaiveTime, Timelike};
use chrono_tz::Tz;
use options_engine_core::types::{ProposalSide, Proposal, Regime, Strategy};

const WINDOW_START: NaiveTime = NaiveTime::from_hms_opt(13, 0, 0).unwrap();
const WINDOW_END: NaiveTime = NaiveTime::from_hms_opt(13, 5, 0).unwrap();
const ADX_MAX: f64 = 20.0;
const POC_DISTANCE_MAX: f64 = 2.0;
const SHORT_DELTA_TARGET: f64 = 0.16;
const WING_WIDTH: f64 = 2.0;
const TARGET_DTE: i64 = 0;
const SIGNAL_NAME: &str = "range_farmer_condor";

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
    if !common::base_preconditions_ok(store, regime) || regime != Regime::LowVolChop {
        return None;
    }
    let t = NaiveTime::from_hms_opt(now_et.hour(), now_et.minute(), now_et.second()).unwrap();
    if t < WINDOW_START || t > WINDOW_END {
        return None;
    }
    if !throttle.proposal_eligible(symbol, now_utc) || !throttle.signal_eligible(symbol, SIGNAL_NAME, now_utc) {
        return None;
    }

    let adx = store.adx(symbol, 14)?;
    if adx >= ADX_MAX {
        return None;
    }
    let price = store.price(symbol)?;
    let profile = store.volume_profile(symbol)?;
    if (price - profile.poc).abs() >= POC_DISTANCE_MAX {
        return None;
    }

    let chain = broker.option_chain(symbol).await.ok()?;
    let expiration = legs::pick_expiration(&chain, now_et.date_naive(), TARGET_DTE)?;
    let quantity = sizing::contracts(equity, WING_WIDTH);
    let condor_legs = legs::build_iron_condor(symbol, &chain, expiration, SHORT_DELTA_TARGET, WING_WIDTH, quantity)?;

    let quotes = broker.quotes_for_legs(&condor_legs).await.ok()?;
    let mids: Option<Vec<pricing::LegMid>> = condor_legs
        .iter()
        .map(|l| {
            quotes
                .iter()
                .find(|q| q.option_symbol == l.option_symbol)
                .map(|q| pricing::LegMid { side: l.side, mid: q.mid, quantity: l.quantity })
        })
        .collect();
    let price_net = pricing::net_price(&mids?);

    let vix = store.vix(now_utc);
    let flow = common::flow_state(Some(price), store.vwap(symbol), common::volume_velocity(&store.closed_bars(symbol)?, 20));
    throttle.record_proposal(symbol, now_utc);
    throttle.record_signal(symbol, SIGNAL_NAME, now_utc);

    Some(common::build_proposal(
        symbol,
        Strategy::IronCondor,
        ProposalSide::Open,
        quantity,
        price_net,
        condor_legs,
        vix,
        flow,
        now_utc,
    ))
}
