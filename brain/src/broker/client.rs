//! Thin client for the brokerage's market-data and execution API.
//!
//! TLS/transport details and the concrete vendor wire format are out of
//! scope (spec §1); this module assumes a JSON REST + WS streaming API
//! authenticated by an API-key header, in the same request-building style
//! as the teacher's `services/blowfin::api` (build URL, attach headers,
//! `.json()`).

use crate::config::settings::Settings;
use crate::indicators::candle::Candle;
use crate::utils::errors::ApiError;
use chrono::{DateTime, NaiveDate, Utc};
use options_engine_core::types::{Leg, LegSide, OptionType, ProposalSide};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct ChainEntry {
    pub option_symbol: String,
    pub expiration: NaiveDate,
    pub strike: f64,
    pub option_type: OptionType,
    pub delta: f64,
    pub bid: f64,
    pub ask: f64,
    pub iv: f64,
}

#[derive(Debug, Clone)]
pub struct LegQuote {
    pub option_symbol: String,
    pub mid: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountBalance {
    pub equity: f64,
}

pub struct BrokerClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl BrokerClient {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: Client::new(),
            base_url: settings.broker_base_url.clone(),
            api_key: settings.broker_api_key.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("X-API-KEY", &self.api_key)
    }

    /// Create a streaming session, returning the opaque token the caller
    /// presents when opening the persistent WS connection (spec §4.D).
    pub async fn create_stream_session(&self) -> Result<String, ApiError> {
        #[derive(Deserialize)]
        struct SessionResp {
            token: String,
        }
        let resp: SessionResp = self
            .authed(self.http.post(self.url("/v1/stream/session")))
            .send()
            .await?
            .json()
            .await?;
        Ok(resp.token)
    }

    pub async fn current_vix(&self) -> Result<f64, ApiError> {
        #[derive(Deserialize)]
        struct VixResp {
            value: f64,
        }
        let resp: VixResp = self
            .authed(self.http.get(self.url("/v1/quotes/VIX")))
            .send()
            .await?
            .json()
            .await?;
        Ok(resp.value)
    }

    /// Average of nearest-ATM call and put implied vol (spec glossary:
    /// "ATM IV").
    pub async fn atm_iv(&self, symbol: &str) -> Result<f64, ApiError> {
        #[derive(Deserialize)]
        struct AtmIvResp {
            call_iv: f64,
            put_iv: f64,
        }
        let resp: AtmIvResp = self
            .authed(self.http.get(self.url(&format!("/v1/options/{symbol}/atm-iv"))))
            .send()
            .await?
            .json()
            .await?;
        Ok((resp.call_iv + resp.put_iv) / 2.0)
    }

    /// Batched history fetch for warm-up: `days` trading days of 1-minute
    /// candles.
    pub async fn history_1m(&self, symbol: &str, days: u32) -> Result<Vec<Candle>, ApiError> {
        #[derive(Deserialize)]
        struct Bar {
            open_time: DateTime<Utc>,
            open: f64,
            high: f64,
            low: f64,
            close: f64,
            volume: f64,
        }
        let bars: Vec<Bar> = self
            .authed(
                self.http
                    .get(self.url(&format!("/v1/bars/{symbol}")))
                    .query(&[("interval", "1m"), ("days", &days.to_string())]),
            )
            .send()
            .await?
            .json()
            .await?;
        Ok(bars
            .into_iter()
            .map(|b| Candle {
                open_time: b.open_time,
                open: b.open,
                high: b.high,
                low: b.low,
                close: b.close,
                volume: b.volume,
            })
            .collect())
    }

    /// The full options chain for a symbol, used by strike/expiration
    /// selection (spec §4.E "Leg construction").
    pub async fn option_chain(&self, symbol: &str) -> Result<Vec<ChainEntry>, ApiError> {
        let chain: Vec<ChainEntry> = self
            .authed(self.http.get(self.url(&format!("/v1/options/{symbol}/chain"))))
            .send()
            .await?
            .json()
            .await?;
        Ok(chain)
    }

    /// Current mid for every leg's option symbol, fetched in a single call
    /// (spec §4.E pricing, §4.F quote fetch).
    pub async fn quotes_for_legs(&self, legs: &[Leg]) -> Result<Vec<LegQuote>, ApiError> {
        let symbols: Vec<&str> = legs.iter().map(|l| l.option_symbol.as_str()).collect();
        #[derive(Deserialize)]
        struct QuoteResp {
            option_symbol: String,
            bid: f64,
            ask: f64,
        }
        let quotes: Vec<QuoteResp> = self
            .authed(
                self.http
                    .post(self.url("/v1/options/quotes"))
                    .json(&serde_json::json!({ "symbols": symbols })),
            )
            .send()
            .await?
            .json()
            .await?;
        Ok(quotes
            .into_iter()
            .map(|q| LegQuote {
                option_symbol: q.option_symbol,
                mid: (q.bid + q.ask) / 2.0,
            })
            .collect())
    }

    pub async fn account_balance(&self) -> Result<AccountBalance, ApiError> {
        let resp: AccountBalance = self
            .authed(self.http.get(self.url("/v1/account/balance")))
            .send()
            .await?
            .json()
            .await?;
        Ok(resp)
    }

    /// Submits a multi-leg limit order directly against the broker for an
    /// already-approved trade (order chasing re-prices a still-pending
    /// order, it does not revisit the trade decision — spec §4.F).
    pub async fn submit_order(
        &self,
        root: &str,
        legs: &[Leg],
        broker_sides: &[&str],
        order_type: &str,
        limit_price: f64,
    ) -> Result<String, ApiError> {
        let mut form: Vec<(String, String)> = vec![
            ("class".to_string(), "multileg".to_string()),
            ("symbol".to_string(), root.to_string()),
            ("type".to_string(), order_type.to_string()),
            ("duration".to_string(), "day".to_string()),
            ("price".to_string(), format!("{limit_price:.2}")),
        ];
        for (i, (leg, side)) in legs.iter().zip(broker_sides.iter()).enumerate() {
            form.push((format!("option_symbol[{i}]"), leg.option_symbol.clone()));
            form.push((format!("side[{i}]"), side.to_string()));
            form.push((format!("quantity[{i}]"), leg.quantity.to_string()));
        }

        #[derive(Deserialize)]
        struct OrderResp {
            order_id: String,
        }
        let resp: OrderResp = self
            .authed(self.http.post(self.url("/v1/orders")).form(&form))
            .send()
            .await?
            .json()
            .await?;
        Ok(resp.order_id)
    }

    pub async fn cancel_order(&self, order_id: &str) -> Result<(), ApiError> {
        self.authed(self.http.delete(self.url(&format!("/v1/orders/{order_id}"))))
            .send()
            .await?;
        Ok(())
    }

    pub async fn order_status(&self, order_id: &str) -> Result<OrderStatus, ApiError> {
        #[derive(Deserialize)]
        struct StatusResp {
            status: OrderStatus,
        }
        let resp: StatusResp = self
            .authed(self.http.get(self.url(&format!("/v1/orders/{order_id}"))))
            .send()
            .await?
            .json()
            .await?;
        Ok(resp.status)
    }

    /// Full broker-side positions snapshot, used by reconciliation (spec
    /// §4.F) — "the broker is authoritative".
    pub async fn broker_positions(&self) -> Result<Vec<BrokerPosition>, ApiError> {
        let resp: Vec<BrokerPosition> = self
            .authed(self.http.get(self.url("/v1/account/positions")))
            .send()
            .await?
            .json()
            .await?;
        Ok(resp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Filled,
    Cancelled,
    Rejected,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerPosition {
    pub option_symbol: String,
    pub quantity: i64,
}

/// Sign of `mid` contribution for computing a leg's share of a net price,
/// per spec §4.E: "SELL legs add mid*qty, BUY legs subtract mid*qty".
pub fn leg_price_sign(side: LegSide) -> f64 {
    match side {
        LegSide::Sell => 1.0,
        LegSide::Buy => -1.0,
    }
}

/// Maps leg side x proposal side to the broker's order-side vocabulary
/// (spec §4.H "Execution"): OPEN.SELL -> sell_to_open, OPEN.BUY ->
/// buy_to_open, CLOSE.SELL -> buy_to_close, CLOSE.BUY -> sell_to_close.
pub fn broker_side(leg_side: LegSide, proposal_side: ProposalSide) -> &'static str {
    match (proposal_side, leg_side) {
        (ProposalSide::Open, LegSide::Sell) => "sell_to_open",
        (ProposalSide::Open, LegSide::Buy) => "buy_to_open",
        (ProposalSide::Close, LegSide::Sell) => "buy_to_close",
        (ProposalSide::Close, LegSide::Buy) => "sell_to_close",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sell_legs_add_buy_legs_subtract() {
        assert_eq!(leg_price_sign(LegSide::Sell), 1.0);
        assert_eq!(leg_price_sign(LegSide::Buy), -1.0);
    }

    #[test]
    fn broker_side_mapping() {
        assert_eq!(broker_side(LegSide::Sell, ProposalSide::Open), "sell_to_open");
        assert_eq!(broker_side(LegSide::Buy, ProposalSide::Open), "buy_to_open");
        assert_eq!(broker_side(LegSide::Sell, ProposalSide::Close), "buy_to_close");
        assert_eq!(broker_side(LegSide::Buy, ProposalSide::Close), "sell_to_close");
    }
}
