//! Thin client for the brokerage's account and execution API, the Gate's
//! side of the same vendor surface the Brain's `broker::client` talks to
//! (spec §4.H "Execution", "Account reconciliation"). Grounded on
//! `services/blowfin/api.rs` (`reqwest::Client`, header auth, `.json()`),
//! duplicated rather than shared with the Brain crate the same way the
//! teacher keeps each service's own API module self-contained instead of
//! factoring out a shared HTTP client crate.

use crate::config::settings::Settings;
use crate::utils::errors::ApiError;
use options_engine_core::types::{Leg, LegSide, ProposalSide};
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AccountBalance {
    pub equity: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerPosition {
    pub option_symbol: String,
    pub quantity: i64,
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

    /// Synchronous account reconciliation fetch (spec §4.H step 10).
    pub async fn account_balance(&self) -> Result<AccountBalance, ApiError> {
        let resp: AccountBalance = self
            .authed(self.http.get(self.url("/v1/account/balance")))
            .send()
            .await?
            .json()
            .await?;
        Ok(resp)
    }

    pub async fn broker_positions(&self) -> Result<Vec<BrokerPosition>, ApiError> {
        let resp: Vec<BrokerPosition> = self
            .authed(self.http.get(self.url("/v1/account/positions")))
            .send()
            .await?
            .json()
            .await?;
        Ok(resp)
    }

    /// Submits the approved multi-leg order (spec §4.H "Execution",
    /// §6 "Multi-leg order payload").
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

    /// Cancels every pending order for `symbol` (liquidate admin action,
    /// spec §4.H "Admin endpoints"). Returns the cancelled order ids.
    pub async fn cancel_pending_orders_for_symbol(&self, symbol: &str) -> Result<Vec<String>, ApiError> {
        #[derive(Deserialize)]
        struct PendingOrder {
            order_id: String,
        }
        let pending: Vec<PendingOrder> = self
            .authed(
                self.http
                    .get(self.url("/v1/orders"))
                    .query(&[("symbol", symbol), ("status", "pending")]),
            )
            .send()
            .await?
            .json()
            .await?;

        let mut cancelled = Vec::new();
        for order in pending {
            self.authed(self.http.delete(self.url(&format!("/v1/orders/{}", order.order_id))))
                .send()
                .await?;
            cancelled.push(order.order_id);
        }
        Ok(cancelled)
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
    fn broker_side_mapping() {
        assert_eq!(broker_side(LegSide::Sell, ProposalSide::Open), "sell_to_open");
        assert_eq!(broker_side(LegSide::Buy, ProposalSide::Open), "buy_to_open");
        assert_eq!(broker_side(LegSide::Sell, ProposalSide::Close), "buy_to_close");
        assert_eq!(broker_side(LegSide::Buy, ProposalSide::Close), "sell_to_close");
    }
}
