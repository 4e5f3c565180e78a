//! HTTP client for talking to the Gate (spec §4.G).
//!
//! Builds the canonical signed payload the same way `core::signing` is
//! grounded on the teacher's `utils/signature.rs` + `blowfin::auth`
//! request-signing pattern, then posts it with a bounded timeout so a
//! slow Gate never stalls the ingest loop for more than 2 s (spec §5).

use crate::config::settings::Settings;
use crate::utils::errors::ApiError;
use options_engine_core::types::{Context, Proposal, Regime};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Spec §5: "Gate HTTP call from Brain 2 s".
const PROPOSAL_TIMEOUT: Duration = Duration::from_secs(2);
/// Not specified explicitly; heartbeats are lower-stakes than proposals so
/// they get a slightly longer budget before being abandoned.
const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Serialize)]
pub struct HeartbeatState {
    pub regime: Regime,
    pub per_symbol_view: Context,
    pub portfolio_greeks: Context,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "status")]
pub enum ProposalResponse {
    #[serde(rename = "APPROVED")]
    Approved { order_id: String, proposal_id: String },
    #[serde(rename = "REJECTED")]
    Rejected { reason: String },
    #[serde(rename = "APPROVED_BUT_EXECUTION_FAILED")]
    ApprovedButExecutionFailed { error: String },
}

/// Gate-owned configuration piggybacked onto the heartbeat acknowledgement
/// (restricted dates, the operator-configurable EOD force-close time) —
/// the Brain has no other channel to learn values the Gate exclusively
/// owns (spec §3 "Ownership"). Both fields are additive to the documented
/// `{status: OK}` contract and default to empty/absent so an older Gate
/// still round-trips cleanly.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct HeartbeatResponse {
    #[serde(default)]
    pub restricted_dates: Vec<chrono::NaiveDate>,
    #[serde(default)]
    pub force_eod_close_et: Option<String>,
}

pub struct GateClient {
    http: Client,
    base_url: String,
    hmac_secret: String,
}

impl GateClient {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: Client::new(),
            base_url: settings.gate_base_url.clone(),
            hmac_secret: settings.gate_hmac_secret.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Signs and sends a proposal. A timeout is treated as abandonment,
    /// not a retry — the per-symbol throttle prevents an instant resend.
    pub async fn send_proposal(&self, proposal: &Proposal) -> Result<ProposalResponse, ApiError> {
        let body = serde_json::to_value(proposal)?;
        let signature = options_engine_core::signing::sign(&self.hmac_secret, &body);

        let resp = tokio::time::timeout(
            PROPOSAL_TIMEOUT,
            self.http
                .post(self.url("/v1/proposal"))
                .header("X-GW-Signature", signature)
                .json(proposal)
                .send(),
        )
        .await
        .map_err(|_| ApiError::Other("proposal call timed out".to_string()))??;

        Ok(resp.json().await?)
    }

    /// Heartbeat failures are logged by the caller and never propagated
    /// into the proposal path (spec §4.G).
    pub async fn send_heartbeat(&self, state: &HeartbeatState) -> Result<HeartbeatResponse, ApiError> {
        let resp = tokio::time::timeout(
            HEARTBEAT_TIMEOUT,
            self.http
                .post(self.url("/v1/heartbeat"))
                .json(&serde_json::json!({ "state": state }))
                .send(),
        )
        .await
        .map_err(|_| ApiError::Other("heartbeat timed out".to_string()))??;
        Ok(resp.json().await.unwrap_or_default())
    }
}
