//! Wire types shared by the Brain and the Gate.
//!
//! Kept deliberately dumb: this crate does not know how a `Proposal` is
//! evaluated or priced, only how it is shaped, signed and serialized.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The four index ETFs this engine is allowed to ever touch.
pub const UNIVERSE: [&str; 4] = ["SPY", "QQQ", "IWM", "DIA"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LegSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProposalSide {
    Open,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionType {
    Put,
    Call,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bias {
    #[serde(rename = "bullish")]
    Bullish,
    #[serde(rename = "bearish")]
    Bearish,
    #[serde(rename = "neutral")]
    Neutral,
}

impl Bias {
    pub fn is_neutral(self) -> bool {
        matches!(self, Bias::Neutral)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    CreditSpread,
    IronCondor,
    IronButterfly,
    RatioSpread,
    CalendarSpread,
}

impl Strategy {
    /// Credit strategies per spec §4.F step 3.
    pub fn is_credit(self) -> bool {
        matches!(
            self,
            Strategy::CreditSpread | Strategy::IronCondor | Strategy::IronButterfly
        )
    }

    /// Debit strategies per spec §4.F step 3.
    pub fn is_debit(self) -> bool {
        matches!(self, Strategy::RatioSpread | Strategy::CalendarSpread)
    }

    /// Leg-count structure required on OPEN, per spec §4.H step 7.
    /// `RatioSpread` additionally requires unequal leg quantities, checked
    /// separately by the caller.
    pub fn required_leg_count(self) -> usize {
        match self {
            Strategy::CreditSpread => 2,
            Strategy::IronCondor => 4,
            Strategy::IronButterfly => 4,
            Strategy::RatioSpread => 2,
            Strategy::CalendarSpread => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    Trending,
    LowVolChop,
    HighVolExpansion,
    EventRisk,
    /// Not a wire value; returned by the classifier when VIX or ADX(SPY)
    /// is absent. Strategies must refuse to open on this value.
    InsufficientData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlowState {
    RiskOn,
    RiskOff,
    Neutral,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Opening,
    Open,
    Closing,
}

/// Tagged union for the semi-open `Proposal.context` dictionary (spec §9
/// "Dynamic context field" / "Source-side polymorphism"). The Gate only
/// ever interprets `vix` and `flow_state`; everything else round-trips
/// verbatim into the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
}

pub type Context = BTreeMap<String, ContextValue>;

pub trait ContextExt {
    fn vix(&self) -> Option<f64>;
    fn flow_state(&self) -> FlowState;
}

impl ContextExt for Context {
    fn vix(&self) -> Option<f64> {
        match self.get("vix") {
            Some(ContextValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    fn flow_state(&self) -> FlowState {
        match self.get("flow_state") {
            Some(ContextValue::String(s)) => match s.as_str() {
                "RISK_ON" => FlowState::RiskOn,
                "RISK_OFF" => FlowState::RiskOff,
                "NEUTRAL" => FlowState::Neutral,
                _ => FlowState::Unknown,
            },
            _ => FlowState::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub option_symbol: String,
    pub expiration: NaiveDate,
    pub strike: f64,
    #[serde(rename = "type")]
    pub option_type: OptionType,
    pub quantity: u32,
    pub side: LegSide,
}

/// An immutable, signed trade request from the Brain to the Gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    pub timestamp_ms: i64,
    pub symbol: String,
    pub strategy: Strategy,
    pub side: ProposalSide,
    pub quantity: u32,
    /// Net credit/debit limit price; must be > 0.
    pub price: f64,
    pub legs: Vec<Leg>,
    pub context: Context,
    /// Lowercase hex HMAC-SHA256 over the canonical payload. Absent on the
    /// wire when signed separately via the `X-GW-Signature` header — kept
    /// here so a proposal can also be serialized with its signature
    /// embedded (e.g. for the audit ledger).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub signature: Option<String>,
}

impl Proposal {
    /// True for OPEN proposals whose bias (derived from the leg-side
    /// composition) is non-neutral — used by the correlation guard and by
    /// the testable invariant in spec §8: "its symbol is in some
    /// correlation group iff its bias is non-neutral".
    pub fn bias(&self) -> Bias {
        if self.strategy == Strategy::IronCondor || self.strategy == Strategy::IronButterfly {
            return Bias::Neutral;
        }
        let net_sell: i64 = self
            .legs
            .iter()
            .map(|l| match l.side {
                LegSide::Sell => l.quantity as i64,
                LegSide::Buy => -(l.quantity as i64),
            })
            .sum();
        match (net_sell, self.legs.first().map(|l| l.option_type)) {
            (n, Some(OptionType::Put)) if n > 0 => Bias::Bullish,
            (n, Some(OptionType::Put)) if n < 0 => Bias::Bearish,
            (n, Some(OptionType::Call)) if n > 0 => Bias::Bearish,
            (n, Some(OptionType::Call)) if n < 0 => Bias::Bullish,
            _ => Bias::Neutral,
        }
    }
}
