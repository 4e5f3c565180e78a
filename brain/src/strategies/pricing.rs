//! Net price computation from leg mids (spec §4.E "Pricing").

use crate::broker::client::leg_price_sign;
use options_engine_core::types::LegSide;

pub struct LegMid {
    pub side: LegSide,
    pub mid: f64,
    pub quantity: u32,
}

/// Net price using final scaled quantities: SELL legs add `mid * qty`,
/// BUY legs subtract. Limit price is `|net_price|` rounded to the cent.
///
/// Per spec §9 "Per-strategy quantity scaling": callers must pass legs
/// with their final trade-size quantities already applied — never compute
/// this from a pre-scaled template and rescale the result.
pub fn net_price(legs: &[LegMid]) -> f64 {
    let net: f64 = legs
        .iter()
        .map(|l| leg_price_sign(l.side) * l.mid * l.quantity as f64)
        .sum();
    round_to_cent(net.abs())
}

fn round_to_cent(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_spread_net_price_is_sell_minus_buy() {
        let legs = [
            LegMid { side: LegSide::Sell, mid: 2.10, quantity: 10 },
            LegMid { side: LegSide::Buy, mid: 1.15, quantity: 10 },
        ];
        // (2.10 - 1.15) * 10 = 9.50
        assert_eq!(net_price(&legs), 9.50);
    }

    #[test]
    fn rounds_to_the_cent() {
        let legs = [LegMid { side: LegSide::Sell, mid: 1.2345, quantity: 1 }];
        assert_eq!(net_price(&legs), 1.23);
    }
}
