//! OCC option symbol encoding: `<ROOT><YYMMDD><C|P><STRIKE*1000, 8 digits>`.

use crate::types::OptionType;
use chrono::NaiveDate;

/// Encode an OCC symbol, e.g. `SPY` @ $416 PUT expiring 2024-01-16 →
/// `SPY240116P00416000`.
pub fn encode(root: &str, expiration: NaiveDate, option_type: OptionType, strike: f64) -> String {
    let type_char = match option_type {
        OptionType::Call => 'C',
        OptionType::Put => 'P',
    };
    let strike_thousandths = (strike * 1000.0).round() as i64;
    format!(
        "{root}{}{type_char}{strike_thousandths:08}",
        expiration.format("%y%m%d"),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub root: String,
    pub expiration: NaiveDate,
    pub option_type: OptionType,
    pub strike: f64,
}

/// Decode an OCC symbol. Root is everything before the fixed 15-character
/// suffix (`YYMMDD` + `C|P` + 8 digits).
pub fn decode(symbol: &str) -> Option<Decoded> {
    if symbol.len() < 15 {
        return None;
    }
    let split_at = symbol.len() - 15;
    let root = &symbol[..split_at];
    let suffix = &symbol[split_at..];

    let date_part = &suffix[0..6];
    let type_char = suffix.as_bytes()[6] as char;
    let strike_part = &suffix[7..15];

    let expiration = NaiveDate::parse_from_str(date_part, "%y%m%d").ok()?;
    let option_type = match type_char {
        'C' => OptionType::Call,
        'P' => OptionType::Put,
        _ => return None,
    };
    let strike_thousandths: i64 = strike_part.parse().ok()?;

    Some(Decoded {
        root: root.to_string(),
        expiration,
        option_type,
        strike: strike_thousandths as f64 / 1000.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_the_spec_example() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
        assert_eq!(encode("SPY", d, OptionType::Put, 416.0), "SPY240116P00416000");
    }

    #[test]
    fn round_trips_through_decode() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let sym = encode("QQQ", d, OptionType::Call, 428.5);
        let decoded = decode(&sym).unwrap();
        assert_eq!(decoded.root, "QQQ");
        assert_eq!(decoded.expiration, d);
        assert_eq!(decoded.option_type, OptionType::Call);
        assert!((decoded.strike - 428.5).abs() < 1e-9);
    }

    #[test]
    fn last_eight_digits_decode_to_strike_times_1000() {
        let d = NaiveDate::from_ymd_opt(2025, 6, 20).unwrap();
        let sym = encode("IWM", d, OptionType::Put, 210.25);
        let strike_digits = &sym[sym.len() - 8..];
        let parsed: i64 = strike_digits.parse().unwrap();
        assert_eq!(parsed, (210.25_f64 * 1000.0).round() as i64);
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode("SPY").is_none());
        assert!(decode("SPY240116X00416000").is_none());
    }
}
