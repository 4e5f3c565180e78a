//! Session volume profile: POC (point of control), VAH/VAL (value area
//! high/low at the top 70% band). Bucket width = 0.25 for indices.

use super::candle::Candle;
use std::collections::BTreeMap;

pub const BUCKET_WIDTH: f64 = 0.25;
const VALUE_AREA_PCT: f64 = 0.70;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeProfile {
    pub poc: f64,
    pub vah: f64,
    pub val: f64,
}

fn bucket_key(price: f64) -> i64 {
    (price / BUCKET_WIDTH).round() as i64
}

fn bucket_price(key: i64) -> f64 {
    key as f64 * BUCKET_WIDTH
}

/// Build a volume profile from the session's closed bars. Each bar's
/// volume is attributed to the bucket of its typical price (H+L+C)/3.
pub fn compute(bars: &[Candle]) -> Option<VolumeProfile> {
    if bars.is_empty() {
        return None;
    }

    let mut buckets: BTreeMap<i64, f64> = BTreeMap::new();
    for bar in bars {
        let typical = (bar.high + bar.low + bar.close) / 3.0;
        *buckets.entry(bucket_key(typical)).or_insert(0.0) += bar.volume;
    }

    let (&poc_key, _) = buckets.iter().max_by(|a, b| a.1.partial_cmp(b.1).unwrap())?;
    let total: f64 = buckets.values().sum();
    if total <= 0.0 {
        return None;
    }

    // Grow the value area outward from the POC bucket, always adding
    // whichever neighbour (above/below the current band) carries more
    // volume, until the accumulated volume reaches VALUE_AREA_PCT.
    let mut keys: Vec<i64> = buckets.keys().copied().collect();
    keys.sort_unstable();
    let poc_idx = keys.iter().position(|&k| k == poc_key).unwrap();

    let mut lo = poc_idx;
    let mut hi = poc_idx;
    let mut acc = *buckets.get(&poc_key).unwrap();

    while acc / total < VALUE_AREA_PCT && (lo > 0 || hi + 1 < keys.len()) {
        let below = if lo > 0 { buckets.get(&keys[lo - 1]).copied() } else { None };
        let above = if hi + 1 < keys.len() { buckets.get(&keys[hi + 1]).copied() } else { None };

        match (below, above) {
            (Some(b), Some(a)) if b >= a => {
                lo -= 1;
                acc += b;
            }
            (Some(_), Some(a)) => {
                hi += 1;
                acc += a;
            }
            (Some(b), None) => {
                lo -= 1;
                acc += b;
            }
            (None, Some(a)) => {
                hi += 1;
                acc += a;
            }
            (None, None) => break,
        }
    }

    Some(VolumeProfile {
        poc: bucket_price(poc_key),
        vah: bucket_price(keys[hi]),
        val: bucket_price(keys[lo]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(price: f64, volume: f64) -> Candle {
        Candle {
            open_time: Utc.timestamp_opt(0, 0).unwrap(),
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
        }
    }

    #[test]
    fn empty_session_is_absent() {
        assert!(compute(&[]).is_none());
    }

    #[test]
    fn poc_is_the_highest_volume_bucket() {
        let bars = vec![bar(100.0, 100.0), bar(101.0, 10.0), bar(100.0, 50.0)];
        let vp = compute(&bars).unwrap();
        assert!((vp.poc - 100.0).abs() < 1e-9);
    }

    #[test]
    fn value_area_contains_poc() {
        let bars = vec![
            bar(99.0, 5.0),
            bar(100.0, 100.0),
            bar(101.0, 40.0),
            bar(102.0, 5.0),
        ];
        let vp = compute(&bars).unwrap();
        assert!(vp.val <= vp.poc && vp.poc <= vp.vah);
    }
}
