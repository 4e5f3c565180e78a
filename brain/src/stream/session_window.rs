//! Trading-session window gating: the stream only stays connected, and
//! strategies only evaluate, inside the 09:25-16:05 America/New_York
//! window on weekdays (spec §4.D).

use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::America::New_York;
use chrono_tz::Tz;

const WINDOW_START: NaiveTime = NaiveTime::from_hms_opt(9, 25, 0).unwrap();
const WINDOW_END: NaiveTime = NaiveTime::from_hms_opt(16, 5, 0).unwrap();

/// 15:55 ET force-close threshold used by the position manager (spec
/// §4.F) until the Gate's Constitution supplies an operator-configured
/// value over the heartbeat channel (see `gateclient::sync_state`).
pub const DEFAULT_FORCE_CLOSE_TIME: NaiveTime = NaiveTime::from_hms_opt(15, 55, 0).unwrap();

pub fn now_eastern() -> DateTime<Tz> {
    Utc::now().with_timezone(&New_York)
}

fn is_weekday(dt: &DateTime<Tz>) -> bool {
    !matches!(dt.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)
}

pub fn in_session_window(dt: DateTime<Tz>) -> bool {
    if !is_weekday(&dt) {
        return false;
    }
    let t = NaiveTime::from_hms_opt(dt.hour(), dt.minute(), dt.second()).unwrap();
    t >= WINDOW_START && t <= WINDOW_END
}

pub fn past_force_close_time_at(dt: DateTime<Tz>, threshold: NaiveTime) -> bool {
    let t = NaiveTime::from_hms_opt(dt.hour(), dt.minute(), dt.second()).unwrap();
    t >= threshold
}

pub fn past_force_close_time(dt: DateTime<Tz>) -> bool {
    past_force_close_time_at(dt, DEFAULT_FORCE_CLOSE_TIME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;

    fn et(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
        New_York
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .single()
            .unwrap()
    }

    #[test]
    fn before_0925_is_outside_window() {
        assert!(!in_session_window(et(2026, 3, 2, 9, 24)));
    }

    #[test]
    fn at_0925_is_inside_window() {
        assert!(in_session_window(et(2026, 3, 2, 9, 25)));
    }

    #[test]
    fn at_1605_is_still_inside_window() {
        assert!(in_session_window(et(2026, 3, 2, 16, 5)));
    }

    #[test]
    fn after_1605_is_outside_window() {
        assert!(!in_session_window(et(2026, 3, 2, 16, 6)));
    }

    #[test]
    fn weekend_is_always_outside_window() {
        assert!(!in_session_window(et(2026, 3, 1, 12, 0))); // a Sunday
    }

    #[test]
    fn force_close_threshold() {
        assert!(!past_force_close_time(et(2026, 3, 2, 15, 54)));
        assert!(past_force_close_time(et(2026, 3, 2, 15, 55)));
    }
}
