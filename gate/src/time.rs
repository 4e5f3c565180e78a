//! America/New_York helpers shared by the DTE gate, the calendar lock and
//! the end-of-day scheduler (spec §9 "Timezone handling for the forced
//! EOD close uses a fixed offset in the source ... Use an America/New_York
//! zone database lookup").

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::America::New_York;

pub fn today_et() -> NaiveDate {
    Utc::now().with_timezone(&New_York).date_naive()
}

/// UTC instant corresponding to midnight America/New_York on `date`, used
/// as the cutoff for "today's" start-of-day equity snapshot.
pub fn start_of_trading_day_utc(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_hms_opt(0, 0, 0).expect("midnight always valid");
    New_York
        .from_local_datetime(&midnight)
        .single()
        .unwrap_or_else(|| New_York.from_utc_datetime(&midnight))
        .with_timezone(&Utc)
}
