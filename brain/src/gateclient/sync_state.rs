//! Gate-owned configuration mirrored into the Brain over the heartbeat
//! channel: Restricted Dates and the Constitution's `force_eod_close_et`
//! (spec §3 "Ownership" — the Gate exclusively owns both; the Brain has
//! no other channel to learn them).
//!
//! Until the first heartbeat round-trips, both read as their spec
//! defaults (not restricted; 15:55 ET force close) rather than as
//! "unknown", so a freshly started Brain is never more permissive than
//! the documented behaviour.

use crate::gateclient::client::HeartbeatResponse;
use crate::stream::session_window::DEFAULT_FORCE_CLOSE_TIME;
use chrono::{NaiveDate, NaiveTime};
use std::collections::HashSet;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy)]
enum ForceClose {
    /// No heartbeat ack has arrived yet.
    Unsynced,
    /// Constitution carries no `force_eod_close_et` — forced close disabled.
    Disabled,
    At(NaiveTime),
}

pub struct GateSyncState {
    restricted_dates: RwLock<HashSet<NaiveDate>>,
    force_close: RwLock<ForceClose>,
}

impl GateSyncState {
    pub fn new() -> Self {
        Self {
            restricted_dates: RwLock::new(HashSet::new()),
            force_close: RwLock::new(ForceClose::Unsynced),
        }
    }

    pub fn apply(&self, ack: &HeartbeatResponse) {
        *self.restricted_dates.write().expect("gate sync lock poisoned") =
            ack.restricted_dates.iter().copied().collect();

        let force_close = match &ack.force_eod_close_et {
            None => ForceClose::Disabled,
            Some(raw) => match NaiveTime::parse_from_str(raw, "%H:%M") {
                Ok(t) => ForceClose::At(t),
                Err(err) => {
                    log::warn!("heartbeat ack carried unparseable force_eod_close_et {raw:?}: {err}");
                    ForceClose::Unsynced
                }
            },
        };
        *self.force_close.write().expect("gate sync lock poisoned") = force_close;
    }

    pub fn is_restricted(&self, date: NaiveDate) -> bool {
        self.restricted_dates.read().expect("gate sync lock poisoned").contains(&date)
    }

    /// `None` means the forced close is disabled; otherwise the ET time
    /// of day at which every tracked position should be closed.
    pub fn force_close_time(&self) -> Option<NaiveTime> {
        match *self.force_close.read().expect("gate sync lock poisoned") {
            ForceClose::Unsynced => Some(DEFAULT_FORCE_CLOSE_TIME),
            ForceClose::Disabled => None,
            ForceClose::At(t) => Some(t),
        }
    }
}

impl Default for GateSyncState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_before_any_heartbeat() {
        let state = GateSyncState::new();
        assert!(!state.is_restricted(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()));
        assert_eq!(state.force_close_time(), Some(DEFAULT_FORCE_CLOSE_TIME));
    }

    #[test]
    fn applies_restricted_dates_and_override_time() {
        let state = GateSyncState::new();
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        state.apply(&HeartbeatResponse {
            restricted_dates: vec![date],
            force_eod_close_et: Some("15:00".to_string()),
        });
        assert!(state.is_restricted(date));
        assert_eq!(state.force_close_time(), NaiveTime::from_hms_opt(15, 0, 0));
    }

    #[test]
    fn absent_force_close_disables_it() {
        let state = GateSyncState::new();
        state.apply(&HeartbeatResponse {
            restricted_dates: vec![],
            force_eod_close_et: None,
        });
        assert_eq!(state.force_close_time(), None);
    }
}
