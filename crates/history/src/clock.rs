//! Non-decreasing timestamps for ordering persisted messages.

use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Hands out timestamps that never go backwards, even if the wall clock does.
///
/// Equal stamps are possible; stores break ties with their insertion id.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last_micros: AtomicI64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure future stamps are not earlier than `at`.
    pub fn observe(&self, at: DateTime<Utc>) {
        self.last_micros
            .fetch_max(at.timestamp_micros(), Ordering::SeqCst);
    }

    /// The next stamp: the current time, or the last stamp if that is later.
    pub fn now(&self) -> DateTime<Utc> {
        let now = Utc::now();
        let micros = now.timestamp_micros();
        let prev = self.last_micros.fetch_max(micros, Ordering::SeqCst);
        if prev > micros {
            DateTime::from_timestamp_micros(prev).unwrap_or(now)
        } else {
            now
        }
    }
}

/// Fixed-width RFC 3339 text, so lexical order matches time order.
pub fn to_sortable(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
