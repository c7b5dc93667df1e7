//! Document update timestamps
//!
//! Timestamps are microseconds since the Unix epoch. They record when a
//! document version was committed and are set on every accepted mutation.
//! They are metadata only: content equality never looks at them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Microsecond-precision commit timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Unix epoch (1970-01-01 00:00:00 UTC)
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Current wall-clock time
    ///
    /// Returns epoch if the system clock is before the Unix epoch.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_micros() as u64)
    }

    /// Current time, but never earlier than `previous`
    ///
    /// Update times of successive versions must not run backwards even if
    /// the wall clock does.
    pub fn now_after(previous: Timestamp) -> Self {
        Self::now().max(previous)
    }

    /// Create a timestamp from microseconds since epoch
    #[inline]
    pub const fn from_micros(micros: u64) -> Self {
        Timestamp(micros)
    }

    /// Microseconds since epoch
    #[inline]
    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// Convert to a chrono UTC datetime
    ///
    /// Returns `None` for values beyond chrono's representable range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let micros = i64::try_from(self.0).ok()?;
        DateTime::<Utc>::from_timestamp_micros(micros)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::EPOCH
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secs = self.0 / 1_000_000;
        let micros = self.0 % 1_000_000;
        write!(f, "{}.{:06}", secs, micros)
    }
}
