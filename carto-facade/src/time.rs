//! Translates reading timestamps (milliseconds since the Unix epoch) into
//! the SLAM engine's monotonic time domain.
//!
//! The original implementation composes `FromUniversal(0) +
//! FromMilliseconds(lidar_reading_time_unix_milli)` (see
//! `examples/original_source/viam-cartographer/src/carto_facade/util.cc`).
//! This crate models that monotonic domain as a [`std::time::Duration`]
//! since the Unix epoch; the mapping is carried over as-is per spec.md §9 —
//! changing it would be a breaking change for saved maps.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// A point in the SLAM engine's monotonic time domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct EngineTime(Duration);

impl EngineTime {
    pub fn from_unix_millis(unix_millis: i64) -> Self {
        // Readings predating the epoch are not a supported input; clamp to
        // zero rather than panic on the subtraction.
        let millis = unix_millis.max(0) as u64;
        EngineTime(Duration::from_millis(millis))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn checked_sub(&self, other: EngineTime) -> Option<Duration> {
        self.0.checked_sub(other.0)
    }

    /// Renders this engine time back as a UTC wall-clock timestamp, for log
    /// lines — the engine's time domain is Unix-epoch-origin, so this is a
    /// lossless inverse of `from_unix_millis` (mirroring the original
    /// `carto_facade.cc` debug logging, which prints reading timestamps in
    /// human-readable form rather than raw milliseconds).
    pub fn to_utc(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(self.0.as_secs() as i64, self.0.subsec_nanos())
            .unwrap_or_else(|| DateTime::<Utc>::from_timestamp(0, 0).unwrap())
    }
}
