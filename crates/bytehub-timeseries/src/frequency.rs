//! Resampling frequencies.
//!
//! A frequency is written `<n><unit>` (the count defaults to 1), e.g. `30s`,
//! `15min`, `1h`, `D`, `2w`. Buckets are half-open intervals
//! `[start, start + step)` counted from a fixed anchor: the Unix epoch for
//! sub-week steps and Monday 1970-01-05 for weekly steps, so bucket
//! boundaries never depend on the data being resampled.

use std::fmt;
use std::str::FromStr;

use bytehub_core::DBDateTime;
use chrono::{Duration, TimeZone, Utc};

use crate::error::{BackendError, Result};

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * 60;
const SECONDS_PER_DAY: i64 = 24 * 60 * 60;
const SECONDS_PER_WEEK: i64 = 7 * SECONDS_PER_DAY;

/// First Monday after the Unix epoch
const WEEK_ANCHOR_SECS: i64 = 4 * SECONDS_PER_DAY;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frequency {
    step_secs: i64,
    anchor_secs: i64,
}

impl Frequency {
    pub fn seconds(n: u32) -> Self {
        Self::fixed(n as i64)
    }

    pub fn minutes(n: u32) -> Self {
        Self::fixed(n as i64 * SECONDS_PER_MINUTE)
    }

    pub fn hours(n: u32) -> Self {
        Self::fixed(n as i64 * SECONDS_PER_HOUR)
    }

    pub fn days(n: u32) -> Self {
        Self::fixed(n as i64 * SECONDS_PER_DAY)
    }

    pub fn weeks(n: u32) -> Self {
        Self {
            step_secs: n as i64 * SECONDS_PER_WEEK,
            anchor_secs: WEEK_ANCHOR_SECS,
        }
    }

    fn fixed(step_secs: i64) -> Self {
        Self {
            step_secs,
            anchor_secs: 0,
        }
    }

    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        let split = spec
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| BackendError::InvalidFrequency(format!("{} has no unit", spec)))?;
        let (count, unit) = spec.split_at(split);

        // u32 counts keep every step within the range of a Duration
        let n: u32 = if count.is_empty() {
            1
        } else {
            count.parse().map_err(|_| {
                BackendError::InvalidFrequency(format!("{} has an out of range count", spec))
            })?
        };
        if n == 0 {
            return Err(BackendError::InvalidFrequency(format!(
                "{} must have a positive count",
                spec
            )));
        }

        match unit {
            "s" | "S" | "sec" => Ok(Self::seconds(n)),
            "min" | "T" => Ok(Self::minutes(n)),
            "h" | "H" => Ok(Self::hours(n)),
            "d" | "D" => Ok(Self::days(n)),
            "w" | "W" => Ok(Self::weeks(n)),
            other => Err(BackendError::InvalidFrequency(format!(
                "unknown unit {:?} in {}",
                other, spec
            ))),
        }
    }

    pub fn step(&self) -> Duration {
        Duration::try_seconds(self.step_secs).unwrap_or(Duration::MAX)
    }

    /// Start of the bucket containing `ts`
    pub fn bucket_start(&self, ts: DBDateTime) -> DBDateTime {
        let offset = ts.timestamp() - self.anchor_secs;
        let start = self.anchor_secs + offset.div_euclid(self.step_secs) * self.step_secs;
        Utc.timestamp_opt(start, 0)
            .single()
            .unwrap_or(ts)
    }
}

impl FromStr for Frequency {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.step_secs;
        if self.anchor_secs == WEEK_ANCHOR_SECS {
            write!(f, "{}w", s / SECONDS_PER_WEEK)
        } else if s % SECONDS_PER_DAY == 0 {
            write!(f, "{}d", s / SECONDS_PER_DAY)
        } else if s % SECONDS_PER_HOUR == 0 {
            write!(f, "{}h", s / SECONDS_PER_HOUR)
        } else if s % SECONDS_PER_MINUTE == 0 {
            write!(f, "{}min", s / SECONDS_PER_MINUTE)
        } else {
            write!(f, "{}s", s)
        }
    }
}
