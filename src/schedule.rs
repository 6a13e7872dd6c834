//! Hour-boundary arithmetic.
//!
//! Boundaries are found by truncating the local reading to the top of the
//! hour and then stepping in absolute hours, so day and month rollover come
//! for free and the labels always line up with the fire instants.

use chrono::{DateTime, Duration, TimeZone, Timelike};
use serde::Serialize;
use std::fmt;

use crate::error::{ResumeError, Result};

/// Number of upcoming hour boundaries offered for selection.
pub const HOUR_CHOICES: usize = 5;

/// Index of the chosen upcoming hour boundary, always in `0..HOUR_CHOICES`.
/// Offset 0 is the very next whole hour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct HourOffset(u8);

impl HourOffset {
    pub const MAX: usize = HOUR_CHOICES - 1;

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn hours(self) -> i64 {
        i64::from(self.0)
    }
}

impl TryFrom<usize> for HourOffset {
    type Error = ResumeError;

    fn try_from(value: usize) -> Result<Self> {
        if value > Self::MAX {
            return Err(ResumeError::InvalidHourOffset {
                value,
                max: Self::MAX,
            });
        }
        Ok(Self(value as u8))
    }
}

impl fmt::Display for HourOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{}h", self.0)
    }
}

/// Start of the next whole local hour strictly after `now`.
pub fn next_hour_boundary<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let into_hour = Duration::seconds(i64::from(now.minute()) * 60 + i64::from(now.second()))
        + Duration::nanoseconds(i64::from(now.nanosecond()));
    now.clone() - into_hour + Duration::hours(1)
}

/// The instant a countdown armed at `now` fires: the next hour boundary,
/// plus `offset` whole hours, plus the grace period.
pub fn fire_instant<Tz: TimeZone>(
    now: &DateTime<Tz>,
    offset: HourOffset,
    grace: Duration,
) -> DateTime<Tz> {
    next_hour_boundary(now) + Duration::hours(offset.hours()) + grace
}

/// 12-hour labels ("5pm", "12am") for the next [`HOUR_CHOICES`] boundaries.
pub fn hour_labels<Tz: TimeZone>(now: &DateTime<Tz>) -> Vec<String> {
    let first = next_hour_boundary(now);
    (0..HOUR_CHOICES as i64)
        .map(|i| hour_label((first.clone() + Duration::hours(i)).hour()))
        .collect()
}

fn hour_label(hour24: u32) -> String {
    let hour12 = match hour24 % 12 {
        0 => 12,
        h => h,
    };
    let suffix = if hour24 >= 12 { "pm" } else { "am" };
    format!("{hour12}{suffix}")
}

/// Zero-padded `HH:MM:SS`. Negative durations render as `00:00:00`.
pub fn format_countdown(remaining: Duration) -> String {
    let total = remaining.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
