//! Broken-down UTC time for expiry checks.
//!
//! The verifier only ever asks one question of time: is `now` strictly after
//! `expires`? Both sides are held as calendar components, so the comparison
//! is plain field-lexicographic ordering and needs no epoch arithmetic.

use std::fmt;

use chrono::{DateTime, Datelike, Timelike, Utc};

/// A UTC instant broken into calendar components.
///
/// The derived ordering compares fields most-significant first, which for
/// in-range components is exactly calendar order. Components are not
/// range-validated here; the parser enforces its own bounds and callers
/// constructing `now` are trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcTime {
    /// Full year, e.g. 2026.
    pub year: u16,
    /// Month, 1-12.
    pub month: u8,
    /// Day of month, 1-31.
    pub day: u8,
    /// Hour, 0-23.
    pub hour: u8,
    /// Minute, 0-59.
    pub minute: u8,
    /// Second, 0-59.
    pub second: u8,
}

impl UtcTime {
    /// Builds an instant from components.
    pub fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        UtcTime {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }
}

impl fmt::Display for UtcTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

impl From<DateTime<Utc>> for UtcTime {
    fn from(value: DateTime<Utc>) -> Self {
        UtcTime {
            year: u16::try_from(value.year()).unwrap_or(0),
            month: value.month() as u8,
            day: value.day() as u8,
            hour: value.hour() as u8,
            minute: value.minute() as u8,
            second: value.second() as u8,
        }
    }
}
