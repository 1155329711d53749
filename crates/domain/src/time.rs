//! Wall-clock helpers and the `HH:MM` time-of-day value used by schedules.

use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Return the current local wall-clock time.
///
/// Schedules are written in local time, so everything that evaluates them
/// works on naive local date-times.
#[must_use]
pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

/// A minute-resolution time of day, written `HH:MM` in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    minutes: u16,
}

impl TimeOfDay {
    /// `00:00`, the default `on_time` of a schedule.
    pub const MIDNIGHT: Self = Self { minutes: 0 };

    /// `23:59`, the default `off_time` of a schedule.
    pub const END_OF_DAY: Self = Self {
        minutes: 23 * 60 + 59,
    };

    /// Build a time of day, returning `None` when out of range.
    #[must_use]
    pub const fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self {
                minutes: hour as u16 * 60 + minute as u16,
            })
        } else {
            None
        }
    }

    /// Truncate a clock reading to its minute.
    #[must_use]
    pub fn from_naive_time(time: NaiveTime) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self {
            minutes: (time.hour() * 60 + time.minute()) as u16,
        }
    }

    #[must_use]
    pub fn hour(self) -> u8 {
        #[allow(clippy::cast_possible_truncation)]
        let hour = (self.minutes / 60) as u8;
        hour
    }

    #[must_use]
    pub fn minute(self) -> u8 {
        #[allow(clippy::cast_possible_truncation)]
        let minute = (self.minutes % 60) as u8;
        minute
    }

    /// This time of day on the given date.
    #[must_use]
    pub fn on(self, date: NaiveDate) -> Option<NaiveDateTime> {
        date.and_hms_opt(u32::from(self.hour()), u32::from(self.minute()), 0)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(Self::from_naive_time)
            .map_err(|_| ValidationError::InvalidTime(s.to_string()))
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}
