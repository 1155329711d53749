//! Weekly day mask.
//!
//! Each weekday owns one bit, starting at bit 1 for Sunday: Sunday=2,
//! Monday=4, Tuesday=8, Wednesday=16, Thursday=32, Friday=64, Saturday=128.
//! Bit 0 is unused, so the largest valid mask is 254.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const DAY_NAMES: [(&str, Weekday); 7] = [
    ("Sunday", Weekday::Sun),
    ("Monday", Weekday::Mon),
    ("Tuesday", Weekday::Tue),
    ("Wednesday", Weekday::Wed),
    ("Thursday", Weekday::Thu),
    ("Friday", Weekday::Fri),
    ("Saturday", Weekday::Sat),
];

/// Set of weekdays a schedule is active on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct DayMask(u8);

impl DayMask {
    pub const NONE: Self = Self(0);
    pub const SUNDAY: Self = Self(1 << 1);
    pub const MONDAY: Self = Self(1 << 2);
    pub const TUESDAY: Self = Self(1 << 3);
    pub const WEDNESDAY: Self = Self(1 << 4);
    pub const THURSDAY: Self = Self(1 << 5);
    pub const FRIDAY: Self = Self(1 << 6);
    pub const SATURDAY: Self = Self(1 << 7);

    pub const WEEKDAYS: Self = Self(
        Self::MONDAY.0 | Self::TUESDAY.0 | Self::WEDNESDAY.0 | Self::THURSDAY.0 | Self::FRIDAY.0,
    );
    pub const WEEKENDS: Self = Self(Self::SATURDAY.0 | Self::SUNDAY.0);
    pub const ALL: Self = Self(Self::WEEKDAYS.0 | Self::WEEKENDS.0);

    /// Largest valid raw mask (every day set).
    pub const MAX: u8 = Self::ALL.0;

    /// Validate a raw mask from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDaysMask`] if the value is negative,
    /// above [`Self::MAX`], or has bit 0 set.
    pub fn from_bits(bits: i64) -> Result<Self, ValidationError> {
        u8::try_from(bits)
            .ok()
            .filter(|raw| raw & !Self::MAX == 0)
            .map(Self)
            .ok_or(ValidationError::InvalidDaysMask(bits))
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// The single-day mask for `weekday`.
    #[must_use]
    pub fn for_weekday(weekday: Weekday) -> Self {
        Self(1 << (weekday.num_days_from_sunday() + 1))
    }

    #[must_use]
    pub fn contains(self, weekday: Weekday) -> bool {
        self.0 & Self::for_weekday(weekday).0 != 0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Build a mask from day names such as `["Monday", "friday"]`.
    ///
    /// Matching is case-insensitive and accepts three-letter abbreviations.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownDay`] for the first unrecognised name.
    pub fn from_names<I, S>(names: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().try_fold(Self::NONE, |mask, name| {
            let name = name.as_ref().trim();
            DAY_NAMES
                .iter()
                .find(|(full, _)| {
                    full.eq_ignore_ascii_case(name)
                        || (name.len() == 3 && full[..3].eq_ignore_ascii_case(name))
                })
                .map(|(_, weekday)| mask | Self::for_weekday(*weekday))
                .ok_or_else(|| ValidationError::UnknownDay(name.to_string()))
        })
    }

    /// Names of the days in the mask, Sunday first.
    #[must_use]
    pub fn names(self) -> Vec<&'static str> {
        DAY_NAMES
            .iter()
            .filter(|(_, weekday)| self.contains(*weekday))
            .map(|(name, _)| *name)
            .collect()
    }
}

impl BitOr for DayMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for DayMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl TryFrom<i64> for DayMask {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_bits(value)
    }
}

impl From<DayMask> for u8 {
    fn from(value: DayMask) -> Self {
        value.0
    }
}

impl fmt::Display for DayMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("never");
        }
        f.write_str(&self.names().join(","))
    }
}
