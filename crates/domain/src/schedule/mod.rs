//! Weekly relay schedules.
//!
//! A [`RelaySchedule`] is an `on_time`/`off_time` window repeated on the days
//! of its [`DayMask`]. Windows whose `on_time` is later than their `off_time`
//! span midnight. Evaluation is half-open: the relay is off at `off_time`.

mod days;
mod next_change;

pub use days::DayMask;
pub use next_change::ScheduleChange;

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::time::TimeOfDay;

/// Weekly on/off window for one relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySchedule {
    pub enabled: bool,
    /// Start of the window; `00:00` when absent.
    pub on_time: Option<TimeOfDay>,
    /// End of the window (exclusive); `23:59` when absent.
    pub off_time: Option<TimeOfDay>,
    pub days_mask: DayMask,
}

impl RelaySchedule {
    /// An enabled schedule with explicit times.
    #[must_use]
    pub fn new(on_time: TimeOfDay, off_time: TimeOfDay, days_mask: DayMask) -> Self {
        Self {
            enabled: true,
            on_time: Some(on_time),
            off_time: Some(off_time),
            days_mask,
        }
    }

    /// A schedule that never turns the relay on.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn effective_on_time(&self) -> TimeOfDay {
        self.on_time.unwrap_or(TimeOfDay::MIDNIGHT)
    }

    #[must_use]
    pub fn effective_off_time(&self) -> TimeOfDay {
        self.off_time.unwrap_or(TimeOfDay::END_OF_DAY)
    }

    /// Whether the window wraps past midnight (`on_time > off_time`).
    #[must_use]
    pub fn spans_midnight(&self) -> bool {
        self.effective_on_time() > self.effective_off_time()
    }

    /// Whether the relay should be energized at `now`.
    ///
    /// Only the bit for `now`'s own weekday is consulted, including for the
    /// after-midnight part of a window that started the previous evening.
    #[must_use]
    pub fn should_be_on(&self, now: NaiveDateTime) -> bool {
        if !self.enabled || !self.days_mask.contains(now.weekday()) {
            return false;
        }

        let current = TimeOfDay::from_naive_time(now.time());
        let on = self.effective_on_time();
        let off = self.effective_off_time();

        if on <= off {
            on <= current && current < off
        } else {
            current >= on || current < off
        }
    }

    /// The next instant after `now` at which [`Self::should_be_on`] flips.
    ///
    /// Returns `None` for disabled or dayless schedules, and when the state
    /// never changes within the coming week.
    #[must_use]
    pub fn next_change(&self, now: NaiveDateTime) -> Option<ScheduleChange> {
        next_change::next_schedule_change(self, now)
    }
}
