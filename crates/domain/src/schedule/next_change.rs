//! Prediction of the next schedule transition.

use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;

use super::RelaySchedule;
use crate::time::TimeOfDay;

/// Days scanned ahead; one full week plus the day a wrapped window ends on.
const SCAN_DAYS: i64 = 8;

/// When a schedule will next flip the relay, and to which state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScheduleChange {
    pub time: NaiveDateTime,
    pub new_state: bool,
    /// Calendar days between `now` and `time` (0 for later today).
    pub days_away: i64,
}

/// `should_be_on` is piecewise constant between midnights and each day's
/// `on_time`/`off_time`, so checking those instants in order is exact.
pub(super) fn next_schedule_change(
    schedule: &RelaySchedule,
    now: NaiveDateTime,
) -> Option<ScheduleChange> {
    if !schedule.enabled || schedule.days_mask.is_empty() {
        return None;
    }

    let current = schedule.should_be_on(now);
    let today = now.date();
    let times = [
        TimeOfDay::MIDNIGHT,
        schedule.effective_on_time(),
        schedule.effective_off_time(),
    ];

    let mut candidates: Vec<NaiveDateTime> = (0..=SCAN_DAYS)
        .filter_map(|offset| today.checked_add_signed(TimeDelta::days(offset)))
        .flat_map(|date| times.iter().filter_map(move |time| time.on(date)))
        .filter(|candidate| *candidate > now)
        .collect();
    candidates.sort_unstable();
    candidates.dedup();

    candidates
        .into_iter()
        .find(|candidate| schedule.should_be_on(*candidate) != current)
        .map(|time| ScheduleChange {
            time,
            new_state: !current,
            days_away: (time.date() - today).num_days(),
        })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::schedule::DayMask;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn hm(hour: u8, minute: u8) -> TimeOfDay {
        TimeOfDay::new(hour, minute).unwrap()
    }

    fn monday_office() -> RelaySchedule {
        RelaySchedule::new(hm(8, 0), hm(18, 0), DayMask::MONDAY)
    }

    #[test]
    fn should_predict_turn_on_later_today() {
        let change = monday_office().next_change(at(3, 7, 0)).unwrap();
        assert_eq!(change.time, at(3, 8, 0));
        assert!(change.new_state);
        assert_eq!(change.days_away, 0);
    }

    #[test]
    fn should_predict_turn_off_inside_window() {
        let change = monday_office().next_change(at(3, 9, 15)).unwrap();
        assert_eq!(change.time, at(3, 18, 0));
        assert!(!change.new_state);
    }

    #[test]
    fn should_wrap_to_next_week_after_window() {
        let change = monday_office().next_change(at(3, 19, 0)).unwrap();
        assert_eq!(change.time, at(10, 8, 0));
        assert!(change.new_state);
        assert_eq!(change.days_away, 7);
    }

    #[test]
    fn should_turn_off_at_midnight_when_next_day_is_not_scheduled() {
        let schedule = RelaySchedule::new(hm(22, 0), hm(6, 0), DayMask::FRIDAY);
        let change = schedule.next_change(at(7, 23, 30)).unwrap();
        assert_eq!(change.time, at(8, 0, 0));
        assert!(!change.new_state);
        assert_eq!(change.days_away, 1);
    }

    #[test]
    fn should_run_through_midnight_when_next_day_is_scheduled() {
        let schedule =
            RelaySchedule::new(hm(22, 0), hm(6, 0), DayMask::FRIDAY | DayMask::SATURDAY);
        let change = schedule.next_change(at(7, 23, 30)).unwrap();
        assert_eq!(change.time, at(8, 6, 0));
        assert!(!change.new_state);
    }

    #[test]
    fn should_return_none_for_empty_mask_or_disabled_schedule() {
        let empty = RelaySchedule::new(hm(8, 0), hm(18, 0), DayMask::NONE);
        assert!(empty.next_change(at(3, 7, 0)).is_none());
        assert!(RelaySchedule::disabled().next_change(at(3, 7, 0)).is_none());
    }

    #[test]
    fn should_return_none_when_state_never_changes() {
        let schedule = RelaySchedule::new(hm(9, 0), hm(9, 0), DayMask::ALL);
        assert!(schedule.next_change(at(3, 7, 0)).is_none());
    }

    #[test]
    fn should_ignore_candidate_equal_to_now() {
        let change = monday_office().next_change(at(3, 8, 0)).unwrap();
        assert_eq!(change.time, at(3, 18, 0));
    }
}
