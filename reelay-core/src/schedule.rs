use chrono::{Duration as ChronoDuration, NaiveDateTime, NaiveTime};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid quiet window time: {0}")]
    InvalidTime(String),
    #[error("quiet window start and end are equal ({0}); window would cover nothing or everything")]
    DegenerateWindow(String),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Daily quiet period during which the orchestrator suspends all work.
/// The window may cross midnight (e.g. 22:00–09:00). Recomputed from the
/// wall clock on each check; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl QuietWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> ScheduleResult<Self> {
        if start == end {
            return Err(ScheduleError::DegenerateWindow(start.to_string()));
        }
        Ok(Self { start, end })
    }

    /// Parses "HH:MM" boundaries, e.g. `parse("22:00", "09:00")`.
    pub fn parse(start: &str, end: &str) -> ScheduleResult<Self> {
        Self::new(parse_hhmm(start)?, parse_hhmm(end)?)
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn is_quiet(&self, at: NaiveDateTime) -> bool {
        let t = at.time();
        if self.start < self.end {
            t >= self.start && t < self.end
        } else {
            // window crosses midnight
            t >= self.start || t < self.end
        }
    }

    /// Next instant at which work may resume. Identity outside the window.
    /// Inside it: today's window end if that is still ahead, otherwise
    /// tomorrow's.
    pub fn wake_time(&self, at: NaiveDateTime) -> NaiveDateTime {
        if !self.is_quiet(at) {
            return at;
        }
        let end_today = at.date().and_time(self.end);
        if end_today > at {
            end_today
        } else {
            end_today + ChronoDuration::days(1)
        }
    }

    /// Clips a prospective next-run instant: anything falling inside the
    /// window is pushed to the window end, never left inside it.
    pub fn clip(&self, at: NaiveDateTime) -> NaiveDateTime {
        self.wake_time(at)
    }
}

fn parse_hhmm(value: &str) -> ScheduleResult<NaiveTime> {
    let (hour, minute) = value
        .split_once(':')
        .ok_or_else(|| ScheduleError::InvalidTime(format!("{value}: expected HH:MM")))?;
    let hour: u32 = hour
        .parse()
        .map_err(|_| ScheduleError::InvalidTime(format!("{value}: bad hour")))?;
    let minute: u32 = minute
        .parse()
        .map_err(|_| ScheduleError::InvalidTime(format!("{value}: bad minute")))?;
    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| ScheduleError::InvalidTime(format!("{value}: out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn overnight() -> QuietWindow {
        QuietWindow::parse("22:00", "09:00").unwrap()
    }

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 20)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn quiet_window_truth_table() {
        let window = overnight();
        assert!(window.is_quiet(at(23, 0)));
        assert!(window.is_quiet(at(8, 59)));
        assert!(!window.is_quiet(at(9, 0)));
        assert!(!window.is_quiet(at(21, 59)));
        assert!(window.is_quiet(at(22, 0)));
    }

    #[test]
    fn wake_after_start_is_next_morning() {
        let window = overnight();
        let wake = window.wake_time(at(23, 0));
        assert_eq!(wake.date(), at(23, 0).date().succ_opt().unwrap());
        assert_eq!(wake.time(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    }

    #[test]
    fn wake_before_end_is_same_morning() {
        let window = overnight();
        let wake = window.wake_time(at(8, 59));
        assert_eq!(wake.date(), at(8, 59).date());
        assert_eq!(wake.time(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    }

    #[test]
    fn wake_time_outside_window_is_identity() {
        let window = overnight();
        assert_eq!(window.wake_time(at(12, 30)), at(12, 30));
    }

    #[test]
    fn clip_pushes_in_window_runs_to_window_end() {
        let window = overnight();
        // 19:00 + 4h lands at 23:00, inside the window: must move to 09:00
        // the next day.
        let next_run = at(19, 0) + ChronoDuration::hours(4);
        let clipped = window.clip(next_run);
        assert!(!window.is_quiet(clipped));
        assert_eq!(clipped.time(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(clipped.date(), at(19, 0).date().succ_opt().unwrap());
    }

    #[test]
    fn clip_leaves_daytime_runs_alone() {
        let window = overnight();
        let next_run = at(10, 0) + ChronoDuration::hours(3);
        assert_eq!(window.clip(next_run), next_run);
    }

    #[test]
    fn daytime_window_does_not_cross_midnight() {
        let window = QuietWindow::parse("12:00", "14:00").unwrap();
        assert!(window.is_quiet(at(13, 0)));
        assert!(!window.is_quiet(at(11, 59)));
        assert!(!window.is_quiet(at(14, 0)));
        assert!(!window.is_quiet(at(23, 0)));
    }

    #[test]
    fn bad_inputs_are_rejected() {
        assert!(QuietWindow::parse("24:00", "09:00").is_err());
        assert!(QuietWindow::parse("22", "09:00").is_err());
        assert!(QuietWindow::parse("22:00", "22:00").is_err());
    }
}
