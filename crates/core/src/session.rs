use crate::config::SessionConfig;
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};

/// Per-asset trading window. Triggers outside the window are ignored; with
/// `flatten_on_close` the asset emits one closing evaluation at window end.
#[derive(Debug, Clone, Copy)]
pub struct SessionWindow {
    config: SessionConfig,
}

impl SessionWindow {
    #[must_use]
    pub const fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn flatten_on_close(&self) -> bool {
        self.config.flatten_on_close
    }

    /// True when `now` falls on a weekday inside [start, end].
    #[must_use]
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        if matches!(now.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        let t = now.time().with_nanosecond(0).unwrap_or_else(|| now.time());
        t >= self.config.start && t <= self.config.end
    }

    /// True exactly when the window has closed for the day: `now` is past
    /// the end on a weekday.
    #[must_use]
    pub fn is_past_close(&self, now: DateTime<Utc>) -> bool {
        if matches!(now.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        now.time() > self.config.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};

    fn window() -> SessionWindow {
        SessionWindow::new(SessionConfig {
            start: NaiveTime::from_hms_opt(14, 30, 0).unwrap(),
            end: NaiveTime::from_hms_opt(20, 45, 0).unwrap(),
            flatten_on_close: false,
        })
    }

    #[test]
    fn weekday_inside_window() {
        // 2024-06-05 is a Wednesday.
        let now = Utc.with_ymd_and_hms(2024, 6, 5, 15, 0, 0).unwrap();
        assert!(window().contains(now));
    }

    #[test]
    fn weekday_before_open_and_after_close() {
        let early = Utc.with_ymd_and_hms(2024, 6, 5, 13, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 6, 5, 21, 0, 0).unwrap();
        assert!(!window().contains(early));
        assert!(!window().contains(late));
        assert!(!window().is_past_close(early));
        assert!(window().is_past_close(late));
    }

    #[test]
    fn weekend_is_always_closed() {
        // 2024-06-08 is a Saturday.
        let now = Utc.with_ymd_and_hms(2024, 6, 8, 15, 0, 0).unwrap();
        assert!(!window().contains(now));
        assert!(!window().is_past_close(now));
    }
}
