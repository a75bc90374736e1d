//! Time windows for scene selection

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A half-open date interval `[start, end)` used to select and
/// temporally aggregate satellite observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl TimeWindow {
    /// Create a window, validating `start < end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start >= end {
            return Err(Error::InvalidParameter {
                name: "time_window",
                value: format!("[{start}, {end})"),
                reason: "window start must precede end".to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Full calendar year: `[Jan 1, Jan 1 of the next year)`.
    pub fn full_year(year: i32) -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(year, 1, 1).expect("valid date"),
            end: NaiveDate::from_ymd_opt(year + 1, 1, 1).expect("valid date"),
        }
    }

    /// Summer season: `[Jun 1, Oct 1)` of the given year.
    pub fn summer(year: i32) -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(year, 6, 1).expect("valid date"),
            end: NaiveDate::from_ymd_opt(year, 10, 1).expect("valid date"),
        }
    }

    /// Window start (inclusive)
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Window end (exclusive)
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// The calendar year the window starts in. Windows never span a
    /// labeled period boundary, so this identifies the target year.
    pub fn year(&self) -> i32 {
        self.start.year()
    }

    /// Whether a date falls inside the window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    /// Render the catalog datetime range string, e.g.
    /// `"2018-01-01/2018-12-31"` (end date is the last included day).
    pub fn to_datetime_range(&self) -> String {
        let last = self.end.pred_opt().unwrap_or(self.end);
        format!("{}/{}", self.start.format("%Y-%m-%d"), last.format("%Y-%m-%d"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_year() {
        let w = TimeWindow::full_year(2018);
        assert!(w.contains(NaiveDate::from_ymd_opt(2018, 1, 1).unwrap()));
        assert!(w.contains(NaiveDate::from_ymd_opt(2018, 12, 31).unwrap()));
        assert!(!w.contains(NaiveDate::from_ymd_opt(2019, 1, 1).unwrap()));
        assert_eq!(w.year(), 2018);
    }

    #[test]
    fn test_summer_window() {
        let w = TimeWindow::summer(2024);
        assert!(w.contains(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()));
        assert!(w.contains(NaiveDate::from_ymd_opt(2024, 9, 30).unwrap()));
        assert!(!w.contains(NaiveDate::from_ymd_opt(2024, 10, 1).unwrap()));
        assert!(!w.contains(NaiveDate::from_ymd_opt(2024, 5, 31).unwrap()));
    }

    #[test]
    fn test_invalid_window_rejected() {
        let a = NaiveDate::from_ymd_opt(2020, 5, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2020, 4, 1).unwrap();
        assert!(TimeWindow::new(a, b).is_err());
        assert!(TimeWindow::new(a, a).is_err());
    }

    #[test]
    fn test_datetime_range_string() {
        assert_eq!(
            TimeWindow::full_year(2018).to_datetime_range(),
            "2018-01-01/2018-12-31"
        );
        assert_eq!(
            TimeWindow::summer(2024).to_datetime_range(),
            "2024-06-01/2024-09-30"
        );
    }
}
