//! Local calendar used for date comparisons and message formatting

use crate::domain::records::{DATETIME_FORMAT, DATE_FORMAT};
use crate::domain::{OffstudyError, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

/// Fixed UTC offset in which calendar dates are taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalCalendar {
    offset: FixedOffset,
}

impl LocalCalendar {
    /// Calendar for an offset east of UTC, in minutes
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the offset is out of range.
    pub fn from_offset_minutes(minutes: i32) -> Result<Self> {
        let offset = minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                OffstudyError::Configuration(format!("Invalid timezone offset: {minutes} minutes"))
            })?;
        Ok(Self { offset })
    }

    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    /// Calendar date of an instant in this offset
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// `%Y-%m-%d %H:%M` in this offset
    pub fn format_datetime(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.offset)
            .format(DATETIME_FORMAT)
            .to_string()
    }

    /// `%Y-%m-%d` in this offset
    pub fn format_date(&self, instant: DateTime<Utc>) -> String {
        self.local_date(instant).format(DATE_FORMAT).to_string()
    }

    /// Format for a comparison mode: the full datetime or only the date
    pub fn format_for_mode(&self, instant: DateTime<Utc>, compare_as_datetime: bool) -> String {
        if compare_as_datetime {
            self.format_datetime(instant)
        } else {
            self.format_date(instant)
        }
    }

    /// Whether `left` is at or before `right` under a comparison mode
    pub fn at_or_before(
        &self,
        left: DateTime<Utc>,
        right: DateTime<Utc>,
        compare_as_datetime: bool,
    ) -> bool {
        if compare_as_datetime {
            left <= right
        } else {
            self.local_date(left) <= self.local_date(right)
        }
    }

    /// Whether `left` is strictly after `right` under a comparison mode
    pub fn after(&self, left: DateTime<Utc>, right: DateTime<Utc>, compare_as_datetime: bool) -> bool {
        !self.at_or_before(left, right, compare_as_datetime)
    }
}

impl Default for LocalCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_local_date_crosses_midnight_with_offset() {
        let calendar = LocalCalendar::from_offset_minutes(120).unwrap();
        let instant = Utc.with_ymd_and_hms(2024, 3, 4, 23, 30, 0).unwrap();
        assert_eq!(
            calendar.local_date(instant),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
        assert_eq!(calendar.format_datetime(instant), "2024-03-05 01:30");
    }

    #[test]
    fn test_same_day_comparison() {
        let calendar = LocalCalendar::utc();
        let morning = Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2024, 3, 5, 20, 0, 0).unwrap();

        assert!(calendar.at_or_before(evening, morning, false));
        assert!(!calendar.at_or_before(evening, morning, true));
        assert!(calendar.after(evening, morning, true));
    }

    #[test]
    fn test_format_for_mode() {
        let calendar = LocalCalendar::utc();
        let instant = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
        assert_eq!(calendar.format_for_mode(instant, false), "2024-03-05");
        assert_eq!(calendar.format_for_mode(instant, true), "2024-03-05 14:30");
    }

    #[test]
    fn test_out_of_range_offset() {
        assert!(LocalCalendar::from_offset_minutes(24 * 60).is_err());
    }

    #[test]
    fn test_extreme_offsets_are_configuration_errors() {
        for minutes in [i32::MAX, i32::MIN] {
            let err = LocalCalendar::from_offset_minutes(minutes).unwrap_err();
            assert!(matches!(err, OffstudyError::Configuration(_)));
        }
    }
}
