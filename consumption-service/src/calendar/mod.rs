//! Calendar-aligned bucket boundaries and period labels.
//!
//! Buckets are always computed in UTC and never cross a month boundary: weeks
//! are counted from day 1 of the month (days 1, 8, 15, ...), not from an ISO
//! week start.

use std::{fmt, str::FromStr};

use time::{macros::format_description, Date, Duration, Month, OffsetDateTime, Time};

use crate::error::ServiceError;

/// Sub-second component of a month's last instant.
///
/// Month-end boundaries land on `23:59:59` plus 59 nanoseconds. Downstream
/// consumers compare against these exact instants, so the value is kept.
pub const MONTH_END_NANOS: u32 = 59;

/// Reporting granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodKind {
    Monthly,
    Weekly,
    Daily,
}

impl PeriodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Weekly => "weekly",
            Self::Daily => "daily",
        }
    }

    /// Ordered bucket boundaries for one calendar month.
    ///
    /// Returns an empty vector when `month` is outside `1..=12` or the year is
    /// outside the representable calendar range.
    pub fn generate_buckets(&self, month: u8, year: i32) -> Vec<TimeBucket> {
        generate_buckets(*self, month, year)
    }

    pub fn format_label(&self, start: OffsetDateTime, end: OffsetDateTime) -> String {
        format_label(*self, start, end)
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodKind {
    type Err = ServiceError;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "monthly" => Ok(Self::Monthly),
            "weekly" => Ok(Self::Weekly),
            "daily" => Ok(Self::Daily),
            _ => Err(ServiceError::Validation(format!(
                "kind period not allowed '{normalized}'"
            ))),
        }
    }
}

/// Inclusive-by-convention time range `[init, finish]`; `init <= finish`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBucket {
    pub init: OffsetDateTime,
    pub finish: OffsetDateTime,
}

impl TimeBucket {
    /// Strict on both ends: a reading exactly on a boundary is outside.
    pub fn contains(&self, ts: OffsetDateTime) -> bool {
        self.init < ts && ts < self.finish
    }
}

/// Number of days in `month` of `year`, leap years included.
pub fn days_in_month(month: Month, year: i32) -> u8 {
    time::util::days_in_year_month(year, month)
}

fn day_start(year: i32, month: Month, day: u8) -> Option<OffsetDateTime> {
    Date::from_calendar_date(year, month, day)
        .ok()
        .map(|d| d.midnight().assume_utc())
}

/// Last instant of the month, carrying the fixed [`MONTH_END_NANOS`] offset.
pub fn month_end(year: i32, month: Month) -> Option<OffsetDateTime> {
    let last = Date::from_calendar_date(year, month, days_in_month(month, year)).ok()?;
    let t = Time::from_hms_nano(23, 59, 59, MONTH_END_NANOS).ok()?;
    Some(last.with_time(t).assume_utc())
}

pub fn generate_buckets(kind: PeriodKind, month: u8, year: i32) -> Vec<TimeBucket> {
    let Ok(month) = Month::try_from(month) else {
        return Vec::new();
    };

    let buckets = match kind {
        PeriodKind::Monthly => monthly_buckets(month, year),
        PeriodKind::Weekly => weekly_buckets(month, year),
        PeriodKind::Daily => daily_buckets(month, year),
    };

    buckets.unwrap_or_default()
}

fn monthly_buckets(month: Month, year: i32) -> Option<Vec<TimeBucket>> {
    Some(vec![TimeBucket {
        init: day_start(year, month, 1)?,
        finish: month_end(year, month)?,
    }])
}

fn daily_buckets(month: Month, year: i32) -> Option<Vec<TimeBucket>> {
    let days = days_in_month(month, year);
    let mut out = Vec::with_capacity(days as usize);
    for day in 1..=days {
        let init = day_start(year, month, day)?;
        out.push(TimeBucket {
            init,
            finish: init.checked_add(Duration::DAY - Duration::SECOND)?,
        });
    }
    Some(out)
}

fn weekly_buckets(month: Month, year: i32) -> Option<Vec<TimeBucket>> {
    let days = days_in_month(month, year);
    let mut out = Vec::with_capacity(5);
    for start_day in (1..=days).step_by(7) {
        let init = day_start(year, month, start_day)?;
        let finish = if start_day + 6 > days {
            month_end(year, month)?
        } else {
            init.checked_add(Duration::WEEK - Duration::SECOND)?
        };
        out.push(TimeBucket { init, finish });
    }
    Some(out)
}

/// Display label of a bucket: `"Jan 2023"`, `"Jan 1 - Jan 7"` or `"Jan 2"`.
///
/// An inverted range yields the empty string, never an error.
pub fn format_label(kind: PeriodKind, start: OffsetDateTime, end: OffsetDateTime) -> String {
    if start > end {
        return String::new();
    }

    let month_year = format_description!("[month repr:short] [year]");
    let month_day = format_description!("[month repr:short] [day padding:none]");

    let label = match kind {
        PeriodKind::Monthly => start.format(month_year),
        PeriodKind::Daily => start.format(month_day),
        PeriodKind::Weekly => start
            .format(month_day)
            .and_then(|s| end.format(month_day).map(|e| format!("{s} - {e}"))),
    };

    label.unwrap_or_default()
}
