use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ReportError, Result};

pub const FROM_FIELD: &str = "fromDate";
pub const TO_FIELD: &str = "toDate";

/// Named report windows selectable from the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportPeriod {
    #[serde(rename = "week")]
    Week,
    #[serde(rename = "10days")]
    TenDays,
    #[serde(rename = "30days")]
    ThirtyDays,
    #[serde(rename = "lastMonth")]
    LastMonth,
    #[serde(rename = "thisMonth")]
    ThisMonth,
    #[serde(rename = "custom")]
    Custom,
}

impl FromStr for ReportPeriod {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "week" => Ok(ReportPeriod::Week),
            "10days" => Ok(ReportPeriod::TenDays),
            "30days" => Ok(ReportPeriod::ThirtyDays),
            "lastMonth" => Ok(ReportPeriod::LastMonth),
            "thisMonth" => Ok(ReportPeriod::ThisMonth),
            "custom" => Ok(ReportPeriod::Custom),
            other => Err(ReportError::UnknownPeriod(other.to_string())),
        }
    }
}

/// Inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// `None` when `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Number of calendar days, both ends included
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every day of the range in ascending order
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        std::iter::successors(Some(self.start), |d| d.succ_opt()).take_while(move |d| *d <= end)
    }

    /// The range of equal length that ends the day before this one starts
    pub fn previous(&self) -> Self {
        let days = Duration::days(self.days());
        Self {
            start: self.start - days,
            end: self.end - days,
        }
    }
}

/// Map a named period to its days relative to `today`.
///
/// Returns `None` for [`ReportPeriod::Custom`], whose days come from the request.
pub fn period_range(period: ReportPeriod, today: NaiveDate) -> Option<DateRange> {
    let trailing = |days: i64| DateRange {
        start: today - Duration::days(days - 1),
        end: today,
    };

    match period {
        ReportPeriod::Week => Some(trailing(7)),
        ReportPeriod::TenDays => Some(trailing(10)),
        ReportPeriod::ThirtyDays => Some(trailing(30)),
        ReportPeriod::ThisMonth => Some(DateRange {
            start: today.with_day(1)?,
            end: today,
        }),
        ReportPeriod::LastMonth => {
            let last_of_previous = today.with_day(1)?.pred_opt()?;
            Some(DateRange {
                start: last_of_previous.with_day(1)?,
                end: last_of_previous,
            })
        }
        ReportPeriod::Custom => None,
    }
}

/// Parse a `YYYY-MM-DD` query value. Signed or longer years are rejected so
/// every accepted day has room for range arithmetic on both sides.
pub fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate> {
    let invalid = || ReportError::InvalidDate {
        field,
        value: value.to_string(),
    };

    let trimmed = value.trim();
    let shaped = trimmed.len() == 10
        && trimmed.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| invalid())
}

/// Resolve the days a report covers.
///
/// A named period wins over explicit dates. Without a period both dates are
/// required, except when neither is given, which means the last 30 days.
pub fn resolve_range(
    period: Option<ReportPeriod>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
    max_days: i64,
) -> Result<DateRange> {
    let range = match (period, from, to) {
        (Some(ReportPeriod::Custom), _, _) | (None, Some(_), _) | (None, _, Some(_)) => {
            let start = from.ok_or(ReportError::MissingDate { field: FROM_FIELD })?;
            let end = to.ok_or(ReportError::MissingDate { field: TO_FIELD })?;
            DateRange::new(start, end).ok_or(ReportError::InvertedRange { field: FROM_FIELD })?
        }
        (Some(named), _, _) => period_range(named, today)
            .ok_or(ReportError::MissingDate { field: FROM_FIELD })?,
        (None, None, None) => period_range(ReportPeriod::ThirtyDays, today)
            .ok_or(ReportError::MissingDate { field: FROM_FIELD })?,
    };

    if range.days() > max_days {
        return Err(ReportError::RangeTooLong {
            field: TO_FIELD,
            days: range.days(),
            max: max_days,
        });
    }

    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::new(date(start), date(end)).unwrap()
    }

    #[test]
    fn test_named_periods() {
        let today = date("2026-10-16");

        assert_eq!(period_range(ReportPeriod::Week, today), Some(range("2026-10-10", "2026-10-16")));
        assert_eq!(period_range(ReportPeriod::TenDays, today), Some(range("2026-10-07", "2026-10-16")));
        assert_eq!(period_range(ReportPeriod::ThirtyDays, today), Some(range("2026-09-17", "2026-10-16")));
        assert_eq!(period_range(ReportPeriod::ThisMonth, today), Some(range("2026-10-01", "2026-10-16")));
        assert_eq!(period_range(ReportPeriod::LastMonth, today), Some(range("2026-09-01", "2026-09-30")));
        assert_eq!(period_range(ReportPeriod::Custom, today), None);
    }

    #[test]
    fn test_last_month_across_year_boundary() {
        let today = date("2026-01-05");
        assert_eq!(period_range(ReportPeriod::LastMonth, today), Some(range("2025-12-01", "2025-12-31")));

        let leap = date("2028-03-31");
        assert_eq!(period_range(ReportPeriod::LastMonth, leap), Some(range("2028-02-01", "2028-02-29")));
    }

    #[test]
    fn test_period_parsing() {
        assert_eq!("10days".parse::<ReportPeriod>().unwrap(), ReportPeriod::TenDays);
        assert_eq!("lastMonth".parse::<ReportPeriod>().unwrap(), ReportPeriod::LastMonth);
        assert_eq!(
            "yesterday".parse::<ReportPeriod>().unwrap_err(),
            ReportError::UnknownPeriod("yesterday".to_string())
        );
    }

    #[test]
    fn test_range_helpers() {
        let r = range("2026-02-27", "2026-03-02");
        assert_eq!(r.days(), 4);
        assert_eq!(r.dates().count(), 4);
        assert_eq!(r.dates().last(), Some(date("2026-03-02")));
        assert_eq!(r.previous(), range("2026-02-23", "2026-02-26"));
        assert!(r.contains(date("2026-03-01")));
        assert!(!r.contains(date("2026-03-03")));
        assert!(DateRange::new(date("2026-03-02"), date("2026-03-01")).is_none());
    }

    #[test]
    fn test_period_overrides_dates() {
        let today = date("2026-10-16");
        let resolved = resolve_range(
            Some(ReportPeriod::ThisMonth),
            Some(date("2025-01-01")),
            Some(date("2025-01-31")),
            today,
            366,
        )
        .unwrap();
        assert_eq!(resolved, range("2026-10-01", "2026-10-16"));
    }

    #[test]
    fn test_custom_and_default_ranges() {
        let today = date("2026-10-16");

        let custom = resolve_range(
            Some(ReportPeriod::Custom),
            Some(date("2026-10-01")),
            Some(date("2026-10-05")),
            today,
            366,
        )
        .unwrap();
        assert_eq!(custom, range("2026-10-01", "2026-10-05"));

        let default = resolve_range(None, None, None, today, 366).unwrap();
        assert_eq!(default.days(), 30);
        assert_eq!(default.end, today);
    }

    #[test]
    fn test_range_errors() {
        let today = date("2026-10-16");

        let missing = resolve_range(Some(ReportPeriod::Custom), Some(today), None, today, 366);
        assert_eq!(missing.unwrap_err().field(), "toDate");

        let inverted = resolve_range(None, Some(date("2026-10-10")), Some(date("2026-10-01")), today, 366);
        assert_eq!(inverted.unwrap_err(), ReportError::InvertedRange { field: "fromDate" });

        let too_long = resolve_range(None, Some(date("2024-01-01")), Some(date("2026-01-01")), today, 366);
        assert!(matches!(too_long.unwrap_err(), ReportError::RangeTooLong { max: 366, .. }));

        let bad = parse_date("fromDate", "16/10/2026").unwrap_err();
        assert_eq!(bad.field(), "fromDate");
    }

    #[test]
    fn test_parse_date_rejects_out_of_shape_years() {
        assert_eq!(parse_date(FROM_FIELD, " 2026-10-16 ").unwrap(), date("2026-10-16"));

        for value in ["+262143-12-31", "-262144-01-01", "20261-01-01", "2026-1-01", "2026-02-30"] {
            let err = parse_date(TO_FIELD, value).unwrap_err();
            assert_eq!(
                err,
                ReportError::InvalidDate { field: TO_FIELD, value: value.to_string() },
                "{}",
                value
            );
        }
    }

    #[test]
    fn test_extreme_accepted_dates_have_neighbours() {
        let today = date("2026-10-16");
        let first = parse_date(FROM_FIELD, "0000-01-01").unwrap();
        let last = parse_date(TO_FIELD, "9999-12-31").unwrap();

        let early = resolve_range(None, Some(first), Some(first), today, 366).unwrap();
        assert_eq!(early.previous().days(), 1);

        let late = resolve_range(None, Some(last), Some(last), today, 366).unwrap();
        let (start, end) = crate::Calendar::default().utc_bounds(&late);
        assert!(start < end);
    }
}
