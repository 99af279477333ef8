//! Business calendar.
//!
//! Contract dates are calendar dates in the business timezone (UTC+7 by
//! default), while stored instants are UTC. `Clock` converts between the two
//! and can be frozen so tests control "today".

use anyhow::{anyhow, Result};
use chrono::{DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveTime, TimeZone, Utc};

/// Source of the current time, fixed to one UTC offset
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    offset: FixedOffset,
    frozen: Option<DateTime<Utc>>,
}

impl Clock {
    pub fn new(utc_offset_hours: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
            .ok_or_else(|| anyhow!("invalid UTC offset: {} hours", utc_offset_hours))?;
        Ok(Self { offset, frozen: None })
    }

    /// A clock that always reports `at`
    pub fn fixed(utc_offset_hours: i32, at: DateTime<Utc>) -> Result<Self> {
        Ok(Self { frozen: Some(at), ..Self::new(utc_offset_hours)? })
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.frozen.unwrap_or_else(Utc::now)
    }

    /// Today's date in the business timezone
    pub fn today(&self) -> NaiveDate {
        self.now().with_timezone(&self.offset).date_naive()
    }

    /// Local midnight of `date` as a UTC instant
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let local = date.and_time(NaiveTime::MIN);
        Utc.from_utc_datetime(&(local - Duration::seconds(i64::from(self.offset.local_minus_utc()))))
    }

    /// Last millisecond of `date` in the business timezone
    pub fn end_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        self.start_of_day(date + Duration::days(1)) - Duration::milliseconds(1)
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

pub fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    first_day_of_month(date) + Duration::days(i64::from(days_in_month(date.year(), date.month())) - 1)
}

pub fn first_day_of_next_month(date: NaiveDate) -> NaiveDate {
    last_day_of_month(date) + Duration::days(1)
}

pub fn first_day_of_previous_month(date: NaiveDate) -> NaiveDate {
    first_day_of_month(first_day_of_month(date) - Duration::days(1))
}

/// Add whole months, clamping the day to the end of shorter months
pub fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| anyhow!("date out of range: {} + {} months", date, months))
}

/// Last day covered by a contract starting on `check_in` for `period` months
pub fn contract_end(check_in: NaiveDate, period: i64) -> Result<NaiveDate> {
    let months = u32::try_from(period).map_err(|_| anyhow!("invalid rental period: {}", period))?;
    Ok(add_months(check_in, months)? - Duration::days(1))
}

/// Whole months elapsed from `from` to `to`
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    let mut months = i64::from(to.year() - from.year()) * 12 + i64::from(to.month()) - i64::from(from.month());
    if months > 0 && to.day() < from.day() {
        months -= 1;
    } else if months < 0 && to.day() > from.day() {
        months += 1;
    }
    months
}

/// Strict `DD/MM/YYYY`
pub fn parse_dmy(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    let bytes = input.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            2 | 5 => *b == b'/',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(input, "%d/%m/%Y").ok()
}

pub fn format_dmy(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// `MM/YYYY`, as printed in order descriptions
pub fn format_month(date: NaiveDate) -> String {
    date.format("%m/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_today_uses_business_offset() {
        // 20:00 UTC on the 14th is already the 15th in UTC+7
        let at = Utc.with_ymd_and_hms(2024, 3, 14, 20, 0, 0).unwrap();
        let clock = Clock::fixed(7, at).unwrap();
        assert_eq!(clock.today(), date(2024, 3, 15));
    }

    #[test]
    fn test_start_and_end_of_day() {
        let clock = Clock::new(7).unwrap();
        let start = clock.start_of_day(date(2024, 3, 15));
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 14, 17, 0, 0).unwrap());
        let end = clock.end_of_day(date(2024, 3, 15));
        assert_eq!(end + Duration::milliseconds(1), Utc.with_ymd_and_hms(2024, 3, 15, 17, 0, 0).unwrap());
    }

    #[test]
    fn test_month_boundaries() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(first_day_of_month(date(2024, 3, 15)), date(2024, 3, 1));
        assert_eq!(last_day_of_month(date(2024, 2, 10)), date(2024, 2, 29));
        assert_eq!(first_day_of_next_month(date(2024, 12, 31)), date(2025, 1, 1));
        assert_eq!(first_day_of_previous_month(date(2024, 1, 20)), date(2023, 12, 1));
    }

    #[test]
    fn test_contract_end_clamps_short_months() {
        assert_eq!(contract_end(date(2024, 1, 10), 6).unwrap(), date(2024, 7, 9));
        assert_eq!(contract_end(date(2024, 1, 31), 1).unwrap(), date(2024, 2, 28));
        assert!(contract_end(date(2024, 1, 31), -1).is_err());
    }

    #[test]
    fn test_months_between_counts_whole_months() {
        assert_eq!(months_between(date(2024, 1, 20), date(2024, 3, 15)), 1);
        assert_eq!(months_between(date(2024, 1, 15), date(2024, 3, 15)), 2);
        assert_eq!(months_between(date(2023, 12, 1), date(2024, 3, 15)), 3);
        assert_eq!(months_between(date(2024, 3, 1), date(2024, 3, 15)), 0);
    }

    #[test]
    fn test_parse_dmy_is_strict() {
        assert_eq!(parse_dmy("05/03/2024"), Some(date(2024, 3, 5)));
        assert_eq!(parse_dmy(" 05/03/2024 "), Some(date(2024, 3, 5)));
        assert_eq!(parse_dmy("5/3/2024"), None);
        assert_eq!(parse_dmy("2024-03-05"), None);
        assert_eq!(parse_dmy("31/02/2024"), None);
        assert_eq!(format_dmy(date(2024, 3, 5)), "05/03/2024");
        assert_eq!(format_month(date(2024, 3, 5)), "03/2024");
    }
}
