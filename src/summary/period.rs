//! Calendar period boundaries for summaries.
//!
//! Every range starts at 00:00:00 on its first day and ends at
//! 23:59:59.999999999 on its last day, on the wall clock of the given
//! timezone. Each bound carries the UTC offset in effect on its own date, so
//! every timestamp in one period gets exactly the same bounds even when the
//! period spans a DST change.

use time::{Date, Duration, Month, OffsetDateTime, Time, macros::time, util::is_leap_year};
use time_tz::{OffsetDateTimeExt, Tz};

use crate::{
    summary::domain::{PeriodRange, PeriodType},
    timezone::local_datetime,
};

const END_OF_DAY: Time = time!(23:59:59.999999999);

/// Get the range of the period of type `period_type` in `timezone` that contains `timestamp`.
pub fn period_range(
    period_type: PeriodType,
    timestamp: OffsetDateTime,
    timezone: &Tz,
) -> PeriodRange {
    match period_type {
        PeriodType::Daily => day_range(timestamp, timezone),
        PeriodType::Weekly => week_range(timestamp, timezone),
        PeriodType::Monthly => month_range(timestamp, timezone),
        PeriodType::Yearly => year_range(timestamp, timezone),
    }
}

/// The calendar day containing `timestamp`.
pub fn day_range(timestamp: OffsetDateTime, timezone: &Tz) -> PeriodRange {
    let date = timestamp.to_timezone(timezone).date();

    full_days(date, date, timezone)
}

/// The Monday to Sunday week containing `timestamp`.
pub fn week_range(timestamp: OffsetDateTime, timezone: &Tz) -> PeriodRange {
    let date = timestamp.to_timezone(timezone).date();
    let weekday_number = date.weekday().number_from_monday() as i64;
    let monday = date - Duration::days(weekday_number - 1);
    let sunday = monday + Duration::days(6);

    full_days(monday, sunday, timezone)
}

/// The calendar month containing `timestamp`.
pub fn month_range(timestamp: OffsetDateTime, timezone: &Tz) -> PeriodRange {
    let date = timestamp.to_timezone(timezone).date();
    let first = date - Duration::days(i64::from(date.day()) - 1);
    let last =
        first + Duration::days(i64::from(last_day_of_month(date.year(), date.month())) - 1);

    full_days(first, last, timezone)
}

/// The calendar year containing `timestamp`.
pub fn year_range(timestamp: OffsetDateTime, timezone: &Tz) -> PeriodRange {
    let date = timestamp.to_timezone(timezone).date();
    let first = date - Duration::days(i64::from(date.ordinal()) - 1);
    let days_in_year = if is_leap_year(date.year()) { 366 } else { 365 };
    let last = first + Duration::days(days_in_year - 1);

    full_days(first, last, timezone)
}

fn full_days(first: Date, last: Date, timezone: &Tz) -> PeriodRange {
    PeriodRange {
        start: local_datetime(first, Time::MIDNIGHT, timezone),
        end: local_datetime(last, END_OF_DAY, timezone),
    }
}

fn last_day_of_month(year: i32, month: Month) -> u8 {
    match month {
        Month::January
        | Month::March
        | Month::May
        | Month::July
        | Month::August
        | Month::October
        | Month::December => 31,
        Month::April | Month::June | Month::September | Month::November => 30,
        Month::February => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
    }
}
