use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use time_tz::{Offset, PrimitiveDateTimeExt, TimeZone, Tz};

use crate::Error;

/// Look up a timezone by its canonical name, e.g. "Pacific/Auckland".
///
/// # Errors
/// Returns [Error::InvalidTimezoneError] if the timezone name is unknown.
pub fn get_timezone(canonical_timezone: &str) -> Result<&'static Tz, Error> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(canonical_timezone.to_owned()))
}

/// The instant at which the wall clock in `timezone` shows `time` on `date`.
///
/// The offset is the one in effect on that date, not at some other instant.
/// A wall clock time repeated by a DST change resolves to its first
/// occurrence. A time skipped by a DST change keeps its wall clock reading
/// with the offset found by reading it as UTC.
pub fn local_datetime(date: Date, time: Time, timezone: &Tz) -> OffsetDateTime {
    let local = PrimitiveDateTime::new(date, time);

    local
        .assume_timezone(timezone)
        .take_first()
        .unwrap_or_else(|| {
            let offset = timezone.get_offset_utc(&local.assume_utc()).to_utc();
            local.assume_offset(offset)
        })
}

#[cfg(test)]
mod tests {
    use time::{
        Time, UtcOffset,
        macros::{date, datetime, time},
    };

    use crate::{
        Error,
        timezone::{get_timezone, local_datetime},
    };

    #[test]
    fn unknown_timezone_is_an_error() {
        assert_eq!(
            get_timezone("Mars/Olympus_Mons").map(|_| ()),
            Err(Error::InvalidTimezoneError("Mars/Olympus_Mons".to_owned()))
        );
    }

    #[test]
    fn uses_the_offset_of_the_given_date() {
        let auckland = get_timezone("Pacific/Auckland").unwrap();

        // NZDT (UTC+13) ends on 2024-04-07, NZST is UTC+12.
        let before = local_datetime(date!(2024 - 04 - 01), Time::MIDNIGHT, auckland);
        let after = local_datetime(date!(2024 - 04 - 30), Time::MIDNIGHT, auckland);

        assert_eq!(before, datetime!(2024-04-01 00:00 +13));
        assert_eq!(after, datetime!(2024-04-30 00:00 +12));
    }

    #[test]
    fn repeated_time_takes_first_occurrence() {
        let auckland = get_timezone("Pacific/Auckland").unwrap();

        // Clocks go back from 03:00 to 02:00 on 2024-04-07.
        let got = local_datetime(date!(2024 - 04 - 07), time!(02:30), auckland);

        assert_eq!(got.offset(), UtcOffset::from_hms(13, 0, 0).unwrap());
    }

    #[test]
    fn skipped_time_still_resolves() {
        let auckland = get_timezone("Pacific/Auckland").unwrap();

        // Clocks go forward from 02:00 to 03:00 on 2024-09-29.
        let got = local_datetime(date!(2024 - 09 - 29), time!(02:30), auckland);

        assert_eq!(got.date(), date!(2024 - 09 - 29));
        assert_eq!(got.time(), time!(02:30));
    }
}
