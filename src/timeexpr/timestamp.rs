// Absolute timestamp parsing
//
// Accepts "HH:MM", "YYYY-MM-DD" and "YYYY-MM-DD<sep>HH:MM" in local time,
// where <sep> is any run of characters other than ASCII letters, digits,
// ':' and '-'.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use super::error::{TimeExprError, TimeExprResult};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// Parse a user supplied timestamp, anchoring time-only input to today.
///
/// Empty input yields `Ok(None)`.
pub fn parse_timestamp(value: &str) -> TimeExprResult<Option<DateTime<Utc>>> {
    parse_timestamp_at(value, Local::now())
}

/// Parse a timestamp with an explicit "now" used for time-only input.
pub fn parse_timestamp_at(
    value: &str,
    now: DateTime<Local>,
) -> TimeExprResult<Option<DateTime<Utc>>> {
    if value.is_empty() {
        return Ok(None);
    }

    // Time of day only
    if value.contains(':') && !value.contains('-') {
        let time = parse_time_of_day(value, value)?;
        let naive = now.date_naive().and_time(time);
        return to_utc(value, naive).map(Some);
    }

    let parts: Vec<&str> = value
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == ':' || c == '-'))
        .filter(|part| !part.is_empty())
        .collect();

    match parts.as_slice() {
        [] => Err(TimeExprError::timestamp(
            value,
            value,
            "nothing left after removing separators",
        )),
        [date] => {
            let date = parse_date(value, date)?;
            to_utc(value, date.and_time(NaiveTime::MIN)).map(Some)
        }
        [date, time] => {
            let date = parse_date(value, date)?;
            let time = parse_time_of_day(value, time)?;
            to_utc(value, date.and_time(time)).map(Some)
        }
        _ => Err(TimeExprError::timestamp(
            value,
            value,
            "expected 'HH:MM', 'YYYY-MM-DD' or 'YYYY-MM-DD HH:MM'",
        )),
    }
}

fn parse_date(input: &str, fragment: &str) -> TimeExprResult<NaiveDate> {
    NaiveDate::parse_from_str(fragment, DATE_FORMAT)
        .map_err(|_| TimeExprError::timestamp(input, fragment, "date must be YYYY-MM-DD"))
}

fn parse_time_of_day(input: &str, fragment: &str) -> TimeExprResult<NaiveTime> {
    // chrono rejects a trailing ":SS" as trailing input, which is what we want
    NaiveTime::parse_from_str(fragment, TIME_FORMAT).map_err(|_| {
        TimeExprError::timestamp(input, fragment, "time must be HH:MM without seconds")
    })
}

fn to_utc(input: &str, naive: NaiveDateTime) -> TimeExprResult<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| {
            TimeExprError::timestamp(input, input, "time does not exist in the local time zone")
        })
}
