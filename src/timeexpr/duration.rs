// Compound duration parsing ("2w3d6h30m")

use chrono::Duration;

use super::error::{TimeExprError, TimeExprResult};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;

/// Units accepted in interval durations
pub(crate) const INTERVAL_UNITS: &[(char, i64)] =
    &[('w', WEEK), ('d', DAY), ('h', HOUR), ('m', MINUTE)];

/// Units accepted on either side of a speedup ratio
pub(crate) const SPEEDUP_UNITS: &[(char, i64)] =
    &[('w', WEEK), ('d', DAY), ('h', HOUR), ('m', MINUTE), ('s', 1)];

/// Parse a compound duration made of `<integer><unit>` terms.
///
/// Units are `w`, `d`, `h` and `m`; repeated units are summed. Empty input
/// means "no duration" and yields `Ok(None)`, which is distinct from a zero
/// duration such as `"0m"`.
pub fn parse_duration(value: &str) -> TimeExprResult<Option<Duration>> {
    if value.is_empty() {
        return Ok(None);
    }
    parse_terms(value, INTERVAL_UNITS)
        .map(Some)
        .map_err(|reason| TimeExprError::duration(value, reason))
}

/// Sum the `<integer><unit>` terms of `value` using the given unit table.
///
/// Returns the failure reason as plain text so callers can wrap it in the
/// error variant matching their grammar.
pub(crate) fn parse_terms(value: &str, units: &[(char, i64)]) -> Result<Duration, String> {
    let mut total: i64 = 0;
    let mut number: Option<i64> = None;
    let mut digits = String::new();

    for c in value.chars() {
        if let Some(digit) = c.to_digit(10) {
            digits.push(c);
            let current = number.unwrap_or(0);
            number = Some(
                current
                    .checked_mul(10)
                    .and_then(|n| n.checked_add(i64::from(digit)))
                    .ok_or_else(|| format!("number '{}' is too large", digits))?,
            );
            continue;
        }

        let Some(&(_, unit_secs)) = units.iter().find(|(unit, _)| *unit == c) else {
            return Err(format!(
                "invalid character '{}' (expected digits or units {})",
                c,
                unit_list(units)
            ));
        };

        let Some(n) = number.take() else {
            return Err(format!("unit '{}' is not preceded by a number", c));
        };
        digits.clear();

        total = n
            .checked_mul(unit_secs)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(|| "duration is too large".to_string())?;
    }

    if number.is_some() {
        return Err(format!("missing unit after '{}'", digits));
    }

    Duration::try_seconds(total).ok_or_else(|| "duration is too large".to_string())
}

fn unit_list(units: &[(char, i64)]) -> String {
    units
        .iter()
        .map(|(unit, _)| unit.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
