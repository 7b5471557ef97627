//! RFC 3339 timestamps as carried in `timestamp`, `creationTime` and
//! `deviceModelChangeTime` attributes.
//!
//! Timestamps are held as microseconds since the Unix epoch in UTC. Offsets
//! other than `Z` are accepted on read and folded into the instant; writing
//! always produces UTC with the fraction trimmed of trailing zeros.

use crate::error::TimestampError;

const MICROSECONDS_PER_SECOND: i64 = 1_000_000;
const MICROSECONDS_PER_MINUTE: i64 = 60 * MICROSECONDS_PER_SECOND;
const MICROSECONDS_PER_HOUR: i64 = 60 * MICROSECONDS_PER_MINUTE;
const MICROSECONDS_PER_DAY: i64 = 24 * MICROSECONDS_PER_HOUR;

/// Parses `YYYY-MM-DDTHH:MM:SS[.fraction](Z|+HH:MM|-HH:MM)` into UTC epoch
/// microseconds. A missing zone reads as UTC; digits past microseconds are
/// truncated.
pub fn parse_timestamp(input: &str) -> Result<i64, TimestampError> {
    if input.len() < 19 || !input.is_ascii() {
        return Err(TimestampError::invalid("format", input));
    }
    let bytes = input.as_bytes();
    if bytes[4] != b'-' || bytes[7] != b'-' || bytes[13] != b':' || bytes[16] != b':' {
        return Err(TimestampError::invalid("format", input));
    }
    if !matches!(bytes[10], b'T' | b't' | b' ') {
        return Err(TimestampError::invalid("separator", input));
    }

    let year: i32 = digits(input, 0..4, "year")?;
    let month: u32 = digits(input, 5..7, "month")?;
    let day: u32 = digits(input, 8..10, "day")?;
    let hours: i64 = digits(input, 11..13, "hours")?;
    let minutes: i64 = digits(input, 14..16, "minutes")?;
    // 60 admits a leap second; it folds into the next minute.
    let seconds: i64 = digits(input, 17..19, "seconds")?;

    if !(1..=12).contains(&month) {
        return Err(TimestampError::invalid("month", input));
    }
    if day == 0 || day > days_in_month(year, month) {
        return Err(TimestampError::invalid("day", input));
    }
    if hours > 23 {
        return Err(TimestampError::invalid("hours", input));
    }
    if minutes > 59 {
        return Err(TimestampError::invalid("minutes", input));
    }
    if seconds > 60 {
        return Err(TimestampError::invalid("seconds", input));
    }

    let rest = &input[19..];
    let (fraction, zone) = match rest.strip_prefix('.') {
        Some(after) => {
            let end = after
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after.len());
            if end == 0 {
                return Err(TimestampError::invalid("fraction", input));
            }
            (fraction_micros(&after[..end]), &after[end..])
        }
        None => (0, rest),
    };
    let offset_minutes = parse_offset(zone).ok_or_else(|| TimestampError::invalid("offset", input))?;

    let days = i64::from(date_to_days(year, month, day));
    Ok(days * MICROSECONDS_PER_DAY
        + hours * MICROSECONDS_PER_HOUR
        + minutes * MICROSECONDS_PER_MINUTE
        + seconds * MICROSECONDS_PER_SECOND
        + fraction
        - offset_minutes * MICROSECONDS_PER_MINUTE)
}

/// Formats UTC epoch microseconds as `YYYY-MM-DDTHH:MM:SS[.fraction]Z`.
pub fn format_timestamp(epoch_micros: i64) -> String {
    let days = epoch_micros.div_euclid(MICROSECONDS_PER_DAY);
    let of_day = epoch_micros.rem_euclid(MICROSECONDS_PER_DAY);
    let (year, month, day) = days_to_date(days);

    let hours = of_day / MICROSECONDS_PER_HOUR;
    let minutes = of_day % MICROSECONDS_PER_HOUR / MICROSECONDS_PER_MINUTE;
    let seconds = of_day % MICROSECONDS_PER_MINUTE / MICROSECONDS_PER_SECOND;
    let micros = of_day % MICROSECONDS_PER_SECOND;

    let mut out = format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        year, month, day, hours, minutes, seconds
    );
    if micros != 0 {
        let fraction = format!("{:06}", micros);
        out.push('.');
        out.push_str(fraction.trim_end_matches('0'));
    }
    out.push('Z');
    out
}

fn digits<T: std::str::FromStr>(
    input: &str,
    range: std::ops::Range<usize>,
    what: &str,
) -> Result<T, TimestampError> {
    let field = &input[range];
    if !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimestampError::invalid(what, input));
    }
    field.parse().map_err(|_| TimestampError::invalid(what, input))
}

fn fraction_micros(digits: &str) -> i64 {
    let mut micros = 0;
    for (i, b) in digits.bytes().take(6).enumerate() {
        micros += i64::from(b - b'0') * 10_i64.pow(5 - i as u32);
    }
    micros
}

/// Offset in minutes east of UTC. Empty reads as UTC.
fn parse_offset(zone: &str) -> Option<i64> {
    match zone {
        "" | "Z" | "z" => return Some(0),
        _ => {}
    }
    let bytes = zone.as_bytes();
    if bytes.len() != 6 || bytes[3] != b':' {
        return None;
    }
    let sign = match bytes[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let hours: i64 = zone[1..3].parse().ok()?;
    let minutes: i64 = zone[4..6].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(sign * (hours * 60 + minutes))
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Days since 1970-01-01 (Hinnant's civil-from-days inverse).
fn date_to_days(year: i32, month: u32, day: u32) -> i32 {
    let y = i64::from(if month <= 2 { year - 1 } else { year });
    let m = i64::from(if month <= 2 { month + 9 } else { month - 3 });
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let doy = (153 * m + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    (era * 146_097 + doe - 719_468) as i32
}

fn days_to_date(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
