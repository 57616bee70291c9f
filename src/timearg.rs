//! Time arguments for the CLI.
//!
//! Accepted forms:
//! - RFC 3339: `2026-10-01T09:00:00Z`, `2026-10-01T11:00:00+02:00`
//! - Calendar date: `2026-10-01` (midnight UTC)
//! - `now`
//! - Relative offset from now: `-7d`, `-12h`, `-30m`

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};

pub fn parse_time(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("now") {
        return Ok(now);
    }
    if let Some(offset) = input.strip_prefix('-') {
        let delta = parse_offset(offset)?;
        return now
            .checked_sub_signed(delta)
            .ok_or_else(|| anyhow!("relative time '{input}' is out of range"));
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| anyhow!("invalid date: {input}"))?;
        return Ok(midnight.and_utc());
    }
    bail!("unrecognized time '{input}' (expected RFC 3339, YYYY-MM-DD, now, or -<n>d/-<n>h/-<n>m)")
}

fn parse_offset(offset: &str) -> Result<Duration> {
    let Some((unit_at, _)) = offset.char_indices().last() else {
        bail!("empty relative time");
    };
    let (digits, unit) = offset.split_at(unit_at);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        bail!("invalid relative time '-{offset}'");
    }
    let n: i64 = digits
        .parse()
        .map_err(|_| anyhow!("relative time '-{offset}' is out of range"))?;
    let delta = match unit {
        "d" => Duration::try_days(n),
        "h" => Duration::try_hours(n),
        "m" => Duration::try_minutes(n),
        _ => bail!("invalid relative time unit in '-{offset}' (use d, h or m)"),
    };
    delta.ok_or_else(|| anyhow!("relative time '-{offset}' is out of range"))
}
