// Next-occurrence resolution for wall-clock schedules
//
// Pure functions: given "now", a set of times of day and a zone, find the
// earliest future instant at which any of the times next occurs. All date
// arithmetic is done on local calendar dates so DST transitions and
// month/year rollover come from the zone database, not from adding
// elapsed seconds.

use chrono::offset::LocalResult;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::errors::ScheduleError;
use crate::models::TimeOfDay;

/// How many calendar days to scan for a valid local instant. A DST gap
/// can erase a local time on at most one consecutive day, so three is
/// already generous.
const MAX_DAY_SCAN: u32 = 3;

/// Compute the next occurrence of any of `times` in `tz`, strictly after
/// `now`, together with the time-of-day entry that produced it.
///
/// Ties between entries resolve to whichever is listed first.
pub fn next_occurrence(
    now: DateTime<Utc>,
    times: &[TimeOfDay],
    tz: Tz,
) -> Result<(DateTime<Utc>, TimeOfDay), ScheduleError> {
    if times.is_empty() {
        return Err(ScheduleError::EmptySchedule);
    }

    let today = now.with_timezone(&tz).date_naive();
    let mut best: Option<(DateTime<Utc>, TimeOfDay)> = None;

    for &tod in times {
        let candidate = candidate_after(now, today, tod, tz)?;
        match best {
            Some((current, _)) if candidate >= current => {}
            _ => best = Some((candidate, tod)),
        }
    }

    // times is non-empty, so best is set
    best.ok_or(ScheduleError::EmptySchedule)
}

/// Earliest instant strictly after `now` at which `tod` occurs in `tz`,
/// starting the scan on `date`. A local time erased by a spring-forward
/// gap rolls to the next day on which it exists.
fn candidate_after(
    now: DateTime<Utc>,
    date: NaiveDate,
    tod: TimeOfDay,
    tz: Tz,
) -> Result<DateTime<Utc>, ScheduleError> {
    let mut day = date;
    for _ in 0..MAX_DAY_SCAN {
        if let Some(instant) = local_instant(day, tod, tz) {
            if instant > now {
                return Ok(instant);
            }
        }
        day = day
            .succ_opt()
            .ok_or_else(|| ScheduleError::NoOccurrence(tod.to_string()))?;
    }
    Err(ScheduleError::NoOccurrence(tod.to_string()))
}

/// Map a (date, time-of-day) pair in `tz` to a UTC instant.
///
/// Returns None when the local time does not exist on that day (DST
/// gap). An ambiguous local time (DST fold) takes the earlier instant.
fn local_instant(date: NaiveDate, tod: TimeOfDay, tz: Tz) -> Option<DateTime<Utc>> {
    let naive = date.and_hms_opt(u32::from(tod.hour), u32::from(tod.minute), 0)?;
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earlier, _) => Some(earlier.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

/// Resolve the configured zone name to a concrete zone.
///
/// `"system-local"` (or an empty value) honors the TZ environment
/// variable the way the process's environment would; anything that fails
/// to parse falls back to UTC with a warning rather than refusing to
/// start.
pub fn resolve_zone(name: &str) -> Tz {
    let trimmed = name.trim();
    if !trimmed.is_empty() && trimmed != "system-local" {
        match trimmed.parse::<Tz>() {
            Ok(tz) => return tz,
            Err(_) => {
                warn!(zone = %trimmed, "Unrecognized timezone, falling back to TZ environment");
            }
        }
    }

    match std::env::var("TZ") {
        Ok(tz_env) => match tz_env.parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                warn!(tz = %tz_env, "Unrecognized TZ environment value, falling back to UTC");
                Tz::UTC
            }
        },
        Err(_) => Tz::UTC,
    }
}
