use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::progress::model::Progress;

/// Calendar day of the last training session, seen from `now`'s timezone
fn last_training_day<Tz: TimeZone>(progress: &Progress, now: &DateTime<Tz>) -> Option<NaiveDate> {
    progress
        .last_training_date
        .map(|ts| ts.with_timezone(&now.timezone()).date_naive())
}

/// Advance the consecutive-day streak for a training session at `now`.
///
/// Days are compared on the calendar of `now`'s timezone, so callers pass
/// the device-local clock. Training twice on one day changes nothing.
pub fn update_streak<Tz: TimeZone>(progress: &Progress, now: &DateTime<Tz>) -> Progress {
    let today = now.date_naive();
    let mut next = progress.clone();

    match last_training_day(progress, now) {
        Some(day) if day == today => return next,
        Some(day) if today.pred_opt() == Some(day) => {
            next.current_streak += 1;
        }
        _ => {
            next.current_streak = 1;
        }
    }

    next.last_training_date = Some(now.with_timezone(&Utc));
    tracing::debug!(streak = next.current_streak, day = %today, "Streak updated");
    next
}

/// Streak as it should be displayed at `now`: a missed full day breaks it
/// even before the next session resets the stored value.
pub fn effective_streak<Tz: TimeZone>(progress: &Progress, now: &DateTime<Tz>) -> u32 {
    let today = now.date_naive();
    match last_training_day(progress, now) {
        Some(day) if day == today || today.pred_opt() == Some(day) => progress.current_streak,
        _ => 0,
    }
}
