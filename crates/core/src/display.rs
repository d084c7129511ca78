//! Timestamp helpers shared by every view of the mirror.
//!
//! The service reports `1900-01-01T00:00:00Z` for "never happened". Every
//! helper here renders a caller-supplied placeholder for it.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::entity::TaskEntity;
use crate::model::TaskStatus;

/// Unix seconds of the sentinel instant, 1900-01-01T00:00:00Z.
pub const NEVER_UNIX_SECONDS: i64 = -2_208_988_800;

/// The sentinel instant.
pub fn never() -> DateTime<Utc> {
    DateTime::from_timestamp(NEVER_UNIX_SECONDS, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Whether `ts` is the sentinel.
pub fn is_never(ts: DateTime<Utc>) -> bool {
    ts == never()
}

/// RFC 3339 rendering, or `placeholder` for the sentinel.
pub fn format_timestamp(ts: DateTime<Utc>, placeholder: &str) -> String {
    if is_never(ts) {
        placeholder.to_owned()
    } else {
        ts.to_rfc3339_opts(SecondsFormat::Millis, false)
    }
}

/// Time since a process last completed a cycle.
pub fn since_last_cycle(last_cycle_at: DateTime<Utc>, now: DateTime<Utc>, placeholder: &str) -> String {
    if is_never(last_cycle_at) {
        placeholder.to_owned()
    } else {
        format_relative(last_cycle_at, now)
    }
}

/// Time since a task's last instance finished. Only meaningful once the task
/// has left `Running`/`Init`.
pub fn since_last_task(task: &TaskEntity, now: DateTime<Utc>, placeholder: &str) -> String {
    match task.remote_status() {
        TaskStatus::Running | TaskStatus::Init => placeholder.to_owned(),
        TaskStatus::Finished => since_last_cycle(task.finished_at(), now, placeholder),
    }
}

/// Short English relative time using the largest of days, hours, minutes and
/// seconds whose count is at least one.
pub fn format_relative(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(ts).num_seconds();
    let magnitude = delta.unsigned_abs();
    let (count, unit) = match magnitude {
        m if m >= 86_400 => (m / 86_400, if m / 86_400 == 1 { "day" } else { "days" }),
        m if m >= 3_600 => (m / 3_600, "hr."),
        m if m >= 60 => (m / 60, "min."),
        m => (m, "sec."),
    };
    if delta < 0 {
        format!("in {count} {unit}")
    } else {
        format!("{count} {unit} ago")
    }
}
