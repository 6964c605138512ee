//! Issue-date rendering for the ledger record.

use chrono::{DateTime, Datelike, FixedOffset, Utc};

/// Offset the issue date is computed in (UTC+9), independent of the host timezone.
pub const LEDGER_UTC_OFFSET_SECS: i32 = 9 * 3600;

/// Render `at` as `"{year}. {month}. {day}"` (no zero padding) in UTC+9.
pub fn format_issue_date(at: DateTime<Utc>) -> String {
    let date = match FixedOffset::east_opt(LEDGER_UTC_OFFSET_SECS) {
        Some(offset) => at.with_timezone(&offset).date_naive(),
        None => at.date_naive(),
    };
    format!("{}. {}. {}", date.year(), date.month(), date.day())
}
