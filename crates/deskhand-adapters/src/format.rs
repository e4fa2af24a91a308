//! Date and text formatting shared by the adapters.

use chrono::{DateTime, FixedOffset, NaiveDate};

/// Collapse line breaks and trim; header values are shown on one line.
pub fn clean_line(value: &str) -> String {
    value
        .replace(['\r', '\n'], " ")
        .trim()
        .to_string()
}

/// Format an RFC 2822 `Date` header as `YYYY-MM-DD HH:MM` in its own offset.
///
/// Unparsable dates (Gmail passes through whatever the sender wrote) are
/// returned cleaned but otherwise unchanged.
pub fn format_mail_date(raw: &str) -> String {
    // Drop a trailing zone comment such as "(UTC)" or "(PST)".
    let without_comment = raw.split('(').next().unwrap_or(raw).trim();

    match DateTime::parse_from_rfc2822(without_comment) {
        Ok(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => clean_line(raw),
    }
}

/// Format a calendar time: either an RFC 3339 `dateTime` or an all-day
/// `date`, as `YYYY-MM-DD HH:MM AM`.
pub fn format_event_time(date_time: Option<&str>, date: Option<&str>) -> Option<String> {
    if let Some(raw) = date_time
        && let Ok(dt) = DateTime::parse_from_rfc3339(raw)
    {
        return Some(format_clock(&dt));
    }

    let day = NaiveDate::parse_from_str(date?, "%Y-%m-%d").ok()?;
    Some(day.and_hms_opt(0, 0, 0)?.format("%Y-%m-%d %I:%M %p").to_string())
}

/// `YYYY-MM-DD HH:MM AM` in the time's own offset.
pub fn format_clock(dt: &DateTime<FixedOffset>) -> String {
    dt.format("%Y-%m-%d %I:%M %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mail_date_with_comment() {
        assert_eq!(
            format_mail_date("Tue, 14 Jan 2025 09:05:33 +0000 (UTC)"),
            "2025-01-14 09:05"
        );
    }

    #[test]
    fn mail_date_keeps_sender_offset() {
        assert_eq!(
            format_mail_date("Mon, 3 Feb 2025 18:30:00 -0800"),
            "2025-02-03 18:30"
        );
    }

    #[test]
    fn unparsable_mail_date_is_cleaned() {
        assert_eq!(format_mail_date("yesterday\r\n-ish"), "yesterday  -ish");
        assert_eq!(format_mail_date(""), "");
    }

    #[test]
    fn event_time_prefers_date_time() {
        assert_eq!(
            format_event_time(Some("2025-03-01T14:00:00+01:00"), None).unwrap(),
            "2025-03-01 02:00 PM"
        );
    }

    #[test]
    fn all_day_event_is_midnight() {
        assert_eq!(
            format_event_time(None, Some("2025-03-01")).unwrap(),
            "2025-03-01 12:00 AM"
        );
    }

    #[test]
    fn missing_event_time() {
        assert!(format_event_time(None, None).is_none());
        assert!(format_event_time(Some("garbage"), None).is_none());
    }

    #[test]
    fn clean_line_collapses_breaks() {
        assert_eq!(clean_line("  a\r\nb  "), "a  b");
    }
}
