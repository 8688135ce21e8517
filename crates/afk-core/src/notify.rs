//! Notification text formatting.

use chrono::{DateTime, Local, TimeZone};

const FOOTER: &str = "--------------------------------------------------";

/// Wraps `body` in the timestamp banner used for report-style notifications.
pub fn stamped(body: &str) -> String {
    stamped_at(&Local::now(), body)
}

/// Like [`stamped`] with an explicit timestamp.
pub fn stamped_at<Tz: TimeZone>(at: &DateTime<Tz>, body: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "-----({}) ({})-----\n{}\n{}",
        at.format("%H:%M:%S"),
        at.format("%Y-%m-%d"),
        body,
        FOOTER
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_banner_layout() {
        let at = Utc.with_ymd_and_hms(2025, 10, 26, 7, 5, 9).unwrap();
        let text = stamped_at(&at, "Health: 20\nHunger: 18");
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "-----(07:05:09) (2025-10-26)-----");
        assert_eq!(lines[1], "Health: 20");
        assert_eq!(lines[2], "Hunger: 18");
        assert_eq!(lines[3], FOOTER);
    }
}
