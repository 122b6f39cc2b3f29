use std::time::{SystemTime, UNIX_EPOCH};

use musicbee_core::Timestamp;

/// Relative "3h" / "2d" style timestamps, falling back to a plain date for
/// anything older than a month.
pub fn format_timestamp(timestamp: Timestamp) -> String {
    let system_time: SystemTime = UNIX_EPOCH + std::time::Duration::from_secs(timestamp.0);
    let now = SystemTime::now();
    let duration_since = now.duration_since(system_time).unwrap_or_default();

    let seconds = duration_since.as_secs();

    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m", seconds / 60)
    } else if seconds < 86400 {
        format!("{}h", seconds / 3600)
    } else if seconds < 2592000 {
        format!("{}d", seconds / 86400)
    } else {
        let date = time::OffsetDateTime::from_unix_timestamp(timestamp.0 as i64)
            .unwrap_or(time::OffsetDateTime::UNIX_EPOCH)
            .date();
        format!("{}/{}/{}", date.month() as u8, date.day(), date.year())
    }
}

/// Absolute date-time for event schedules.
pub fn format_event_time(timestamp: Timestamp) -> String {
    let dt = time::OffsetDateTime::from_unix_timestamp(timestamp.0 as i64)
        .unwrap_or(time::OffsetDateTime::UNIX_EPOCH);
    format!(
        "{} {} {}, {:02}:{:02}",
        dt.day(),
        dt.month(),
        dt.year(),
        dt.hour(),
        dt.minute()
    )
}
