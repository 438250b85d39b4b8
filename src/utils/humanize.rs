use humansize::{DECIMAL, format_size};
use std::time::Duration;

pub fn format_file_size(bytes: u64) -> String {
    format_size(bytes, DECIMAL)
}

/// Format a duration as HH:MM:SS or MM:SS.
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// ETA display; unknown remains "?" rather than a fake zero.
pub fn format_eta(eta: Option<Duration>) -> String {
    match eta {
        Some(d) => format_duration(d),
        None => "?".to_string(),
    }
}
