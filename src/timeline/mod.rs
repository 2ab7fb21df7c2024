// Timeline module for counsel-review
// Pure transcript/time logic: selection-to-time mapping, cursor location,
// and the playback transport state.

pub mod locator;
pub mod mapper;
pub mod playback;

pub use locator::locate;
pub use mapper::{estimate_range, TimeRange};
pub use playback::{PlaybackController, PlaybackEvent};

/// Render seconds as the m:ss label used across transcript and comment views
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "0:00");
        assert_eq!(format_timestamp(36.0), "0:36");
        assert_eq!(format_timestamp(75.4), "1:15");
        assert_eq!(format_timestamp(-3.0), "0:00");
    }
}
