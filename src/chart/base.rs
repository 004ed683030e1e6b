//! Base constants and utility functions for the chart module.

use chrono::{DateTime, FixedOffset, Offset, Utc};

// Geometry defaults
pub const POINT_WIDTH: f32 = 8.0;
pub const CANDLE_WIDTH: f32 = 6.0;
pub const CANDLE_LINE_WIDTH: f32 = 0.8;
pub const BAR_WIDTH: f32 = 6.5;
pub const TOP_PADDING: f32 = 15.0;
pub const BOTTOM_DATE_HEIGHT: f32 = 15.0;
pub const CHILD_PADDING: f32 = 15.0;
pub const TEXT_SIZE: f32 = 8.0;
pub const CONTENT_PADDING: f32 = 12.0;

// Dashed lines
pub const DASH_WIDTH: f32 = 4.0;
pub const DASH_SPACE: f32 = 4.0;

// Layout policy
pub const SECONDARY_PANE_RATIO: f32 = 0.15;
pub const MAIN_FLOOR_RATIO: f32 = 0.3;
pub const RIGHT_MARGIN_RATIO: f32 = 0.2;

// Zoom limits
pub const MIN_SCALE: f32 = 0.5;
pub const MAX_SCALE: f32 = 2.2;

/// Timestamps above this magnitude are milliseconds
pub const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

const DAY_MILLIS: i64 = 86_400_000;

const VOLUME_UNITS: [(f64, &str); 5] = [(1.0, ""), (1e3, "k"), (1e6, "M"), (1e9, "B"), (1e12, "T")];

/// Normalize a timestamp in seconds or milliseconds to milliseconds
#[inline]
pub fn timestamp_millis(timestamp: i64) -> i64 {
    if timestamp > MILLIS_THRESHOLD {
        timestamp
    } else {
        timestamp.saturating_mul(1000)
    }
}

/// Format price with thousands grouping and a fixed number of decimals
pub fn format_price(price: f64, decimals: usize) -> String {
    if !price.is_finite() {
        return format!("{}", price);
    }

    let raw = format!("{:.prec$}", price.abs(), prec = decimals);
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (raw.as_str(), None),
    };

    let mut grouped = String::with_capacity(raw.len() + int_part.len() / 3 + 1);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }

    let is_zero = raw.chars().all(|c| c == '0' || c == '.');
    if price.is_sign_negative() && !is_zero {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Format volume with appropriate units (k, M, B, T)
pub fn format_volume(volume: f64, decimals: usize) -> String {
    let abs = volume.abs();
    let mut unit = VOLUME_UNITS
        .iter()
        .rposition(|(scale, _)| abs >= *scale)
        .unwrap_or(0);
    // rounding may carry into the next unit, 999.999k at two places is 1M
    while unit + 1 < VOLUME_UNITS.len() {
        let rounded: f64 = format!("{:.*}", decimals, abs / VOLUME_UNITS[unit].0)
            .parse()
            .unwrap_or(0.0);
        if rounded < 1000.0 {
            break;
        }
        unit += 1;
    }
    let (scale, unit) = VOLUME_UNITS[unit];
    let value = volume / scale;

    let mut text = format_price(value, decimals);
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    text.push_str(unit);
    text
}

/// Choose a date pattern from the spacing of the first two bars
pub fn date_format_for_interval(first: i64, second: i64) -> &'static str {
    let interval = (timestamp_millis(second) - timestamp_millis(first)).abs();
    if interval >= DAY_MILLIS * 28 {
        "%y-%m"
    } else if interval >= DAY_MILLIS {
        "%y-%m-%d"
    } else {
        "%m-%d %H:%M"
    }
}

/// Render a bar timestamp with the given pattern at a fixed UTC offset
pub fn format_timestamp(timestamp: i64, pattern: &str, utc_offset_minutes: i32) -> String {
    let offset = FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60)).unwrap_or(Utc.fix());
    match DateTime::<Utc>::from_timestamp_millis(timestamp_millis(timestamp)) {
        Some(dt) => dt.with_timezone(&offset).format(pattern).to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_unit_detection() {
        assert_eq!(timestamp_millis(1_700_000_000), 1_700_000_000_000);
        assert_eq!(timestamp_millis(1_700_000_000_123), 1_700_000_000_123);
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_price(100.0, 2), "100.00");
        assert_eq!(format_price(-1234.5, 1), "-1,234.5");
        assert_eq!(format_price(999.0, 0), "999");
        assert_eq!(format_price(-0.001, 2), "0.00");
    }

    #[test]
    fn test_format_volume() {
        assert_eq!(format_volume(100.0, 2), "100");
        assert_eq!(format_volume(1500.0, 2), "1.5k");
        assert_eq!(format_volume(2_000_000.0, 2), "2M");
        assert_eq!(format_volume(1_250_000_000.0, 2), "1.25B");
        assert_eq!(format_volume(3.5e12, 2), "3.5T");
        assert_eq!(format_volume(12.34, 2), "12.34");
    }

    #[test]
    fn test_format_volume_rounding_carries_unit() {
        assert_eq!(format_volume(999_999.0, 2), "1M");
        assert_eq!(format_volume(999.999, 2), "1k");
        assert_eq!(format_volume(-999_999.0, 2), "-1M");
        assert_eq!(format_volume(999_499.0, 0), "999k");
        assert_eq!(format_volume(999_990.0, 2), "999.99k");
        assert_eq!(format_volume(5e15, 2), "5,000T");
    }

    #[test]
    fn test_date_format_for_interval() {
        let minute = 60;
        let day = 86_400;
        assert_eq!(date_format_for_interval(0, minute), "%m-%d %H:%M");
        assert_eq!(date_format_for_interval(0, day), "%y-%m-%d");
        assert_eq!(date_format_for_interval(0, day * 30), "%y-%m");
    }

    #[test]
    fn test_format_timestamp() {
        // 2024-01-02 03:04:00 UTC
        let ts = 1_704_164_640;
        assert_eq!(format_timestamp(ts, "%m-%d %H:%M", 0), "01-02 03:04");
        assert_eq!(format_timestamp(ts * 1000, "%m-%d %H:%M", 480), "01-02 11:04");
    }
}
