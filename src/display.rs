//! Clock label formatting.

/// Render an `"HH : MM"` label as a 12-hour clock, e.g. `"13 : 5"` -> `"PM 1:05"`.
///
/// Anything that does not parse as an hour and minute is returned unchanged.
pub fn format_clock(label: &str) -> String {
    let Some((hour, minute)) = label.split_once(':') else {
        return label.to_string();
    };
    let (Ok(hour), Ok(minute)) = (hour.trim().parse::<u32>(), minute.trim().parse::<u32>()) else {
        return label.to_string();
    };
    if hour > 23 || minute > 59 {
        return label.to_string();
    }

    let period = if hour < 12 { "AM" } else { "PM" };
    let display_hour = match hour {
        0 => 12,
        h if h > 12 => h - 12,
        h => h,
    };
    format!("{} {}:{:02}", period, display_hour, minute)
}
