/// Render a duration as `"D D, H H, M m"`.
///
/// The day and hour segments are omitted when zero; minutes are always
/// shown. Each unit is truncated, never rounded.
pub fn format_duration(total_secs: u64) -> String {
    let days = total_secs / 86_400;
    let remainder = total_secs % 86_400;
    let hours = remainder / 3_600;
    let minutes = (remainder % 3_600) / 60;

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{days} D, "));
    }
    if hours > 0 {
        out.push_str(&format!("{hours} H, "));
    }
    out.push_str(&format!("{minutes} m"));
    out
}

/// Seconds as minutes with two decimals, e.g. `"12.50"`.
pub fn format_minutes(secs: f64) -> String {
    format!("{:.2}", secs / 60.0)
}
