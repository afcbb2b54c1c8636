//! Human-readable route summaries.
//!
//! Pure functions; the route client never converts units itself.

/// `"X m"` below one kilometre, `"X.X km"` otherwise.
///
/// ```
/// use nav_core::format_distance;
/// assert_eq!(format_distance(950.0), "950 m");
/// assert_eq!(format_distance(1500.0), "1.5 km");
/// ```
pub fn format_distance(meters: f64) -> String {
    let meters = meters.max(0.0);
    if meters < 1000.0 {
        format!("{:.0} m", meters)
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

/// `"N min"` below one hour, `"Hh Mm"` otherwise.  Seconds are rounded to
/// the nearest whole minute first.
///
/// ```
/// use nav_core::format_duration;
/// assert_eq!(format_duration(125.0), "2 min");
/// assert_eq!(format_duration(5400.0), "1h 30m");
/// ```
pub fn format_duration(seconds: f64) -> String {
    let minutes = (seconds.max(0.0) / 60.0).round() as u64;
    if minutes < 60 {
        format!("{minutes} min")
    } else {
        format!("{}h {}m", minutes / 60, minutes % 60)
    }
}
