//! Formatting utilities used for CLI outputs.

pub fn mins2readable(mins: i64, want_sign: bool, short: bool) -> String {
    let abs_m = mins.abs();
    let hours = abs_m / 60;
    let minutes = abs_m % 60;

    let sign = if mins > 0 && want_sign {
        "+"
    } else if mins < 0 && want_sign {
        "-"
    } else {
        ""
    };

    if short {
        // e.g. +02:25 or -01:10
        format!("{}{:02}:{:02}", sign, hours, minutes)
    } else {
        // e.g. +02h 25m or -01h 10m
        format!("{}{:02}h {:02}m", sign, hours, minutes)
    }
}

/// Declared or worked hours, `--` when unknown.
pub fn hours2readable(hours: Option<f64>) -> String {
    match hours {
        Some(h) => mins2readable((h * 60.0).round() as i64, false, false),
        None => "--".to_string(),
    }
}
