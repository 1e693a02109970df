use std::time::Duration;

/// Human byte sizes with two decimals, switching units at 10x the
/// previous one so short numbers stay short.
pub fn format_bytes(bytes: u64) -> String {
    let b = bytes as f64;
    if b < 1024.0 * 10.0 {
        format!("{b:.2}B")
    } else if b < 1024.0 * 1024.0 * 10.0 {
        format!("{:.2}kB", b / 1024.0)
    } else if b < 1024.0 * 1024.0 * 1024.0 * 10.0 {
        format!("{:.2}MB", b / (1024.0 * 1024.0))
    } else {
        format!("{:.2}GB", b / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Ages like `1y 2d 3h 4m 5s`. Zero-valued leading units are omitted;
/// seconds always print.
pub fn format_age(age: Duration) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;
    const YEAR: u64 = 365 * DAY;

    let mut secs = age.as_secs();
    let mut out = String::with_capacity(16);

    let years = secs / YEAR;
    secs %= YEAR;
    let days = secs / DAY;
    secs %= DAY;
    let hours = secs / HOUR;
    secs %= HOUR;
    let minutes = secs / MINUTE;
    secs %= MINUTE;

    if years > 0 {
        out.push_str(&format!("{years}y "));
    }
    if days > 0 {
        out.push_str(&format!("{days}d "));
    }
    if hours > 0 {
        out.push_str(&format!("{hours}h "));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}m "));
    }
    out.push_str(&format!("{secs}s"));
    out
}

pub fn number_width(mut n: u64) -> usize {
    let mut width = 1;
    while n >= 10 {
        n /= 10;
        width += 1;
    }
    width
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_pick_the_right_unit() {
        assert_eq!(format_bytes(512), "512.00B");
        assert_eq!(format_bytes(20 * 1024), "20.00kB");
        assert_eq!(format_bytes(20 * 1024 * 1024), "20.00MB");
        assert_eq!(format_bytes(20 * 1024 * 1024 * 1024), "20.00GB");
    }

    #[test]
    fn ages_skip_zero_units() {
        assert_eq!(format_age(Duration::from_secs(5)), "5s");
        assert_eq!(format_age(Duration::from_secs(3 * 60 + 5)), "3m 5s");
        assert_eq!(
            format_age(Duration::from_secs(2 * 86400 + 3 * 3600 + 4 * 60 + 5)),
            "2d 3h 4m 5s"
        );
        assert_eq!(
            format_age(Duration::from_secs(366 * 86400)),
            "1y 1d 0s"
        );
    }

    #[test]
    fn widths() {
        assert_eq!(number_width(0), 1);
        assert_eq!(number_width(9), 1);
        assert_eq!(number_width(10), 2);
        assert_eq!(number_width(12345), 5);
    }
}
