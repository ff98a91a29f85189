// Formatting and parsing helpers shared by the renderer and the painters.
//
// Everything locale-specific lives here: Indian digit grouping for plain
// numbers and the `DD Month YYYY` date stamp. Currency strings coming from
// the model are never routed through these helpers.
use chrono::{DateTime, NaiveDate};
use num_format::{CustomFormat, Grouping, Locale, ToFormattedString};
use once_cell::sync::Lazy;

static INDIAN_FORMAT: Lazy<Option<CustomFormat>> = Lazy::new(|| {
    CustomFormat::builder()
        .grouping(Grouping::Indian)
        .separator(",")
        .minus_sign("-")
        .build()
        .ok()
});

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in form input.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips grouping separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    // Accept both a bare `YYYY-MM-DD` and a full RFC 3339 timestamp.
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|d| d.date_naive()))
}

/// Group an integer the Indian way: the last three digits, then pairs.
pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    match INDIAN_FORMAT.as_ref() {
        Some(format) => n.to_formatted_string(format),
        None => n.to_formatted_string(&Locale::en),
    }
}

/// Format a plain number with Indian grouping and at most `max_decimals`
/// fraction digits. Trailing zeros in the fraction are dropped, so
/// `1500.0` renders as `1,500` and `1234.50` as `1,234.5`.
pub fn format_number(n: f64, max_decimals: usize) -> String {
    if !n.is_finite() {
        return n.to_string();
    }
    let s = format!("{:.*}", max_decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next().map(|f| f.trim_end_matches('0')).unwrap_or("");
    let int_val: u64 = int_part.parse().unwrap_or(0);
    let mut res = format_int(int_val);
    if !frac_part.is_empty() {
        res.push('.');
        res.push_str(frac_part);
    }
    let is_zero = int_val == 0 && frac_part.is_empty();
    if n.is_sign_negative() && !is_zero {
        format!("-{}", res)
    } else {
        res
    }
}

/// `05 March 2025`
pub fn format_report_date(date: NaiveDate) -> String {
    date.format("%d %B %Y").to_string()
}

/// Format an ISO date string as a report stamp; `None` if it does not parse.
pub fn format_iso_date(s: &str) -> Option<String> {
    parse_date_safe(Some(s)).map(format_report_date)
}

/// Turn a camelCase or snake_case key into a display label:
/// `materialCosts` → `Material Costs`, `foundation` → `Foundation`.
pub fn humanize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev_lower = false;
    let mut at_word_start = true;
    for ch in key.chars() {
        if ch == '_' || ch == '-' || ch == ' ' {
            if !out.ends_with(' ') && !out.is_empty() {
                out.push(' ');
            }
            at_word_start = true;
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower {
            out.push(' ');
            at_word_start = true;
        }
        if at_word_start {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        at_word_start = false;
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_digits_the_indian_way() {
        assert_eq!(format_int(1234567u64), "12,34,567");
        assert_eq!(format_int(999u64), "999");
        assert_eq!(format_int(100000u64), "1,00,000");
        assert_eq!(format_int(123456789u64), "12,34,56,789");
    }

    #[test]
    fn format_number_trims_fraction() {
        assert_eq!(format_number(1500.0, 3), "1,500");
        assert_eq!(format_number(1234.5, 3), "1,234.5");
        assert_eq!(format_number(2500000.25, 3), "25,00,000.25");
        assert_eq!(format_number(-1234567.0, 3), "-12,34,567");
        assert_eq!(format_number(0.0, 3), "0");
    }

    #[test]
    fn parse_f64_safe_is_forgiving() {
        assert_eq!(parse_f64_safe(Some(" 1,500 ")), Some(1500.0));
        assert_eq!(parse_f64_safe(Some("12.5")), Some(12.5));
        assert_eq!(parse_f64_safe(Some("abc")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn dates_render_day_month_year() {
        assert_eq!(format_iso_date("2025-03-05").as_deref(), Some("05 March 2025"));
        assert_eq!(
            format_iso_date("2025-03-05T10:15:00+05:30").as_deref(),
            Some("05 March 2025")
        );
        assert_eq!(format_iso_date("05/03/2025"), None);
    }

    #[test]
    fn humanize_splits_camel_case() {
        assert_eq!(humanize_key("materialCosts"), "Material Costs");
        assert_eq!(humanize_key("foundation"), "Foundation");
        assert_eq!(humanize_key("monsoon_considerations"), "Monsoon Considerations");
        assert_eq!(humanize_key("hill-station"), "Hill Station");
    }
}
