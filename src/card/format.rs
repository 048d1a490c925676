//! Text helpers for card content.

/// Compact count: `1234` becomes `"1.2k"`, `2_000_000` becomes `"2m"`.
pub fn k_format(n: u64) -> String {
    if n < 1_000 {
        return n.to_string();
    }
    if n < 1_000_000 {
        let thousands = n as f64 / 1_000.0;
        if thousands >= 100.0 {
            return format!("{:.0}k", thousands);
        }
        return format!("{}k", one_decimal(thousands));
    }
    format!("{}m", one_decimal(n as f64 / 1_000_000.0))
}

/// One decimal place, dropping a trailing `.0`.
fn one_decimal(value: f64) -> String {
    let formatted = format!("{:.1}", value);
    match formatted.strip_suffix(".0") {
        Some(whole) => whole.to_string(),
        None => formatted,
    }
}

/// Escapes text for use in SVG element content and attribute values.
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_k_format_small_numbers_unchanged() {
        assert_eq!(k_format(0), "0");
        assert_eq!(k_format(999), "999");
    }

    #[test]
    fn test_k_format_thousands() {
        assert_eq!(k_format(1_000), "1k");
        assert_eq!(k_format(1_234), "1.2k");
        assert_eq!(k_format(45_600), "45.6k");
        assert_eq!(k_format(123_456), "123k");
    }

    #[test]
    fn test_k_format_millions() {
        assert_eq!(k_format(2_000_000), "2m");
        assert_eq!(k_format(2_345_678), "2.3m");
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(
            escape_xml(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#x27;s&lt;/a&gt;"
        );
        assert_eq!(escape_xml("plain"), "plain");
    }
}
