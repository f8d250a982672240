//! Number and text formatting shared by the report renderers.

/// Shown wherever a value is undefined.
pub const NOT_AVAILABLE: &str = "N/A";

/// Format a number with comma thousands separators.
///
/// Whole numbers print without decimals, anything else with two.
pub fn format_thousands(value: f64) -> String {
    let text = if value.fract() == 0.0 {
        format!("{:.0}", value.abs())
    } else {
        format!("{:.2}", value.abs())
    };

    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && text.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };

    match frac_part {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

/// Format a price, e.g. `$12.50`.
pub fn format_price(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("${:.2}", v),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Format a fraction as a percentage, e.g. `0.6` as `60.00%`.
pub fn format_ratio(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v * 100.0),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Format an already-scaled percent change with its sign, e.g. `+4.00%`.
pub fn format_change(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:+.2}%", v),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Escape text for HTML and SVG output.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Escape text for a Markdown table cell.
pub fn escape_table_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Turn a product name into an anchor / file name fragment.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for ch in text.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            slug.push(ch);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.0), "999");
        assert_eq!(format_thousands(1000.0), "1,000");
        assert_eq!(format_thousands(1234567.0), "1,234,567");
        assert_eq!(format_thousands(1234.5), "1,234.50");
        assert_eq!(format_thousands(-98765.0), "-98,765");
    }

    #[test]
    fn test_undefined_values_render_as_na() {
        assert_eq!(format_price(None), "N/A");
        assert_eq!(format_ratio(None), "N/A");
        assert_eq!(format_change(None), "N/A");
    }

    #[test]
    fn test_format_metrics() {
        assert_eq!(format_price(Some(12.5)), "$12.50");
        assert_eq!(format_ratio(Some(0.6)), "60.00%");
        assert_eq!(format_change(Some(4.0)), "+4.00%");
        assert_eq!(format_change(Some(-77.5)), "-77.50%");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Café" & 'Té'</b>"#),
            "&lt;b&gt;&quot;Café&quot; &amp; &#39;Té&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_escape_table_cell() {
        assert_eq!(escape_table_cell("A|B"), "A\\|B");
        assert_eq!(escape_table_cell("Café"), "Café");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Café Molido"), "café-molido");
        assert_eq!(slugify("  A/B  "), "a-b");
    }
}
