//! HTML building with escaping applied in one place.
//!
//! Every piece of text or attribute value that reaches a rendered fragment goes
//! through [`escape_html`]. Renderers use [`Markup`] rather than formatting
//! strings by hand.

use chrono::{DateTime, NaiveDateTime};
use std::fmt::Write;

/// Escape the five characters that are significant in HTML text and
/// attribute values.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Format an amount held in minor units (cents) as `1,234.56`.
pub fn format_amount(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("{sign}{grouped}.{:02}", cents % 100)
}

/// Format a server timestamp (`2024-05-01 14:03:00` or RFC 3339) as
/// `May 01, 14:03`. Unrecognized input is returned unchanged.
pub fn format_timestamp(raw: &str) -> String {
    const DISPLAY: &str = "%b %d, %H:%M";

    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return parsed.format(DISPLAY).to_string();
    }
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => parsed.format(DISPLAY).to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Append-only HTML builder.
#[derive(Debug, Default)]
pub struct Markup {
    buf: String,
}

impl Markup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a tag. Attribute values are escaped; attribute names are expected
    /// to be literals.
    pub fn open(mut self, tag: &str, attrs: &[(&str, &str)]) -> Self {
        self.buf.push('<');
        self.buf.push_str(tag);
        for (name, value) in attrs {
            let _ = write!(self.buf, " {name}=\"{}\"", escape_html(value));
        }
        self.buf.push('>');
        self
    }

    pub fn close(mut self, tag: &str) -> Self {
        let _ = write!(self.buf, "</{tag}>");
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.buf.push_str(&escape_html(text));
        self
    }

    /// `<tag attrs>text</tag>`
    pub fn element(self, tag: &str, attrs: &[(&str, &str)], text: &str) -> Self {
        self.open(tag, attrs).text(text).close(tag)
    }

    /// Append an already built fragment.
    pub fn append(mut self, other: Markup) -> Self {
        self.buf.push_str(&other.buf);
        self
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_html_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<img src=x onerror="alert('x')">&"#),
            "&lt;img src=x onerror=&quot;alert(&#39;x&#39;)&quot;&gt;&amp;"
        );
        assert_eq!(escape_html("Business cards"), "Business cards");
    }

    #[test]
    fn markup_escapes_text_and_attribute_values() {
        let html = Markup::new()
            .open("li", &[("data-name", "\"quoted\"")])
            .text("<b>bold</b>")
            .close("li")
            .into_string();

        assert_eq!(
            html,
            "<li data-name=\"&quot;quoted&quot;\">&lt;b&gt;bold&lt;/b&gt;</li>"
        );
    }

    #[test]
    fn amounts_are_grouped_by_thousands() {
        assert_eq!(format_amount(0), "0.00");
        assert_eq!(format_amount(5), "0.05");
        assert_eq!(format_amount(123_456), "1,234.56");
        assert_eq!(format_amount(100_000_000), "1,000,000.00");
        assert_eq!(format_amount(-2_50), "-2.50");
    }

    #[test]
    fn timestamps_are_formatted_when_recognized() {
        assert_eq!(format_timestamp("2024-05-01 14:03:00"), "May 01, 14:03");
        assert_eq!(format_timestamp("2024-05-01T14:03:00+02:00"), "May 01, 14:03");
        assert_eq!(format_timestamp("yesterday"), "yesterday");
    }
}
