use std::sync::OnceLock;

use regex::Regex;

fn email_regex() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").ok())
        .as_ref()
}

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    email.len() <= 254 && email_regex().map_or(false, |re| re.is_match(email))
}

/// Escape user-supplied text before it is interpolated into HTML.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Lowercased, trimmed email used for lookups and uniqueness.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
