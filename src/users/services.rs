use lazy_static::lazy_static;
use regex::Regex;
use time::{OffsetDateTime, Time};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Midnight of the day `now` falls on, in `now`'s offset.
pub fn start_of_day(now: OffsetDateTime) -> OffsetDateTime {
    now.replace_time(Time::MIDNIGHT)
}

/// Start of the current UTC day.
pub fn today() -> OffsetDateTime {
    start_of_day(OffsetDateTime::now_utc())
}

/// `ILIKE` pattern matching names that start with `prefix`.
/// `\`, `%` and `_` in the input match literally.
pub fn name_prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
