//! Field rules: pure predicates shared by every wizard step.
//!
//! Each rule returns `Ok(())` when the value passes or `Err(reason)` with the
//! human-readable message to surface on the field. Rules compose with
//! `and_then`, so the first failing rule in a chain is the one reported.

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Local, NaiveDate};
use regex::Regex;

use crate::models::resume::YearValue;

pub type RuleResult = Result<(), String>;

/// Earliest accepted education year.
pub const MIN_YEAR: i64 = 1990;
/// How far past the current year an education year may reach.
pub const YEARS_AHEAD: i64 = 5;

pub const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Values a rule needs from outside the field itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleContext {
    pub current_year: i64,
}

impl RuleContext {
    pub fn today() -> Self {
        Self {
            current_year: i64::from(Local::now().year()),
        }
    }
}

pub fn required(value: &str, message: &str) -> RuleResult {
    if value.trim().is_empty() {
        Err(message.to_string())
    } else {
        Ok(())
    }
}

pub fn min_length(value: &str, n: usize, message: &str) -> RuleResult {
    if value.chars().count() < n {
        Err(message.to_string())
    } else {
        Ok(())
    }
}

/// Pattern rules only judge non-empty values; emptiness is `required`'s call.
pub fn pattern(value: &str, regex: &Regex, message: &str) -> RuleResult {
    if value.is_empty() || regex.is_match(value) {
        Ok(())
    } else {
        Err(message.to_string())
    }
}

pub fn rich_text_non_empty(value: &str, message: &str) -> RuleResult {
    if strip_tags(value).trim().is_empty() {
        Err(message.to_string())
    } else {
        Ok(())
    }
}

pub fn valid_year(value: &YearValue, ctx: &RuleContext, message: &str) -> RuleResult {
    match value.as_integer() {
        Some(year) if (MIN_YEAR..=ctx.current_year + YEARS_AHEAD).contains(&year) => Ok(()),
        _ => Err(message.to_string()),
    }
}

pub fn valid_month(value: &str, message: &str) -> RuleResult {
    if MONTHS.contains(&value) {
        Ok(())
    } else {
        Err(message.to_string())
    }
}

/// Blank values pass; pair with `required` when the date is mandatory.
pub fn valid_date(value: &str, message: &str) -> RuleResult {
    if value.trim().is_empty() || parse_date(value).is_some() {
        Ok(())
    } else {
        Err(message.to_string())
    }
}

/// Passes unless both dates parse and `end` falls before `start`.
pub fn date_ordering(start: &str, end: &str, message: &str) -> RuleResult {
    match (parse_date(start), parse_date(end)) {
        (Some(start), Some(end)) if end < start => Err(message.to_string()),
        _ => Ok(()),
    }
}

/// `required`, but only while `predicate` holds for the current snapshot.
pub fn conditional_required(
    value: &str,
    predicate: impl FnOnce() -> bool,
    message: &str,
) -> RuleResult {
    if predicate() {
        required(value, message)
    } else {
        Ok(())
    }
}

/// Accepts `YYYY-MM-DD` and full RFC 3339 timestamps (the API stores the latter).
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

pub fn strip_tags(html: &str) -> String {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    TAGS.get_or_init(|| Regex::new(r"<[^>]*>").expect("regex for html tags"))
        .replace_all(html, "")
        .into_owned()
}

pub fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").expect("regex for email")
    })
}

pub fn phone_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]{10}$").expect("regex for phone"))
}

pub fn linkedin_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(https?://)?([\w\d]+\.)?linkedin\.com/.+").expect("regex for linkedin")
    })
}

pub fn github_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(https?://)?([\w\d]+\.)?github\.com/.+").expect("regex for github")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTX: RuleContext = RuleContext { current_year: 2026 };

    #[test]
    fn test_required_rejects_whitespace() {
        assert!(required("   ", "Name is required").is_err());
        assert!(required("", "Name is required").is_err());
        assert!(required(" a ", "Name is required").is_ok());
    }

    #[test]
    fn test_min_length_counts_chars() {
        assert_eq!(min_length("a", 2, "too short"), Err("too short".to_string()));
        assert!(min_length("ab", 2, "too short").is_ok());
        assert!(min_length("Zü", 2, "too short").is_ok());
    }

    #[test]
    fn test_email_pattern() {
        let re = email_pattern();
        assert!(pattern("ada@example.com", re, "bad").is_ok());
        assert!(pattern("ADA.L+cv@Mail.Example.ORG", re, "bad").is_ok());
        assert!(pattern("ada@example", re, "bad").is_err());
        assert!(pattern("not an email", re, "bad").is_err());
    }

    #[test]
    fn test_phone_pattern_exactly_ten_digits() {
        let re = phone_pattern();
        assert!(pattern("0123456789", re, "bad").is_ok());
        assert!(pattern("012345678", re, "bad").is_err());
        assert!(pattern("01234567890", re, "bad").is_err());
        assert!(pattern("012-345-6789", re, "bad").is_err());
    }

    #[test]
    fn test_profile_url_patterns() {
        assert!(pattern("https://www.linkedin.com/in/ada", linkedin_pattern(), "bad").is_ok());
        assert!(pattern("linkedin.com/in/ada", linkedin_pattern(), "bad").is_ok());
        assert!(pattern("https://linkedin.com/", linkedin_pattern(), "bad").is_err());
        assert!(pattern("https://github.com/ada", github_pattern(), "bad").is_ok());
        assert!(pattern("https://gitlab.com/ada", github_pattern(), "bad").is_err());
    }

    #[test]
    fn test_required_fires_before_pattern() {
        let verdict = required("", "Email is required")
            .and_then(|_| pattern("", email_pattern(), "Invalid email address"));
        assert_eq!(verdict, Err("Email is required".to_string()));
    }

    #[test]
    fn test_rich_text_only_markup_is_empty() {
        assert!(rich_text_non_empty("<p><br></p>", "empty").is_err());
        assert!(rich_text_non_empty("<p>  </p>", "empty").is_err());
        assert!(rich_text_non_empty("<ul><li>Rust</li></ul>", "empty").is_ok());
    }

    #[test]
    fn test_valid_year_range() {
        let msg = "Please select a valid year";
        assert_eq!(valid_year(&YearValue::Number(1899), &CTX, msg), Err(msg.to_string()));
        assert!(valid_year(&YearValue::Number(1990), &CTX, msg).is_ok());
        assert!(valid_year(&YearValue::Text("2031".into()), &CTX, msg).is_ok());
        assert!(valid_year(&YearValue::Text("2032".into()), &CTX, msg).is_err());
        assert!(valid_year(&YearValue::Text("soon".into()), &CTX, msg).is_err());
    }

    #[test]
    fn test_valid_month_is_case_sensitive() {
        assert!(valid_month("March", "bad").is_ok());
        assert!(valid_month("march", "bad").is_err());
        assert!(valid_month("Mar", "bad").is_err());
    }

    #[test]
    fn test_date_parsing_and_ordering() {
        assert!(parse_date("2020-01-31").is_some());
        assert!(parse_date("2020-01-31T00:00:00.000Z").is_some());
        assert!(parse_date("31/01/2020").is_none());

        assert!(date_ordering("2020-01-01", "2020-01-01", "bad").is_ok());
        assert!(date_ordering("2020-01-01", "2021-06-01", "bad").is_ok());
        assert!(date_ordering("2021-06-01", "2020-01-01", "bad").is_err());
        // unparsable inputs are left to the date rules
        assert!(date_ordering("", "2020-01-01", "bad").is_ok());
    }

    #[test]
    fn test_conditional_required_follows_predicate() {
        assert!(conditional_required("", || false, "needed").is_ok());
        assert_eq!(
            conditional_required("", || true, "needed"),
            Err("needed".to_string())
        );
        assert!(conditional_required("2020-01-01", || true, "needed").is_ok());
    }
}
