//! Request body validation.
//!
//! Bodies are deserialised leniently (missing fields default to empty) and
//! then checked here, so that every problem is reported at once rather than
//! only the first one serde trips over.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rocket::serde::json::Value;
use serde::{Deserialize, Serialize};

pub const MIN_TITLE_LENGTH: usize = 5;
pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 20;
pub const MAX_OPTION_LENGTH: usize = 200;

/// A single violated constraint on a request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

/// An accumulator of [`Violation`]s.
#[derive(Debug, Default)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(Violation {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Check that `value`, once trimmed, is between `min` and `max` characters.
    pub fn check_length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let length = value.trim().chars().count();
        if length < min {
            if min == 1 {
                self.push(field, "must not be empty");
            } else {
                self.push(field, format!("must be at least {min} characters"));
            }
        } else if length > max {
            self.push(field, format!("must be at most {max} characters"));
        }
    }

    /// Check the fields shared by every poll and survey.
    pub fn check_metadata(
        &mut self,
        title: &str,
        description: &str,
        end_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) {
        self.check_length("title", title, MIN_TITLE_LENGTH, MAX_TITLE_LENGTH);
        self.check_length("description", description, 0, MAX_DESCRIPTION_LENGTH);
        if let Some(end_date) = end_date {
            if end_date <= now {
                self.push("end_date", "must be in the future");
            }
        }
    }

    /// Check a list of answer options: count within bounds, each non-empty,
    /// and no two the same (ignoring case and surrounding whitespace).
    pub fn check_options(&mut self, field: &str, options: &[String]) {
        if options.len() < MIN_OPTIONS || options.len() > MAX_OPTIONS {
            self.push(
                field,
                format!("must have between {MIN_OPTIONS} and {MAX_OPTIONS} options"),
            );
        }
        let mut seen = HashSet::new();
        for (i, option) in options.iter().enumerate() {
            let option_field = format!("{field}[{i}]");
            self.check_length(&option_field, option, 1, MAX_OPTION_LENGTH);
            let normalised = option.trim().to_lowercase();
            if !normalised.is_empty() && !seen.insert(normalised) {
                self.push(option_field, "duplicates an earlier option");
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<Violation> {
        self.0
    }

    /// `Ok` if nothing was violated, otherwise every violation.
    pub fn into_result(self) -> Result<(), Vec<Violation>> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self.0)
        }
    }
}

/// Read a submitted choice as an option index below `option_count`.
///
/// Choices arrive as raw JSON so that fractional, negative, oversized or
/// non-numeric values can be reported like any other bad choice.
pub fn choice_index(choice: &Value, option_count: usize) -> Option<usize> {
    choice
        .as_u64()
        .and_then(|index| usize::try_from(index).ok())
        .filter(|&index| index < option_count)
}

/// Trim the surrounding whitespace from every option.
pub fn trimmed(options: Vec<String>) -> Vec<String> {
    options.into_iter().map(|o| o.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn fields(violations: Vec<Violation>) -> Vec<String> {
        violations.into_iter().map(|v| v.field).collect()
    }

    #[test]
    fn short_title() {
        let mut violations = Violations::new();
        violations.check_metadata("Hi", "", None, Utc::now());
        assert_eq!(fields(violations.into_result().unwrap_err()), vec!["title"]);
    }

    #[test]
    fn whitespace_does_not_count_towards_length() {
        let mut violations = Violations::new();
        violations.check_length("title", "   ab    ", 5, 10);
        assert!(!violations.is_empty());
    }

    #[test]
    fn end_date_in_past() {
        let now = Utc::now();
        let mut violations = Violations::new();
        violations.check_metadata("Good title", "", Some(now - Duration::days(1)), now);
        assert_eq!(
            fields(violations.into_result().unwrap_err()),
            vec!["end_date"]
        );
    }

    #[test]
    fn valid_metadata() {
        let now = Utc::now();
        let mut violations = Violations::new();
        violations.check_metadata("Good title", "Some words", Some(now + Duration::days(1)), now);
        assert!(violations.into_result().is_ok());
    }

    #[test]
    fn options_are_checked_individually() {
        let mut violations = Violations::new();
        violations.check_options(
            "options",
            &["Yes".to_string(), " ".to_string(), " yes ".to_string()],
        );
        assert_eq!(
            fields(violations.into_result().unwrap_err()),
            vec!["options[1]", "options[2]"]
        );
    }

    #[test]
    fn only_small_whole_numbers_are_choices() {
        let choice = |text: &str| {
            choice_index(
                &rocket::serde::json::serde_json::from_str(text).unwrap(),
                3,
            )
        };
        assert_eq!(choice("0"), Some(0));
        assert_eq!(choice("2"), Some(2));
        for bad in ["3", "-1", "1.5", "99999999999999999999", "\"1\"", "null", "[1]"] {
            assert_eq!(choice(bad), None, "{bad}");
        }
    }

    #[test]
    fn too_few_options() {
        let mut violations = Violations::new();
        violations.check_options("options", &["Only".to_string()]);
        assert_eq!(fields(violations.into_result().unwrap_err()), vec!["options"]);
    }

    #[test]
    fn too_many_options() {
        let options: Vec<String> = (0..=MAX_OPTIONS).map(|i| format!("Option {i}")).collect();
        let mut violations = Violations::new();
        violations.check_options("options", &options);
        assert_eq!(fields(violations.into_result().unwrap_err()), vec!["options"]);
    }
}
