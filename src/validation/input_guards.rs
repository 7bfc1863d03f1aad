//! Input validation guards for dashboard form fields
//!
//! Each guard checks one field value and returns a [`ValidationError`] whose
//! display text is the message shown next to the field.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// `local@domain.tld` with no whitespace and no extra `@`.
static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern valid")
});

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Field is empty or contains only whitespace
    #[error("{label} is required")]
    Required { label: &'static str },

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("{label} must be a valid date (YYYY-MM-DD)")]
    InvalidDate { label: &'static str },

    /// `later` must fall strictly after `earlier`
    #[error("{later} must be after {earlier}")]
    DateOrder {
        later: &'static str,
        earlier: &'static str,
    },

    #[error("{label} must be greater than 0")]
    NotPositive { label: &'static str },
}

/// Validates that a string is not empty or whitespace-only
///
/// ```
/// use admin_dashboard::validation::validate_required;
///
/// assert!(validate_required("Name", "Ada").is_ok());
/// assert!(validate_required("Name", "   ").is_err());
/// ```
pub fn validate_required<'a>(label: &'static str, value: &'a str) -> ValidationResult<&'a str> {
    if value.trim().is_empty() {
        Err(ValidationError::Required { label })
    } else {
        Ok(value)
    }
}

/// Validates a required email address against `local@domain.tld`
///
/// ```
/// use admin_dashboard::validation::validate_email;
///
/// assert!(validate_email("Email", "a@b.co").is_ok());
/// assert!(validate_email("Email", "not-an-email").is_err());
/// ```
pub fn validate_email<'a>(label: &'static str, value: &'a str) -> ValidationResult<&'a str> {
    validate_required(label, value)?;
    if EMAIL_PATTERN.is_match(value) {
        Ok(value)
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

/// Validates a required ISO date (`YYYY-MM-DD`)
pub fn validate_date(label: &'static str, value: &str) -> ValidationResult<NaiveDate> {
    let value = validate_required(label, value)?.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate { label })
}

/// Validates that `later` is strictly after `earlier`
pub fn validate_date_order(
    earlier_label: &'static str,
    earlier: NaiveDate,
    later_label: &'static str,
    later: NaiveDate,
) -> ValidationResult<()> {
    if later > earlier {
        Ok(())
    } else {
        Err(ValidationError::DateOrder {
            later: later_label,
            earlier: earlier_label,
        })
    }
}

/// Validates that an amount is strictly greater than zero
pub fn validate_positive(label: &'static str, value: f64) -> ValidationResult<f64> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::NotPositive { label })
    }
}
