//! Submission validation and phone normalization.
//!
//! Validation collects every field error before failing; unknown fields in the
//! payload are ignored.
use crate::errors::AppError;
use crate::models::Submission;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Country code prepended to numbers that look domestic.
pub const DEFAULT_COUNTRY_CODE: &str = "55";

/// Numbers with at most this many digits are assumed to lack a country code.
const DOMESTIC_MAX_DIGITS: usize = 11;

pub const ZIP_LENGTH: usize = 8;

// HTML5 / RFC 5322 simplified email regex
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email regex is valid")
});

/// Syntactic email check (`local@domain`).
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Normalize a phone number to `+CC AA NNNNN-NNNN`.
///
/// Non-digits are stripped. Numbers with 11 digits or fewer get the `55`
/// country code prepended. This is best-effort: a foreign number that already
/// carries its country code but has 11 digits or fewer is still prefixed with
/// `55`. Short inputs yield short (possibly empty) blocks instead of failing.
pub fn format_phone_number(raw: &str) -> String {
    let mut digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() <= DOMESTIC_MAX_DIGITS {
        digits.insert_str(0, DEFAULT_COUNTRY_CODE);
    }

    format!(
        "+{} {} {}-{}",
        block(&digits, 0, 2),
        block(&digits, 2, 4),
        block(&digits, 4, 9),
        block(&digits, 9, digits.len()),
    )
}

/// ASCII-only slice clamped to the string bounds.
fn block(digits: &str, start: usize, end: usize) -> &str {
    let start = start.min(digits.len());
    let end = end.clamp(start, digits.len());
    &digits[start..end]
}

/// Validate a parsed request body and build the canonical [`Submission`].
///
/// The returned submission still carries the phone as submitted; the
/// orchestrator normalizes it afterwards.
pub fn validate_submission(body: &Value) -> Result<Submission, AppError> {
    let Some(obj) = body.as_object() else {
        return Err(AppError::ValidationFailed(vec![
            "body must be a JSON object".to_string(),
        ]));
    };

    let mut errors = Vec::new();

    let phone = required_string(obj, "phone", &mut errors);

    let email = required_string(obj, "email", &mut errors);
    if let Some(ref email) = email {
        if !is_valid_email(email) {
            errors.push("email must be a valid email".to_string());
        }
    }

    let full_name = required_string(obj, "fullName", &mut errors);

    let zip = required_string(obj, "zip", &mut errors);
    if let Some(ref zip) = zip {
        if zip.chars().count() != ZIP_LENGTH {
            errors.push(format!("zip must be exactly {} characters", ZIP_LENGTH));
        }
    }

    let energy_consumption = required_number(obj, "energyConsumption", &mut errors);
    if let Some(value) = energy_consumption {
        if value < 0.0 {
            errors.push("energyConsumption must be greater than or equal to 0".to_string());
        }
    }

    let creci = required_string(obj, "creci", &mut errors);

    match (phone, email, full_name, zip, energy_consumption, creci) {
        (Some(phone), Some(email), Some(full_name), Some(zip), Some(energy_consumption), Some(creci))
            if errors.is_empty() =>
        {
            Ok(Submission {
                phone,
                email,
                full_name,
                zip,
                energy_consumption,
                creci,
            })
        }
        _ => Err(AppError::ValidationFailed(errors)),
    }
}

/// Strings are required and non-empty; scalars are stringified.
fn required_string(obj: &Map<String, Value>, field: &str, errors: &mut Vec<String>) -> Option<String> {
    match obj.get(field) {
        None | Some(Value::Null) => {
            errors.push(format!("{} is a required field", field));
            None
        }
        Some(Value::String(s)) if s.is_empty() => {
            errors.push(format!("{} is a required field", field));
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(_) => {
            errors.push(format!("{} must be a string", field));
            None
        }
    }
}

/// Numbers are required; numeric strings are accepted.
fn required_number(obj: &Map<String, Value>, field: &str, errors: &mut Vec<String>) -> Option<f64> {
    let parsed = match obj.get(field) {
        None | Some(Value::Null) => {
            errors.push(format!("{} is a required field", field));
            return None;
        }
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match parsed.filter(|v| v.is_finite()) {
        Some(value) => Some(value),
        None => {
            errors.push(format!("{} must be a number", field));
            None
        }
    }
}
