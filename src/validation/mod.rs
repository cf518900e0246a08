use bigdecimal::BigDecimal;
use std::fmt;
use std::str::FromStr;

use crate::domain::Operator;

pub const PHONE_MAX_LEN: usize = 20;
pub const PIN_MIN_LEN: usize = 4;
pub const PIN_MAX_LEN: usize = 6;
pub const MIN_EXCHANGE_AMOUNT: i64 = 500;
// Ledger columns are NUMERIC(10, 2).
pub const MAX_EXCHANGE_AMOUNT: &str = "99999999.99";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

/// Joins field errors into one caller-facing message.
pub fn describe(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.len() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

pub fn validate_operator(field: &'static str, value: &str) -> Result<Operator, ValidationError> {
    let value = sanitize_string(value);
    Operator::from_str(&value).map_err(|_| {
        ValidationError::new(field, "must be one of: orange, wave")
    })
}

/// Phone identifiers are opaque: presence and a sane length, nothing more.
pub fn validate_msisdn(field: &'static str, value: &str) -> ValidationResult {
    let value = sanitize_string(value);
    validate_required(field, &value)?;
    validate_max_len(field, &value, PHONE_MAX_LEN)?;

    Ok(())
}

pub fn validate_amount(amount: &BigDecimal) -> ValidationResult {
    if amount < &BigDecimal::from(MIN_EXCHANGE_AMOUNT) {
        return Err(ValidationError::new(
            "amount",
            format!("must be at least {}", MIN_EXCHANGE_AMOUNT),
        ));
    }

    if !(amount * BigDecimal::from(100)).is_integer() {
        return Err(ValidationError::new(
            "amount",
            "must have at most 2 decimal places",
        ));
    }

    let max = BigDecimal::from_str(MAX_EXCHANGE_AMOUNT).unwrap_or_default();
    if amount > &max {
        return Err(ValidationError::new(
            "amount",
            format!("must be at most {}", MAX_EXCHANGE_AMOUNT),
        ));
    }

    Ok(())
}

pub fn validate_pin(pin: &str) -> ValidationResult {
    if pin.len() < PIN_MIN_LEN || pin.len() > PIN_MAX_LEN {
        return Err(ValidationError::new(
            "pinCode",
            format!("must be {} to {} digits", PIN_MIN_LEN, PIN_MAX_LEN),
        ));
    }

    if !pin.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(ValidationError::new("pinCode", "must contain only digits"));
    }

    Ok(())
}
