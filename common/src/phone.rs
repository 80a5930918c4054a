use std::fmt;
use thiserror::Error;

pub const MIN_PHONE_DIGITS: usize = 9;
pub const MAX_PHONE_DIGITS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhoneError {
    #[error("Phone number is required")]
    Empty,
    #[error("Phone number must have 9-15 digits, got {0}")]
    InvalidLength(usize),
}

/// Strips separators from a phone number, keeping a leading `+`.
///
/// `"090-123-4567"` becomes `"0901234567"` and `"+84 90 123 4567"` becomes `"+84901234567"`.
/// A `+` anywhere but the first position is dropped like any other separator.
pub fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    let digits = trimmed.chars().filter(char::is_ascii_digit);

    if trimmed.starts_with('+') {
        std::iter::once('+').chain(digits).collect()
    } else {
        digits.collect()
    }
}

pub fn validate_phone(raw: &str) -> bool {
    PhoneNumber::parse(raw).is_ok()
}

/// A normalized phone number with 9 to 15 digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> Result<Self, PhoneError> {
        let normalized = normalize_phone(raw);
        let digit_count = normalized.trim_start_matches('+').len();

        if digit_count == 0 {
            return Err(PhoneError::Empty);
        }
        if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digit_count) {
            return Err(PhoneError::InvalidLength(digit_count));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
