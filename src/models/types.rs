use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Raised when a stored column or submitted form value cannot be interpreted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: '{value}'")]
pub struct InvalidValue {
    pub kind: &'static str,
    pub value: String,
}

impl InvalidValue {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    M,
    F,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::M => "M",
            Gender::F => "F",
            Gender::Other => "Other",
        }
    }

    pub fn parse(value: &str) -> Result<Self, InvalidValue> {
        match value.trim() {
            "M" | "m" => Ok(Gender::M),
            "F" | "f" => Ok(Gender::F),
            "Other" | "other" => Ok(Gender::Other),
            other => Err(InvalidValue::new("gender", other)),
        }
    }
}

impl TryFrom<String> for Gender {
    type Error = InvalidValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn parse_number<T: std::str::FromStr>(
    kind: &'static str,
    raw: &str,
) -> Result<T, InvalidValue> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| InvalidValue::new(kind, raw))
}

/// Blank input clears an optional reference
pub(crate) fn parse_optional_id(kind: &'static str, raw: &str) -> Result<Option<i32>, InvalidValue> {
    if raw.trim().is_empty() {
        Ok(None)
    } else {
        parse_number(kind, raw).map(Some)
    }
}

pub(crate) fn parse_text(kind: &'static str, raw: &str) -> Result<String, InvalidValue> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(InvalidValue::new(kind, raw))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Body mass index from centimetres and kilograms, zero when height is unknown
pub fn bmi(height_cm: f64, weight_kg: f64) -> f64 {
    if height_cm > 0.0 {
        (weight_kg * 10000.0) / (height_cm * height_cm)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_parse() {
        assert_eq!(Gender::parse("M").unwrap(), Gender::M);
        assert_eq!(Gender::parse(" f ").unwrap(), Gender::F);
        assert_eq!(Gender::parse("Other").unwrap(), Gender::Other);
        assert_eq!(
            Gender::parse("X").unwrap_err(),
            InvalidValue::new("gender", "X")
        );
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_number::<i64>("fee", " 1500 ").unwrap(), 1500);
        assert!(parse_number::<i64>("fee", "abc").is_err());
        assert_eq!(parse_optional_id("trainer", "").unwrap(), None);
        assert_eq!(parse_optional_id("trainer", "3").unwrap(), Some(3));
        assert_eq!(parse_text("name", "  Ravi ").unwrap(), "Ravi");
        assert!(parse_text("name", "   ").is_err());
    }

    #[test]
    fn test_bmi() {
        assert!((bmi(180.0, 81.0) - 25.0).abs() < 1e-9);
        assert_eq!(bmi(0.0, 70.0), 0.0);
        assert_eq!(bmi(-5.0, 70.0), 0.0);
    }
}
