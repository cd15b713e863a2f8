//! Internal helpers for decimal conversion.
//!
//! Amounts are persisted as exact decimal text and handled in memory as
//! [`Decimal`]. These helpers keep the parsing rules in one place.

use rust_decimal::Decimal;
use serde_json::Value;

use crate::{EngineError, ResultEngine};

/// Parse a decimal stored in the DB and return a labeled error on failure.
pub(crate) fn parse_decimal(value: &str, label: &str) -> ResultEngine<Decimal> {
    value
        .trim()
        .parse::<Decimal>()
        .map_err(|_| EngineError::InvalidAmount(format!("invalid {label}: {value}")))
}

pub(crate) fn parse_optional_decimal(
    value: Option<&str>,
    label: &str,
) -> ResultEngine<Option<Decimal>> {
    value.map(|v| parse_decimal(v, label)).transpose()
}

/// Format a decimal for storage, dropping trailing zeros.
pub(crate) fn decimal_to_db(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Read a decimal from a JSON value given either as a number or as a string.
pub(crate) fn decimal_from_json(value: &Value, label: &str) -> ResultEngine<Decimal> {
    match value {
        Value::String(s) => parse_decimal(s, label),
        Value::Number(n) => parse_decimal(&n.to_string(), label),
        other => Err(EngineError::InvalidAmount(format!(
            "invalid {label}: expected a decimal, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decimals_round_trip_through_storage_text() {
        let value = parse_decimal("865.000", "balance").unwrap();
        assert_eq!(decimal_to_db(value), "865");
        assert_eq!(decimal_to_db(parse_decimal("-0.10", "x").unwrap()), "-0.1");
    }

    #[test]
    fn json_decimals_accept_numbers_and_strings() {
        assert_eq!(
            decimal_from_json(&json!("12.5"), "fee").unwrap(),
            parse_decimal("12.5", "fee").unwrap()
        );
        assert_eq!(
            decimal_from_json(&json!(10), "fee").unwrap(),
            Decimal::from(10)
        );
        assert!(matches!(
            decimal_from_json(&json!(true), "fee"),
            Err(EngineError::InvalidAmount(_))
        ));
    }

    #[test]
    fn invalid_text_is_rejected() {
        assert!(matches!(
            parse_decimal("ten", "amount"),
            Err(EngineError::InvalidAmount(_))
        ));
        assert_eq!(parse_optional_decimal(None, "amount").unwrap(), None);
    }
}
