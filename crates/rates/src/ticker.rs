//! Wire model of the ticker endpoint.
//!
//! The endpoint returns a document shaped like
//! `{"data": [{"symbol": "BTC/EUR", "value": "64123.45"}, ...]}`.
//! Every field is optional on the wire; absence is reported as a typed
//! error rather than defaulting to a zero rate.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::{CurrencyPair, RateError};

/// Top-level ticker document
#[derive(Debug, Clone, Deserialize)]
pub struct TickerResponse {
    /// Quoted pairs, possibly absent or null
    #[serde(default)]
    pub data: Option<Vec<TickerEntry>>,
}

/// A single quoted pair
#[derive(Debug, Clone, Deserialize)]
pub struct TickerEntry {
    /// Pair symbol such as "BTC/EUR"
    #[serde(default)]
    pub symbol: Option<String>,
    /// Quoted value; the venue sends either a numeric string or a number
    #[serde(default)]
    pub value: Option<Value>,
}

/// Pull the rate for `pair` out of a decoded ticker document
pub fn extract_rate(response: &TickerResponse, pair: &CurrencyPair) -> Result<Decimal, RateError> {
    let symbol = pair.symbol();

    let entries = response
        .data
        .as_deref()
        .filter(|entries| !entries.is_empty())
        .ok_or(RateError::MissingData)?;

    let entry = entries
        .iter()
        .find(|entry| entry.symbol.as_deref() == Some(symbol.as_str()))
        .ok_or_else(|| RateError::SymbolNotFound {
            pair: symbol.clone(),
        })?;

    entry
        .value
        .as_ref()
        .and_then(parse_value)
        .ok_or(RateError::NonNumericRate { pair: symbol })
}

fn parse_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        // serde_json renders numbers in their literal decimal form, so
        // going through the string keeps the exact digits
        Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> CurrencyPair {
        CurrencyPair::new("BTC", "EUR")
    }

    fn parse(json: &str) -> TickerResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn extracts_string_valued_rate() {
        let response = parse(
            r#"{"data": [
                {"symbol": "BTC/USD", "value": "69000.10"},
                {"symbol": "BTC/EUR", "value": "64123.45"}
            ]}"#,
        );

        let rate = extract_rate(&response, &pair()).unwrap();
        assert_eq!(rate, "64123.45".parse().unwrap());
    }

    #[test]
    fn extracts_number_valued_rate() {
        let response = parse(r#"{"data": [{"symbol": "BTC/EUR", "value": 64123.45}]}"#);

        let rate = extract_rate(&response, &pair()).unwrap();
        assert_eq!(rate, "64123.45".parse().unwrap());
    }

    #[test]
    fn missing_data_is_an_error_not_zero() {
        for body in [r#"{}"#, r#"{"data": null}"#, r#"{"data": []}"#] {
            let response = parse(body);
            let err = extract_rate(&response, &pair()).unwrap_err();
            assert!(matches!(err, RateError::MissingData), "body {body}");
        }
    }

    #[test]
    fn unquoted_pair_is_reported() {
        let response = parse(r#"{"data": [{"symbol": "BTC/USD", "value": "69000"}]}"#);

        let err = extract_rate(&response, &pair()).unwrap_err();
        match err {
            RateError::SymbolNotFound { pair } => assert_eq!(pair, "BTC/EUR"),
            other => panic!("expected symbol-not-found, got {other:?}"),
        }
    }

    #[test]
    fn entry_without_symbol_is_skipped() {
        let response = parse(
            r#"{"data": [
                {"value": "1"},
                {"symbol": "BTC/EUR", "value": "2"}
            ]}"#,
        );

        let rate = extract_rate(&response, &pair()).unwrap();
        assert_eq!(rate, Decimal::from(2));
    }

    #[test]
    fn non_numeric_values_are_rejected() {
        for value in [r#""not-a-price""#, "true", "null", r#"{"nested": 1}"#] {
            let body = format!(r#"{{"data": [{{"symbol": "BTC/EUR", "value": {value}}}]}}"#);
            let response = parse(&body);
            let err = extract_rate(&response, &pair()).unwrap_err();
            assert!(
                matches!(err, RateError::NonNumericRate { .. }),
                "value {value}"
            );
        }
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let response = parse(
            r#"{"data": [{"symbol": "BTC/EUR", "value": "5", "volume": 12}], "ts": 1700000000}"#,
        );

        let rate = extract_rate(&response, &pair()).unwrap();
        assert_eq!(rate, Decimal::from(5));
    }
}
