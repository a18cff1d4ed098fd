use std::fmt;

/// Money is represented as integer cents to avoid floating-point precision issues.
/// For USDT/EUR/USD, 1 unit = 100 cents, so 50.00 = 5000 cents.
pub type Cents = i64;

/// Format cents as a human-readable currency string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.abs();
    let units = abs_cents / 100;
    let remainder = abs_cents % 100;
    format!("{}{}.{:02}", sign, units, remainder)
}

/// Parse a decimal string into cents, rounding half away from zero past two digits.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000, "0.005" -> 1
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let negative = input.starts_with('-');
    let input = input.trim_start_matches('-');

    let parts: Vec<&str> = input.split('.').collect();
    let cents = match parts.len() {
        1 => {
            // No decimal point, treat as whole units
            let units = parse_digits(parts[0])?;
            units.checked_mul(100).ok_or(ParseCentsError::Overflow)?
        }
        2 => {
            if parts[0].is_empty() && parts[1].is_empty() {
                return Err(ParseCentsError::InvalidFormat);
            }
            let units = if parts[0].is_empty() {
                0
            } else {
                parse_digits(parts[0])?
            };

            let decimals = parts[1];
            if !decimals.chars().all(|c| c.is_ascii_digit()) {
                return Err(ParseCentsError::InvalidFormat);
            }
            let mut digits = decimals.bytes().map(|b| (b - b'0') as i64);
            let tens = digits.next().unwrap_or(0);
            let ones = digits.next().unwrap_or(0);
            let round_up = digits.next().is_some_and(|d| d >= 5);

            units
                .checked_mul(100)
                .and_then(|c| c.checked_add(tens * 10 + ones + i64::from(round_up)))
                .ok_or(ParseCentsError::Overflow)?
        }
        _ => return Err(ParseCentsError::InvalidFormat),
    };

    Ok(if negative { -cents } else { cents })
}

fn parse_digits(s: &str) -> Result<i64, ParseCentsError> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseCentsError::InvalidFormat);
    }
    s.parse().map_err(|_| ParseCentsError::Overflow)
}

/// Convert a floating-point amount (as found in JSON written by other tools) to cents.
pub fn cents_from_f64(value: f64) -> Result<Cents, ParseCentsError> {
    if !value.is_finite() {
        return Err(ParseCentsError::InvalidFormat);
    }
    let cents = (value * 100.0).round();
    if cents.abs() > i64::MAX as f64 {
        return Err(ParseCentsError::Overflow);
    }
    Ok(cents as Cents)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
    Overflow,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
            ParseCentsError::Overflow => write!(f, "amount out of range"),
        }
    }
}

impl std::error::Error for ParseCentsError {}

/// Serde adapter for amounts stored inside JSON records.
///
/// Written as a JSON number with two decimals. Read from either a number or a
/// decimal string, since collaborators are not consistent about it.
pub mod amount {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{cents_from_f64, parse_cents, Cents, ParseCentsError};

    pub fn serialize<S: Serializer>(cents: &Cents, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(*cents as f64 / 100.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Cents, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Float(f64),
            Text(String),
        }

        let parsed = match Raw::deserialize(deserializer)? {
            Raw::Int(units) => units.checked_mul(100).ok_or(ParseCentsError::Overflow),
            Raw::Float(value) => cents_from_f64(value),
            Raw::Text(text) => parse_cents(&text),
        };
        parsed.map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(5000), "50.00");
        assert_eq!(format_cents(1234), "12.34");
        assert_eq!(format_cents(100), "1.00");
        assert_eq!(format_cents(1), "0.01");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-5000), "-50.00");
        assert_eq!(format_cents(-1), "-0.01");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("50.00"), Ok(5000));
        assert_eq!(parse_cents("50"), Ok(5000));
        assert_eq!(parse_cents("12.34"), Ok(1234));
        assert_eq!(parse_cents("12.5"), Ok(1250));
        assert_eq!(parse_cents("0.01"), Ok(1));
        assert_eq!(parse_cents(".50"), Ok(50));
        assert_eq!(parse_cents("-50.00"), Ok(-5000));
        assert_eq!(parse_cents("1000."), Ok(100000));
    }

    #[test]
    fn test_parse_cents_rounds_third_digit() {
        assert_eq!(parse_cents("100.994"), Ok(10099));
        assert_eq!(parse_cents("100.995"), Ok(10100));
        assert_eq!(parse_cents("0.005"), Ok(1));
        assert_eq!(parse_cents("-0.005"), Ok(-1));
    }

    #[test]
    fn test_parse_cents_invalid() {
        assert!(parse_cents("abc").is_err());
        assert!(parse_cents("12.34.56").is_err());
        assert!(parse_cents("1e5").is_err());
        assert!(parse_cents(".").is_err());
        assert!(parse_cents("").is_err());
        assert_eq!(
            parse_cents("99999999999999999999"),
            Err(ParseCentsError::Overflow)
        );
    }

    #[test]
    fn test_cents_from_f64() {
        assert_eq!(cents_from_f64(50.0), Ok(5000));
        assert_eq!(cents_from_f64(0.1 + 0.2), Ok(30));
        assert_eq!(cents_from_f64(12.345), Ok(1235));
        assert!(cents_from_f64(f64::NAN).is_err());
    }

    #[test]
    fn test_amount_serde_accepts_numbers_and_strings() {
        #[derive(serde::Deserialize, serde::Serialize)]
        struct Wrapper {
            #[serde(with = "amount")]
            amount: Cents,
        }

        let from_int: Wrapper = serde_json::from_str(r#"{"amount": 50}"#).unwrap();
        assert_eq!(from_int.amount, 5000);
        let from_float: Wrapper = serde_json::from_str(r#"{"amount": 12.5}"#).unwrap();
        assert_eq!(from_float.amount, 1250);
        let from_text: Wrapper = serde_json::from_str(r#"{"amount": "7.25"}"#).unwrap();
        assert_eq!(from_text.amount, 725);
        assert!(serde_json::from_str::<Wrapper>(r#"{"amount": "abc"}"#).is_err());

        let json = serde_json::to_string(&Wrapper { amount: 1250 }).unwrap();
        assert_eq!(json, r#"{"amount":12.5}"#);
    }
}
