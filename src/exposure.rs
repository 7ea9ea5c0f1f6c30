//! Shutter-speed token resolution.
//!
//! Cameras report shutter speeds as tokens such as `"30"`, `"2.5"`, `"1/100"`
//! or `"bulb"`. The capture server wants a number of seconds where one can be
//! derived, so tokens are resolved before a capture request is built.
//!
//! Parsing is deliberately narrow: a token is either a plain non-negative
//! decimal or `integer/integer`. Nothing else is evaluated.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Token that selects operator-timed exposures.
pub const BULB: &str = "bulb";

// Patterns are literals; a failure here is a programming error
#[allow(clippy::unwrap_used)]
static FRACTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)\s*/\s*(\d+)$").unwrap());

#[allow(clippy::unwrap_used)]
static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:\d+(?:\.\d*)?|\.\d+)$").unwrap());

/// Exposure sent with a capture request.
#[derive(Debug, Clone, PartialEq)]
pub enum ExposureValue {
    /// Exposure time in seconds.
    Seconds(f64),
    /// A token that could not be interpreted; forwarded verbatim so the
    /// server can accept or reject it.
    Token(String),
    /// Bulb mode with the operator-supplied duration.
    Bulb(String),
}

impl ExposureValue {
    /// Seconds, if the exposure is numeric.
    #[must_use]
    pub fn as_seconds(&self) -> Option<f64> {
        match self {
            Self::Seconds(s) => Some(*s),
            _ => None,
        }
    }

    /// Returns true for bulb exposures.
    #[must_use]
    pub fn is_bulb(&self) -> bool {
        matches!(self, Self::Bulb(_))
    }
}

impl fmt::Display for ExposureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seconds(s) => write!(f, "{s}s"),
            Self::Token(t) => write!(f, "{t}"),
            Self::Bulb(d) => write!(f, "bulb ({d}s)"),
        }
    }
}

// Wire form: numbers stay numbers, everything else is a string.
impl Serialize for ExposureValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Seconds(s) => serializer.serialize_f64(*s),
            Self::Token(t) => serializer.serialize_str(t),
            Self::Bulb(d) => serializer.serialize_str(d),
        }
    }
}

/// Why a shutter-speed token was not numeric.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShutterSpeedError {
    /// Token was empty or whitespace.
    #[error("shutter speed is empty")]
    Empty,
    /// Token is neither a decimal nor `integer/integer`.
    #[error("'{0}' is not a number or integer fraction")]
    Malformed(String),
    /// Fraction with a zero denominator.
    #[error("'{0}' has a zero denominator")]
    ZeroDenominator(String),
}

/// Parse a shutter-speed token into seconds.
///
/// ```
/// use astropi_control::exposure::parse_shutter_speed;
///
/// assert_eq!(parse_shutter_speed("1/100"), Ok(0.01));
/// assert_eq!(parse_shutter_speed("2.5"), Ok(2.5));
/// assert!(parse_shutter_speed("1/0").is_err());
/// assert!(parse_shutter_speed("2**64").is_err());
/// ```
pub fn parse_shutter_speed(token: &str) -> Result<f64, ShutterSpeedError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(ShutterSpeedError::Empty);
    }

    if let Some(caps) = FRACTION.captures(trimmed) {
        let numerator: u64 = caps[1]
            .parse()
            .map_err(|_| ShutterSpeedError::Malformed(trimmed.to_string()))?;
        let denominator: u64 = caps[2]
            .parse()
            .map_err(|_| ShutterSpeedError::Malformed(trimmed.to_string()))?;
        if denominator == 0 {
            return Err(ShutterSpeedError::ZeroDenominator(trimmed.to_string()));
        }
        return Ok(numerator as f64 / denominator as f64);
    }

    if DECIMAL.is_match(trimmed) {
        // A long enough digit run parses to infinity, which has no JSON form
        return trimmed
            .parse::<f64>()
            .ok()
            .filter(|seconds| seconds.is_finite())
            .ok_or_else(|| ShutterSpeedError::Malformed(trimmed.to_string()));
    }

    Err(ShutterSpeedError::Malformed(trimmed.to_string()))
}

/// Turns a selected shutter-speed token into an [`ExposureValue`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ExposureResolver;

impl ExposureResolver {
    /// Resolve `selected_token`, using `bulb_duration` when the token is bulb.
    ///
    /// Never fails: a token that does not parse is returned unchanged as
    /// [`ExposureValue::Token`].
    pub fn resolve(selected_token: &str, bulb_duration: &str) -> ExposureValue {
        if selected_token.trim().eq_ignore_ascii_case(BULB) {
            return ExposureValue::Bulb(bulb_duration.to_string());
        }

        match parse_shutter_speed(selected_token) {
            Ok(seconds) => ExposureValue::Seconds(seconds),
            Err(e) => {
                tracing::debug!(token = selected_token, reason = %e, "Forwarding shutter token unparsed");
                ExposureValue::Token(selected_token.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_fractions() {
        assert_eq!(
            ExposureResolver::resolve("1/100", ""),
            ExposureValue::Seconds(0.01)
        );
        assert_eq!(
            ExposureResolver::resolve("1/4000", ""),
            ExposureValue::Seconds(0.00025)
        );
        assert_eq!(
            ExposureResolver::resolve(" 1 / 2 ", ""),
            ExposureValue::Seconds(0.5)
        );
    }

    #[test]
    fn resolves_plain_numbers() {
        assert_eq!(ExposureResolver::resolve("30", ""), ExposureValue::Seconds(30.0));
        assert_eq!(ExposureResolver::resolve("2.5", ""), ExposureValue::Seconds(2.5));
        assert_eq!(ExposureResolver::resolve(".5", ""), ExposureValue::Seconds(0.5));
        assert_eq!(ExposureResolver::resolve("0", ""), ExposureValue::Seconds(0.0));
    }

    #[test]
    fn bulb_is_case_insensitive() {
        for token in ["bulb", "Bulb", "BULB", " bulb "] {
            assert_eq!(
                ExposureResolver::resolve(token, "120"),
                ExposureValue::Bulb("120".to_string())
            );
        }
    }

    #[test]
    fn bulb_duration_is_not_validated() {
        assert_eq!(
            ExposureResolver::resolve("bulb", "two minutes"),
            ExposureValue::Bulb("two minutes".to_string())
        );
    }

    #[test]
    fn unparseable_tokens_pass_through() {
        for token in ["auto", "1/0", "1/2/3", "-5", "inf", "NaN", "1e3", "2**64", "30\"", ""] {
            assert_eq!(
                ExposureResolver::resolve(token, "10"),
                ExposureValue::Token(token.to_string()),
                "token {token:?}"
            );
        }
    }

    #[test]
    fn parser_reports_reason() {
        assert_eq!(parse_shutter_speed("  "), Err(ShutterSpeedError::Empty));
        assert_eq!(
            parse_shutter_speed("1/0"),
            Err(ShutterSpeedError::ZeroDenominator("1/0".to_string()))
        );
        assert_eq!(
            parse_shutter_speed("__import__('os')"),
            Err(ShutterSpeedError::Malformed("__import__('os')".to_string()))
        );
        // numerator overflows u64
        assert!(matches!(
            parse_shutter_speed("99999999999999999999999/1"),
            Err(ShutterSpeedError::Malformed(_))
        ));
    }

    #[test]
    fn overlong_decimal_passes_through() {
        let token = "9".repeat(400);
        assert!(matches!(
            parse_shutter_speed(&token),
            Err(ShutterSpeedError::Malformed(_))
        ));
        let value = ExposureResolver::resolve(&token, "");
        assert_eq!(value, ExposureValue::Token(token.clone()));
        assert_eq!(serde_json::to_value(&value).unwrap(), serde_json::json!(token));
    }

    #[test]
    fn serializes_numbers_and_strings() {
        assert_eq!(
            serde_json::to_value(ExposureValue::Seconds(0.01)).unwrap(),
            serde_json::json!(0.01)
        );
        assert_eq!(
            serde_json::to_value(ExposureValue::Bulb("90".into())).unwrap(),
            serde_json::json!("90")
        );
        assert_eq!(
            serde_json::to_value(ExposureValue::Token("auto".into())).unwrap(),
            serde_json::json!("auto")
        );
    }
}
