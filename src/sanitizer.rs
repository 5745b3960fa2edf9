use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Tainted, Verified};

/// A scalar value bound to a named query or procedure parameter.
///
/// This is the only shape a caller-derived value takes once it has been
/// sanitized. Nested arrays and objects are never bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// SQL `NULL`
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// Text value
    Text(String),
}

/// Error returned when sanitization fails.
///
/// The error never echoes the rejected input back; only the constraint that
/// failed is described.
///
/// # Examples
///
/// ```
/// use datasource_router::{SanitizationError, SanitizationErrorKind};
///
/// let error = SanitizationError::new(SanitizationErrorKind::TooLong, "value exceeds 256 bytes");
/// assert_eq!(error.kind(), SanitizationErrorKind::TooLong);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizationError {
    kind: SanitizationErrorKind,
    message: String,
}

impl SanitizationError {
    /// Creates a new sanitization error.
    pub fn new(kind: SanitizationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> SanitizationErrorKind {
        self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SanitizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sanitization failed ({}): {}", self.kind, self.message)
    }
}

impl std::error::Error for SanitizationError {}

/// Kind of sanitization error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizationErrorKind {
    /// Value is an array or object; only scalars can be bound.
    NotScalar,
    /// Value is empty or contains only whitespace.
    Empty,
    /// Value exceeds the maximum allowed length.
    TooLong,
    /// Value contains control or non-printable characters.
    ContainsControlChars,
    /// Numeric value cannot be represented as a bound parameter.
    InvalidNumber,
}

impl fmt::Display for SanitizationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotScalar => write!(f, "not a scalar"),
            Self::Empty => write!(f, "empty input"),
            Self::TooLong => write!(f, "input too long"),
            Self::ContainsControlChars => write!(f, "contains control characters"),
            Self::InvalidNumber => write!(f, "invalid number"),
        }
    }
}

/// Trait for sanitizing tainted values into verified values.
///
/// Implementations MUST:
/// - Validate the input according to their rules
/// - Only call `Verified::new_unchecked` after validation succeeds
/// - Return `Err(SanitizationError)` if validation fails
/// - Not leak the rejected input in errors
pub trait Sanitizer<T> {
    /// The verified type produced on success.
    type Output;

    /// Sanitizes a tainted value, returning a verified value on success.
    ///
    /// # Errors
    ///
    /// Returns `SanitizationError` if the input fails validation.
    fn sanitize(&self, input: Tainted<T>) -> Result<Verified<Self::Output>, SanitizationError>;
}

/// Sanitizer that turns a tainted claim into a bindable [`ParamValue`].
///
/// Rules:
/// - `null`, booleans and numbers map to the matching scalar
/// - Arrays and objects are rejected
/// - Strings must be non-blank, free of control characters and at most
///   `max_len` bytes; they are bound exactly as given (no trimming, so the
///   bound identity always equals the claimed identity)
///
/// # Examples
///
/// ```
/// use datasource_router::{ParamSanitizer, ParamValue, Sanitizer, Tainted};
///
/// let sanitizer = ParamSanitizer::new(64);
///
/// let verified = sanitizer.sanitize(Tainted::new(serde_json::json!("42"))).unwrap();
/// assert_eq!(verified.as_ref(), &ParamValue::Text("42".to_string()));
///
/// // Control characters are rejected
/// assert!(sanitizer.sanitize(Tainted::new(serde_json::json!("42\n--"))).is_err());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ParamSanitizer {
    max_len: usize,
}

impl ParamSanitizer {
    /// Default maximum length of a bound text value, in bytes.
    pub const DEFAULT_MAX_LEN: usize = 256;

    /// Creates a sanitizer with the specified maximum text length.
    ///
    /// # Panics
    ///
    /// Panics if `max_len` is 0.
    pub fn new(max_len: usize) -> Self {
        assert!(max_len > 0, "max_len must be greater than 0");
        Self { max_len }
    }

    /// Returns the maximum text length in bytes.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    fn is_control_char(c: char) -> bool {
        c.is_control() || c == '\u{007F}'
    }

    fn sanitize_text(&self, text: String) -> Result<ParamValue, SanitizationError> {
        if text.chars().any(Self::is_control_char) {
            return Err(SanitizationError::new(
                SanitizationErrorKind::ContainsControlChars,
                "value contains control or non-printable characters",
            ));
        }

        if text.trim().is_empty() {
            return Err(SanitizationError::new(
                SanitizationErrorKind::Empty,
                "value is empty or contains only whitespace",
            ));
        }

        if text.len() > self.max_len {
            return Err(SanitizationError::new(
                SanitizationErrorKind::TooLong,
                format!("value exceeds maximum length of {} bytes", self.max_len),
            ));
        }

        Ok(ParamValue::Text(text))
    }
}

impl Default for ParamSanitizer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_LEN)
    }
}

impl Sanitizer<Value> for ParamSanitizer {
    type Output = ParamValue;

    fn sanitize(&self, input: Tainted<Value>) -> Result<Verified<ParamValue>, SanitizationError> {
        let value = match input.into_inner() {
            Value::Null => ParamValue::Null,
            Value::Bool(b) => ParamValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ParamValue::Integer(i)
                } else if let Some(f) = n.as_f64().filter(|f| f.is_finite()) {
                    ParamValue::Float(f)
                } else {
                    return Err(SanitizationError::new(
                        SanitizationErrorKind::InvalidNumber,
                        "number does not fit a 64-bit parameter",
                    ));
                }
            }
            Value::String(s) => self.sanitize_text(s)?,
            Value::Array(_) | Value::Object(_) => {
                return Err(SanitizationError::new(
                    SanitizationErrorKind::NotScalar,
                    "parameter values must be scalars",
                ));
            }
        };

        Ok(Verified::new_unchecked(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sanitize(value: Value) -> Result<ParamValue, SanitizationError> {
        ParamSanitizer::default()
            .sanitize(Tainted::new(value))
            .map(Verified::into_inner)
    }

    #[test]
    fn sanitization_error_display() {
        let error = SanitizationError::new(SanitizationErrorKind::NotScalar, "arrays are not bound");

        let output = format!("{}", error);
        assert!(output.contains("sanitization failed"));
        assert!(output.contains("not a scalar"));
        assert!(output.contains("arrays are not bound"));
    }

    #[test]
    fn scalars_map_to_param_values() {
        assert_eq!(sanitize(json!(null)).unwrap(), ParamValue::Null);
        assert_eq!(sanitize(json!(true)).unwrap(), ParamValue::Bool(true));
        assert_eq!(sanitize(json!(42)).unwrap(), ParamValue::Integer(42));
        assert_eq!(sanitize(json!(1.5)).unwrap(), ParamValue::Float(1.5));
        assert_eq!(
            sanitize(json!("42")).unwrap(),
            ParamValue::Text("42".to_string())
        );
    }

    #[test]
    fn text_is_bound_verbatim() {
        let value = sanitize(json!("42' OR '1'='1")).unwrap();

        // Quotes are not escaped or stripped: the value is bound, never spliced.
        assert_eq!(value, ParamValue::Text("42' OR '1'='1".to_string()));
    }

    #[test]
    fn rejects_arrays_and_objects() {
        let err = sanitize(json!(["a", "b"])).unwrap_err();
        assert_eq!(err.kind(), SanitizationErrorKind::NotScalar);

        let err = sanitize(json!({"a": 1})).unwrap_err();
        assert_eq!(err.kind(), SanitizationErrorKind::NotScalar);
    }

    #[test]
    fn rejects_blank_text() {
        assert_eq!(
            sanitize(json!("")).unwrap_err().kind(),
            SanitizationErrorKind::Empty
        );
        assert_eq!(
            sanitize(json!("   ")).unwrap_err().kind(),
            SanitizationErrorKind::Empty
        );
    }

    #[test]
    fn rejects_control_characters() {
        for input in ["42\n--", "42\0", "42\r", "4\t2", "42\u{7f}", "\n", " \t "] {
            let err = sanitize(json!(input)).unwrap_err();
            assert_eq!(err.kind(), SanitizationErrorKind::ContainsControlChars);
        }
    }

    #[test]
    fn rejects_too_long_without_leaking_input() {
        let sanitizer = ParamSanitizer::new(10);
        let secret_input = "SECRET_TENANT_TOKEN_12345";

        let err = sanitizer
            .sanitize(Tainted::new(json!(secret_input)))
            .unwrap_err();

        assert_eq!(err.kind(), SanitizationErrorKind::TooLong);
        let message = format!("{}", err);
        assert!(!message.contains(secret_input));
        assert!(message.contains("10"));
    }

    #[test]
    fn accepts_text_at_max_length() {
        let sanitizer = ParamSanitizer::new(10);
        let verified = sanitizer
            .sanitize(Tainted::new(json!("exactly10!")))
            .expect("should succeed");

        assert_eq!(verified.as_ref(), &ParamValue::Text("exactly10!".to_string()));
    }

    #[test]
    fn accepts_unicode() {
        assert_eq!(
            sanitize(json!("Zürich 世界")).unwrap(),
            ParamValue::Text("Zürich 世界".to_string())
        );
    }

    #[test]
    fn large_unsigned_numbers_bind_as_float() {
        assert_eq!(
            sanitize(json!(u64::MAX)).unwrap(),
            ParamValue::Float(u64::MAX as f64)
        );
    }

    #[test]
    fn param_value_serializes_untagged() {
        let values = vec![
            ParamValue::Null,
            ParamValue::Bool(false),
            ParamValue::Integer(3),
            ParamValue::Text("x".to_string()),
        ];

        assert_eq!(
            serde_json::to_value(&values).unwrap(),
            json!([null, false, 3, "x"])
        );
    }

    #[test]
    #[should_panic(expected = "max_len must be greater than 0")]
    fn panics_on_zero_max_len() {
        let _sanitizer = ParamSanitizer::new(0);
    }

    mod proptests {
        use super::*;
        use crate::test_utils::{arb_control_text, arb_valid_text};
        use proptest::prelude::*;

        proptest! {
            /// Property: Text with any control character never becomes a bound value
            #[test]
            fn proptest_control_chars_always_rejected(input in arb_control_text()) {
                let err = sanitize(json!(input)).unwrap_err();

                prop_assert_eq!(err.kind(), SanitizationErrorKind::ContainsControlChars);
            }

            /// Property: Rejection messages never echo the rejected text
            #[test]
            fn proptest_errors_do_not_leak_input(input in "[A-Za-z]{20,40}") {
                let err = ParamSanitizer::new(8)
                    .sanitize(Tainted::new(json!(input.clone())))
                    .unwrap_err();

                prop_assert!(!err.to_string().contains(&input));
            }

            /// Property: Text within the limit is accepted, text beyond it is rejected
            #[test]
            fn proptest_length_limit_is_exact(input in arb_valid_text(64), max_len in 1usize..64) {
                let result = ParamSanitizer::new(max_len).sanitize(Tainted::new(json!(input.clone())));

                if input.len() <= max_len {
                    prop_assert!(result.is_ok());
                } else {
                    prop_assert_eq!(result.unwrap_err().kind(), SanitizationErrorKind::TooLong);
                }
            }
        }
    }
}
