/// A value that has passed parameter sanitization and may be bound to a query.
///
/// `Verified<T>` is the proof type that sits between a [`Tainted<T>`](crate::Tainted)
/// claim and a bound query parameter. The customizer only copies values into a
/// [`QueryDirective`](crate::QueryDirective) after they have been promoted to
/// `Verified`.
///
/// # Construction Invariants
///
/// `Verified<T>` cannot be constructed by external code. Construction goes
/// through the crate-internal `new_unchecked`, called only by
/// [`Sanitizer`](crate::Sanitizer) implementations after validation succeeds.
///
/// ```compile_fail
/// use datasource_router::Verified;
///
/// // This will not compile - no public constructor:
/// let verified = Verified::new("42".to_string());
/// ```
///
/// # Access
///
/// - [`AsRef::as_ref`]: borrow the verified value
/// - [`into_inner`](Self::into_inner): consume and extract the value
#[derive(Debug, Clone, PartialEq)]
pub struct Verified<T> {
    inner: T,
}

impl<T> Verified<T> {
    /// Creates a `Verified<T>` without performing validation.
    ///
    /// Callers inside the crate must have validated the value first.
    pub(crate) fn new_unchecked(value: T) -> Self {
        Self { inner: value }
    }

    /// Consumes the `Verified<T>` and returns the inner value.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> AsRef<T> for Verified<T> {
    fn as_ref(&self) -> &T {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParamValue;

    #[test]
    fn verified_as_ref_returns_reference() {
        let verified = Verified::new_unchecked(ParamValue::Text("42".to_string()));

        assert_eq!(verified.as_ref(), &ParamValue::Text("42".to_string()));
    }

    #[test]
    fn verified_into_inner_returns_value() {
        let verified = Verified::new_unchecked(ParamValue::Integer(7));

        assert_eq!(verified.into_inner(), ParamValue::Integer(7));
    }

    #[test]
    fn verified_as_ref_does_not_consume() {
        let verified = Verified::new_unchecked(ParamValue::Bool(true));

        let ref1 = verified.as_ref().clone();
        let ref2 = verified.as_ref().clone();
        assert_eq!(ref1, ref2);

        assert_eq!(verified.into_inner(), ParamValue::Bool(true));
    }

    #[test]
    fn verified_prevents_direct_construction() {
        // Outside the crate none of these compile:
        // let v = Verified { inner: 42 }; // ← private field
        // let v = Verified::new(42); // ← no such method
        // let v: Verified<i32> = 42.into(); // ← no From impl
        let _ = Verified::new_unchecked(42);
    }

    mod proptests {
        use crate::{sanitizer::ParamSanitizer, test_utils::arb_valid_text, ParamValue, Sanitizer, Tainted};
        use proptest::prelude::*;

        proptest! {
            /// Property: Valid text survives the Tainted → Sanitizer → Verified flow unchanged
            #[test]
            fn proptest_tainted_to_verified_preserves_valid_text(input in arb_valid_text(256)) {
                let sanitizer = ParamSanitizer::default();
                let tainted = Tainted::new(serde_json::Value::String(input.clone()));

                let verified = sanitizer.sanitize(tainted).expect("valid input should pass");

                prop_assert_eq!(verified.into_inner(), ParamValue::Text(input));
            }

            /// Property: Integers survive sanitization exactly
            #[test]
            fn proptest_integers_survive(value in any::<i64>()) {
                let sanitizer = ParamSanitizer::default();
                let verified = sanitizer
                    .sanitize(Tainted::new(serde_json::json!(value)))
                    .expect("integers are scalars");

                prop_assert_eq!(verified.as_ref(), &ParamValue::Integer(value));
            }
        }
    }
}
