use std::fmt;

/// A wrapper for caller-supplied data that must be sanitized before it is bound
/// to a query parameter.
///
/// Every value read out of a [`UserContext`](crate::UserContext) for parameter
/// binding (the user id, identity-provider claims) and the dashboard id sent by
/// the client arrive as `Tainted<T>`. The only way to get at the inner value is
/// through a [`Sanitizer`](crate::Sanitizer), which yields a
/// [`Verified<T>`](crate::Verified).
///
/// # Security Properties
///
/// - Does NOT implement `Deref` or any implicit conversion traits
/// - Inner value is inaccessible outside the crate
/// - Prevents caller data from being spliced into SQL text
///
/// # Examples
///
/// ```
/// use datasource_router::Tainted;
///
/// let claim = Tainted::new(serde_json::json!("42 OR 1=1"));
///
/// // Debug output shows it's tainted
/// assert!(format!("{:?}", claim).starts_with("Tainted"));
///
/// // But the value cannot be used directly:
/// // let sql = format!("SELECT * FROM orders WHERE customer_id = {}", claim); // Won't compile!
/// ```
// BREAKING CHANGE WARNING: Do NOT remove Clone - the same claim may be bound by several params.
#[derive(Clone)]
pub struct Tainted<T> {
    // BREAKING CHANGE WARNING: This field MUST remain private.
    // Making it public lets claim values skip sanitization on their way into a query (CWE-89).
    inner: T,
}

impl<T> Tainted<T> {
    /// Wraps an untrusted value in `Tainted`.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Extracts the inner value for sanitization.
    ///
    /// Only sanitizer implementations inside this crate may call this, and only
    /// to validate the value before wrapping it in `Verified<T>`.
    ///
    /// BREAKING CHANGE WARNING: Changing visibility to `pub` creates a CRITICAL SECURITY BYPASS
    /// (CWE-74, CWE-89).
    pub(crate) fn into_inner(self) -> T {
        self.inner
    }
}

// BREAKING CHANGE WARNING: Do NOT add Deref, AsRef, Borrow, From<T>, Into<T>, or Display.
// Any of these would let a claim value be formatted straight into query text.

impl<T: fmt::Debug> fmt::Debug for Tainted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tainted")
            .field("inner", &self.inner)
            .finish()
    }
}
