use subtle::ConstantTimeEq;

/// Compare two strings without leaking the position of the first mismatch.
///
/// Length differences are still observable, which is acceptable for
/// identifiers.
#[must_use]
pub fn constant_time_eq_str(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
