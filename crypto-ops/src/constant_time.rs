//! Constant-time comparisons for secret-dependent data
//!
//! Tag, key and digest comparisons MUST go through these helpers. A plain
//! `==` on byte slices returns at the first differing byte and leaks, through
//! timing, how much of a forged tag was correct.

use subtle::ConstantTimeEq;

/// Constant-time comparison of byte slices
///
/// Returns true if slices are equal, false otherwise.
/// Execution time is independent of the contents; only the lengths
/// (which are public) short-circuit.
///
/// # Example
///
/// ```rust
/// use crypto_ops::constant_time::ct_eq;
///
/// assert!(ct_eq(b"expected_tag", b"expected_tag"));
/// assert!(!ct_eq(b"expected_tag", b"expected_taG"));
/// ```
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.ct_eq(b).into()
}

/// Constant-time MAC tag verification
pub fn verify_tag(expected_tag: &[u8], computed_tag: &[u8]) -> bool {
    ct_eq(expected_tag, computed_tag)
}
