/*!
Constant-time comparisons.

Tag checks go through these helpers so that the time taken does not depend
on where two values first differ.
*/

use subtle::ConstantTimeEq;

/// Compare two byte slices for equality in constant time.
///
/// Slices of different lengths compare unequal; only the length itself is
/// revealed through timing.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Compare two byte arrays for equality in constant time.
pub fn constant_time_eq_arrays<const N: usize>(a: &[u8; N], b: &[u8; N]) -> bool {
    a.ct_eq(b).into()
}

/// Compare two field elements in constant time.
pub fn constant_time_eq_u128(a: u128, b: u128) -> bool {
    a.to_be_bytes().ct_eq(&b.to_be_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"tag", b"tag"));
        assert!(!constant_time_eq(b"tag", b"tab"));
        assert!(!constant_time_eq(b"tag", b"tags"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn test_constant_time_eq_arrays() {
        assert!(constant_time_eq_arrays(&[1u8; 32], &[1u8; 32]));
        let mut other = [1u8; 32];
        other[31] = 0;
        assert!(!constant_time_eq_arrays(&[1u8; 32], &other));
    }

    #[test]
    fn test_constant_time_eq_u128() {
        assert!(constant_time_eq_u128(5, 5));
        assert!(!constant_time_eq_u128(5, 1 << 100));
    }
}
