use std::hint::black_box;

/// Compares two byte strings in time independent of where they differ.
///
/// Every byte pair is visited; only the length is allowed to leak.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= black_box(x ^ y);
    }
    black_box(diff) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_slices() {
        assert!(constant_time_eq(b"token-abc", b"token-abc"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn differing_slices() {
        assert!(!constant_time_eq(b"token-abc", b"token-abd"));
        assert!(!constant_time_eq(b"Xoken-abc", b"token-abc"));
    }

    #[test]
    fn differing_lengths() {
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(!constant_time_eq(b"", b"a"));
    }
}
