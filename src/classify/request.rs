//! Bundled request classifier.

/// Whether the first three bytes are all zero.
///
/// A placeholder convention for binary protocols. Messages shorter than
/// three bytes never match.
pub fn first_three_zero(message: &[u8]) -> bool {
    matches!(message, [0, 0, 0, ..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_three_zero() {
        assert!(first_three_zero(&[0, 0, 0]));
        assert!(first_three_zero(&[0, 0, 0, 0xFF, 1]));
        assert!(!first_three_zero(&[0, 0, 1]));
        assert!(!first_three_zero(&[1, 0, 0]));
    }

    #[test]
    fn test_short_messages() {
        assert!(!first_three_zero(&[]));
        assert!(!first_three_zero(&[0]));
        assert!(!first_three_zero(&[0, 0]));
    }
}
