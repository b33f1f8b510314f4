//! Push authentication.
//!
//! The producer proves itself with a shared token carried in a request
//! header. Validation happens entirely at this boundary; a rejected push
//! never reaches the relay core.

use subtle::ConstantTimeEq;

/// Header carrying the producer's shared token.
pub const AUTH_HEADER: &str = "x-auth-token";

/// Compare the presented token against the expected one in constant time.
pub fn token_matches(expected: &str, presented: &str) -> bool {
    expected.as_bytes().ct_eq(presented.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_token_is_accepted() {
        assert!(token_matches("secret", "secret"));
    }

    #[test]
    fn wrong_token_is_rejected() {
        assert!(!token_matches("secret", "guess"));
        assert!(!token_matches("secret", "secret-but-longer"));
        assert!(!token_matches("secret", ""));
    }
}
