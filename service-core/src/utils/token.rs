use subtle::ConstantTimeEq;

/// Compare a presented shared token against the expected secret in constant time.
///
/// An empty expected secret never matches.
pub fn tokens_match(expected: &str, presented: &str) -> bool {
    let expected_bytes = expected.as_bytes();
    let presented_bytes = presented.as_bytes();

    if expected_bytes.is_empty() || expected_bytes.len() != presented_bytes.len() {
        return false;
    }

    expected_bytes.ct_eq(presented_bytes).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_tokens() {
        assert!(tokens_match("cb-token-123", "cb-token-123"));
    }

    #[test]
    fn test_mismatched_tokens() {
        assert!(!tokens_match("cb-token-123", "cb-token-124"));
        assert!(!tokens_match("cb-token-123", "cb-token"));
        assert!(!tokens_match("cb-token-123", ""));
    }

    #[test]
    fn test_empty_secret_never_matches() {
        assert!(!tokens_match("", ""));
    }
}
