use rand::RngCore;
use rand::rngs::OsRng;

/// Access tokens are 32 random bytes, hex encoded.
pub const TOKEN_BYTES: usize = 32;

pub fn generate_access_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Cheap shape check before the store is consulted.
pub fn is_plausible_token(token: &str) -> bool {
    token.len() == TOKEN_BYTES * 2 && token.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_64_hex_chars_and_unique() {
        let a = generate_access_token();
        let b = generate_access_token();
        assert_eq!(a.len(), 64);
        assert!(is_plausible_token(&a));
        assert_ne!(a, b, "two generated tokens should never collide");
    }

    #[test]
    fn plausibility_rejects_wrong_shapes() {
        assert!(!is_plausible_token(""));
        assert!(!is_plausible_token("abc123"));
        assert!(!is_plausible_token(&"g".repeat(64)), "non-hex characters rejected");
        assert!(is_plausible_token(&"A1".repeat(32)), "uppercase hex accepted");
    }
}
