//! One-time secrets mailed to users.

use rand::rngs::OsRng;
use rand::{Rng, RngCore};

/// Six-digit numeric email verification code.
pub fn verification_code() -> String {
    OsRng.gen_range(100_000u32..1_000_000).to_string()
}

/// 16 random bytes, hex-encoded.
pub fn reset_token() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_six_digits() {
        for _ in 0..100 {
            let c = verification_code();
            assert_eq!(c.len(), 6);
            assert!(c.chars().all(|ch| ch.is_ascii_digit()));
        }
    }

    #[test]
    fn reset_token_is_32_hex_chars() {
        let t = reset_token();
        assert_eq!(t.len(), 32);
        assert!(t.chars().all(|ch| ch.is_ascii_hexdigit()));
        assert_ne!(t, reset_token());
    }
}
