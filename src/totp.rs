// totp.rs
// One-time codes for sign-in: verify a code against a user's Base32 secret.

use anyhow::Result;
use data_encoding::BASE32_NOPAD;
use rand::RngCore;
use totp_rs::{Algorithm, Secret, TOTP};

pub const ISSUER: &str = "BuildingDesk";
pub const MIN_SECRET_BYTES: usize = 16; // 128 bits
pub const DEFAULT_SECRET_BYTES: usize = 20; // 160 bits

/// Build a TOTP for `email` from its Base32 secret; rejects secrets under 128 bits.
pub fn build_totp(email: &str, base32_secret: &str) -> Result<TOTP> {
    let secret = Secret::Encoded(base32_secret.to_string()).to_bytes()?;
    if secret.len() < MIN_SECRET_BYTES {
        anyhow::bail!(
            "shared secret too short: {} bytes, need >= {}",
            secret.len(),
            MIN_SECRET_BYTES
        );
    }
    let totp = TOTP::new(
        Algorithm::SHA1,
        6,  // digits
        1,  // skew: ±1 step
        30, // period in seconds
        secret,
        Some(ISSUER.to_string()),
        email.to_string(),
    )?;
    Ok(totp)
}

pub fn verify_code(email: &str, base32_secret: &str, code: &str) -> Result<bool> {
    let totp = build_totp(email, base32_secret)?;
    Ok(totp.check_current(code.trim()).unwrap_or(false))
}

/// Random Base32 (NOPAD) secret of at least `MIN_SECRET_BYTES`.
pub fn generate_base32_secret_n(bytes: usize) -> String {
    let n = bytes.max(MIN_SECRET_BYTES);
    let mut buf = vec![0u8; n];
    rand::rng().fill_bytes(&mut buf);
    BASE32_NOPAD.encode(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_code_verifies() {
        let secret = generate_base32_secret_n(DEFAULT_SECRET_BYTES);
        let code = build_totp("admin@example.com", &secret)
            .unwrap()
            .generate_current()
            .unwrap();
        assert!(verify_code("admin@example.com", &secret, &code).unwrap());
        assert!(!verify_code("admin@example.com", &secret, "not-a-code").unwrap());
    }

    #[test]
    fn short_secret_is_rejected() {
        let short = BASE32_NOPAD.encode(&[7u8; 8]);
        assert!(build_totp("a@b.c", &short).is_err());
    }
}
