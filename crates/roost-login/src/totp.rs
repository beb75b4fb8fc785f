//! Time-based one-time codes for the MFA challenge.

use crate::error::{LoginError, Result};
use totp_rs::{Algorithm, Secret, TOTP};

/// Generate the current 6-digit TOTP for a base32 seed.
///
/// Derived at submission time so the code is valid for the window in which
/// it is typed.
pub fn totp_now(seed: &str) -> Result<String> {
    let secret = Secret::Encoded(seed.trim().replace(' ', ""))
        .to_bytes()
        .map_err(|e| LoginError::InvalidMfaSeed(format!("{e:?}")))?;

    let totp = TOTP::new_unchecked(Algorithm::SHA1, 6, 1, 30, secret);
    totp.generate_current()
        .map_err(|e| LoginError::InvalidMfaSeed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 6238 SHA-1 secret "12345678901234567890" in base32
    const RFC_SEED: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    #[test]
    fn test_known_answer_at_fixed_time() {
        let secret = Secret::Encoded(RFC_SEED.to_string()).to_bytes().unwrap();
        let totp = TOTP::new_unchecked(Algorithm::SHA1, 6, 1, 30, secret);
        // RFC 6238 vector at T=59 is 94287082 for 8 digits; 6-digit suffix
        assert_eq!(totp.generate(59), "287082");
    }

    #[test]
    fn test_totp_now_shape() {
        let code = totp_now(RFC_SEED).expect("generate code");
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_totp_now_tolerates_spaced_seed() {
        let spaced = "GEZD GNBV GY3T QOJQ GEZD GNBV GY3T QOJQ";
        assert!(totp_now(spaced).is_ok());
    }

    #[test]
    fn test_invalid_seed_is_rejected() {
        assert!(matches!(
            totp_now("not-base32-1!"),
            Err(LoginError::InvalidMfaSeed(_))
        ));
    }
}
