//! Stateless confirmation codes
//!
//! A code is `<base36 timestamp>-<hex HMAC-SHA256>`. The MAC covers the
//! user's id, username, email, auth state, last login and the timestamp, so
//! confirming the user (which changes auth state and last login) invalidates
//! every code issued before it.

use crate::db::models::{AuthState, User};
use crate::errors::{AppError, Result};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Issues and checks confirmation codes
pub struct ConfirmationCodes {
    secret: Vec<u8>,
    ttl_secs: i64,
}

impl ConfirmationCodes {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl_secs: ttl_secs as i64,
        }
    }

    /// Generate a code for the user's current state
    pub fn issue(&self, user: &User) -> Result<String> {
        self.issue_at(user, Utc::now().timestamp())
    }

    /// Check a code against the user's current state
    pub fn verify(&self, user: &User, code: &str) -> bool {
        self.verify_at(user, code, Utc::now().timestamp())
    }

    fn issue_at(&self, user: &User, timestamp: i64) -> Result<String> {
        let tag = self.mac(user, timestamp)?.finalize().into_bytes();
        Ok(format!("{}-{}", to_base36(timestamp as u64), hex::encode(tag)))
    }

    fn verify_at(&self, user: &User, code: &str, now: i64) -> bool {
        if user.auth_state != AuthState::Pending {
            return false;
        }

        let Some((ts, tag)) = code.split_once('-') else {
            return false;
        };
        let Ok(timestamp) = u64::from_str_radix(ts, 36) else {
            return false;
        };
        let Ok(tag) = hex::decode(tag) else {
            return false;
        };
        let timestamp = timestamp as i64;

        if timestamp > now || now - timestamp > self.ttl_secs {
            return false;
        }

        match self.mac(user, timestamp) {
            Ok(mac) => mac.verify_slice(&tag).is_ok(),
            Err(_) => false,
        }
    }

    fn mac(&self, user: &User, timestamp: i64) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|e| AppError::Internal {
            message: format!("Invalid confirmation key: {}", e),
        })?;

        let last_login = user
            .last_login
            .map(|t| t.timestamp_micros().to_string())
            .unwrap_or_default();

        for part in [
            user.id.to_string().as_str(),
            user.username.as_str(),
            user.email.as_str(),
            user.auth_state.as_str(),
            last_login.as_str(),
            timestamp.to_string().as_str(),
        ] {
            mac.update(part.as_bytes());
            mac.update(b"\x00");
        }
        Ok(mac)
    }
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tests::sample_user;

    const TTL: u64 = 3600;

    fn codes() -> ConfirmationCodes {
        ConfirmationCodes::new("confirmation-secret", TTL)
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(u64::from_str_radix(&to_base36(1_700_000_000), 36).unwrap(), 1_700_000_000);
    }

    #[test]
    fn test_issued_code_verifies() {
        let user = sample_user();
        let code = codes().issue(&user).unwrap();
        assert!(codes().verify(&user, &code));
    }

    #[test]
    fn test_code_bound_to_user() {
        let user = sample_user();
        let code = codes().issue(&user).unwrap();

        let mut other = user.clone();
        other.email = "someone@example.com".to_string();
        assert!(!codes().verify(&other, &code));

        let stranger = ConfirmationCodes::new("another-secret", TTL);
        assert!(!stranger.verify(&user, &code));
    }

    #[test]
    fn test_confirmation_invalidates_code() {
        let user = sample_user();
        let code = codes().issue(&user).unwrap();

        let mut confirmed = user.clone();
        confirmed.auth_state = AuthState::Confirmed;
        confirmed.last_login = Some(Utc::now());
        assert!(!codes().verify(&confirmed, &code));

        // Back to pending with a new last_login: old code still dead
        confirmed.auth_state = AuthState::Pending;
        assert!(!codes().verify(&confirmed, &code));
    }

    #[test]
    fn test_code_expires() {
        let user = sample_user();
        let issued = 1_700_000_000;
        let code = codes().issue_at(&user, issued).unwrap();

        assert!(codes().verify_at(&user, &code, issued + TTL as i64));
        assert!(!codes().verify_at(&user, &code, issued + TTL as i64 + 1));
        // Codes from the future are refused
        assert!(!codes().verify_at(&user, &code, issued - 10));
    }

    #[test]
    fn test_malformed_codes() {
        let user = sample_user();
        for code in ["", "nodash", "zz-nothex", "-abcdef", "12345-"] {
            assert!(!codes().verify(&user, code), "{:?}", code);
        }
    }
}
