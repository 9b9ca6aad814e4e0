//! Access token issuance and validation (HS256 JWT).

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tonic::Status;

use crate::model::User;

/// Source of the current time, in Unix seconds.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    /// Moves the clock forward, saturating at `i64::MAX`.
    pub fn advance(&self, by: Duration) {
        let secs = i64::try_from(by.as_secs()).unwrap_or(i64::MAX);
        let _ = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(now.saturating_add(secs))
            });
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Claims carried by every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    /// Username.
    pub sub: String,
    pub role: String,
    /// Issued at (Unix seconds).
    pub iat: i64,
    /// Expiry (Unix seconds).
    pub exp: i64,
}

/// Why a token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("token has expired")]
    Expired,
}

/// Signs and validates access tokens with one shared secret.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_duration: Duration,
    clock: Arc<dyn Clock>,
}

impl JwtManager {
    pub fn new(secret_key: &str, token_duration: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock instead.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret_key.as_bytes()),
            validation,
            token_duration,
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn token_duration(&self) -> Duration {
        self.token_duration
    }

    /// Issues a token for `user`, valid for the configured duration.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the expiry does not fit a Unix timestamp or
    /// signing fails.
    pub fn generate(&self, user: &User) -> Result<String, Status> {
        let iat = self.clock.now();
        let exp = i64::try_from(self.token_duration.as_secs())
            .ok()
            .and_then(|duration| iat.checked_add(duration))
            .ok_or_else(|| Status::internal("token duration is out of range"))?;
        let claims = UserClaims {
            sub: user.username.clone(),
            role: user.role.clone(),
            iat,
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Status::internal(format!("cannot generate access token: {e}")))
    }

    /// Checks the signature and expiry of `token` and returns its claims.
    ///
    /// # Errors
    ///
    /// [`TokenError::Invalid`] for anything malformed or signed with another
    /// key, [`TokenError::Expired`] once the clock is past `exp`.
    pub fn validate(&self, token: &str) -> Result<UserClaims, TokenError> {
        let data = decode::<UserClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;

        if self.clock.now() > data.claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str) -> User {
        User {
            username: "admin1".to_string(),
            hashed_password: String::new(),
            role: role.to_string(),
        }
    }

    fn manager(clock: Arc<ManualClock>) -> JwtManager {
        JwtManager::new("secret", Duration::from_secs(900)).with_clock(clock)
    }

    #[test]
    fn test_generate_then_validate() {
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let jwt = manager(clock);

        let token = jwt.generate(&user("admin")).unwrap();
        let claims = jwt.validate(&token).unwrap();

        assert_eq!(claims.sub, "admin1");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_generate_is_deterministic_for_fixed_clock() {
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let jwt = manager(clock);
        assert_eq!(
            jwt.generate(&user("admin")).unwrap(),
            jwt.generate(&user("admin")).unwrap()
        );
    }

    #[test]
    fn test_valid_until_exp_then_expired() {
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let jwt = manager(Arc::clone(&clock));
        let token = jwt.generate(&user("user")).unwrap();

        clock.advance(Duration::from_secs(900));
        assert!(jwt.validate(&token).is_ok());

        clock.advance(Duration::from_secs(1));
        assert_eq!(jwt.validate(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_huge_duration_is_an_error_not_a_past_expiry() {
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        for secs in [u64::MAX, i64::MAX as u64] {
            let jwt = JwtManager::new("secret", Duration::from_secs(secs))
                .with_clock(Arc::clone(&clock) as _);
            let err = jwt.generate(&user("admin")).unwrap_err();
            assert_eq!(err.code(), tonic::Code::Internal, "{secs}");
        }
    }

    #[test]
    fn test_manual_clock_saturates() {
        let clock = ManualClock::new(i64::MAX - 1);
        clock.advance(Duration::from_secs(u64::MAX));
        assert_eq!(clock.now(), i64::MAX);
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let token = manager(Arc::clone(&clock)).generate(&user("admin")).unwrap();

        let other = JwtManager::new("other-secret", Duration::from_secs(900)).with_clock(clock);
        assert!(matches!(other.validate(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_malformed_tokens_are_invalid() {
        let jwt = JwtManager::new("secret", Duration::from_secs(900));
        for token in ["", "abc", "a.b.c", "Bearer x.y.z"] {
            assert!(
                matches!(jwt.validate(token), Err(TokenError::Invalid(_))),
                "{token:?} should be invalid"
            );
        }
    }

    #[test]
    fn test_tampered_token_is_invalid() {
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let jwt = manager(clock);
        let token = jwt.generate(&user("user")).unwrap();

        let forged = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &UserClaims {
                sub: "admin1".to_string(),
                role: "admin".to_string(),
                iat: 1_700_000_000,
                exp: 1_700_000_900,
            },
            &EncodingKey::from_secret(b"guess"),
        )
        .unwrap();

        // Our header and signature around someone else's payload.
        let parts: Vec<&str> = token.split('.').collect();
        let forged_payload = forged.split('.').nth(1).unwrap();
        let tampered = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert!(matches!(jwt.validate(&tampered), Err(TokenError::Invalid(_))));
    }
}
