//! Bearer-token verification.
//!
//! Customers and staff sign in through the identity service, which issues
//! HS256 tokens carrying a [`Claims`] payload. This server never issues
//! tokens for real callers; [`issue_token`] exists for operator tooling and
//! tests.

use cinebook_core::types::DbId;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Payload of a caller's bearer token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// The caller's user id.
    pub sub: DbId,
    /// `"customer"`, `"staff"` or `"admin"`.
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// How incoming tokens are checked.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared HMAC secret with the identity service.
    pub secret: String,
    /// Clock skew tolerated on `exp`, in seconds.
    pub leeway_secs: u64,
    /// When set, tokens must carry this `iss`.
    pub issuer: Option<String>,
}

const DEFAULT_LEEWAY_SECS: u64 = 30;

/// Lifetime of tokens minted by [`issue_token`].
const ISSUED_TOKEN_TTL_SECS: i64 = 15 * 60;

impl JwtConfig {
    /// Read `JWT_SECRET` (required), `JWT_LEEWAY_SECS` (default 30) and
    /// `JWT_ISSUER` (optional).
    ///
    /// # Panics
    ///
    /// Panics if the secret is missing or empty, or the leeway is not a
    /// number.
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let leeway_secs = match std::env::var("JWT_LEEWAY_SECS") {
            Ok(raw) => raw
                .parse()
                .expect("JWT_LEEWAY_SECS must be a whole number of seconds"),
            Err(_) => DEFAULT_LEEWAY_SECS,
        };

        let issuer = std::env::var("JWT_ISSUER").ok().filter(|s| !s.is_empty());

        Self {
            secret,
            leeway_secs,
            issuer,
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway_secs;
        if let Some(iss) = &self.issuer {
            validation.set_issuer(&[iss]);
        }
        validation
    }
}

/// Check signature, expiry and (if configured) issuer.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &config.validation(),
    )?;
    Ok(data.claims)
}

/// Mint a short-lived token the way the identity service would.
pub fn issue_token(
    user_id: DbId,
    role: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        exp: now + ISSUED_TOKEN_TTL_SECS,
        iat: now,
        iss: config.issuer.clone(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str, issuer: Option<&str>) -> JwtConfig {
        JwtConfig {
            secret: secret.to_string(),
            leeway_secs: 0,
            issuer: issuer.map(str::to_string),
        }
    }

    fn sign(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn issued_token_round_trips_identity() {
        let cfg = config("box-office-secret", None);
        let token = issue_token(42, "staff", &cfg).unwrap();

        let claims = validate_token(&token, &cfg).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, "staff");
        assert!(claims.iss.is_none());
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: 1,
            role: "customer".into(),
            exp: now - 120,
            iat: now - 1_000,
            iss: None,
        };
        let token = sign(&claims, "box-office-secret");

        assert!(validate_token(&token, &config("box-office-secret", None)).is_err());
    }

    #[test]
    fn leeway_accepts_recently_expired_token() {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: 1,
            role: "customer".into(),
            exp: now - 5,
            iat: now - 600,
            iss: None,
        };
        let token = sign(&claims, "box-office-secret");

        let mut cfg = config("box-office-secret", None);
        cfg.leeway_secs = 60;
        assert!(validate_token(&token, &cfg).is_ok());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token(1, "customer", &config("secret-alpha", None)).unwrap();
        assert!(validate_token(&token, &config("secret-bravo", None)).is_err());
    }

    #[test]
    fn issuer_is_enforced_when_configured() {
        let strict = config("box-office-secret", Some("cinebook-identity"));
        let foreign = issue_token(3, "customer", &config("box-office-secret", Some("elsewhere")))
            .unwrap();
        assert!(validate_token(&foreign, &strict).is_err());

        let ours = issue_token(3, "customer", &strict).unwrap();
        assert_eq!(
            validate_token(&ours, &strict).unwrap().iss.as_deref(),
            Some("cinebook-identity")
        );
    }
}
