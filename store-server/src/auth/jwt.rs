//! JWT token service
//!
//! Issues and validates the access/refresh token pair.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use shared::models::{TokenPair, User};
use thiserror::Error;

pub const ISSUER: &str = "anthony-store";
pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_minutes: i64,
    pub refresh_days: i64,
    pub issuer: String,
}

impl JwtConfig {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            access_minutes: config.jwt_access_minutes,
            refresh_days: config.jwt_refresh_days,
            issuer: ISSUER.to_string(),
        }
    }
}

/// Claims stored in the token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub email: String,
    pub is_staff: bool,
    /// `access` or `refresh`
    pub token_type: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Wrong token type: expected {expected}")]
    WrongTokenType { expected: &'static str },

    #[error("Token generation failed: {0}")]
    GenerationFailed(String),
}

/// JWT token service
#[derive(Clone)]
pub struct JwtService {
    pub config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("issuer", &self.config.issuer)
            .field("access_minutes", &self.config.access_minutes)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    pub fn with_config(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    fn generate(&self, user: &User, token_type: &str, ttl: Duration) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            is_staff: user.is_staff,
            token_type: token_type.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::GenerationFailed(e.to_string()))
    }

    /// Issue an access + refresh token pair for the user
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, JwtError> {
        let access_ttl = Duration::minutes(self.config.access_minutes);
        Ok(TokenPair {
            access_token: self.generate(user, TOKEN_TYPE_ACCESS, access_ttl)?,
            refresh_token: self.generate(
                user,
                TOKEN_TYPE_REFRESH,
                Duration::days(self.config.refresh_days),
            )?,
            token_type: "Bearer".to_string(),
            expires_in: access_ttl.num_seconds(),
        })
    }

    /// Validate signature, expiry and issuer
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);
        validation.leeway = 0;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::InvalidToken(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }

    /// Validate a token and require the given `token_type`
    pub fn validate_kind(&self, token: &str, expected: &'static str) -> Result<Claims, JwtError> {
        let claims = self.validate_token(token)?;
        if claims.token_type != expected {
            return Err(JwtError::WrongTokenType { expected });
        }
        Ok(claims)
    }

    /// Extract the token from an `Authorization` header value
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Current user context (parsed from JWT claims)
///
/// Inserted into request extensions by [`super::require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
    pub is_staff: bool,
}

impl TryFrom<Claims> for CurrentUser {
    type Error = JwtError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let id = claims
            .sub
            .parse()
            .map_err(|_| JwtError::InvalidToken(format!("invalid subject: {}", claims.sub)))?;
        Ok(Self {
            id,
            email: claims.email,
            is_staff: claims.is_staff,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::with_config(JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hs256".into(),
            access_minutes: 15,
            refresh_days: 7,
            issuer: ISSUER.into(),
        })
    }

    fn user(is_staff: bool) -> User {
        User {
            id: 42,
            email: "jane@example.com".into(),
            is_staff,
            is_active: true,
            created_at: 0,
            last_login_at: None,
        }
    }

    #[test]
    fn test_issue_and_validate_pair() {
        let svc = service();
        let pair = svc.issue_pair(&user(true)).unwrap();
        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 15 * 60);

        let claims = svc.validate_kind(&pair.access_token, TOKEN_TYPE_ACCESS).unwrap();
        assert_eq!(claims.sub, "42");
        assert!(claims.is_staff);
        assert_eq!(claims.iss, ISSUER);

        let current = CurrentUser::try_from(claims).unwrap();
        assert_eq!(current.id, 42);
    }

    #[test]
    fn test_access_token_is_not_a_refresh_token() {
        let svc = service();
        let pair = svc.issue_pair(&user(false)).unwrap();
        assert!(matches!(
            svc.validate_kind(&pair.access_token, TOKEN_TYPE_REFRESH),
            Err(JwtError::WrongTokenType { .. })
        ));
        assert!(svc.validate_kind(&pair.refresh_token, TOKEN_TYPE_REFRESH).is_ok());
    }

    #[test]
    fn test_expired_token() {
        let svc = JwtService::with_config(JwtConfig {
            access_minutes: -5,
            ..service().config
        });
        let pair = svc.issue_pair(&user(false)).unwrap();
        assert!(matches!(
            svc.validate_token(&pair.access_token),
            Err(JwtError::ExpiredToken)
        ));
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let pair = service().issue_pair(&user(false)).unwrap();
        let other = JwtService::with_config(JwtConfig {
            secret: "another-secret-that-is-long-enough-too".into(),
            ..service().config
        });
        assert!(other.validate_token(&pair.access_token).is_err());
    }

    #[test]
    fn test_extract_from_header() {
        assert_eq!(JwtService::extract_from_header("Bearer abc"), Some("abc"));
        assert_eq!(JwtService::extract_from_header("Basic abc"), None);
        assert_eq!(JwtService::extract_from_header("Bearer "), None);
    }
}
