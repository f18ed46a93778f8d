//! Access and refresh token issuance.

use std::sync::Arc;

use buddy_common::config::AuthConfig;
use buddy_common::{AppError, AppResult, IdGenerator};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Which half of a token pair a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived token sent with every request.
    Access,
    /// Long-lived token exchanged for new access tokens.
    Refresh,
}

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: String,
    /// Token kind.
    pub token_type: TokenKind,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
    /// Token ID.
    pub jti: String,
}

/// An access/refresh token pair.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    /// Access token.
    pub access: String,
    /// Refresh token.
    pub refresh: String,
}

/// Signs and verifies HS256 tokens.
#[derive(Clone)]
pub struct TokenService {
    secret: Arc<str>,
    access_ttl: i64,
    refresh_ttl: i64,
    id_gen: IdGenerator,
}

impl TokenService {
    /// Create a token service from configuration.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            secret: Arc::from(config.jwt_secret.as_str()),
            access_ttl: config.access_token_ttl_secs,
            refresh_ttl: config.refresh_token_ttl_secs,
            id_gen: IdGenerator::new(),
        }
    }

    fn sign(&self, user_id: &str, kind: TokenKind) -> AppResult<String> {
        let now = chrono::Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };

        let claims = Claims {
            sub: user_id.to_string(),
            token_type: kind,
            iat: now.timestamp(),
            exp: (now + chrono::Duration::seconds(ttl)).timestamp(),
            jti: self.id_gen.generate_token(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("JWT encode failed: {e}")))
    }

    /// Issue a fresh access/refresh pair for a user.
    pub fn issue_pair(&self, user_id: &str) -> AppResult<TokenPair> {
        Ok(TokenPair {
            access: self.sign(user_id, TokenKind::Access)?,
            refresh: self.sign(user_id, TokenKind::Refresh)?,
        })
    }

    /// Issue a new access token.
    pub fn issue_access(&self, user_id: &str) -> AppResult<String> {
        self.sign(user_id, TokenKind::Access)
    }

    /// Verify a token's signature, expiry and kind.
    pub fn verify(&self, token: &str, expected: TokenKind) -> AppResult<Claims> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected token");
            AppError::Unauthorized
        })?;

        if data.claims.token_type != expected {
            return Err(AppError::Unauthorized);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn service(access_ttl: i64) -> TokenService {
        TokenService::new(&AuthConfig {
            jwt_secret: "test-secret".to_string(),
            access_token_ttl_secs: access_ttl,
            refresh_token_ttl_secs: 86_400,
        })
    }

    #[test]
    fn test_issue_and_verify_pair() {
        let tokens = service(300);
        let pair = tokens.issue_pair("user1").unwrap();

        let access = tokens.verify(&pair.access, TokenKind::Access).unwrap();
        assert_eq!(access.sub, "user1");
        assert_eq!(access.exp - access.iat, 300);

        let refresh = tokens.verify(&pair.refresh, TokenKind::Refresh).unwrap();
        assert_eq!(refresh.sub, "user1");
        assert_ne!(access.jti, refresh.jti);
    }

    #[test]
    fn test_kind_mismatch_is_unauthorized() {
        let tokens = service(300);
        let pair = tokens.issue_pair("user1").unwrap();

        assert!(matches!(
            tokens.verify(&pair.refresh, TokenKind::Access),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            tokens.verify(&pair.access, TokenKind::Refresh),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        let tokens = service(-3600);
        let access = tokens.issue_access("user1").unwrap();
        assert!(matches!(
            tokens.verify(&access, TokenKind::Access),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_foreign_signature_is_unauthorized() {
        let ours = service(300);
        let theirs = TokenService::new(&AuthConfig {
            jwt_secret: "other-secret".to_string(),
            access_token_ttl_secs: 300,
            refresh_token_ttl_secs: 300,
        });

        let access = theirs.issue_access("user1").unwrap();
        assert!(ours.verify(&access, TokenKind::Access).is_err());
        assert!(ours.verify("not-a-jwt", TokenKind::Access).is_err());
    }
}
