use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::shared::AppError;

/// The authenticated caller identity carried by every request. The core
/// trusts it as-is; ownership and participation checks are not its job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub user_id: String,
    pub username: String,
    pub exp: usize,
    pub iat: usize,
}

/// Configuration for signing and validating session tokens.
#[derive(Clone)]
pub struct TokenConfig {
    secret: String,
    pub expiration_days: i64,
}

impl TokenConfig {
    pub fn new() -> Self {
        let expiration_days = std::env::var("SESSION_EXPIRATION_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(365);

        Self {
            secret: std::env::var("JWT_SECRET")
                .unwrap_or_else(|_| "your-secret-key-change-in-production".to_string()),
            expiration_days,
        }
    }

    /// Creates a signed token for the given user identity.
    #[instrument(skip(self, user_id, username))]
    pub fn create_token(&self, user_id: String, username: String) -> Result<String, AppError> {
        let now = Utc::now();
        let exp = (now + Duration::days(self.expiration_days)).timestamp() as usize;

        debug!(
            expiration_days = self.expiration_days,
            exp_timestamp = exp,
            "Creating session token"
        );

        let claims = UserClaims {
            user_id,
            username,
            exp,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| {
            debug!(error = %e, "Failed to encode session token");
            AppError::JwtError(e.to_string())
        })
    }

    /// Validates a token and returns the caller identity if valid.
    #[instrument(skip(self, token))]
    pub fn validate_token(&self, token: &str) -> Result<UserClaims, AppError> {
        decode::<UserClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| {
            debug!(
                username = %data.claims.username,
                user_id = %data.claims.user_id,
                "Session token validated"
            );
            data.claims
        })
        .map_err(|e| {
            debug!(error = %e, "Failed to decode session token");
            AppError::JwtError(e.to_string())
        })
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self::new()
    }
}
