//! JWT verification for connecting clients
//!
//! Tokens are issued by the external account service and signed with a
//! shared HS256 secret. `issue_token` exists for operational tooling and tests.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use roomcast_core::UserId;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Get the user ID from the subject
    ///
    /// # Errors
    /// Returns `InvalidToken` if the subject is not an integer id
    pub fn user_id(&self) -> Result<UserId, AppError> {
        self.sub.parse().map_err(|_| AppError::InvalidToken)
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// JWT service for encoding and decoding tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry: i64,
}

impl JwtService {
    #[must_use]
    pub fn new(secret: &str, token_expiry: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_expiry,
        }
    }

    /// Mint a token for a user
    pub fn issue_token(&self, user_id: UserId) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.token_expiry)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Failed to encode JWT")))
    }

    /// Decode and validate a JWT token
    ///
    /// # Errors
    /// Returns `TokenExpired` or `InvalidToken`
    pub fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::default();

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::InvalidToken,
            }
        })?;

        Ok(token_data.claims)
    }

    /// Validate a token and return the user it was issued to
    pub fn verify(&self, token: &str) -> Result<UserId, AppError> {
        self.decode_token(token)?.user_id()
    }
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("token_expiry", &self.token_expiry)
            .finish_non_exhaustive()
    }
}
