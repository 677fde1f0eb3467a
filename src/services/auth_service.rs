//! Session token issuing and verification.
//!
//! The identity provider is external; this service only resolves a bearer
//! token to a stable uploader id plus a coarse permission level.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use utoipa::ToSchema;

use crate::error::Result;

/// Coarse permission ladder. Ordering matters: checks are `>=`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Registered but not email-verified; may browse only.
    Unverified,
    /// May upload files and post.
    Verified,
    /// May review submissions.
    Moderator,
    /// May do anything, including DMCA takedowns.
    Admin,
}

/// JWT claims for a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Stable uploader identity
    pub sub: String,
    pub permission: Permission,
    pub exp: i64,
}

/// Issues and verifies session tokens.
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
        }
    }

    /// Issue a session token for a user.
    pub fn issue_token(
        &self,
        user_id: &str,
        permission: Permission,
        ttl: Duration,
    ) -> Result<String> {
        let claims = Claims {
            sub: user_id.to_string(),
            permission,
            exp: (Utc::now() + ttl).timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Verify a session token and return its claims.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        // No expiry leeway; tokens are minted with generous TTLs instead
        let mut validation = Validation::default();
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }
}
