use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::auth::repo::{Role, User};
use crate::config::JwtConfig;
use crate::state::AppState;

/// Claims carried by a session token: the full identity the gate needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,   // user ID
    pub username: String,
    pub email: String,
    pub role: Role,
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
}

/// Claims carried by a password-reset token: only the user id and expiry.
/// The missing identity claims are what keeps a reset token from passing
/// session verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetClaims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        }
    }
}

/// Holds the signing and verification keys plus both expiry policies.
#[derive(Clone)]
pub struct TokenKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub session_ttl: Duration,
    pub reset_ttl: Duration,
}

impl FromRef<AppState> for TokenKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            ttl_minutes,
            reset_ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            session_ttl: Duration::from_secs((ttl_minutes as u64) * 60),
            reset_ttl: Duration::from_secs((reset_ttl_minutes as u64) * 60),
        }
    }
}

impl TokenKeys {
    fn timestamps(ttl: Duration) -> (usize, usize) {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        (now.unix_timestamp() as usize, exp.unix_timestamp() as usize)
    }

    pub fn sign_session(&self, user: &User) -> anyhow::Result<String> {
        let (iat, exp) = Self::timestamps(self.session_ttl);
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            iat,
            exp,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user.id, "session token signed");
        Ok(token)
    }

    pub fn sign_reset(&self, user_id: Uuid) -> anyhow::Result<String> {
        let (iat, exp) = Self::timestamps(self.reset_ttl);
        let claims = ResetClaims {
            sub: user_id,
            iat,
            exp,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "reset token signed");
        Ok(token)
    }

    /// Verify a session token: signature, expiry, and the full claim shape.
    /// There is no revocation list; any unexpired, well-formed token passes
    /// regardless of later account changes.
    pub fn verify_session(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        debug!(user_id = %data.claims.sub, "session token verified");
        Ok(data.claims)
    }

    /// Verify a reset token: signature and expiry over the `{sub, iat, exp}`
    /// shape.
    pub fn verify_reset(&self, token: &str) -> Result<ResetClaims, TokenError> {
        let data = decode::<ResetClaims>(token, &self.decoding, &Validation::default())?;
        debug!(user_id = %data.claims.sub, "reset token verified");
        Ok(data.claims)
    }
}
