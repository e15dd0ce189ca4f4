//! JWT service for access and refresh token issuance and validation
//!
//! Access and refresh tokens are HS256-signed with two independent secrets, so
//! a leaked access secret cannot forge refresh tokens and vice versa. Refresh
//! tokens carry an opaque session id (`jti`); the server stores only its
//! SHA-256 hash.

use anyhow::{Result, ensure};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Role;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret for signing access tokens
    pub access_secret: String,
    /// Secret for signing refresh tokens
    pub refresh_secret: String,
    /// Access token expiration time in seconds (default: 15 minutes)
    pub access_token_expiry: u64,
    /// Refresh token expiration time in seconds (default: 24 hours)
    pub refresh_token_expiry: u64,
}

impl JwtConfig {
    /// Minimum accepted secret length, in bytes
    pub const MIN_SECRET_LEN: usize = 32;

    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_ACCESS_SECRET`: Secret for access tokens (at least 32 characters)
    /// - `JWT_REFRESH_SECRET`: Secret for refresh tokens (at least 32 characters, distinct)
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 900)
    /// - `JWT_REFRESH_TOKEN_EXPIRY`: Refresh token expiry in seconds (default: 86400)
    pub fn from_env() -> Result<Self> {
        let access_secret = std::env::var("JWT_ACCESS_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_ACCESS_SECRET environment variable not set"))?;

        let refresh_secret = std::env::var("JWT_REFRESH_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_REFRESH_SECRET environment variable not set"))?;

        let access_token_expiry = std::env::var("JWT_ACCESS_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "900".to_string()) // 15 minutes
            .parse()
            .unwrap_or(900);

        let refresh_token_expiry = std::env::var("JWT_REFRESH_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "86400".to_string()) // 24 hours
            .parse()
            .unwrap_or(86400);

        let config = JwtConfig {
            access_secret,
            refresh_secret,
            access_token_expiry,
            refresh_token_expiry,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check secret length, secret separation and non-zero lifetimes
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.access_secret.len() >= Self::MIN_SECRET_LEN,
            "access token secret too short, must be at least {} characters",
            Self::MIN_SECRET_LEN
        );
        ensure!(
            self.refresh_secret.len() >= Self::MIN_SECRET_LEN,
            "refresh token secret too short, must be at least {} characters",
            Self::MIN_SECRET_LEN
        );
        ensure!(
            self.access_secret != self.refresh_secret,
            "access and refresh token secrets must differ"
        );
        ensure!(
            self.access_token_expiry > 0 && self.refresh_token_expiry > 0,
            "token expiry must be positive"
        );
        Ok(())
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_token_expiry", &self.access_token_expiry)
            .field("refresh_token_expiry", &self.refresh_token_expiry)
            .finish()
    }
}

/// Access token claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Account ID
    pub sub: Uuid,
    /// Account role
    pub role: Role,
    /// Issued at time
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
}

/// Refresh token claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Account ID
    pub sub: Uuid,
    /// Session id, stored server-side only as its hash
    pub jti: String,
    /// Issued at time
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
}

/// Token errors
#[derive(Debug, Error)]
pub enum TokenError {
    /// Bad signature, unexpected algorithm, expired, or malformed
    #[error("invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    /// The signing key could not produce a token
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    access_encoding_key: EncodingKey,
    access_decoding_key: DecodingKey,
    refresh_encoding_key: EncodingKey,
    refresh_decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Result<Self> {
        config.validate()?;

        // Only HS256 is accepted; tokens whose header names another
        // algorithm are rejected before signature verification.
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(JwtService {
            access_encoding_key: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding_key: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding_key: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding_key: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            validation,
            config,
        })
    }

    /// Generate an access token for an account
    pub fn generate_access_token(&self, account_id: Uuid, role: Role) -> Result<String, TokenError> {
        self.generate_access_token_at(account_id, role, Utc::now())
    }

    /// Generate an access token as if issued at `now`
    pub fn generate_access_token_at(
        &self,
        account_id: Uuid,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = AccessClaims {
            sub: account_id,
            role,
            iat: now.timestamp(),
            exp: (now + self.access_token_ttl()).timestamp(),
        };

        encode(&Header::new(ALGORITHM), &claims, &self.access_encoding_key)
            .map_err(TokenError::Signing)
    }

    /// Generate a refresh token carrying the session id `jti`
    pub fn generate_refresh_token(&self, account_id: Uuid, jti: &str) -> Result<String, TokenError> {
        self.generate_refresh_token_at(account_id, jti, Utc::now())
    }

    /// Generate a refresh token as if issued at `now`
    pub fn generate_refresh_token_at(
        &self,
        account_id: Uuid,
        jti: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = RefreshClaims {
            sub: account_id,
            jti: jti.to_string(),
            iat: now.timestamp(),
            exp: (now + self.refresh_token_ttl()).timestamp(),
        };

        encode(&Header::new(ALGORITHM), &claims, &self.refresh_encoding_key)
            .map_err(TokenError::Signing)
    }

    /// Validate an access token and return its claims
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        decode::<AccessClaims>(token, &self.access_decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }

    /// Validate a refresh token and return its claims
    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        decode::<RefreshClaims>(token, &self.refresh_decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }

    /// Get the access token expiry time in seconds
    pub fn access_token_expiry(&self) -> u64 {
        self.config.access_token_expiry
    }

    /// Access token lifetime
    pub fn access_token_ttl(&self) -> Duration {
        Duration::seconds(self.config.access_token_expiry as i64)
    }

    /// Refresh token and refresh session lifetime
    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::seconds(self.config.refresh_token_expiry as i64)
    }
}

/// Generate a fresh random session id
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// One-way hash of a session id, as stored in `refresh_sessions.token_hash`
pub fn hash_session_id(jti: &str) -> String {
    hex::encode(Sha256::digest(jti.as_bytes()))
}
