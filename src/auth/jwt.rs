//! # JWT Token Management
//!
//! Access and refresh token issuance and validation.
//!
//! Both token kinds are HS256 JWTs whose subject is the hosted user id. A
//! `token_type` claim keeps a refresh token from being accepted where an
//! access token is expected.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::errors::{AuthError, AuthResult};

/// Which of the two token kinds a JWT is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Issued at timestamp (Unix epoch seconds)
    pub iat: i64,

    /// Expiration timestamp (Unix epoch seconds)
    pub exp: i64,

    /// Audience
    pub aud: String,

    /// Issuer
    pub iss: String,

    pub token_type: TokenType,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for signing
    pub secret: String,

    /// Access token lifetime
    pub access_token_ttl: Duration,

    /// Refresh token lifetime
    pub refresh_token_ttl: Duration,

    /// Issuer identifier
    pub issuer: String,

    /// Audience identifier
    pub audience: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "CHANGE_THIS_SECRET_IN_PRODUCTION".to_string(),
            access_token_ttl: Duration::hours(1),
            refresh_token_ttl: Duration::days(30),
            issuer: "munconnect".to_string(),
            audience: "munconnect".to_string(),
        }
    }
}

/// JWT manager for token generation and validation
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    /// Create a new JWT manager with the given configuration
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    pub fn generate_access_token(&self, user_id: &str) -> AuthResult<String> {
        self.generate(user_id, TokenType::Access, self.config.access_token_ttl)
    }

    pub fn generate_refresh_token(&self, user_id: &str) -> AuthResult<String> {
        self.generate(user_id, TokenType::Refresh, self.config.refresh_token_ttl)
    }

    /// Issue both tokens for a freshly authenticated user
    pub fn issue_pair(&self, user_id: &str) -> AuthResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.generate_access_token(user_id)?,
            refresh_token: self.generate_refresh_token(user_id)?,
            token_type: "bearer".to_string(),
            expires_in: self.config.access_token_ttl.num_seconds(),
        })
    }

    fn generate(&self, user_id: &str, token_type: TokenType, ttl: Duration) -> AuthResult<String> {
        let now = Utc::now();

        let claims = JwtClaims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            aud: self.config.audience.clone(),
            iss: self.config.issuer.clone(),
            token_type,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| AuthError::TokenGenerationFailed)
    }

    /// Validate a token and require it to be of `expected` type
    pub fn validate_token(&self, token: &str, expected: TokenType) -> AuthResult<JwtClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);

        let token_data =
            decode::<JwtClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AuthError::InvalidSignature
                    }
                    _ => AuthError::MalformedToken,
                }
            })?;

        if token_data.claims.token_type != expected {
            return Err(AuthError::WrongTokenType(expected.as_str()));
        }

        Ok(token_data.claims)
    }

    pub fn validate_access(&self, token: &str) -> AuthResult<JwtClaims> {
        self.validate_token(token, TokenType::Access)
    }

    pub fn validate_refresh(&self, token: &str) -> AuthResult<JwtClaims> {
        self.validate_token(token, TokenType::Refresh)
    }
}

/// Tokens returned to the client after register/login
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Pull the token out of an `Authorization: Bearer ...` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
