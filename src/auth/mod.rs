//! # Authentication Module
//!
//! Account sign-up/sign-in through an identity provider, plus the access
//! and refresh JWTs this service issues on top of it.

pub mod crypto;
pub mod errors;
pub mod identity;
pub mod jwt;

pub use crypto::{hash_password, verify_password, PasswordPolicy};
pub use errors::{AuthError, AuthResult};
pub use identity::{HostedUser, HttpIdentityProvider, IdentityProvider, MemoryIdentityProvider};
pub use jwt::{bearer_token, JwtClaims, JwtConfig, JwtManager, TokenPair, TokenType};
