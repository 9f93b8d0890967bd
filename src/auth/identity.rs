//! # Identity Providers
//!
//! Email/password accounts live with the hosted backend's auth service. The
//! in-process provider mirrors its behavior for tests and offline runs.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use super::crypto::{hash_password, verify_password, PasswordPolicy};
use super::errors::{AuthError, AuthResult};
use crate::rest_api::client::HostedCredentials;

/// Account as the identity provider reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Boxed future returned by identity providers
pub type IdentityFuture<'a, T> = Pin<Box<dyn Future<Output = AuthResult<T>> + Send + 'a>>;

pub trait IdentityProvider: Send + Sync {
    /// Create an account
    fn sign_up<'a>(&'a self, email: &'a str, password: &'a str) -> IdentityFuture<'a, HostedUser>;

    /// Check credentials
    fn sign_in<'a>(&'a self, email: &'a str, password: &'a str) -> IdentityFuture<'a, HostedUser>;

    /// Look up an account by id
    fn get_user<'a>(&'a self, id: &'a str) -> IdentityFuture<'a, Option<HostedUser>>;
}

// ==================
// Hosted auth over HTTP
// ==================

/// Calls the hosted `/auth/v1` endpoints
#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    client: Client,
    credentials: HostedCredentials,
}

impl HttpIdentityProvider {
    pub fn new(client: Client, credentials: HostedCredentials) -> Self {
        Self {
            client,
            credentials,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.credentials.base_url, path)
    }

    async fn post(&self, path: &str, body: Value) -> AuthResult<(StatusCode, Value)> {
        let headers = self
            .credentials
            .auth_headers()
            .map_err(|e| AuthError::Provider(e.status.unwrap_or(401), e.message))?;

        let response = self
            .client
            .post(self.url(path))
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Provider(502, e.to_string()))?;

        read_body(response).await
    }

    async fn signup(&self, email: &str, password: &str) -> AuthResult<HostedUser> {
        let (status, body) = self
            .post("signup", json!({ "email": email, "password": password }))
            .await?;

        if !status.is_success() {
            let message = error_message(&body);
            debug!(status = status.as_u16(), %message, "hosted sign-up rejected");
            return Err(if message.contains("already registered") {
                AuthError::EmailAlreadyExists
            } else if message.contains("Password should be") {
                AuthError::WeakPassword(message)
            } else {
                AuthError::Provider(status.as_u16(), message)
            });
        }

        user_from_body(&body)
    }

    async fn signin(&self, email: &str, password: &str) -> AuthResult<HostedUser> {
        let (status, body) = self
            .post(
                "token?grant_type=password",
                json!({ "email": email, "password": password }),
            )
            .await?;

        match status {
            s if s.is_success() => user_from_body(&body),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Err(AuthError::InvalidCredentials),
            s => Err(AuthError::Provider(s.as_u16(), error_message(&body))),
        }
    }

    async fn lookup(&self, id: &str) -> AuthResult<Option<HostedUser>> {
        let headers = self
            .credentials
            .auth_headers()
            .map_err(|e| AuthError::Provider(e.status.unwrap_or(401), e.message))?;

        let response = self
            .client
            .get(self.url(&format!("admin/users/{}", id)))
            .headers(headers)
            .send()
            .await
            .map_err(|e| AuthError::Provider(502, e.to_string()))?;

        let (status, body) = read_body(response).await?;
        match status {
            s if s.is_success() => user_from_body(&body).map(Some),
            StatusCode::NOT_FOUND => Ok(None),
            s => Err(AuthError::Provider(s.as_u16(), error_message(&body))),
        }
    }
}

impl IdentityProvider for HttpIdentityProvider {
    fn sign_up<'a>(&'a self, email: &'a str, password: &'a str) -> IdentityFuture<'a, HostedUser> {
        Box::pin(self.signup(email, password))
    }

    fn sign_in<'a>(&'a self, email: &'a str, password: &'a str) -> IdentityFuture<'a, HostedUser> {
        Box::pin(self.signin(email, password))
    }

    fn get_user<'a>(&'a self, id: &'a str) -> IdentityFuture<'a, Option<HostedUser>> {
        Box::pin(self.lookup(id))
    }
}

async fn read_body(response: reqwest::Response) -> AuthResult<(StatusCode, Value)> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| AuthError::Provider(502, e.to_string()))?;
    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
    Ok((status, body))
}

/// Sign-up returns the user at the top level; token grants nest it under `user`
fn user_from_body(body: &Value) -> AuthResult<HostedUser> {
    let user = body.get("user").unwrap_or(body);
    serde_json::from_value(user.clone())
        .map_err(|e| AuthError::Provider(502, format!("Unexpected identity payload: {}", e)))
}

fn error_message(body: &Value) -> String {
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|k| body.get(*k).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

// ==================
// In-process provider
// ==================

struct StoredAccount {
    user: HostedUser,
    password_hash: String,
}

/// Accounts kept in memory with Argon2 password hashes
#[derive(Default)]
pub struct MemoryIdentityProvider {
    accounts: RwLock<HashMap<String, StoredAccount>>,
    policy: PasswordPolicy,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, email: &str, password: &str) -> AuthResult<HostedUser> {
        self.policy.validate(password)?;
        let email = email.trim().to_lowercase();
        let password_hash = hash_password(password)?;

        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| AuthError::Provider(500, "Lock poisoned".into()))?;
        if accounts.contains_key(&email) {
            return Err(AuthError::EmailAlreadyExists);
        }

        let user = HostedUser {
            id: Uuid::new_v4().to_string(),
            email: email.clone(),
            created_at: Some(Utc::now().to_rfc3339()),
        };
        accounts.insert(
            email,
            StoredAccount {
                user: user.clone(),
                password_hash,
            },
        );
        Ok(user)
    }

    fn authenticate(&self, email: &str, password: &str) -> AuthResult<HostedUser> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| AuthError::Provider(500, "Lock poisoned".into()))?;
        let account = accounts
            .get(&email.trim().to_lowercase())
            .ok_or(AuthError::InvalidCredentials)?;

        if verify_password(password, &account.password_hash)? {
            Ok(account.user.clone())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }

    fn find(&self, id: &str) -> AuthResult<Option<HostedUser>> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| AuthError::Provider(500, "Lock poisoned".into()))?;
        Ok(accounts
            .values()
            .find(|a| a.user.id == id)
            .map(|a| a.user.clone()))
    }
}

impl IdentityProvider for MemoryIdentityProvider {
    fn sign_up<'a>(&'a self, email: &'a str, password: &'a str) -> IdentityFuture<'a, HostedUser> {
        Box::pin(async move { self.register(email, password) })
    }

    fn sign_in<'a>(&'a self, email: &'a str, password: &'a str) -> IdentityFuture<'a, HostedUser> {
        Box::pin(async move { self.authenticate(email, password) })
    }

    fn get_user<'a>(&'a self, id: &'a str) -> IdentityFuture<'a, Option<HostedUser>> {
        Box::pin(async move { self.find(id) })
    }
}
