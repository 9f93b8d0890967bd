//! Auth HTTP Routes
//!
//! Registration, login, token refresh and the current-user lookup.

use axum::{
    extract::{rejection::JsonRejection, Extension, Json, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::auth::{bearer_token, HostedUser, TokenPair};
use crate::core::Identity;

use super::errors::{ApiError, ApiResult};
use super::guard::guarded;
use super::profiles::{create_profile, find_profile, require_profile, temporary_username};
use super::state::AppState;
use super::validation::{validated, LoginRequest, RegisterRequest};

/// Auth routes, mounted under `/api/auth`
pub fn auth_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/refresh", post(refresh_handler))
        .route("/me", guarded(get(me_handler), state.authenticated()))
}

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl UserSummary {
    fn new(user: &HostedUser, username: String) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            username,
            full_name: None,
            avatar_url: None,
        }
    }

    /// Summary with the display fields a stored profile carries
    fn from_profile(user: &HostedUser, profile: &Map<String, Value>) -> Self {
        let text = |key: &str| profile.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            full_name: text("full_name"),
            avatar_url: text("avatar_url"),
            ..Self::new(user, text("username").unwrap_or_default())
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: UserSummary,
    pub tokens: TokenPair,
}

// ==================
// Handlers
// ==================

async fn register_handler(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let request = validated(body)?;

    if find_profile(&state.adapter, "username", &request.username, Some("id"))
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("Username already taken".to_string()));
    }

    let user = state
        .identity
        .sign_up(&request.email, &request.password)
        .await?;
    create_profile(&state.adapter, &user.id, &request.username).await?;
    let tokens = state.jwt.issue_pair(&user.id)?;

    info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            user: UserSummary::new(&user, request.username),
            tokens,
        }),
    ))
}

async fn login_handler(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let request = validated(body)?;

    let user = state
        .identity
        .sign_in(&request.email, &request.password)
        .await?;

    // Accounts created outside this service may have no profile yet
    let profile = match find_profile(&state.adapter, "id", &user.id, None).await? {
        Some(profile) => profile,
        None => {
            info!(user_id = %user.id, "creating missing profile on login");
            create_profile(&state.adapter, &user.id, &temporary_username()).await?
        }
    };

    let tokens = state.jwt.issue_pair(&user.id)?;

    Ok(Json(AuthResponse {
        message: "Login successful",
        user: UserSummary::from_profile(&user, &profile),
        tokens,
    }))
}

/// Exchange a refresh token (sent as the bearer) for a new access token
async fn refresh_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization token".to_string()))?;

    let claims = state.jwt.validate_refresh(token)?;
    let access_token = state.jwt.generate_access_token(&claims.sub)?;

    Ok(Json(json!({ "access_token": access_token })))
}

async fn me_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<Value>> {
    let mut profile = require_profile(&state.adapter, &identity.user_id).await?;

    if let Some(user) = state.identity.get_user(&identity.user_id).await? {
        profile.insert("email".to_string(), Value::String(user.email));
    }

    Ok(Json(Value::Object(profile)))
}
