//! User HTTP Routes
//!
//! Own-profile read/update, public profile lookup and profile search.

use axum::{
    extract::{rejection::JsonRejection, Extension, Json, Path, Query, State},
    routing::{get, put},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::core::{GuardChain, Identity};

use super::errors::{ApiError, ApiResult};
use super::guard::guarded;
use super::pagination::{PageMeta, PageQuery};
use super::profiles::{find_profile, params, require_profile, PROFILES, PUBLIC_PROFILE_COLUMNS};
use super::state::AppState;
use super::validation::{validate_username, validated, ProfileUpdate};

/// User routes, mounted under `/api/users`
pub fn user_routes(state: AppState) -> Router<AppState> {
    let authenticated = state.authenticated();

    Router::new()
        .route("/profile", guarded(get(get_profile_handler), authenticated.clone()))
        .route(
            "/profile",
            guarded(
                put(update_profile_handler),
                state.limited(authenticated, 10),
            ),
        )
        .route(
            "/profile/:username",
            guarded(
                get(public_profile_handler),
                state.limited(GuardChain::new(), 30),
            ),
        )
        .route(
            "/profiles",
            guarded(get(search_handler), state.limited(GuardChain::new(), 10)),
        )
}

async fn get_profile_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<Value>> {
    let profile = require_profile(&state.adapter, &identity.user_id).await?;
    Ok(Json(Value::Object(profile)))
}

async fn update_profile_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    body: Result<Json<ProfileUpdate>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let update = validated(body)?;

    if let Some(username) = &update.username {
        let owner = find_profile(&state.adapter, "username", username, Some("id")).await?;
        let taken = owner
            .and_then(|row| row.get("id").and_then(Value::as_str).map(str::to_string))
            .is_some_and(|id| id != identity.user_id);
        if taken {
            return Err(ApiError::Conflict("Username already taken".to_string()));
        }
    }

    let mut patch = serde_json::to_value(&update)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if let Value::Object(fields) = &mut patch {
        fields.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
    }

    let by_id = params([("id", format!("eq.{}", identity.user_id))]);
    state
        .adapter
        .execute("PATCH", PROFILES, Some(patch), Some(&by_id), None)
        .await?;

    let profile = require_profile(&state.adapter, &identity.user_id).await?;
    info!(user_id = %identity.user_id, "profile updated");

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "profile": profile,
    })))
}

async fn public_profile_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<Value>> {
    // Anything that cannot be a username cannot match one
    validate_username(&username).map_err(|_| ApiError::not_found("Profile"))?;

    let profile = find_profile(
        &state.adapter,
        "username",
        &username,
        Some(PUBLIC_PROFILE_COLUMNS),
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Profile"))?;

    Ok(Json(Value::Object(profile)))
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub country: Option<String>,
    /// Comma-separated interest list
    pub interests: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl SearchQuery {
    pub fn page(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            per_page: self.per_page,
        }
    }

    /// `(username.ilike.%q%,...)`, or None when no criterion is given
    pub fn or_group(&self) -> Option<String> {
        let mut members = Vec::new();

        if let Some(q) = self.q.as_deref().map(sanitize).filter(|q| !q.is_empty()) {
            members.push(format!("username.ilike.%{}%", q));
            members.push(format!("full_name.ilike.%{}%", q));
        }
        if let Some(country) = self.country.as_deref().map(sanitize).filter(|c| !c.is_empty()) {
            members.push(format!("country.eq.{}", country));
        }
        if let Some(interests) = &self.interests {
            members.extend(
                interests
                    .split(',')
                    .map(|i| sanitize(i).replace(['{', '}'], ""))
                    .filter(|i| !i.is_empty())
                    .map(|i| format!("interests.cs.{{{}}}", i)),
            );
        }

        (!members.is_empty()).then(|| format!("({})", members.join(",")))
    }
}

/// Drop characters that would break the `or` group grammar
fn sanitize(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '(' | ')'))
        .collect()
}

async fn search_handler(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Value>> {
    let mut filters = params([("select", PUBLIC_PROFILE_COLUMNS.to_string())]);
    if let Some(group) = query.or_group() {
        filters.insert("or".to_string(), group);
    }

    let mut page_params = filters.clone();
    page_params.insert("order".to_string(), "username.asc".to_string());
    query.page().apply(&mut page_params);

    let rows = state
        .adapter
        .execute("GET", PROFILES, None, Some(&page_params), None)
        .await?
        .into_rows();

    let total = state
        .adapter
        .execute("GET", "/rest/v1/profiles/count", None, Some(&filters), None)
        .await?
        .count();

    Ok(Json(json!({
        "data": rows,
        "meta": PageMeta::new(&query.page(), total),
    })))
}
