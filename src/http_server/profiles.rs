//! Profile lookups shared by the auth and user routes.

use chrono::Utc;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::rest_api::{Params, QueryAdapter};

use super::errors::{ApiError, ApiResult};

pub const PROFILES: &str = "/rest/v1/profiles";

/// Columns anyone may see
pub const PUBLIC_PROFILE_COLUMNS: &str =
    "id,username,full_name,bio,avatar_url,country,interests,conference_experience";

/// Build adapter params from `(key, value)` pairs
pub fn params<const N: usize>(pairs: [(&str, String); N]) -> Params {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// First profile whose `field` equals `value`
pub async fn find_profile(
    adapter: &QueryAdapter,
    field: &str,
    value: &str,
    select: Option<&str>,
) -> ApiResult<Option<Map<String, Value>>> {
    let mut query = params([(field, format!("eq.{}", value)), ("limit", "1".to_string())]);
    if let Some(select) = select {
        query.insert("select".to_string(), select.to_string());
    }

    let result = adapter
        .execute("GET", PROFILES, None, Some(&query), None)
        .await?;
    Ok(result.first())
}

pub async fn require_profile(adapter: &QueryAdapter, user_id: &str) -> ApiResult<Map<String, Value>> {
    find_profile(adapter, "id", user_id, None)
        .await?
        .ok_or_else(|| ApiError::not_found("Profile"))
}

/// Insert a fresh profile row for `user_id`
pub async fn create_profile(
    adapter: &QueryAdapter,
    user_id: &str,
    username: &str,
) -> ApiResult<Map<String, Value>> {
    let now = Utc::now().to_rfc3339();
    let row = json!({
        "id": user_id,
        "username": username,
        "created_at": now,
        "updated_at": now,
    });

    adapter
        .execute("POST", PROFILES, Some(row), None, None)
        .await?
        .first()
        .ok_or_else(|| ApiError::Internal("Profile insert returned no row".to_string()))
}

/// `user_` plus eight hex characters
pub fn temporary_username() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("user_{}", &id[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_server::validation::validate_username;
    use crate::rest_api::MemoryQueryExecutor;
    use std::sync::Arc;

    #[test]
    fn test_temporary_username_is_valid() {
        let name = temporary_username();
        assert_eq!(name.len(), 13);
        assert!(validate_username(&name).is_ok());
    }

    #[tokio::test]
    async fn test_create_then_find() {
        let adapter = QueryAdapter::with_executor(Arc::new(MemoryQueryExecutor::new()));
        create_profile(&adapter, "u1", "alice").await.unwrap();

        let found = find_profile(&adapter, "username", "alice", Some("id"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.get("id"), Some(&json!("u1")));
        assert_eq!(found.len(), 1);

        assert!(matches!(
            require_profile(&adapter, "u2").await,
            Err(ApiError::NotFound(_))
        ));
    }
}
