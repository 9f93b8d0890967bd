//! Content HTTP Routes
//!
//! Documents and speeches share one set of owner-scoped handlers;
//! committees are public to read and admin-only to change.

use axum::{
    extract::{rejection::JsonRejection, Extension, Json, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Router,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::info;
use uuid::Uuid;

use crate::core::Identity;
use crate::rest_api::Params;

use super::errors::{ApiError, ApiResult};
use super::guard::guarded;
use super::pagination::{PageMeta, PageQuery};
use super::profiles::params;
use super::state::AppState;
use super::validation::{
    validated, DocumentUpdate, NewCommittee, NewDocument, NewSpeech, SpeechUpdate, Validate,
};

/// An author-owned content table
pub trait OwnedContent: Send + Sync + 'static {
    const TABLE: &'static str;
    const LABEL: &'static str;
    type New: DeserializeOwned + Serialize + Validate + Send;
    type Update: DeserializeOwned + Serialize + Validate + Send;
}

pub struct Documents;

impl OwnedContent for Documents {
    const TABLE: &'static str = "documents";
    const LABEL: &'static str = "Document";
    type New = NewDocument;
    type Update = DocumentUpdate;
}

pub struct Speeches;

impl OwnedContent for Speeches {
    const TABLE: &'static str = "speeches";
    const LABEL: &'static str = "Speech";
    type New = NewSpeech;
    type Update = SpeechUpdate;
}

/// Routes for one owned table, mounted under `/api/{table}`
pub fn owned_routes<C: OwnedContent>(state: AppState) -> Router<AppState> {
    let authenticated = state.authenticated();

    Router::new()
        .route("/", guarded(get(list_owned::<C>), authenticated.clone()))
        .route(
            "/",
            guarded(post(create_owned::<C>), state.limited(authenticated.clone(), 20)),
        )
        .route(
            "/:id",
            guarded(
                get(get_owned::<C>)
                    .patch(update_owned::<C>)
                    .delete(delete_owned::<C>),
                authenticated,
            ),
        )
}

/// Committee routes, mounted under `/api/committees`
pub fn committee_routes(state: AppState) -> Router<AppState> {
    let admin = state.admin();

    Router::new()
        .route("/", get(list_committees))
        .route("/", guarded(post(create_committee), admin.clone()))
        .route("/:id", get(get_committee))
        .route("/:id", guarded(delete(delete_committee), admin))
}

fn endpoint(table: &str) -> String {
    format!("/rest/v1/{}", table)
}

/// Body plus generated id, timestamps and any extra fields
fn new_row<T: Serialize>(body: &T, extra: &[(&str, Value)]) -> ApiResult<Value> {
    let mut row = match serde_json::to_value(body) {
        Ok(Value::Object(map)) => map,
        Ok(_) => Map::new(),
        Err(e) => return Err(ApiError::Internal(e.to_string())),
    };

    let now = Utc::now().to_rfc3339();
    row.insert("id".to_string(), json!(Uuid::new_v4().to_string()));
    row.insert("created_at".to_string(), json!(now));
    row.insert("updated_at".to_string(), json!(now));
    for (key, value) in extra {
        row.insert(key.to_string(), value.clone());
    }
    Ok(Value::Object(row))
}

async fn list_page(
    state: &AppState,
    table: &str,
    filters: Params,
    order: &str,
    page: &PageQuery,
) -> ApiResult<Value> {
    let mut page_params = filters.clone();
    page_params.insert("order".to_string(), order.to_string());
    page.apply(&mut page_params);

    let rows = state
        .adapter
        .execute("GET", &endpoint(table), None, Some(&page_params), None)
        .await?
        .into_rows();

    let total = state
        .adapter
        .execute("GET", &format!("{}/count", endpoint(table)), None, Some(&filters), None)
        .await?
        .count();

    Ok(json!({ "data": rows, "meta": PageMeta::new(page, total) }))
}

async fn find_by_id(state: &AppState, table: &str, id: &str) -> ApiResult<Option<Map<String, Value>>> {
    let query = params([("id", format!("eq.{}", id)), ("limit", "1".to_string())]);
    Ok(state
        .adapter
        .execute("GET", &endpoint(table), None, Some(&query), None)
        .await?
        .first())
}

fn is_owner(row: &Map<String, Value>, user_id: &str) -> bool {
    row.get("author_id").and_then(Value::as_str) == Some(user_id)
}

fn is_public(row: &Map<String, Value>) -> bool {
    row.get("is_public").and_then(Value::as_bool).unwrap_or(false)
}

/// Row `id` if the caller authored it; 404 otherwise
async fn require_owned<C: OwnedContent>(
    state: &AppState,
    id: &str,
    user_id: &str,
) -> ApiResult<Map<String, Value>> {
    find_by_id(state, C::TABLE, id)
        .await?
        .filter(|row| is_owner(row, user_id))
        .ok_or_else(|| ApiError::not_found(C::LABEL))
}

// ==================
// Owned content handlers
// ==================

async fn list_owned<C: OwnedContent>(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Value>> {
    let visible = params([(
        "or",
        format!("(author_id.eq.{},is_public.eq.true)", identity.user_id),
    )]);
    let body = list_page(&state, C::TABLE, visible, "created_at.desc", &page).await?;
    Ok(Json(body))
}

async fn create_owned<C: OwnedContent>(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    body: Result<Json<C::New>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let body = validated(body)?;
    let row = new_row(&body, &[("author_id", json!(identity.user_id))])?;

    let created = state
        .adapter
        .execute("POST", &endpoint(C::TABLE), Some(row), None, None)
        .await?
        .first()
        .ok_or_else(|| ApiError::Internal(format!("{} insert returned no row", C::LABEL)))?;

    info!(table = C::TABLE, author = %identity.user_id, "content created");
    Ok((StatusCode::CREATED, Json(Value::Object(created))))
}

async fn get_owned<C: OwnedContent>(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let row = find_by_id(&state, C::TABLE, &id)
        .await?
        .filter(|row| is_owner(row, &identity.user_id) || is_public(row))
        .ok_or_else(|| ApiError::not_found(C::LABEL))?;
    Ok(Json(Value::Object(row)))
}

async fn update_owned<C: OwnedContent>(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    body: Result<Json<C::Update>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let update = validated(body)?;
    require_owned::<C>(&state, &id, &identity.user_id).await?;

    let mut fields = match serde_json::to_value(&update) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) => Map::new(),
        Err(e) => return Err(ApiError::Internal(e.to_string())),
    };
    if fields.is_empty() {
        return Err(ApiError::ValidationFailed("No fields to update".to_string()));
    }
    fields.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
    let patch = Value::Object(fields);

    let scope = params([
        ("id", format!("eq.{}", id)),
        ("author_id", format!("eq.{}", identity.user_id)),
    ]);
    let updated = state
        .adapter
        .execute("PATCH", &endpoint(C::TABLE), Some(patch), Some(&scope), None)
        .await?
        .first()
        .ok_or_else(|| ApiError::not_found(C::LABEL))?;

    Ok(Json(Value::Object(updated)))
}

async fn delete_owned<C: OwnedContent>(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    require_owned::<C>(&state, &id, &identity.user_id).await?;

    let scope = params([
        ("id", format!("eq.{}", id)),
        ("author_id", format!("eq.{}", identity.user_id)),
    ]);
    let deleted = state
        .adapter
        .execute("DELETE", &endpoint(C::TABLE), None, Some(&scope), None)
        .await?;
    if deleted.is_empty() {
        return Err(ApiError::not_found(C::LABEL));
    }

    info!(table = C::TABLE, id = %id, "content deleted");
    Ok(Json(json!({ "message": format!("{} deleted successfully", C::LABEL) })))
}

// ==================
// Committee handlers
// ==================

const COMMITTEES: &str = "committees";

async fn list_committees(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Value>> {
    let body = list_page(&state, COMMITTEES, Params::new(), "name.asc", &page).await?;
    Ok(Json(body))
}

async fn get_committee(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let row = find_by_id(&state, COMMITTEES, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Committee"))?;
    Ok(Json(Value::Object(row)))
}

async fn create_committee(
    State(state): State<AppState>,
    body: Result<Json<NewCommittee>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let body = validated(body)?;
    let row = new_row(&body, &[])?;

    let created = state
        .adapter
        .execute("POST", &endpoint(COMMITTEES), Some(row), None, None)
        .await?
        .first()
        .ok_or_else(|| ApiError::Internal("Committee insert returned no row".to_string()))?;

    Ok((StatusCode::CREATED, Json(Value::Object(created))))
}

async fn delete_committee(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let scope = params([("id", format!("eq.{}", id))]);
    let deleted = state
        .adapter
        .execute("DELETE", &endpoint(COMMITTEES), None, Some(&scope), None)
        .await?;
    if deleted.is_empty() {
        return Err(ApiError::not_found("Committee"));
    }

    Ok(Json(json!({ "message": "Committee deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GuardChain;
    use crate::http_server::validation::DocumentType;

    #[test]
    fn test_new_row_stamps_fields() {
        let doc = NewDocument {
            title: "Draft".into(),
            content: "Text".into(),
            document_type: DocumentType::Notes,
            tags: vec![],
            is_public: false,
            committee_id: None,
        };
        let row = new_row(&doc, &[("author_id", json!("u1"))]).unwrap();

        assert_eq!(row["author_id"], "u1");
        assert_eq!(row["document_type"], "notes");
        assert!(row["id"].as_str().is_some_and(|id| !id.is_empty()));
        assert_eq!(row["created_at"], row["updated_at"]);
        assert!(row.get("committee_id").is_none());
    }

    #[test]
    fn test_visibility() {
        let row = json!({"author_id": "u1", "is_public": false});
        let row = row.as_object().unwrap();
        assert!(is_owner(row, "u1"));
        assert!(!is_owner(row, "u2"));
        assert!(!is_public(row));
    }

    #[test]
    fn test_chain_sizes() {
        let state = AppState::in_memory(&Default::default());
        assert_eq!(state.admin().len(), 2);
        assert_eq!(state.limited(GuardChain::new(), 5).len(), 1);
    }
}
