//! Query adapter behavior observed through its public API

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use munconnect::rest_api::{
    AdapterError, AdapterResult, ExecFuture, MemoryQueryExecutor, Params, QueryAdapter,
    QueryExecutor, QueryResponse, TableQuery, UpstreamError, UpstreamResult,
};
use serde_json::{json, Map, Value};

/// Replays scripted outcomes and counts calls
struct Scripted {
    outcomes: Mutex<VecDeque<UpstreamResult<QueryResponse>>>,
    calls: Mutex<usize>,
}

impl Scripted {
    fn new(outcomes: Vec<UpstreamResult<QueryResponse>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl QueryExecutor for Scripted {
    fn execute<'a>(&'a self, _query: &'a TableQuery) -> ExecFuture<'a> {
        *self.calls.lock().unwrap() += 1;
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(UpstreamError::with_status(500, "unexpected call")));
        Box::pin(async move { outcome })
    }
}

fn row(v: Value) -> Map<String, Value> {
    v.as_object().cloned().unwrap()
}

fn profiles() -> QueryAdapter {
    let db = MemoryQueryExecutor::new().with_rows(
        "profiles",
        vec![
            json!({"id": "1", "username": "alice", "country": "France", "age": 31}),
            json!({"id": "2", "username": "bob", "country": "France", "age": 24}),
            json!({"id": "3", "username": "carol", "country": "Kenya", "age": 27}),
        ],
    );
    QueryAdapter::with_executor(Arc::new(db))
}

fn ids(result: AdapterResult) -> Vec<String> {
    let mut ids: Vec<String> = result
        .into_rows()
        .into_iter()
        .filter_map(|r| r.get("id").and_then(Value::as_str).map(str::to_string))
        .collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn non_rest_endpoints_never_reach_the_executor() {
    let exec = Scripted::new(vec![]);
    let adapter = QueryAdapter::with_executor(exec.clone());

    for endpoint in ["/auth/v1/users", "/rest/v2/profiles", "profiles", "/rest/v1/"] {
        let err = adapter
            .execute("GET", endpoint, None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::InvalidEndpoint(_)), "{}", endpoint);
    }
    assert_eq!(exec.calls(), 0);
}

#[tokio::test]
async fn unknown_methods_are_rejected() {
    let adapter = profiles();
    for method in ["TRACE", "OPTIONS", ""] {
        let err = adapter
            .execute(method, "/rest/v1/profiles", None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::InvalidEndpoint(_)), "{:?}", method);
    }
}

#[tokio::test]
async fn filter_tokens_are_anded_in_any_order() {
    let adapter = profiles();

    let forward = adapter
        .execute("GET", "/rest/v1/profiles?country=eq.France&age=gt.25", None, None, None)
        .await
        .unwrap();
    let reversed = adapter
        .execute("GET", "/rest/v1/profiles?age=gt.25&country=eq.France", None, None, None)
        .await
        .unwrap();

    assert_eq!(ids(forward.clone()), vec!["1"]);
    assert_eq!(ids(forward), ids(reversed));
}

#[tokio::test]
async fn params_narrow_endpoint_filters() {
    let adapter = profiles();
    let mut params = Params::new();
    params.insert("age".into(), "lt.30".into());

    let result = adapter
        .execute("GET", "/rest/v1/profiles?country=eq.France", None, Some(&params), None)
        .await
        .unwrap();
    assert_eq!(ids(result), vec!["2"]);
}

#[tokio::test]
async fn fallback_rows_replace_a_failed_primary() {
    let exec = Scripted::new(vec![
        Err(UpstreamError::with_status(500, "statement timeout")),
        Ok(QueryResponse {
            data: vec![row(json!({"id": "1", "username": "alice"}))],
            count: None,
        }),
    ]);
    let adapter = QueryAdapter::with_executor(exec.clone());

    let result = adapter
        .execute("GET", "/rest/v1/profiles?id=eq.1", None, None, None)
        .await
        .unwrap();

    assert_eq!(
        result,
        AdapterResult::Rows(vec![row(json!({"id": "1", "username": "alice"}))])
    );
    assert_eq!(exec.calls(), 2);
}

#[tokio::test]
async fn double_failure_follows_the_fallback_classification() {
    let exec = Scripted::new(vec![
        Err(UpstreamError::with_status(500, "boom")),
        Err(UpstreamError::new(None, "request failed with status 401")),
    ]);
    let adapter = QueryAdapter::with_executor(exec.clone());

    let err = adapter
        .execute("GET", "/rest/v1/profiles?id=eq.1", None, None, None)
        .await
        .unwrap_err();
    assert_eq!(err, AdapterError::Unauthorized);

    let exec = Scripted::new(vec![
        Err(UpstreamError::with_status(502, "bad gateway")),
        Err(UpstreamError::with_status(503, "unavailable")),
    ]);
    let adapter = QueryAdapter::with_executor(exec);

    let err = adapter
        .execute("GET", "/rest/v1/profiles?id=eq.1", None, None, None)
        .await
        .unwrap_err();
    assert_eq!(err, AdapterError::UpstreamFailure(503, "unavailable".to_string()));
}

#[tokio::test]
async fn count_matches_row_count() {
    let adapter = profiles();
    let mut params = Params::new();
    params.insert("country".into(), "eq.France".into());

    let rows = adapter
        .execute("GET", "/rest/v1/profiles", None, Some(&params), None)
        .await
        .unwrap();
    let count = adapter
        .execute("GET", "/rest/v1/profiles/count", None, Some(&params), None)
        .await
        .unwrap();

    assert!(matches!(count, AdapterResult::Count(2)));
    assert_eq!(count.count(), rows.count());
}

#[tokio::test]
async fn exact_count_param_matches_row_count() {
    let adapter = profiles();
    let mut params = Params::new();
    params.insert("country".into(), "eq.France".into());

    let rows = adapter
        .execute("GET", "/rest/v1/profiles", None, Some(&params), None)
        .await
        .unwrap();

    params.insert("count".into(), "exact".into());
    let count = adapter
        .execute("GET", "/rest/v1/profiles", None, Some(&params), None)
        .await
        .unwrap();

    assert_eq!(count, AdapterResult::Count(2));
    assert_eq!(count.count(), rows.count());
}

#[tokio::test]
async fn lookup_by_username() {
    let db = MemoryQueryExecutor::new()
        .with_rows("profiles", vec![json!({"id": "1", "username": "alice"})]);
    let adapter = QueryAdapter::with_executor(Arc::new(db));

    let result = adapter
        .execute("GET", "/rest/v1/profiles?username=eq.alice", None, None, None)
        .await
        .unwrap();
    assert_eq!(
        result,
        AdapterResult::Rows(vec![row(json!({"id": "1", "username": "alice"}))])
    );
}

#[tokio::test]
async fn inserted_rows_are_readable() {
    let adapter = QueryAdapter::with_executor(Arc::new(MemoryQueryExecutor::new()));

    let created = adapter
        .execute(
            "POST",
            "/rest/v1/profiles",
            Some(json!({"id": "2", "username": "bob"})),
            None,
            None,
        )
        .await
        .unwrap();
    assert_eq!(
        created,
        AdapterResult::Rows(vec![row(json!({"id": "2", "username": "bob"}))])
    );

    let found = adapter
        .execute("GET", "/rest/v1/profiles?username=eq.bob", None, None, None)
        .await
        .unwrap();
    assert_eq!(found, created);
}

#[tokio::test]
async fn updates_and_deletes_follow_filters() {
    let adapter = profiles();
    let mut by_id = Params::new();
    by_id.insert("id".into(), "eq.3".into());

    let updated = adapter
        .execute("patch", "/rest/v1/profiles", Some(json!({"country": "Chile"})), Some(&by_id), None)
        .await
        .unwrap();
    assert_eq!(updated.count(), 1);

    let chile = adapter
        .execute("GET", "/rest/v1/profiles?country=eq.Chile", None, None, None)
        .await
        .unwrap();
    assert_eq!(ids(chile), vec!["3"]);

    let deleted = adapter
        .execute("DELETE", "/rest/v1/profiles", None, Some(&by_id), None)
        .await
        .unwrap();
    assert_eq!(deleted.count(), 1);

    let remaining = adapter
        .execute("GET", "/rest/v1/profiles/count", None, None, None)
        .await
        .unwrap();
    assert_eq!(remaining.count(), 2);
}
