use serde_json::Value;

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::models::{RemoteTask, TaskDraft, TaskEdit};

/// Remote CRUD operations the reconciler depends on. Production code uses
/// [`HttpGateway`]; tests substitute an in-memory implementation.
#[allow(async_fn_in_trait)]
pub trait TaskGateway {
    async fn list(&self, user_id: &str) -> Result<Vec<RemoteTask>, ApiError>;
    async fn create(&self, draft: &TaskDraft) -> Result<RemoteTask, ApiError>;
    async fn update(&self, id: &str, edit: &TaskEdit) -> Result<(), ApiError>;
    async fn delete(&self, id: &str) -> Result<(), ApiError>;
    async fn set_completion(&self, id: &str, completed: bool) -> Result<(), ApiError>;
}

/// The backends this client has been pointed at disagree on how the todo
/// list is scoped to a user, so `list` walks these routes in order and takes
/// the first structurally valid answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListRoute {
    /// `GET todos?userId={id}` — server filters by query parameter.
    QueryByUser,
    /// `GET todos/{id}` — server filters by path parameter.
    PathByUser,
    /// `GET todos` — unfiltered dump, scoped client-side by owner fields.
    FullScan,
}

impl ListRoute {
    const ORDER: [ListRoute; 3] = [
        ListRoute::QueryByUser,
        ListRoute::PathByUser,
        ListRoute::FullScan,
    ];

    fn path(&self, user_id: &str) -> String {
        match self {
            ListRoute::QueryByUser => format!("todos?userId={user_id}"),
            ListRoute::PathByUser => format!("todos/{user_id}"),
            ListRoute::FullScan => "todos".to_string(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ListRoute::QueryByUser => "query-by-user",
            ListRoute::PathByUser => "path-by-user",
            ListRoute::FullScan => "full-scan",
        }
    }
}

/// Accepts either a bare array or an object wrapping it under `todos`.
fn tasks_array(body: &Value) -> Option<&Vec<Value>> {
    if let Value::Array(items) = body {
        return Some(items);
    }
    if let Some(Value::Array(items)) = body.get("todos") {
        return Some(items);
    }
    None
}

/// Owner match for the full-scan route: `userId`, `user`, or a nested user
/// object carrying `_id`/`id`.
fn belongs_to(task: &Value, user_id: &str) -> bool {
    if task.get("userId").and_then(|v| v.as_str()) == Some(user_id) {
        return true;
    }
    match task.get("user") {
        Some(Value::String(owner)) => owner == user_id,
        Some(Value::Object(owner)) => {
            owner.get("_id").and_then(|v| v.as_str()) == Some(user_id)
                || owner.get("id").and_then(|v| v.as_str()) == Some(user_id)
        }
        _ => false,
    }
}

fn normalize_list(body: &Value, route: ListRoute, user_id: &str) -> Result<Vec<RemoteTask>, ApiError> {
    let items = tasks_array(body).ok_or_else(|| ApiError::Unknown {
        status: None,
        message: format!("unrecognized list shape from {} route", route.name()),
    })?;

    let mut tasks = Vec::new();
    for item in items {
        if route == ListRoute::FullScan && !belongs_to(item, user_id) {
            continue;
        }
        let task: RemoteTask =
            serde_json::from_value(item.clone()).map_err(|err| ApiError::Unknown {
                status: None,
                message: format!("malformed task payload: {err}"),
            })?;
        tasks.push(task);
    }
    Ok(tasks)
}

/// Some deployments return the created record bare, others wrap it under a
/// `todo` key next to a message.
fn task_from_create_body(body: &Value) -> Result<RemoteTask, ApiError> {
    let record = match body.get("todo") {
        Some(value @ Value::Object(_)) => value,
        _ => body,
    };
    serde_json::from_value(record.clone()).map_err(|err| ApiError::Unknown {
        status: None,
        message: format!("malformed create response: {err}"),
    })
}

/// Keeps the more specific of two cascade failures; ties go to the earlier
/// attempt. Chosen deliberately over always surfacing the first error, so a
/// late 404 is not hidden behind an early connection refusal.
fn keep_more_specific(best: Option<ApiError>, next: ApiError) -> Option<ApiError> {
    match best {
        Some(current) if current.specificity() >= next.specificity() => Some(current),
        _ => Some(next),
    }
}

/// reqwest-backed gateway. Stateless apart from the shared transport; the
/// session token travels with every request via [`ApiClient`].
#[derive(Clone)]
pub struct HttpGateway {
    api: ApiClient,
}

impl HttpGateway {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl TaskGateway for HttpGateway {
    async fn list(&self, user_id: &str) -> Result<Vec<RemoteTask>, ApiError> {
        let mut best: Option<ApiError> = None;
        for route in ListRoute::ORDER {
            let outcome = match self.api.get(&route.path(user_id)).await {
                Ok(body) => normalize_list(&body, route, user_id),
                Err(err) => Err(err),
            };
            match outcome {
                Ok(tasks) => {
                    if best.is_some() {
                        log::debug!("list served by fallback route {}", route.name());
                    }
                    return Ok(tasks);
                }
                // 401 already cleared the session; trying further routes
                // could only produce more of the same.
                Err(err) if err.is_auth() => return Err(err),
                Err(err) => {
                    log::warn!("list route {} failed: {err}", route.name());
                    best = keep_more_specific(best, err);
                }
            }
        }
        Err(best.unwrap_or_else(|| ApiError::Unknown {
            status: None,
            message: "no list route available".to_string(),
        }))
    }

    async fn create(&self, draft: &TaskDraft) -> Result<RemoteTask, ApiError> {
        let payload = serde_json::to_value(draft).map_err(|err| ApiError::Unknown {
            status: None,
            message: format!("failed to encode task: {err}"),
        })?;
        let body = self.api.post("todos/", &payload).await?;
        task_from_create_body(&body)
    }

    async fn update(&self, id: &str, edit: &TaskEdit) -> Result<(), ApiError> {
        let payload = serde_json::to_value(edit).map_err(|err| ApiError::Unknown {
            status: None,
            message: format!("failed to encode task: {err}"),
        })?;
        self.api.put(&format!("todos/{id}"), &payload).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.api.delete(&format!("todos/{id}")).await?;
        Ok(())
    }

    async fn set_completion(&self, id: &str, completed: bool) -> Result<(), ApiError> {
        let action = if completed { "done" } else { "undone" };
        self.api
            .patch(&format!("todos/{id}/{action}"), &serde_json::json!({}))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tasks_array_accepts_bare_and_wrapped_shapes() {
        let bare = serde_json::json!([{ "id": "a" }]);
        assert_eq!(tasks_array(&bare).map(|v| v.len()), Some(1));

        let wrapped = serde_json::json!({ "todos": [{ "id": "a" }, { "id": "b" }] });
        assert_eq!(tasks_array(&wrapped).map(|v| v.len()), Some(2));

        let neither = serde_json::json!({ "message": "hi" });
        assert!(tasks_array(&neither).is_none());
    }

    #[test]
    fn full_scan_filters_by_owner_fields() {
        let body = serde_json::json!([
          { "id": "a", "title": "t", "description": "d", "userId": "u1" },
          { "id": "b", "title": "t", "description": "d", "userId": "u2" },
          { "id": "c", "title": "t", "description": "d", "user": "u1" },
          { "id": "d", "title": "t", "description": "d", "user": { "_id": "u1" } },
          { "id": "e", "title": "t", "description": "d", "user": { "id": "u2" } }
        ]);
        let tasks = normalize_list(&body, ListRoute::FullScan, "u1").expect("normalizes");
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "d"]);
    }

    #[test]
    fn full_scan_with_two_owners_returns_only_callers_task() {
        let body = serde_json::json!([
          { "id": "a", "userId": "u1" },
          { "id": "b", "userId": "u2" }
        ]);
        let tasks = normalize_list(&body, ListRoute::FullScan, "u1").expect("normalizes");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "a");
    }

    #[test]
    fn server_filtered_routes_do_not_rescope() {
        // When the server claims to have filtered, trust it: a record with a
        // missing owner field must still come through.
        let body = serde_json::json!([{ "id": "a", "title": "t", "description": "d" }]);
        let tasks = normalize_list(&body, ListRoute::QueryByUser, "u1").expect("normalizes");
        assert_eq!(tasks.len(), 1);
    }

    #[test]
    fn unrecognized_shape_is_an_error_not_an_empty_list() {
        let body = serde_json::json!({ "data": [] });
        let err = normalize_list(&body, ListRoute::PathByUser, "u1").expect_err("shape error");
        assert!(matches!(err, ApiError::Unknown { .. }));
    }

    #[test]
    fn create_body_unwraps_optional_todo_key() {
        let wrapped = serde_json::json!({
          "message": "created",
          "todo": { "_id": "x1", "title": "t", "description": "d", "isUrgent": true }
        });
        let task = task_from_create_body(&wrapped).expect("parses wrapped");
        assert_eq!(task.id, "x1");
        assert_eq!(task.is_urgent, Some(true));

        let bare = serde_json::json!({ "id": "x2", "title": "t", "description": "d" });
        let task = task_from_create_body(&bare).expect("parses bare");
        assert_eq!(task.id, "x2");
    }

    #[test]
    fn cascade_surfaces_most_specific_error() {
        let network = ApiError::Network("refused".into());
        let not_found = ApiError::NotFound("no such route".into());
        let server = ApiError::Server {
            status: 500,
            message: "boom".into(),
        };

        let best = keep_more_specific(None, network.clone());
        let best = keep_more_specific(best, not_found.clone());
        let best = keep_more_specific(best, server);
        assert_eq!(best, Some(not_found));
    }

    #[test]
    fn cascade_ties_keep_the_earlier_error() {
        let first = ApiError::Network("first".into());
        let second = ApiError::Network("second".into());
        let best = keep_more_specific(Some(first.clone()), second);
        assert_eq!(best, Some(first));
    }

    #[test]
    fn list_route_paths() {
        assert_eq!(ListRoute::QueryByUser.path("u1"), "todos?userId=u1");
        assert_eq!(ListRoute::PathByUser.path("u1"), "todos/u1");
        assert_eq!(ListRoute::FullScan.path("u1"), "todos");
    }

    #[tokio::test]
    async fn list_cascade_stops_at_first_auth_failure() {
        use crate::store::SessionStore;
        use std::io::{Read, Write};
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        // Answers every request with 401 and counts how many arrive. If the
        // cascade kept walking routes after an auth failure, the count would
        // exceed one.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_in_server = Arc::clone(&hits);
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                hits_in_server.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 2048];
                let _ = stream.read(&mut buf);
                let body = r#"{"message":"jwt expired"}"#;
                let response = format!(
                    "HTTP/1.1 401 Unauthorized\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        let dir = tempfile::tempdir().expect("tempdir");
        let session = SessionStore::new(dir.path().to_path_buf());
        session.establish("u1", "tok").expect("establish");

        let api = ApiClient::new(format!("http://{addr}/api/"), session.clone()).expect("client");
        let gateway = HttpGateway::new(api);

        let err = gateway.list("u1").await.expect_err("auth failure surfaces");
        assert!(matches!(err, ApiError::Auth(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(session.current().is_none());
    }
}
