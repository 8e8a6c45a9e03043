use std::time::Duration;

use serde_json::Value;

use crate::error::ApiError;
use crate::store::SessionStore;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api/";

const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Stateless transport over the remote service. The session token is read
/// fresh from the store on every request, so a login or logout in the same
/// process is picked up immediately. A 401 response clears the session
/// before the error is surfaced; the request is never retried.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: SessionStore) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|err| ApiError::Unknown {
                status: None,
                message: format!("failed to build http client: {err}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            session,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.execute(self.client.get(self.url(path))).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.execute(self.client.post(self.url(path)).json(body))
            .await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.execute(self.client.put(self.url(path)).json(body))
            .await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.execute(self.client.patch(self.url(path)).json(body))
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.execute(self.client.delete(self.url(path))).await
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        let request = match self.session.current() {
            Some(session) => request.bearer_auth(session.token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|err| ApiError::Network(format!("failed to read response: {err}")))?;
        let body = parse_body(&text);

        if status == 401 {
            // An expired session must not linger; later guard checks have to
            // see the anonymous state.
            if let Err(err) = self.session.clear() {
                log::error!("failed to clear session after 401: {err}");
            }
            return Err(ApiError::Auth(error_message(&body, "session expired")));
        }

        if !(200..300).contains(&status) {
            return Err(ApiError::from_status(
                status,
                error_message(&body, "request failed"),
            ));
        }

        Ok(body)
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or(Value::Null)
}

/// Prefers the backend's own `message` field when one exists.
fn error_message(body: &Value, fallback: &str) -> String {
    body.get("message")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| fallback.to_string())
}
