use serde::Serialize;
use serde_json::Value;

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::store::Session;

#[derive(Debug, Clone, Serialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Account operations. Login is the one place a session gets established;
/// everything downstream only ever reads or clears it.
#[derive(Clone)]
pub struct AuthClient {
    api: ApiClient,
}

impl AuthClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn register(&self, input: &RegisterInput) -> Result<(), ApiError> {
        let payload = serde_json::to_value(input).map_err(|err| ApiError::Unknown {
            status: None,
            message: format!("failed to encode registration: {err}"),
        })?;
        self.api.post("auth/register", &payload).await?;
        Ok(())
    }

    /// Logs in and persists the returned credentials in the session store.
    /// A 2xx response without a usable token or user id is an error and
    /// leaves the store untouched.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        let payload = serde_json::to_value(credentials).map_err(|err| ApiError::Unknown {
            status: None,
            message: format!("failed to encode credentials: {err}"),
        })?;
        let body = self.api.post("auth/login", &payload).await?;
        let (user_id, token) = session_from_login_body(&body)?;
        self.api.session().establish(&user_id, &token)?;
        log::info!("session established for user {user_id}");
        Ok(Session { user_id, token })
    }

    /// Drops the persisted session. Idempotent.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.api.session().clear()?;
        Ok(())
    }
}

/// The login response carries `token` and a `user` object whose id arrives
/// as `id` or `_id` depending on the backend.
fn session_from_login_body(body: &Value) -> Result<(String, String), ApiError> {
    let token = body
        .get("token")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::Unknown {
            status: None,
            message: "login succeeded but no token was received".to_string(),
        })?;

    let user = body.get("user");
    let user_id = user
        .and_then(|u| u.get("_id").or_else(|| u.get("id")))
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::Unknown {
            status: None,
            message: "login succeeded but no user id was received".to_string(),
        })?;

    Ok((user_id.to_string(), token.to_string()))
}
