use crate::store::StoreError;

/// Normalized failure taxonomy for everything that can go wrong between the
/// caller and the remote service. Every transport or protocol failure is
/// folded into one of these variants before it reaches the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Caller error caught before any network call (empty required field).
    Validation(String),
    /// Missing or expired session, or a 401 from the remote service.
    Auth(String),
    /// 404-equivalent (missing account or task).
    NotFound(String),
    /// 5xx-equivalent.
    Server { status: u16, message: String },
    /// No response received at all.
    Network(String),
    /// Anything else, with the origin status when one exists.
    Unknown { status: Option<u16>, message: String },
}

impl ApiError {
    /// Classifies a non-2xx response. 401 is handled by the transport layer
    /// (it must clear the session first), so it maps here as well for
    /// completeness but callers normally never see it through this path.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => ApiError::Auth(message),
            404 => ApiError::NotFound(message),
            500..=599 => ApiError::Server { status, message },
            _ => ApiError::Unknown {
                status: Some(status),
                message,
            },
        }
    }

    /// Ranking used by the list cascade when every attempt failed: the most
    /// specific error wins, earliest attempt breaking ties.
    pub(crate) fn specificity(&self) -> u8 {
        match self {
            ApiError::Validation(_) | ApiError::Auth(_) => 5,
            ApiError::NotFound(_) => 4,
            ApiError::Server { .. } => 3,
            ApiError::Unknown { .. } => 2,
            ApiError::Network(_) => 1,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Validation(msg) => write!(f, "validation error: {msg}"),
            ApiError::Auth(msg) => write!(f, "auth error: {msg}"),
            ApiError::NotFound(msg) => write!(f, "not found: {msg}"),
            ApiError::Server { status, message } => {
                write!(f, "server error ({status}): {message}")
            }
            ApiError::Network(msg) => write!(f, "network error: {msg}"),
            ApiError::Unknown {
                status: Some(status),
                message,
            } => write!(f, "unexpected error ({status}): {message}"),
            ApiError::Unknown {
                status: None,
                message,
            } => write!(f, "unexpected error: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::EmptyField(field) => {
                ApiError::Validation(format!("empty field: {field}"))
            }
            other => ApiError::Unknown {
                status: None,
                message: format!("local storage error: {other}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_status_classifies_by_code() {
        assert!(matches!(
            ApiError::from_status(401, "expired".into()),
            ApiError::Auth(_)
        ));
        assert!(matches!(
            ApiError::from_status(404, "missing".into()),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from_status(500, "boom".into()),
            ApiError::Server { status: 500, .. }
        ));
        assert!(matches!(
            ApiError::from_status(503, "down".into()),
            ApiError::Server { status: 503, .. }
        ));
        assert!(matches!(
            ApiError::from_status(418, "teapot".into()),
            ApiError::Unknown {
                status: Some(418),
                ..
            }
        ));
    }

    #[test]
    fn specificity_prefers_concrete_failures_over_network() {
        let not_found = ApiError::NotFound("x".into());
        let server = ApiError::Server {
            status: 500,
            message: "x".into(),
        };
        let network = ApiError::Network("x".into());
        assert!(not_found.specificity() > server.specificity());
        assert!(server.specificity() > network.specificity());
    }

    #[test]
    fn display_includes_status_when_present() {
        let err = ApiError::Server {
            status: 502,
            message: "bad gateway".into(),
        };
        assert_eq!(err.to_string(), "server error (502): bad gateway");
        let err = ApiError::Unknown {
            status: None,
            message: "odd".into(),
        };
        assert_eq!(err.to_string(), "unexpected error: odd");
    }
}
