//! Client core for a remote todo service: persisted session credentials, a
//! guard that gates protected views, a shape-tolerant HTTP gateway, and a
//! reconciler that merges server records with a locally persisted urgency
//! overlay into one consistent in-memory view.

pub mod api;
pub mod auth;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod logging;
pub mod messages;
pub mod models;
pub mod reconciler;
pub mod store;

pub use api::{ApiClient, DEFAULT_BASE_URL};
pub use auth::{AuthClient, Credentials, RegisterInput};
pub use error::ApiError;
pub use gateway::{HttpGateway, TaskGateway};
pub use guard::{GuardDecision, SessionGuard};
pub use models::{filtered, Filter, RemoteTask, Stats, Task, TaskDraft, TaskEdit};
pub use reconciler::TaskReconciler;
pub use store::{Session, SessionStore, StoreError, UrgencyOverlay};
