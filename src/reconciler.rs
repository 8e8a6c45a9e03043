use std::sync::Mutex;

use crate::error::ApiError;
use crate::gateway::TaskGateway;
use crate::models::{filtered, Filter, Stats, Task, TaskDraft, TaskEdit};
use crate::store::{Session, UrgencyOverlay};

/// Owns the in-memory task list for one authenticated session and keeps it
/// consistent with the remote service and the urgency overlay.
///
/// Every mutation is a single gateway round-trip followed by a local patch;
/// the patch only happens after the gateway confirms, so a failed mutation
/// leaves both the list and the overlay exactly as they were. There is no
/// optimistic update and no automatic retry; the caller re-issues a failed
/// mutation explicitly.
///
/// Once the gateway *has* confirmed, the local patch always lands: overlay
/// writes at that point are best-effort (logged on failure), because
/// surfacing an error for a mutation the server already applied would leave
/// the list diverged and invite duplicate retries.
pub struct TaskReconciler<G> {
    gateway: G,
    overlay: UrgencyOverlay,
    user_id: String,
    tasks: Mutex<Vec<Task>>,
}

impl<G: TaskGateway> TaskReconciler<G> {
    /// Built from an admitted session; the guard decides whether one exists.
    pub fn new(gateway: G, overlay: UrgencyOverlay, session: &Session) -> Self {
        Self {
            gateway,
            overlay,
            user_id: session.user_id.clone(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Fetches the full list and replaces the in-memory state wholesale.
    /// Urgency missing from a server record resolves to overlay membership.
    /// On failure the previous list is left untouched. Returns the number of
    /// tasks loaded.
    pub async fn load(&self) -> Result<usize, ApiError> {
        let remote = self.gateway.list(&self.user_id).await?;
        let resolved: Vec<Task> = remote
            .into_iter()
            .map(|task| {
                let fallback = self.overlay.contains(&task.id);
                task.resolve(fallback)
            })
            .collect();
        let count = resolved.len();
        let mut guard = self.tasks.lock().expect("state poisoned");
        *guard = resolved;
        Ok(count)
    }

    /// Creates a task. Validation failures never reach the gateway.
    pub async fn add(
        &self,
        title: &str,
        description: &str,
        is_urgent: bool,
    ) -> Result<Task, ApiError> {
        validate_fields(title, description)?;
        let draft = TaskDraft {
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            is_urgent,
            user_id: self.user_id.clone(),
        };
        let created = self.gateway.create(&draft).await?;
        // The requested flag is the fallback here, not the overlay: the user
        // just told us what they want.
        let task = created.resolve(is_urgent);
        if task.is_urgent {
            self.overlay_add(&task.id);
        }
        let mut guard = self.tasks.lock().expect("state poisoned");
        guard.push(task.clone());
        Ok(task)
    }

    /// Edits a task in place. The overlay is reconciled to the new urgency
    /// before the in-memory entry is patched. An id not present in the
    /// loaded list is rejected before any gateway call, so the overlay can
    /// never gain an id no task carries.
    pub async fn edit(&self, id: &str, edit: TaskEdit) -> Result<(), ApiError> {
        validate_fields(&edit.title, &edit.description)?;
        {
            let guard = self.tasks.lock().expect("state poisoned");
            if !guard.iter().any(|t| t.id == id) {
                return Err(ApiError::NotFound(format!("unknown task: {id}")));
            }
        }
        self.gateway.update(id, &edit).await?;
        if edit.is_urgent {
            self.overlay_add(id);
        } else {
            self.overlay_remove(id);
        }
        let mut guard = self.tasks.lock().expect("state poisoned");
        if let Some(task) = guard.iter_mut().find(|t| t.id == id) {
            task.title = edit.title;
            task.description = edit.description;
            task.is_urgent = edit.is_urgent;
        }
        Ok(())
    }

    /// Flips completion, locally only after the gateway confirms. Returns
    /// the new completion state.
    pub async fn toggle(&self, id: &str) -> Result<bool, ApiError> {
        let target = {
            let guard = self.tasks.lock().expect("state poisoned");
            let task = guard
                .iter()
                .find(|t| t.id == id)
                .ok_or_else(|| ApiError::NotFound(format!("unknown task: {id}")))?;
            !task.completed
        };
        self.gateway.set_completion(id, target).await?;
        let mut guard = self.tasks.lock().expect("state poisoned");
        if let Some(task) = guard.iter_mut().find(|t| t.id == id) {
            task.completed = target;
        }
        Ok(target)
    }

    /// Deletes a task remotely, then drops it from the list and the overlay.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.gateway.delete(id).await?;
        self.overlay_remove(id);
        let mut guard = self.tasks.lock().expect("state poisoned");
        guard.retain(|task| task.id != id);
        Ok(())
    }

    fn overlay_add(&self, id: &str) {
        if let Err(err) = self.overlay.add(id) {
            log::warn!("urgent overlay write failed for {id}: {err}");
        }
    }

    fn overlay_remove(&self, id: &str) {
        if let Err(err) = self.overlay.remove(id) {
            log::warn!("urgent overlay write failed for {id}: {err}");
        }
    }

    pub fn tasks(&self) -> Vec<Task> {
        let guard = self.tasks.lock().expect("state poisoned");
        guard.clone()
    }

    pub fn stats(&self) -> Stats {
        let guard = self.tasks.lock().expect("state poisoned");
        Stats::of(&guard)
    }

    pub fn filtered(&self, filter: Filter) -> Vec<Task> {
        let guard = self.tasks.lock().expect("state poisoned");
        filtered(&guard, filter)
    }
}

fn validate_fields(title: &str, description: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() || description.trim().is_empty() {
        return Err(ApiError::Validation(
            "title and description are required".to_string(),
        ));
    }
    Ok(())
}
