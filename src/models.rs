use serde::{Deserialize, Serialize};

/// A task as held by the reconciler: a transient, locally mutable copy of
/// the server record with the urgency flag already resolved. `is_urgent` is
/// never unset here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub is_urgent: bool,
}

/// A task as it comes off the wire. The remote service is loose about field
/// presence (`id` vs `_id`, urgency sometimes missing), so everything except
/// identity degrades to a default instead of failing the whole payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTask {
    #[serde(default, alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub is_urgent: Option<bool>,
}

impl RemoteTask {
    /// Resolves the wire record into a reconciler task, falling back to the
    /// given value when the server omitted the urgency field.
    pub fn resolve(self, fallback_urgent: bool) -> Task {
        Task {
            id: self.id,
            title: self.title,
            description: self.description,
            completed: self.completed,
            is_urgent: self.is_urgent.unwrap_or(fallback_urgent),
        }
    }
}

/// Payload for creating a task.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub is_urgent: bool,
    pub user_id: String,
}

/// Payload for editing an existing task in place.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEdit {
    pub title: String,
    pub description: String,
    pub is_urgent: bool,
}

/// View selector over the task list. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    #[default]
    All,
    Completed,
    Pending,
    Urgent,
}

impl Filter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Completed => task.completed,
            Filter::Pending => !task.completed,
            Filter::Urgent => task.is_urgent,
        }
    }
}

/// Pure view derivation; the source list is never mutated.
pub fn filtered(tasks: &[Task], filter: Filter) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| filter.matches(task))
        .cloned()
        .collect()
}

/// Counters recomputed from the current list on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Urgent tasks still open; a completed urgent task no longer counts.
    pub urgent: usize,
    pub completion_rate: u32,
}

impl Stats {
    pub fn of(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|t| t.completed).count();
        let pending = tasks.iter().filter(|t| !t.completed).count();
        let urgent = tasks.iter().filter(|t| t.is_urgent && !t.completed).count();
        let completion_rate = if total > 0 {
            ((completed as f64 / total as f64) * 100.0).round() as u32
        } else {
            0
        };
        Self {
            total,
            completed,
            pending,
            urgent,
            completion_rate,
        }
    }
}
