//! Fixed catalog of user-facing message templates. The presentation layer
//! renders these as transient notifications; nothing here does I/O.

use crate::error::ApiError;

pub const TASK_ADDED: &str = "Task added successfully.";
pub const TASK_UPDATED: &str = "Task updated successfully.";
pub const TASK_DELETED: &str = "Task deleted successfully.";
pub const TASK_COMPLETED: &str = "Great job! Task marked as completed.";
pub const TASK_UNCOMPLETED: &str = "Task marked as incomplete.";

pub const VALIDATION_EMPTY: &str = "Please fill in both title and description.";
pub const SESSION_EXPIRED: &str = "Session expired. Please login again.";
pub const NOT_FOUND: &str = "Not found. Please check and try again.";
pub const SERVER_ERROR: &str = "Server is temporarily unavailable. Please try again later.";
pub const NETWORK_ERROR: &str = "Connection error. Please check your internet connection.";
pub const GENERIC_ERROR: &str = "Something went wrong. Please try again.";

pub const DELETE_CONFIRM: &str =
    "Are you sure you want to delete this task? This action cannot be undone.";

pub fn tasks_loaded(count: usize) -> String {
    let plural = if count == 1 { "" } else { "s" };
    format!("Loaded {count} task{plural}.")
}

/// Maps a normalized error to the message shown to the user. Backend-provided
/// text is only surfaced when it reads like a sentence rather than a stack
/// trace.
pub fn error_message(error: &ApiError) -> String {
    match error {
        ApiError::Validation(_) => VALIDATION_EMPTY.to_string(),
        ApiError::Auth(_) => SESSION_EXPIRED.to_string(),
        ApiError::NotFound(message) => friendly_or(message, NOT_FOUND),
        ApiError::Server { .. } => SERVER_ERROR.to_string(),
        ApiError::Network(_) => NETWORK_ERROR.to_string(),
        ApiError::Unknown { message, .. } => friendly_or(message, GENERIC_ERROR),
    }
}

fn friendly_or(message: &str, fallback: &str) -> String {
    let technical = message.contains("Error:")
        || message.contains("Exception")
        || message.contains("Stack")
        || message.len() >= 100;
    if message.trim().is_empty() || technical {
        fallback.to_string()
    } else {
        message.to_string()
    }
}
