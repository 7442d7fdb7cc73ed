//! Task Stream Records
//!
//! Wire types for the Corvin server's task progress streams. Each data
//! payload on `/stream/tasks` is one JSON-encoded [`TaskEvent`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle stage of a download task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Downloading,
    Processing,
    Done,
    Failed,
}

impl TaskStatus {
    /// Whether the task will receive no further updates.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Downloading => write!(f, "downloading"),
            Self::Processing => write!(f, "processing"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Progress update for a single download task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    pub id: u64,
    pub status: TaskStatus,
    /// Percent complete, when the server knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Human-readable detail (error text for failed tasks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_minimal_payload() {
        let event: TaskEvent = serde_json::from_str(r#"{"id":1,"status":"done"}"#).unwrap();
        assert_eq!(event.id, 1);
        assert_eq!(event.status, TaskStatus::Done);
        assert!(event.progress.is_none());
        assert!(event.title.is_none());
    }

    #[test]
    fn decodes_full_payload() {
        let event: TaskEvent = serde_json::from_str(
            r#"{"id":9,"status":"downloading","progress":42.5,"title":"talk.mp4","detail":"480p"}"#,
        )
        .unwrap();
        assert_eq!(event.status, TaskStatus::Downloading);
        assert_eq!(event.progress, Some(42.5));
        assert_eq!(event.title.as_deref(), Some("talk.mp4"));
        assert_eq!(event.detail.as_deref(), Some("480p"));
    }

    #[test]
    fn tolerates_unknown_fields() {
        let event: TaskEvent =
            serde_json::from_str(r#"{"id":2,"status":"queued","extra":{"nested":true}}"#).unwrap();
        assert_eq!(event.status, TaskStatus::Queued);
    }

    #[test]
    fn rejects_unknown_status() {
        assert!(serde_json::from_str::<TaskEvent>(r#"{"id":3,"status":"paused"}"#).is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(TaskStatus::Done.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Queued.is_terminal());
        assert!(!TaskStatus::Downloading.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
    }

    #[test]
    fn status_display_matches_wire_form() {
        assert_eq!(TaskStatus::Downloading.to_string(), "downloading");
        assert_eq!(
            serde_json::to_string(&TaskStatus::Downloading).unwrap(),
            "\"downloading\"",
        );
    }
}
