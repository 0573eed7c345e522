//! Records shared by every backend: users, tasks and comments.
//!
//! Field names match the column names of the hosted tables (`user_id`,
//! `user_name`) so rows deserialize straight into these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{require_non_blank, Result};

pub type TaskId = i64;
pub type CommentId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    #[serde(rename = "user_id")]
    pub owner_id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Column this task currently sits in.
    pub fn column(&self) -> Column {
        Column::for_completed(self.completed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: CommentId,
    pub task_id: TaskId,
    #[serde(rename = "user_id")]
    pub author_id: String,
    /// Author's display name when the comment was written.
    #[serde(rename = "user_name")]
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Partial task update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            text: None,
            completed: Some(completed),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            completed: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.completed.is_none()
    }

    /// Trim text and reject blank values.
    pub fn normalized(self) -> Result<Self> {
        let text = match self.text {
            Some(text) => Some(require_non_blank(&text, "task text")?.to_string()),
            None => None,
        };
        Ok(Self {
            text,
            completed: self.completed,
        })
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(text) = &self.text {
            task.text = text.clone();
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
    }
}

/// Partial profile update for the signed-in user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ProfilePatch {
    pub fn normalized(self) -> Result<Self> {
        let name = match self.name {
            Some(name) => Some(require_non_blank(&name, "name")?.to_string()),
            None => None,
        };
        let email = match self.email {
            Some(email) => Some(require_non_blank(&email, "email")?.to_lowercase()),
            None => None,
        };
        Ok(Self { name, email })
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
    }
}

/// Board column. Each column implies one value of `completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Incomplete,
    Complete,
}

impl Column {
    pub fn for_completed(completed: bool) -> Self {
        if completed {
            Column::Complete
        } else {
            Column::Incomplete
        }
    }

    pub fn implies_completed(self) -> bool {
        matches!(self, Column::Complete)
    }

    pub fn other(self) -> Self {
        match self {
            Column::Incomplete => Column::Complete,
            Column::Complete => Column::Incomplete,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "incomplete" | "todo" | "open" => Some(Column::Incomplete),
            "complete" | "done" | "completed" => Some(Column::Complete),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_round_trips_hosted_column_names() {
        let json = r#"{"id":7,"user_id":"u1","text":"buy milk","completed":false,"created_at":"2024-05-01T10:00:00Z"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.owner_id, "u1");
        assert_eq!(task.column(), Column::Incomplete);

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["user_id"], "u1");
        assert!(value.get("updated_at").is_none());
    }

    #[test]
    fn patch_rejects_blank_text() {
        let err = TaskPatch::text("   ").normalized().unwrap_err();
        assert!(matches!(err, crate::Error::Validation(_)));

        let patch = TaskPatch::text("  walk dog ").normalized().unwrap();
        assert_eq!(patch.text.as_deref(), Some("walk dog"));
    }

    #[test]
    fn column_parse_accepts_board_titles() {
        assert_eq!(Column::parse("Done"), Some(Column::Complete));
        assert_eq!(Column::parse("todo"), Some(Column::Incomplete));
        assert_eq!(Column::parse("later"), None);
        assert_eq!(Column::Complete.other(), Column::Incomplete);
    }
}
