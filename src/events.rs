//! Event output for external integrations.
//!
//! Events are emitted as JSON lines to stdout or a configured file.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::User;
use crate::store::StoreEvent;

pub const EVENT_SCHEMA_VERSION: &str = "taskboard.event.v1";

#[derive(Debug, Clone)]
pub enum EventDestination {
    Stdout,
    File(PathBuf),
}

impl EventDestination {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|value| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return None;
            }
            if trimmed == "-" {
                return Some(EventDestination::Stdout);
            }
            Some(EventDestination::File(PathBuf::from(trimmed)))
        })
    }

    pub fn open(&self) -> Result<EventSink> {
        match self {
            EventDestination::Stdout => Ok(EventSink::stdout()),
            EventDestination::File(path) => EventSink::file(path),
        }
    }
}

/// Event kinds emitted by tb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TaskCreated,
    TaskUpdated,
    TaskDeleted,
    CommentCreated,
    CommentDeleted,
    StoreLoaded,
    StoreCleared,
    SessionChanged,
}

/// A structured event with optional payload.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub schema_version: &'static str,
    pub event: EventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Event {
    /// Build a new event with an optional payload.
    pub fn new(event: EventKind, actor: Option<String>) -> Self {
        Self {
            schema_version: EVENT_SCHEMA_VERSION,
            event,
            timestamp: Utc::now(),
            actor,
            data: None,
        }
    }

    /// Attach a serializable payload to the event.
    pub fn with_data<T: Serialize>(mut self, data: T) -> Result<Self> {
        self.data = Some(serde_json::to_value(data)?);
        Ok(self)
    }

    /// Event for a change applied by the task store.
    pub fn from_store(event: &StoreEvent, actor: Option<String>) -> Result<Self> {
        use serde_json::json;

        match event {
            StoreEvent::Loaded {
                owner_id,
                tasks,
                comments,
            } => Event::new(EventKind::StoreLoaded, actor).with_data(json!({
                "owner_id": owner_id,
                "tasks": tasks,
                "comments": comments,
            })),
            StoreEvent::Cleared => Ok(Event::new(EventKind::StoreCleared, actor)),
            StoreEvent::TaskAdded(task) => Event::new(EventKind::TaskCreated, actor).with_data(task),
            StoreEvent::TaskUpdated(task) => {
                Event::new(EventKind::TaskUpdated, actor).with_data(task)
            }
            StoreEvent::TaskRemoved {
                id,
                comments_removed,
            } => Event::new(EventKind::TaskDeleted, actor).with_data(json!({
                "task_id": id,
                "comments_removed": comments_removed,
            })),
            StoreEvent::CommentAdded(comment) => {
                Event::new(EventKind::CommentCreated, actor).with_data(comment)
            }
            StoreEvent::CommentRemoved { id, task_id } => Event::new(EventKind::CommentDeleted, actor)
                .with_data(json!({ "comment_id": id, "task_id": task_id })),
        }
    }

    /// Event for a sign-in, sign-out or user switch.
    pub fn session_changed(user: Option<&User>) -> Result<Self> {
        Event::new(EventKind::SessionChanged, user.map(|u| u.email.clone()))
            .with_data(serde_json::json!({ "user": user }))
    }
}

/// Event sink that writes JSONL output to a destination.
pub struct EventSink {
    writer: Box<dyn Write + Send>,
}

impl EventSink {
    /// Emit events to stdout.
    pub fn stdout() -> Self {
        Self {
            writer: Box::new(std::io::stdout()),
        }
    }

    /// Emit events to a file, creating it if necessary.
    pub fn file(path: &Path) -> Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            writer: Box::new(file),
        })
    }

    /// Write a single event as JSONL.
    pub fn emit(&mut self, event: &Event) -> Result<()> {
        let serialized = serde_json::to_vec(event)?;
        self.writer.write_all(&serialized)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush().map_err(Error::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn destination_parse_handles_dash_and_blank() {
        assert!(matches!(EventDestination::parse(Some("-")), Some(EventDestination::Stdout)));
        assert!(EventDestination::parse(Some("  ")).is_none());
        assert!(EventDestination::parse(None).is_none());
    }

    #[test]
    fn file_sink_appends_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.jsonl");
        let mut sink = EventSink::file(&path).unwrap();
        let removed = StoreEvent::TaskRemoved {
            id: 4,
            comments_removed: 2,
        };
        sink.emit(&Event::from_store(&removed, Some("ann@example.com".into())).unwrap())
            .unwrap();
        sink.emit(&Event::session_changed(None).unwrap()).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = raw
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "task_deleted");
        assert_eq!(lines[0]["data"]["comments_removed"], 2);
        assert_eq!(lines[1]["event"], "session_changed");
        assert_eq!(lines[1]["schema_version"], EVENT_SCHEMA_VERSION);
    }
}
