//! Storage layer for taskboard
//!
//! The local backend keeps one JSON document per named entry in the data
//! directory. Each entry is rewritten in full whenever its collection
//! changes.
//!
//! # Directory Structure
//!
//! ```text
//! <data dir>/
//!   .taskboard.toml     # Optional configuration
//!   users.json          # Registered local users (with password hashes)
//!   tasks.json          # Every user's tasks
//!   comments.json       # Every task's comments
//!   current_user        # Id of the active local user
//!   next_id.json        # Next task/comment id
//!   session.json        # Hosted-backend session (remote backend only)
//!   store.lock          # Guards read-modify-write of the entries above
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::Result;
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::model::{Comment, Task, User};

const USERS_FILE: &str = "users.json";
const TASKS_FILE: &str = "tasks.json";
const COMMENTS_FILE: &str = "comments.json";
const CURRENT_USER_FILE: &str = "current_user";
const NEXT_ID_FILE: &str = "next_id.json";
const SESSION_FILE: &str = "session.json";
const LOCK_FILE: &str = "store.lock";

/// A locally registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUser {
    #[serde(flatten)]
    pub user: User,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Storage manager for the data directory
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn users_file(&self) -> PathBuf {
        self.root.join(USERS_FILE)
    }

    pub fn tasks_file(&self) -> PathBuf {
        self.root.join(TASKS_FILE)
    }

    pub fn comments_file(&self) -> PathBuf {
        self.root.join(COMMENTS_FILE)
    }

    pub fn current_user_file(&self) -> PathBuf {
        self.root.join(CURRENT_USER_FILE)
    }

    pub fn next_id_file(&self) -> PathBuf {
        self.root.join(NEXT_ID_FILE)
    }

    pub fn session_file(&self) -> PathBuf {
        self.root.join(SESSION_FILE)
    }

    pub fn lock_file(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    // =========================================================================
    // File I/O helpers
    // =========================================================================

    /// Serialize `data` and atomically replace `path`.
    pub fn write_json<T: Serialize + ?Sized>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic(path, json.as_bytes())
    }

    /// Read a JSON entry; a missing file reads as `T::default()`.
    pub fn read_json<T: DeserializeOwned + Default>(&self, path: &Path) -> Result<T> {
        if !path.exists() {
            return Ok(T::default());
        }
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(T::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Run `f` while holding the store lock.
    pub fn locked<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Storage) -> Result<T>,
    {
        self.init()?;
        let _lock = FileLock::acquire(self.lock_file(), DEFAULT_LOCK_TIMEOUT_MS)?;
        f(self)
    }

    // =========================================================================
    // Named entries
    // =========================================================================

    pub fn read_users(&self) -> Result<Vec<StoredUser>> {
        self.read_json(&self.users_file())
    }

    pub fn write_users(&self, users: &[StoredUser]) -> Result<()> {
        self.write_json(&self.users_file(), users)
    }

    pub fn read_tasks(&self) -> Result<Vec<Task>> {
        self.read_json(&self.tasks_file())
    }

    pub fn write_tasks(&self, tasks: &[Task]) -> Result<()> {
        self.write_json(&self.tasks_file(), tasks)
    }

    pub fn read_comments(&self) -> Result<Vec<Comment>> {
        self.read_json(&self.comments_file())
    }

    pub fn write_comments(&self, comments: &[Comment]) -> Result<()> {
        self.write_json(&self.comments_file(), comments)
    }

    pub fn read_current_user(&self) -> Option<String> {
        fs::read_to_string(self.current_user_file())
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn write_current_user(&self, user_id: &str) -> Result<()> {
        self.init()?;
        lock::write_atomic(self.current_user_file(), format!("{user_id}\n").as_bytes())
    }

    pub fn clear_current_user(&self) -> Result<()> {
        remove_if_exists(&self.current_user_file())
    }

    /// Hand out the next id. Caller must hold the store lock.
    pub fn allocate_id(&self) -> Result<i64> {
        let path = self.next_id_file();
        let next: i64 = self.read_json::<Option<i64>>(&path)?.unwrap_or(1).max(1);
        self.write_json(&path, &(next + 1))?;
        Ok(next)
    }

    pub fn read_session<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.read_json(&self.session_file())
    }

    pub fn write_session<T: Serialize>(&self, session: &T) -> Result<()> {
        self.init()?;
        self.write_json(&self.session_file(), session)
    }

    pub fn clear_session(&self) -> Result<()> {
        remove_if_exists(&self.session_file())
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn storage() -> (TempDir, Storage) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("data"));
        (dir, storage)
    }

    #[test]
    fn missing_entries_read_as_empty() {
        let (_dir, storage) = storage();
        assert!(storage.read_tasks().unwrap().is_empty());
        assert!(storage.read_users().unwrap().is_empty());
        assert!(storage.read_current_user().is_none());
    }

    #[test]
    fn ids_are_strictly_increasing() {
        let (_dir, storage) = storage();
        let ids: Vec<i64> = (0..3)
            .map(|_| storage.locked(|s| s.allocate_id()).unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn current_user_round_trip_and_clear() {
        let (_dir, storage) = storage();
        storage.write_current_user("u-1").unwrap();
        assert_eq!(storage.read_current_user().as_deref(), Some("u-1"));

        storage.clear_current_user().unwrap();
        storage.clear_current_user().unwrap();
        assert!(storage.read_current_user().is_none());
    }

    #[test]
    fn stored_user_flattens_profile() {
        let record = StoredUser {
            user: User {
                id: "u-1".to_string(),
                name: "Ann".to_string(),
                email: "ann@example.com".to_string(),
            },
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["email"], "ann@example.com");
        assert_eq!(value["password_hash"], "hash");
    }
}
