//! In-memory tasks and comments for the signed-in user.
//!
//! The store is the only mutator of its collections. Every mutation goes to
//! the adapter first and is applied here only after the adapter confirms;
//! a failed call is logged, leaves the collections untouched, and comes
//! back as `Err`. Listeners registered with [`TaskStore::subscribe`] see a
//! [`StoreEvent`] after each applied change.

use std::sync::Arc;

use crate::adapter::PersistenceAdapter;
use crate::error::{require_non_blank, Error, Result};
use crate::model::{Comment, CommentId, Task, TaskId, TaskPatch};

#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Loaded { owner_id: String, tasks: usize, comments: usize },
    Cleared,
    TaskAdded(Task),
    TaskUpdated(Task),
    TaskRemoved { id: TaskId, comments_removed: usize },
    CommentAdded(Comment),
    CommentRemoved { id: CommentId, task_id: TaskId },
}

/// What a [`TaskStore::load`] managed to fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub tasks_loaded: bool,
    pub comments_loaded: bool,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.tasks_loaded && self.comments_loaded
    }
}

type Listener = Box<dyn FnMut(&StoreEvent) + Send>;

pub struct TaskStore {
    adapter: Arc<dyn PersistenceAdapter>,
    owner_id: Option<String>,
    tasks: Vec<Task>,
    comments: Vec<Comment>,
    listeners: Vec<Listener>,
}

impl TaskStore {
    pub fn new(adapter: Arc<dyn PersistenceAdapter>) -> Self {
        Self {
            adapter,
            owner_id: None,
            tasks: Vec::new(),
            comments: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&StoreEvent) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    /// Tasks, newest first.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// All loaded comments, oldest first.
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Comments on `task_id` in chronological order.
    pub fn comments_for(&self, task_id: TaskId) -> Vec<&Comment> {
        self.comments
            .iter()
            .filter(|comment| comment.task_id == task_id)
            .collect()
    }

    /// Replace the contents with `owner_id`'s tasks and comments.
    ///
    /// Both lists are fetched concurrently. A list that fails to load is
    /// logged and left empty; the store never holds a half-replaced set.
    pub async fn load(&mut self, owner_id: &str) -> LoadReport {
        let adapter = Arc::clone(&self.adapter);
        let (tasks, comments) = tokio::join!(
            adapter.list_tasks(owner_id),
            adapter.list_comments_for_owner(owner_id)
        );

        let mut report = LoadReport::default();
        self.tasks = match tasks {
            Ok(tasks) => {
                report.tasks_loaded = true;
                tasks
            }
            Err(err) => {
                tracing::warn!(owner_id, error = %err, "failed to load tasks");
                Vec::new()
            }
        };
        self.comments = match comments {
            Ok(comments) => {
                report.comments_loaded = true;
                comments
            }
            Err(err) => {
                tracing::warn!(owner_id, error = %err, "failed to load comments");
                Vec::new()
            }
        };
        self.owner_id = Some(owner_id.to_string());

        tracing::debug!(
            owner_id,
            tasks = self.tasks.len(),
            comments = self.comments.len(),
            "store loaded"
        );
        self.notify(StoreEvent::Loaded {
            owner_id: owner_id.to_string(),
            tasks: self.tasks.len(),
            comments: self.comments.len(),
        });
        report
    }

    /// Drop everything, e.g. after sign-out.
    pub fn clear(&mut self) {
        self.owner_id = None;
        self.tasks.clear();
        self.comments.clear();
        self.notify(StoreEvent::Cleared);
    }

    pub async fn add_task(&mut self, text: &str) -> Result<Task> {
        let owner_id = self.require_owner()?;
        let text = require_non_blank(text, "task text")?;
        let task = logged("add task", self.adapter.create_task(&owner_id, text).await)?;
        self.tasks.insert(0, task.clone());
        self.notify(StoreEvent::TaskAdded(task.clone()));
        Ok(task)
    }

    pub async fn toggle_task(&mut self, id: TaskId) -> Result<Task> {
        self.require_owner()?;
        let current = self.require_task(id)?.completed;
        let result = self.adapter.toggle_task_completion(id, current).await;
        let task = logged("toggle task", result)?;
        self.replace_task(task.clone());
        Ok(task)
    }

    pub async fn update_task(&mut self, id: TaskId, patch: TaskPatch) -> Result<Task> {
        self.require_owner()?;
        self.require_task(id)?;
        let patch = patch.normalized()?;
        if patch.is_empty() {
            return Err(Error::InvalidArgument("nothing to update".to_string()));
        }
        let task = logged("update task", self.adapter.update_task(id, patch).await)?;
        self.replace_task(task.clone());
        Ok(task)
    }

    /// Delete a task and every comment on it.
    pub async fn remove_task(&mut self, id: TaskId) -> Result<()> {
        self.require_owner()?;
        self.require_task(id)?;
        logged("remove task", self.adapter.delete_task(id).await)?;

        self.tasks.retain(|task| task.id != id);
        let before = self.comments.len();
        self.comments.retain(|comment| comment.task_id != id);
        self.notify(StoreEvent::TaskRemoved {
            id,
            comments_removed: before - self.comments.len(),
        });
        Ok(())
    }

    pub async fn add_comment(&mut self, task_id: TaskId, content: &str) -> Result<Comment> {
        let owner_id = self.require_owner()?;
        let content = require_non_blank(content, "comment")?;
        self.require_task(task_id)?;
        let result = self
            .adapter
            .create_comment(task_id, &owner_id, content)
            .await;
        let comment = logged("add comment", result)?;
        self.comments.push(comment.clone());
        self.notify(StoreEvent::CommentAdded(comment.clone()));
        Ok(comment)
    }

    pub async fn remove_comment(&mut self, id: CommentId) -> Result<()> {
        self.require_owner()?;
        let task_id = self
            .comments
            .iter()
            .find(|comment| comment.id == id)
            .map(|comment| comment.task_id)
            .ok_or(Error::CommentNotFound(id))?;
        logged("remove comment", self.adapter.delete_comment(id).await)?;
        self.comments.retain(|comment| comment.id != id);
        self.notify(StoreEvent::CommentRemoved { id, task_id });
        Ok(())
    }

    fn require_owner(&self) -> Result<String> {
        self.owner_id.clone().ok_or(Error::Unauthenticated)
    }

    /// Only tasks loaded for the current owner can be touched.
    fn require_task(&self, id: TaskId) -> Result<&Task> {
        self.task(id).ok_or(Error::TaskNotFound(id))
    }

    fn replace_task(&mut self, task: Task) {
        if let Some(slot) = self.tasks.iter_mut().find(|t| t.id == task.id) {
            *slot = task.clone();
        }
        self.notify(StoreEvent::TaskUpdated(task));
    }

    fn notify(&mut self, event: StoreEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }
}

fn logged<T>(operation: &str, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        tracing::warn!(operation, error = %err, "store operation failed; state unchanged");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::LocalAdapter;
    use crate::config::SessionConfig;
    use crate::session::{LocalSession, SessionProvider};
    use crate::storage::Storage;
    use std::sync::Mutex;
    use tempfile::TempDir;

    async fn store_for_new_user(dir: &TempDir) -> TaskStore {
        let storage = Storage::new(dir.path());
        let session = LocalSession::open(storage.clone(), SessionConfig::default()).unwrap();
        let user = session.sign_up("ann@example.com", "secret1", "Ann").await.unwrap();
        let mut store = TaskStore::new(Arc::new(LocalAdapter::new(storage)));
        store.load(&user.id).await;
        store
    }

    #[tokio::test]
    async fn mutations_without_owner_are_unauthenticated() {
        let dir = TempDir::new().unwrap();
        let mut store = TaskStore::new(Arc::new(LocalAdapter::new(Storage::new(dir.path()))));
        assert!(matches!(store.add_task("x").await, Err(Error::Unauthenticated)));
        assert!(matches!(store.toggle_task(1).await, Err(Error::Unauthenticated)));
    }

    #[tokio::test]
    async fn add_task_prepends_and_blank_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut store = store_for_new_user(&dir).await;
        let first = store.add_task("first").await.unwrap();
        let second = store.add_task("  second ").await.unwrap();
        assert_eq!(second.text, "second");
        assert!(!second.completed);

        assert!(matches!(store.add_task("   ").await, Err(Error::Validation(_))));
        let ids: Vec<TaskId> = store.tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn listeners_see_each_applied_change() {
        let dir = TempDir::new().unwrap();
        let mut store = store_for_new_user(&dir).await;
        let seen: Arc<Mutex<Vec<StoreEvent>>> = Arc::default();
        let sink = Arc::clone(&seen);
        store.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        let task = store.add_task("t").await.unwrap();
        let _ = store.add_comment(task.id, "").await;
        store.remove_task(task.id).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(matches!(seen[0], StoreEvent::TaskAdded(_)));
        assert_eq!(
            seen[1],
            StoreEvent::TaskRemoved {
                id: task.id,
                comments_removed: 0
            }
        );
    }

    #[tokio::test]
    async fn unknown_ids_leave_state_untouched() {
        let dir = TempDir::new().unwrap();
        let mut store = store_for_new_user(&dir).await;
        store.add_task("keep").await.unwrap();
        let before = store.tasks().to_vec();

        assert!(matches!(store.toggle_task(999).await, Err(Error::TaskNotFound(999))));
        assert!(matches!(store.remove_comment(5).await, Err(Error::CommentNotFound(5))));
        assert_eq!(store.tasks(), before.as_slice());
    }
}
