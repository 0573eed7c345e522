//! Persistence adapters: the one capability set the task store talks to.
//!
//! Two implementations share the [`PersistenceAdapter`] trait:
//! - [`LocalAdapter`]: JSON entries in the data directory
//! - [`RemoteAdapter`]: tables on the hosted backend
//!
//! Every call is owner-scoped where it matters and returns an explicit
//! `Result`; nothing here touches in-memory state.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Comment, CommentId, Task, TaskId, TaskPatch};

mod local;
mod remote;

pub use local::LocalAdapter;
pub use remote::RemoteAdapter;

#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Tasks owned by `owner_id`, newest first.
    async fn list_tasks(&self, owner_id: &str) -> Result<Vec<Task>>;

    /// Create an incomplete task. Assigns `id` and `created_at`.
    async fn create_task(&self, owner_id: &str, text: &str) -> Result<Task>;

    /// Apply `patch`. Fails with `TaskNotFound` for unknown ids.
    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> Result<Task>;

    /// Delete the task and every comment on it.
    async fn delete_task(&self, id: TaskId) -> Result<bool>;

    /// Comments on tasks owned by `owner_id`, oldest first.
    async fn list_comments_for_owner(&self, owner_id: &str) -> Result<Vec<Comment>>;

    /// Create a comment, snapshotting the author's current name.
    async fn create_comment(&self, task_id: TaskId, author_id: &str, content: &str)
        -> Result<Comment>;

    async fn delete_comment(&self, id: CommentId) -> Result<bool>;

    async fn toggle_task_completion(&self, id: TaskId, current: bool) -> Result<Task> {
        self.update_task(id, TaskPatch::completed(!current)).await
    }
}

/// Sort newest first, ties broken by id so the order is total.
pub(crate) fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// Sort oldest first, ties broken by id.
pub(crate) fn sort_oldest_first(comments: &mut [Comment]) {
    comments.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
