use async_trait::async_trait;
use chrono::Utc;

use crate::error::{require_non_blank, Error, Result};
use crate::model::{Comment, CommentId, Task, TaskId, TaskPatch};
use crate::storage::Storage;

use super::{sort_newest_first, sort_oldest_first, PersistenceAdapter};

/// Adapter over the local JSON entries.
///
/// Each mutation takes the store lock, rereads the affected entries and
/// rewrites them whole. Deleting a task removes its comments first, in the
/// same locked section.
#[derive(Debug, Clone)]
pub struct LocalAdapter {
    storage: Storage,
}

impl LocalAdapter {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    fn author_name(storage: &Storage, author_id: &str) -> Result<String> {
        storage
            .read_users()?
            .into_iter()
            .find(|record| record.user.id == author_id)
            .map(|record| record.user.name)
            .ok_or_else(|| Error::UserNotFound(author_id.to_string()))
    }
}

#[async_trait]
impl PersistenceAdapter for LocalAdapter {
    async fn list_tasks(&self, owner_id: &str) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .storage
            .read_tasks()?
            .into_iter()
            .filter(|task| task.owner_id == owner_id)
            .collect();
        sort_newest_first(&mut tasks);
        Ok(tasks)
    }

    async fn create_task(&self, owner_id: &str, text: &str) -> Result<Task> {
        let text = require_non_blank(text, "task text")?;
        self.storage.locked(|storage| {
            if !storage
                .read_users()?
                .iter()
                .any(|record| record.user.id == owner_id)
            {
                return Err(Error::UserNotFound(owner_id.to_string()));
            }
            let mut tasks = storage.read_tasks()?;
            let task = Task {
                id: storage.allocate_id()?,
                owner_id: owner_id.to_string(),
                text: text.to_string(),
                completed: false,
                created_at: Utc::now(),
                updated_at: None,
            };
            tasks.push(task.clone());
            storage.write_tasks(&tasks)?;
            tracing::debug!(task_id = task.id, owner_id, "local task created");
            Ok(task)
        })
    }

    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> Result<Task> {
        let patch = patch.normalized()?;
        self.storage.locked(|storage| {
            let mut tasks = storage.read_tasks()?;
            let task = tasks
                .iter_mut()
                .find(|task| task.id == id)
                .ok_or(Error::TaskNotFound(id))?;
            patch.apply(task);
            task.updated_at = Some(Utc::now());
            let updated = task.clone();
            storage.write_tasks(&tasks)?;
            Ok(updated)
        })
    }

    async fn delete_task(&self, id: TaskId) -> Result<bool> {
        self.storage.locked(|storage| {
            let mut tasks = storage.read_tasks()?;
            let before = tasks.len();
            tasks.retain(|task| task.id != id);
            if tasks.len() == before {
                return Err(Error::TaskNotFound(id));
            }

            let mut comments = storage.read_comments()?;
            let comments_before = comments.len();
            comments.retain(|comment| comment.task_id != id);
            if comments.len() != comments_before {
                storage.write_comments(&comments)?;
            }
            storage.write_tasks(&tasks)?;
            tracing::debug!(
                task_id = id,
                comments_removed = comments_before - comments.len(),
                "local task deleted"
            );
            Ok(true)
        })
    }

    async fn list_comments_for_owner(&self, owner_id: &str) -> Result<Vec<Comment>> {
        let task_ids: Vec<TaskId> = self
            .storage
            .read_tasks()?
            .into_iter()
            .filter(|task| task.owner_id == owner_id)
            .map(|task| task.id)
            .collect();
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut comments: Vec<Comment> = self
            .storage
            .read_comments()?
            .into_iter()
            .filter(|comment| task_ids.contains(&comment.task_id))
            .collect();
        sort_oldest_first(&mut comments);
        Ok(comments)
    }

    async fn create_comment(
        &self,
        task_id: TaskId,
        author_id: &str,
        content: &str,
    ) -> Result<Comment> {
        let content = require_non_blank(content, "comment")?;
        self.storage.locked(|storage| {
            if !storage.read_tasks()?.iter().any(|task| task.id == task_id) {
                return Err(Error::TaskNotFound(task_id));
            }
            let author_name = Self::author_name(storage, author_id)?;
            let mut comments = storage.read_comments()?;
            let comment = Comment {
                id: storage.allocate_id()?,
                task_id,
                author_id: author_id.to_string(),
                author_name,
                content: content.to_string(),
                created_at: Utc::now(),
            };
            comments.push(comment.clone());
            storage.write_comments(&comments)?;
            Ok(comment)
        })
    }

    async fn delete_comment(&self, id: CommentId) -> Result<bool> {
        self.storage.locked(|storage| {
            let mut comments = storage.read_comments()?;
            let before = comments.len();
            comments.retain(|comment| comment.id != id);
            if comments.len() == before {
                return Err(Error::CommentNotFound(id));
            }
            storage.write_comments(&comments)?;
            Ok(true)
        })
    }
}
