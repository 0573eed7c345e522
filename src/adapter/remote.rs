use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::{require_non_blank, Error, Result};
use crate::model::{Comment, CommentId, Task, TaskId, TaskPatch};
use crate::remote::{
    decode_row, decode_rows, Query, RemoteClient, COMMENTS_TABLE, TASKS_TABLE, USERS_TABLE,
};

use super::{sort_newest_first, sort_oldest_first, PersistenceAdapter};

/// Adapter over the hosted `tasks` and `comments` tables.
///
/// Deleting a task relies on the backend's `ON DELETE CASCADE` to remove
/// its comments. Comments for an owner are fetched in two steps (task ids,
/// then comments in that id set) because the query API has no joins.
pub struct RemoteAdapter {
    client: Arc<RemoteClient>,
}

#[derive(Deserialize)]
struct IdRow {
    id: TaskId,
}

#[derive(Deserialize)]
struct NameRow {
    name: String,
}

impl RemoteAdapter {
    pub fn new(client: Arc<RemoteClient>) -> Self {
        Self { client }
    }

    async fn author_name(&self, author_id: &str) -> Result<String> {
        let query = Query::from(USERS_TABLE)
            .select(&["name"])
            .eq("id", author_id);
        let rows = self.client.select(&query).await?;
        let row: NameRow = rows
            .into_iter()
            .next()
            .map(decode_row)
            .transpose()?
            .ok_or_else(|| Error::UserNotFound(author_id.to_string()))?;
        Ok(row.name)
    }

    async fn task_exists(&self, id: TaskId) -> Result<bool> {
        let query = Query::from(TASKS_TABLE).select(&["id"]).eq("id", id);
        Ok(!self.client.select(&query).await?.is_empty())
    }
}

#[async_trait]
impl PersistenceAdapter for RemoteAdapter {
    async fn list_tasks(&self, owner_id: &str) -> Result<Vec<Task>> {
        let query = Query::from(TASKS_TABLE)
            .eq("user_id", owner_id)
            .order("created_at", false);
        let mut tasks: Vec<Task> = decode_rows(self.client.select(&query).await?)?;
        sort_newest_first(&mut tasks);
        Ok(tasks)
    }

    async fn create_task(&self, owner_id: &str, text: &str) -> Result<Task> {
        let text = require_non_blank(text, "task text")?;
        let row = json!({
            "user_id": owner_id,
            "text": text,
            "completed": false,
        });
        let task: Task = decode_row(self.client.insert(TASKS_TABLE, row).await?)?;
        tracing::debug!(task_id = task.id, owner_id, "remote task created");
        Ok(task)
    }

    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> Result<Task> {
        let patch = patch.normalized()?;
        let mut changes = Map::new();
        if let Some(text) = &patch.text {
            changes.insert("text".to_string(), Value::String(text.clone()));
        }
        if let Some(completed) = patch.completed {
            changes.insert("completed".to_string(), Value::Bool(completed));
        }
        let query = Query::from(TASKS_TABLE).eq("id", id);
        let rows = self.client.update(&query, Value::Object(changes)).await?;
        decode_rows::<Task>(rows)?
            .into_iter()
            .next()
            .ok_or(Error::TaskNotFound(id))
    }

    async fn delete_task(&self, id: TaskId) -> Result<bool> {
        let query = Query::from(TASKS_TABLE).eq("id", id);
        match self.client.delete(&query).await? {
            0 => Err(Error::TaskNotFound(id)),
            _ => Ok(true),
        }
    }

    async fn list_comments_for_owner(&self, owner_id: &str) -> Result<Vec<Comment>> {
        let ids_query = Query::from(TASKS_TABLE)
            .select(&["id"])
            .eq("user_id", owner_id);
        let task_ids: Vec<TaskId> = decode_rows::<IdRow>(self.client.select(&ids_query).await?)?
            .into_iter()
            .map(|row| row.id)
            .collect();
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = Query::from(COMMENTS_TABLE)
            .in_set("task_id", task_ids)
            .order("created_at", true);
        let mut comments: Vec<Comment> = decode_rows(self.client.select(&query).await?)?;
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
        self.client.token()?;
        if !self.task_exists(task_id).await? {
            return Err(Error::TaskNotFound(task_id));
        }
        let author_name = self.author_name(author_id).await?;
        let row = json!({
            "task_id": task_id,
            "user_id": author_id,
            "user_name": author_name,
            "content": content,
        });
        decode_row(self.client.insert(COMMENTS_TABLE, row).await?)
    }

    async fn delete_comment(&self, id: CommentId) -> Result<bool> {
        let query = Query::from(COMMENTS_TABLE).eq("id", id);
        match self.client.delete(&query).await? {
            0 => Err(Error::CommentNotFound(id)),
            _ => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{Backend, MemoryBackend};

    async fn signed_in(backend: &Arc<MemoryBackend>, email: &str, name: &str) -> Arc<RemoteClient> {
        let client = Arc::new(RemoteClient::new(backend.clone()));
        let session = backend.sign_up(email, "secret1", name).await.unwrap();
        client.set_session(Some(session)).unwrap();
        client
    }

    #[tokio::test]
    async fn comments_join_through_owned_tasks() {
        let backend = Arc::new(MemoryBackend::new());
        let client = signed_in(&backend, "ann@example.com", "Ann").await;
        let owner = client.current_user().unwrap().id;
        let adapter = RemoteAdapter::new(client);

        assert!(adapter.list_comments_for_owner(&owner).await.unwrap().is_empty());

        let task = adapter.create_task(&owner, "buy milk").await.unwrap();
        let first = adapter.create_comment(task.id, &owner, "get 2%").await.unwrap();
        let second = adapter.create_comment(task.id, &owner, "and bread").await.unwrap();
        assert_eq!(first.author_name, "Ann");

        let ids: Vec<CommentId> = adapter
            .list_comments_for_owner(&owner)
            .await
            .unwrap()
            .iter()
            .map(|comment| comment.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn delete_relies_on_backend_cascade() {
        let backend = Arc::new(MemoryBackend::new());
        let client = signed_in(&backend, "ann@example.com", "Ann").await;
        let owner = client.current_user().unwrap().id;
        let adapter = RemoteAdapter::new(client);

        let task = adapter.create_task(&owner, "t").await.unwrap();
        adapter.create_comment(task.id, &owner, "c").await.unwrap();
        assert!(adapter.delete_task(task.id).await.unwrap());
        assert_eq!(backend.row_count(COMMENTS_TABLE), 0);
        assert!(matches!(
            adapter.delete_task(task.id).await,
            Err(Error::TaskNotFound(_))
        ));
    }

    #[tokio::test]
    async fn missing_task_and_missing_session_are_reported() {
        let backend = Arc::new(MemoryBackend::new());
        let client = signed_in(&backend, "ann@example.com", "Ann").await;
        let owner = client.current_user().unwrap().id;
        let adapter = RemoteAdapter::new(client.clone());

        assert!(matches!(
            adapter.create_comment(404, &owner, "hello").await,
            Err(Error::TaskNotFound(404))
        ));
        assert!(matches!(
            adapter.update_task(404, TaskPatch::completed(true)).await,
            Err(Error::TaskNotFound(404))
        ));

        client.set_session(None).unwrap();
        assert!(matches!(
            adapter.create_comment(1, &owner, "hello").await,
            Err(Error::Unauthenticated)
        ));
    }
}
