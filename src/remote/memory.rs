use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{require_non_blank, Error, Result};
use crate::model::User;
use crate::session::password;

use super::{AuthSession, Backend, Query, COMMENTS_TABLE, TASKS_TABLE, USERS_TABLE};

struct Account {
    user_id: String,
    email: String,
    password_hash: String,
}

#[derive(Default)]
struct State {
    accounts: Vec<Account>,
    tokens: HashMap<String, String>,
    tables: HashMap<String, Vec<Value>>,
    next_ids: HashMap<String, i64>,
    offline: bool,
}

/// In-process backend with the hosted service's table semantics.
///
/// Rows are only visible to their owner (comments through their task),
/// comment inserts need an existing task, and deleting a task deletes its
/// comments. `set_offline(true)` makes every table call fail the way an
/// unreachable service does.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        {
            let mut state = backend.lock();
            for table in [USERS_TABLE, TASKS_TABLE, COMMENTS_TABLE] {
                state.tables.insert(table.to_string(), Vec::new());
            }
        }
        backend
    }

    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Drop every issued token, as if all sessions expired.
    pub fn expire_sessions(&self) {
        self.lock().tokens.clear();
    }

    /// Total rows in `table`, ignoring row-level scoping.
    pub fn row_count(&self, table: &str) -> usize {
        self.lock().tables.get(table).map(Vec::len).unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl State {
    fn user_for_token(&self, token: &str) -> Result<String> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(Error::Unauthenticated)
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline {
            return Err(Error::Persistence("backend unreachable".to_string()));
        }
        Ok(())
    }

    fn table(&self, name: &str) -> Result<&Vec<Value>> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::Persistence(format!("relation \"{name}\" does not exist")))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Vec<Value>> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::Persistence(format!("relation \"{name}\" does not exist")))
    }

    fn next_id(&mut self, table: &str) -> i64 {
        let next = self.next_ids.entry(table.to_string()).or_insert(1);
        let id = *next;
        *next += 1;
        id
    }

    fn task_owner(&self, task_id: &Value) -> Option<String> {
        self.tables.get(TASKS_TABLE).and_then(|tasks| {
            tasks
                .iter()
                .find(|task| task.get("id") == Some(task_id))
                .and_then(|task| task.get("user_id"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
    }

    /// Row-level policy: can `user_id` see this row?
    fn visible(&self, table: &str, row: &Value, user_id: &str) -> bool {
        let owner = match table {
            USERS_TABLE => row.get("id").and_then(Value::as_str).map(str::to_string),
            TASKS_TABLE => row.get("user_id").and_then(Value::as_str).map(str::to_string),
            COMMENTS_TABLE => row.get("task_id").and_then(|id| self.task_owner(id)),
            _ => None,
        };
        owner.as_deref() == Some(user_id)
    }

    fn session_for(&mut self, user_id: &str) -> Result<AuthSession> {
        let user = self
            .table(USERS_TABLE)?
            .iter()
            .find(|row| row.get("id").and_then(Value::as_str) == Some(user_id))
            .cloned()
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))?;
        let user: User = serde_json::from_value(user)?;
        let token = Uuid::new_v4().to_string();
        self.tokens.insert(token.clone(), user_id.to_string());
        Ok(AuthSession {
            access_token: token,
            user,
        })
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn compare_cells(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => {
            match (a.parse::<DateTime<Utc>>(), b.parse::<DateTime<Utc>>()) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => a.cmp(b),
            }
        }
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn rejected(reason: &str) -> Error {
    Error::Persistence(format!("new row violates {reason}"))
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<AuthSession> {
        let email = require_non_blank(email, "email")?.to_lowercase();
        let name = require_non_blank(name, "name")?;
        password::check_strength(password)?;

        let mut state = self.lock();
        if state.accounts.iter().any(|account| account.email == email) {
            return Err(Error::DuplicateEmail(email));
        }
        let user_id = Uuid::new_v4().to_string();
        state.accounts.push(Account {
            user_id: user_id.clone(),
            email: email.clone(),
            password_hash: password::hash_password(password)?,
        });
        state.table_mut(USERS_TABLE)?.push(json!({
            "id": user_id,
            "name": name,
            "email": email,
            "created_at": timestamp(),
        }));
        state.session_for(&user_id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let email = email.trim().to_lowercase();
        let mut state = self.lock();
        let user_id = state
            .accounts
            .iter()
            .find(|account| account.email == email)
            .filter(|account| {
                password::verify_password(password, &account.password_hash).unwrap_or(false)
            })
            .map(|account| account.user_id.clone())
            .ok_or(Error::InvalidCredentials)?;
        state.session_for(&user_id)
    }

    async fn sign_out(&self, token: &str) -> Result<()> {
        self.lock().tokens.remove(token);
        Ok(())
    }

    async fn get_user(&self, token: &str) -> Result<User> {
        let state = self.lock();
        let user_id = state.user_for_token(token)?;
        let row = state
            .table(USERS_TABLE)?
            .iter()
            .find(|row| row.get("id").and_then(Value::as_str) == Some(user_id.as_str()))
            .cloned()
            .ok_or(Error::Unauthenticated)?;
        Ok(serde_json::from_value(row)?)
    }

    async fn select(&self, token: &str, query: &Query) -> Result<Vec<Value>> {
        let state = self.lock();
        state.ensure_online()?;
        let user_id = state.user_for_token(token)?;
        let mut rows: Vec<Value> = state
            .table(&query.table)?
            .iter()
            .filter(|row| state.visible(&query.table, row, &user_id) && query.matches(row))
            .cloned()
            .collect();
        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_cells(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }
        Ok(rows.iter().map(|row| query.project(row)).collect())
    }

    async fn insert(&self, token: &str, table: &str, row: Value) -> Result<Value> {
        let mut state = self.lock();
        state.ensure_online()?;
        let user_id = state.user_for_token(token)?;
        let Value::Object(mut row) = row else {
            return Err(Error::Persistence("row must be a JSON object".to_string()));
        };

        match table {
            TASKS_TABLE => {
                if row.get("user_id").and_then(Value::as_str) != Some(user_id.as_str()) {
                    return Err(rejected("row-level security policy for table \"tasks\""));
                }
                row.entry("completed").or_insert(Value::Bool(false));
            }
            COMMENTS_TABLE => {
                let task_id = row.get("task_id").cloned().unwrap_or(Value::Null);
                match state.task_owner(&task_id) {
                    None => return Err(rejected("foreign key constraint \"comments_task_id_fkey\"")),
                    Some(owner) if owner != user_id => {
                        return Err(rejected("row-level security policy for table \"comments\""))
                    }
                    Some(_) => {}
                }
                if row.get("user_id").and_then(Value::as_str) != Some(user_id.as_str()) {
                    return Err(rejected("row-level security policy for table \"comments\""));
                }
            }
            _ => {
                state.table(table)?;
                return Err(rejected(&format!("row-level security policy for table \"{table}\"")));
            }
        }

        let id = state.next_id(table);
        row.insert("id".to_string(), json!(id));
        row.insert("created_at".to_string(), json!(timestamp()));
        let row = Value::Object(row);
        state.table_mut(table)?.push(row.clone());
        Ok(row)
    }

    async fn update(&self, token: &str, query: &Query, changes: Value) -> Result<Vec<Value>> {
        let mut state = self.lock();
        state.ensure_online()?;
        let user_id = state.user_for_token(token)?;
        let Value::Object(changes) = changes else {
            return Err(Error::Persistence("changes must be a JSON object".to_string()));
        };
        if changes.contains_key("id") || changes.contains_key("user_id") {
            return Err(rejected("column privileges: id and user_id are read-only"));
        }

        let visible: Vec<bool> = state
            .table(&query.table)?
            .iter()
            .map(|row| state.visible(&query.table, row, &user_id) && query.matches(row))
            .collect();
        let now = timestamp();
        let table = query.table.clone();
        let mut updated = Vec::new();
        for (row, hit) in state.table_mut(&table)?.iter_mut().zip(visible) {
            if !hit {
                continue;
            }
            if let Value::Object(map) = row {
                for (key, value) in &changes {
                    map.insert(key.clone(), value.clone());
                }
                if table != USERS_TABLE {
                    map.insert("updated_at".to_string(), json!(now));
                }
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, token: &str, query: &Query) -> Result<usize> {
        let mut state = self.lock();
        state.ensure_online()?;
        let user_id = state.user_for_token(token)?;

        let doomed: Vec<Value> = state
            .table(&query.table)?
            .iter()
            .filter(|row| state.visible(&query.table, row, &user_id) && query.matches(row))
            .cloned()
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }
        let table = query.table.clone();
        state.table_mut(&table)?.retain(|row| !doomed.contains(row));

        if table == TASKS_TABLE {
            let task_ids: Vec<Value> = doomed
                .iter()
                .filter_map(|row| row.get("id").cloned())
                .collect();
            state.table_mut(COMMENTS_TABLE)?.retain(|comment| {
                comment
                    .get("task_id")
                    .map(|id| !task_ids.contains(id))
                    .unwrap_or(true)
            });
        }
        Ok(doomed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let backend = MemoryBackend::new();
        backend.sign_up("a@example.com", "secret1", "Ann").await.unwrap();
        let err = backend
            .sign_up("A@example.com", "secret2", "Other")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn rows_are_scoped_to_their_owner() {
        let backend = MemoryBackend::new();
        let ann = backend.sign_up("ann@example.com", "secret1", "Ann").await.unwrap();
        let bob = backend.sign_up("bob@example.com", "secret1", "Bob").await.unwrap();

        backend
            .insert(
                &ann.access_token,
                TASKS_TABLE,
                json!({"user_id": ann.user.id, "text": "ann's"}),
            )
            .await
            .unwrap();

        let seen = backend
            .select(&bob.access_token, &Query::from(TASKS_TABLE))
            .await
            .unwrap();
        assert!(seen.is_empty());

        let err = backend
            .insert(
                &bob.access_token,
                TASKS_TABLE,
                json!({"user_id": ann.user.id, "text": "sneaky"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
    }

    #[tokio::test]
    async fn deleting_a_task_cascades() {
        let backend = MemoryBackend::new();
        let ann = backend.sign_up("ann@example.com", "secret1", "Ann").await.unwrap();
        let token = ann.access_token.as_str();
        let task = backend
            .insert(token, TASKS_TABLE, json!({"user_id": ann.user.id, "text": "t"}))
            .await
            .unwrap();
        backend
            .insert(
                token,
                COMMENTS_TABLE,
                json!({"task_id": task["id"], "user_id": ann.user.id, "user_name": "Ann", "content": "c"}),
            )
            .await
            .unwrap();
        assert_eq!(backend.row_count(COMMENTS_TABLE), 1);

        let removed = backend
            .delete(token, &Query::from(TASKS_TABLE).eq("id", task["id"].clone()))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(backend.row_count(COMMENTS_TABLE), 0);
    }

    #[tokio::test]
    async fn offline_backend_fails_table_calls() {
        let backend = MemoryBackend::new();
        let ann = backend.sign_up("ann@example.com", "secret1", "Ann").await.unwrap();
        backend.set_offline(true);
        let err = backend
            .select(&ann.access_token, &Query::from(TASKS_TABLE))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
    }
}
