//! Hosted backend: authentication plus a table query API.
//!
//! The service exposes `users`, `tasks` and `comments` tables with equality
//! and set-membership filters, ordering, row-level scoping by the signed-in
//! user and `ON DELETE CASCADE` from tasks to comments. This module only
//! describes that contract ([`Backend`], [`Query`]) and keeps the signed-in
//! session ([`RemoteClient`]); the service itself is external.
//!
//! - [`HttpBackend`] talks to the real service over REST.
//! - [`MemoryBackend`] is an in-process stand-in with the same semantics.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::model::User;
use crate::storage::Storage;

mod http;
mod memory;

pub use http::HttpBackend;
pub use memory::MemoryBackend;

pub const USERS_TABLE: &str = "users";
pub const TASKS_TABLE: &str = "tasks";
pub const COMMENTS_TABLE: &str = "comments";

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(column, _) | Filter::In(column, _) => column,
        }
    }

    pub fn matches(&self, row: &Value) -> bool {
        match self {
            Filter::Eq(column, value) => row.get(column) == Some(value),
            Filter::In(column, values) => row
                .get(column)
                .map(|cell| values.contains(cell))
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// A filtered, ordered selection on one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub columns: Option<Vec<String>>,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl Query {
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: None,
            filters: Vec::new(),
            order: None,
        }
    }

    /// Restrict the returned columns (default: all).
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    pub fn in_set<V: Into<Value>>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.filters.push(Filter::In(
            column.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|filter| filter.matches(row))
    }

    /// Keep only the selected columns of `row`.
    pub fn project(&self, row: &Value) -> Value {
        match (&self.columns, row) {
            (Some(columns), Value::Object(map)) => Value::Object(
                map.iter()
                    .filter(|(key, _)| columns.iter().any(|column| column == *key))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            ),
            _ => row.clone(),
        }
    }
}

/// Signed-in session: bearer token plus the user it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    pub user: User,
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<AuthSession>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession>;
    async fn sign_out(&self, token: &str) -> Result<()>;
    async fn get_user(&self, token: &str) -> Result<User>;

    async fn select(&self, token: &str, query: &Query) -> Result<Vec<Value>>;
    /// Insert one row and return it as stored (ids and defaults filled in).
    async fn insert(&self, token: &str, table: &str, row: Value) -> Result<Value>;
    /// Apply `changes` to every matching row and return the updated rows.
    async fn update(&self, token: &str, query: &Query, changes: Value) -> Result<Vec<Value>>;
    /// Delete matching rows and return how many went.
    async fn delete(&self, token: &str, query: &Query) -> Result<usize>;
}

/// Shared handle on the backend and the current session.
///
/// The session and the adapter hold the same client, so a sign-in is
/// immediately visible to table calls. When the backend rejects the token
/// the session is dropped and subscribers see `None`.
pub struct RemoteClient {
    backend: Arc<dyn Backend>,
    session: RwLock<Option<AuthSession>>,
    changes: watch::Sender<Option<User>>,
    storage: Option<Storage>,
}

impl RemoteClient {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let (changes, _) = watch::channel(None);
        Self {
            backend,
            session: RwLock::new(None),
            changes,
            storage: None,
        }
    }

    /// Client that persists its session in `storage` and restores it now.
    pub fn with_storage(backend: Arc<dyn Backend>, storage: Storage) -> Result<Self> {
        let restored: Option<AuthSession> = storage.read_session()?;
        let (changes, _) = watch::channel(restored.as_ref().map(|s| s.user.clone()));
        if let Some(session) = &restored {
            tracing::debug!(user_id = %session.user.id, "restored remote session");
        }
        Ok(Self {
            backend,
            session: RwLock::new(restored),
            changes,
            storage: Some(storage),
        })
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn current_user(&self) -> Option<User> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|session| session.user.clone())
    }

    pub fn token(&self) -> Result<String> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|session| session.access_token.clone())
            .ok_or(Error::Unauthenticated)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.changes.subscribe()
    }

    /// Replace the session, persist it and notify subscribers.
    pub fn set_session(&self, session: Option<AuthSession>) -> Result<()> {
        let user = session.as_ref().map(|s| s.user.clone());
        if let Some(storage) = &self.storage {
            match &session {
                Some(session) => storage.write_session(session)?,
                None => storage.clear_session()?,
            }
        }
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
        self.changes.send_if_modified(|current| {
            if *current == user {
                return false;
            }
            *current = user;
            true
        });
        Ok(())
    }

    /// Update the cached profile of the signed-in user.
    pub fn replace_user(&self, user: User) -> Result<()> {
        let session = self
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match session {
            Some(mut session) if session.user.id == user.id => {
                session.user = user;
                self.set_session(Some(session))
            }
            _ => Err(Error::Unauthenticated),
        }
    }

    pub async fn select(&self, query: &Query) -> Result<Vec<Value>> {
        let token = self.token()?;
        let result = self.backend.select(&token, query).await;
        self.expire_on_rejection(result)
    }

    pub async fn insert(&self, table: &str, row: Value) -> Result<Value> {
        let token = self.token()?;
        let result = self.backend.insert(&token, table, row).await;
        self.expire_on_rejection(result)
    }

    pub async fn update(&self, query: &Query, changes: Value) -> Result<Vec<Value>> {
        let token = self.token()?;
        let result = self.backend.update(&token, query, changes).await;
        self.expire_on_rejection(result)
    }

    pub async fn delete(&self, query: &Query) -> Result<usize> {
        let token = self.token()?;
        let result = self.backend.delete(&token, query).await;
        self.expire_on_rejection(result)
    }

    fn expire_on_rejection<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(Error::Unauthenticated) = &result {
            tracing::info!("remote session rejected; signing out locally");
            if let Err(err) = self.set_session(None) {
                tracing::warn!(error = %err, "failed to clear expired session");
            }
        }
        result
    }
}

/// Deserialize one row into a record type.
pub(crate) fn decode_row<T: serde::de::DeserializeOwned>(row: Value) -> Result<T> {
    Ok(serde_json::from_value(row)?)
}

pub(crate) fn decode_rows<T: serde::de::DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter().map(decode_row).collect()
}
