use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::error::{require_non_blank, Error, Result};
use crate::model::{ProfilePatch, User};
use crate::remote::{decode_row, decode_rows, Query, RemoteClient, USERS_TABLE};

use super::{password, SessionProvider};

/// Session held by the hosted service's auth endpoints.
pub struct RemoteSession {
    client: Arc<RemoteClient>,
}

impl RemoteSession {
    pub fn new(client: Arc<RemoteClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<RemoteClient> {
        &self.client
    }
}

#[async_trait]
impl SessionProvider for RemoteSession {
    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<User> {
        let email = require_non_blank(email, "email")?.to_lowercase();
        let name = require_non_blank(name, "name")?;
        password::check_strength(password)?;

        let session = self.client.backend().sign_up(&email, password, name).await?;
        let user = session.user.clone();
        tracing::info!(user_id = %user.id, "remote user registered");
        self.client.set_session(Some(session))?;
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || password.is_empty() {
            return Err(Error::InvalidCredentials);
        }
        let session = self.client.backend().sign_in(&email, password).await?;
        let user = session.user.clone();
        self.client.set_session(Some(session))?;
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        let token = self.client.token().ok();
        self.client.set_session(None)?;
        match token {
            Some(token) => self.client.backend().sign_out(&token).await,
            None => Ok(()),
        }
    }

    fn current_user(&self) -> Option<User> {
        self.client.current_user()
    }

    fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.client.subscribe()
    }

    async fn profile(&self) -> Result<User> {
        let current = self.require_user()?;
        let query = Query::from(USERS_TABLE)
            .select(&["id", "name", "email"])
            .eq("id", current.id.clone());
        let rows = self.client.select(&query).await?;
        let user: User = rows
            .into_iter()
            .next()
            .map(decode_row)
            .transpose()?
            .ok_or_else(|| Error::UserNotFound(current.id.clone()))?;
        if user != current {
            self.client.replace_user(user.clone())?;
        }
        Ok(user)
    }

    async fn update_profile(&self, patch: ProfilePatch) -> Result<User> {
        let current = self.require_user()?;
        let patch = patch.normalized()?;
        if patch.name.is_none() && patch.email.is_none() {
            return self.profile().await;
        }

        let mut changes = Map::new();
        if let Some(name) = &patch.name {
            changes.insert("name".to_string(), Value::String(name.clone()));
        }
        if let Some(email) = &patch.email {
            changes.insert("email".to_string(), Value::String(email.clone()));
        }
        let query = Query::from(USERS_TABLE)
            .select(&["id", "name", "email"])
            .eq("id", current.id.clone());
        let rows = self.client.update(&query, Value::Object(changes)).await?;
        let user: User = decode_rows(rows)?
            .into_iter()
            .next()
            .ok_or(Error::UserNotFound(current.id))?;
        self.client.replace_user(user.clone())?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryBackend;

    fn session() -> (Arc<MemoryBackend>, RemoteSession) {
        let backend = Arc::new(MemoryBackend::new());
        let client = Arc::new(RemoteClient::new(backend.clone()));
        (backend, RemoteSession::new(client))
    }

    #[tokio::test]
    async fn sign_up_then_sign_in_with_wrong_password() {
        let (_backend, session) = session();
        let user = session.sign_up("ann@example.com", "secret1", "Ann").await.unwrap();
        assert_eq!(session.current_user(), Some(user));

        session.sign_out().await.unwrap();
        assert!(session.current_user().is_none());
        assert!(matches!(
            session.sign_in("ann@example.com", "wrong12").await,
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            session.sign_up("ann@example.com", "secret1", "Ann").await,
            Err(Error::DuplicateEmail(_))
        ));
    }

    #[tokio::test]
    async fn update_profile_refreshes_cached_user() {
        let (_backend, session) = session();
        session.sign_up("ann@example.com", "secret1", "Ann").await.unwrap();
        let mut changes = session.subscribe();
        changes.borrow_and_update();

        let user = session
            .update_profile(ProfilePatch {
                name: Some("Annie".to_string()),
                email: None,
            })
            .await
            .unwrap();
        assert_eq!(user.name, "Annie");
        assert_eq!(session.current_user().unwrap().name, "Annie");
        assert!(changes.has_changed().unwrap());
    }

    #[tokio::test]
    async fn expired_session_signs_out_on_next_call() {
        let (backend, session) = session();
        session.sign_up("ann@example.com", "secret1", "Ann").await.unwrap();
        backend.expire_sessions();

        assert!(matches!(session.profile().await, Err(Error::Unauthenticated)));
        assert!(session.current_user().is_none());
    }
}
