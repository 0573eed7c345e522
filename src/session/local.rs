use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::{require_non_blank, Error, Result};
use crate::model::{ProfilePatch, User};
use crate::storage::{Storage, StoredUser};

use super::{password, SessionProvider};

/// Users registered in the data directory.
///
/// Initial user resolution order:
/// 1) Persisted selection in `current_user`
/// 2) Config default (`session.default_user`, by email)
/// 3) Nobody signed in
pub struct LocalSession {
    storage: Storage,
    config: SessionConfig,
    changes: watch::Sender<Option<User>>,
}

impl LocalSession {
    pub fn open(storage: Storage, config: SessionConfig) -> Result<Self> {
        let initial = resolve_initial_user(&storage, &config)?;
        if let Some(user) = &initial {
            tracing::debug!(user_id = %user.id, "restored local user");
        }
        let (changes, _) = watch::channel(initial);
        Ok(Self {
            storage,
            config,
            changes,
        })
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    fn activate(&self, user: Option<User>) -> Result<()> {
        match &user {
            Some(user) => self.storage.write_current_user(&user.id)?,
            None => self.storage.clear_current_user()?,
        }
        self.changes.send_if_modified(|current| {
            if *current == user {
                return false;
            }
            *current = user;
            true
        });
        Ok(())
    }
}

fn resolve_initial_user(storage: &Storage, config: &SessionConfig) -> Result<Option<User>> {
    let users = storage.read_users()?;

    if let Some(id) = storage.read_current_user() {
        if let Some(record) = users.iter().find(|record| record.user.id == id) {
            return Ok(Some(record.user.clone()));
        }
        tracing::warn!(user_id = %id, "persisted user no longer exists");
    }

    if let Some(email) = config.default_user.as_deref() {
        let email = email.trim().to_lowercase();
        if let Some(record) = users.iter().find(|record| record.user.email == email) {
            return Ok(Some(record.user.clone()));
        }
        tracing::warn!(%email, "configured default user is not registered");
    }

    Ok(None)
}

#[async_trait]
impl SessionProvider for LocalSession {
    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<User> {
        let email = require_non_blank(email, "email")?.to_lowercase();
        let name = require_non_blank(name, "name")?.to_string();
        password::check_strength(password)?;

        let user = self.storage.locked(|storage| {
            let mut users = storage.read_users()?;
            if users.iter().any(|record| record.user.email == email) {
                return Err(Error::DuplicateEmail(email.clone()));
            }
            let user = User {
                id: Uuid::new_v4().to_string(),
                name: name.clone(),
                email: email.clone(),
            };
            users.push(StoredUser {
                user: user.clone(),
                password_hash: password::hash_password(password)?,
                created_at: Utc::now(),
            });
            storage.write_users(&users)?;
            Ok(user)
        })?;

        tracing::info!(user_id = %user.id, "local user registered");
        self.activate(Some(user.clone()))?;
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        let record = self
            .storage
            .read_users()?
            .into_iter()
            .find(|record| record.user.email == email)
            .ok_or(Error::InvalidCredentials)?;
        if !password::verify_password(password, &record.password_hash)? {
            return Err(Error::InvalidCredentials);
        }
        self.activate(Some(record.user.clone()))?;
        Ok(record.user)
    }

    async fn sign_out(&self) -> Result<()> {
        self.activate(None)
    }

    fn current_user(&self) -> Option<User> {
        self.changes.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.changes.subscribe()
    }

    async fn profile(&self) -> Result<User> {
        let current = self.require_user()?;
        self.storage
            .read_users()?
            .into_iter()
            .find(|record| record.user.id == current.id)
            .map(|record| record.user)
            .ok_or(Error::UserNotFound(current.id))
    }

    async fn update_profile(&self, patch: ProfilePatch) -> Result<User> {
        let current = self.require_user()?;
        let patch = patch.normalized()?;

        let updated = self.storage.locked(|storage| {
            let mut users = storage.read_users()?;
            if let Some(email) = &patch.email {
                if users
                    .iter()
                    .any(|record| record.user.email == *email && record.user.id != current.id)
                {
                    return Err(Error::DuplicateEmail(email.clone()));
                }
            }
            let record = users
                .iter_mut()
                .find(|record| record.user.id == current.id)
                .ok_or_else(|| Error::UserNotFound(current.id.clone()))?;
            patch.apply(&mut record.user);
            let updated = record.user.clone();
            storage.write_users(&users)?;
            Ok(updated)
        })?;

        self.activate(Some(updated.clone()))?;
        Ok(updated)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self
            .storage
            .read_users()?
            .into_iter()
            .map(|record| record.user)
            .collect())
    }

    async fn switch_user(&self, email: &str) -> Result<User> {
        if !self.config.allow_switch {
            return Err(Error::InvalidArgument(
                "user switching is disabled (session.allow_switch = false)".to_string(),
            ));
        }
        let email = require_non_blank(email, "email")?.to_lowercase();
        let user = self
            .storage
            .read_users()?
            .into_iter()
            .find(|record| record.user.email == email)
            .map(|record| record.user)
            .ok_or(Error::UserNotFound(email))?;
        self.activate(Some(user.clone()))?;
        Ok(user)
    }
}
