//! Application state: one session provider, one store, kept in step.
//!
//! The store follows the session. [`App::sync`] reads the latest identity
//! from the session's change channel and reloads the store for a new user
//! or clears it after sign-out, so user A's tasks are gone before user B's
//! are fetched.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::watch;

use crate::adapter::{LocalAdapter, PersistenceAdapter, RemoteAdapter};
use crate::board::BoardController;
use crate::config::{BackendKind, Config};
use crate::error::Result;
use crate::model::User;
use crate::remote::{Backend, HttpBackend, RemoteClient};
use crate::session::{LocalSession, RemoteSession, SessionProvider};
use crate::storage::Storage;
use crate::store::{LoadReport, TaskStore};

pub struct App {
    config: Config,
    session: Box<dyn SessionProvider>,
    changes: watch::Receiver<Option<User>>,
    store: TaskStore,
    board: BoardController,
}

impl App {
    pub fn new(
        config: Config,
        session: Box<dyn SessionProvider>,
        adapter: Arc<dyn PersistenceAdapter>,
    ) -> Self {
        let changes = session.subscribe();
        Self {
            config,
            session,
            changes,
            store: TaskStore::new(adapter),
            board: BoardController::new(),
        }
    }

    /// Build the app for `config.backend` over the data directory.
    pub fn open(data_dir: &Path, config: Config) -> Result<Self> {
        config.validate()?;
        let storage = Storage::new(data_dir);
        storage.init()?;
        match config.backend {
            BackendKind::Local => Self::local(storage, config),
            BackendKind::Remote => {
                let backend = HttpBackend::from_config(&config.remote)?;
                Self::remote(Arc::new(backend), storage, config)
            }
        }
    }

    pub fn local(storage: Storage, config: Config) -> Result<Self> {
        let session = LocalSession::open(storage.clone(), config.session.clone())?;
        let adapter = LocalAdapter::new(storage);
        tracing::debug!(root = %adapter.storage().root().display(), "using local backend");
        Ok(Self::new(config, Box::new(session), Arc::new(adapter)))
    }

    /// Remote backend whose session survives restarts via `storage`.
    pub fn remote(backend: Arc<dyn Backend>, storage: Storage, config: Config) -> Result<Self> {
        let client = Arc::new(RemoteClient::with_storage(backend, storage)?);
        let session = RemoteSession::new(Arc::clone(&client));
        let adapter = RemoteAdapter::new(client);
        tracing::debug!("using remote backend");
        Ok(Self::new(config, Box::new(session), Arc::new(adapter)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &dyn SessionProvider {
        self.session.as_ref()
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TaskStore {
        &mut self.store
    }

    pub fn board(&self) -> &BoardController {
        &self.board
    }

    /// Store and board together, for drag-and-drop.
    pub fn board_and_store(&mut self) -> (&mut BoardController, &mut TaskStore) {
        (&mut self.board, &mut self.store)
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.current_user()
    }

    /// Bring the store in line with the session's latest identity.
    ///
    /// Returns the load report when a (re)load happened.
    pub async fn sync(&mut self) -> Option<LoadReport> {
        let user = self.changes.borrow_and_update().clone();
        match user {
            Some(user) if self.store.owner_id() != Some(user.id.as_str()) => {
                self.board.cancel();
                if self.store.owner_id().is_some() {
                    self.store.clear();
                }
                Some(self.store.load(&user.id).await)
            }
            Some(_) => None,
            None => {
                if self.store.owner_id().is_some() {
                    self.board.cancel();
                    self.store.clear();
                }
                None
            }
        }
    }

    /// Reload the current user's data even if nothing changed.
    pub async fn reload(&mut self) -> Option<LoadReport> {
        let user = self.changes.borrow_and_update().clone()?;
        Some(self.store.load(&user.id).await)
    }

    pub async fn sign_up(&mut self, email: &str, password: &str, name: &str) -> Result<User> {
        let user = self.session.sign_up(email, password, name).await?;
        self.sync().await;
        Ok(user)
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<User> {
        let user = self.session.sign_in(email, password).await?;
        self.sync().await;
        Ok(user)
    }

    pub async fn sign_out(&mut self) -> Result<()> {
        let result = self.session.sign_out().await;
        self.sync().await;
        result
    }

    pub async fn switch_user(&mut self, email: &str) -> Result<User> {
        let user = self.session.switch_user(email).await?;
        self.sync().await;
        Ok(user)
    }
}
