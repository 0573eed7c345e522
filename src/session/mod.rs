//! Session providers: who is signed in, and who wants to know.
//!
//! A provider owns the active identity and publishes every change on a
//! [`watch`] channel. Sign-in, sign-out and a backend rejecting an expired
//! session all land on that one channel; nothing polls.
//!
//! - [`LocalSession`]: users registered in the data directory
//! - [`RemoteSession`]: the hosted service's auth endpoints

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::model::{ProfilePatch, User};

mod local;
pub mod password;
mod remote;

pub use local::LocalSession;
pub use remote::RemoteSession;

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Register and sign in. Blank fields fail with `Validation`, a taken
    /// email with `DuplicateEmail`.
    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<User>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<User>;

    /// Clear the active session. `current_user` is `None` afterwards even
    /// when this returns an error.
    async fn sign_out(&self) -> Result<()>;

    fn current_user(&self) -> Option<User>;

    /// Receiver that observes every identity change.
    fn subscribe(&self) -> watch::Receiver<Option<User>>;

    /// Fresh copy of the signed-in user's profile.
    async fn profile(&self) -> Result<User>;

    async fn update_profile(&self, patch: ProfilePatch) -> Result<User>;

    async fn list_users(&self) -> Result<Vec<User>> {
        Err(Error::InvalidArgument(
            "listing users needs the local backend".to_string(),
        ))
    }

    /// Activate another registered user without a password.
    async fn switch_user(&self, _email: &str) -> Result<User> {
        Err(Error::InvalidArgument(
            "switching users needs the local backend".to_string(),
        ))
    }

    fn require_user(&self) -> Result<User> {
        self.current_user().ok_or(Error::Unauthenticated)
    }
}

/// Run `callback` on every identity change until the provider goes away.
pub fn on_change<F>(provider: &dyn SessionProvider, mut callback: F) -> JoinHandle<()>
where
    F: FnMut(Option<User>) + Send + 'static,
{
    let mut changes = provider.subscribe();
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let user = changes.borrow_and_update().clone();
            callback(user);
        }
    })
}
