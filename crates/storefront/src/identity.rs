//! Identity provider boundary.
//!
//! Authentication itself (login UI, token exchange) happens elsewhere; the
//! core only consumes the resulting nullable current-user identity. Every
//! cart and order mutation requires a signed-in user — callers obtain one
//! through [`IdentityProvider::require_user`], which refuses with
//! [`StorefrontError::SignedOut`] otherwise.

use tokio::sync::watch;
use velvet_fig_core::{Email, UserId};

use crate::error::StorefrontError;

/// The authenticated user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    /// Opaque user key; the root of the user's cart and order collections.
    pub id: UserId,
    /// Display name, when the provider has one.
    pub display_name: Option<String>,
    /// Email, when the provider has one.
    pub email: Option<Email>,
}

/// Source of the nullable current-user identity.
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, if any.
    fn current_user(&self) -> Option<UserIdentity>;

    /// A live view of auth changes: `None` means signed out.
    fn watch(&self) -> watch::Receiver<Option<UserIdentity>>;

    /// The signed-in user, or `SignedOut`.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::SignedOut`] when nobody is signed in.
    fn require_user(&self) -> Result<UserIdentity, StorefrontError> {
        self.current_user().ok_or(StorefrontError::SignedOut)
    }
}

/// In-process identity state over a watch channel.
///
/// Tests and local development sign users in and out directly; a hosted
/// identity adapter would feed the same channel from its auth callbacks.
#[derive(Debug)]
pub struct AuthState {
    tx: watch::Sender<Option<UserIdentity>>,
}

impl AuthState {
    /// Create signed-out state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Sign a user in, notifying watchers.
    pub fn sign_in(&self, identity: UserIdentity) {
        let _ = self.tx.send(Some(identity));
    }

    /// Sign the current user out, notifying watchers.
    pub fn sign_out(&self) {
        let _ = self.tx.send(None);
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for AuthState {
    fn current_user(&self) -> Option<UserIdentity> {
        self.tx.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<UserIdentity>> {
        self.tx.subscribe()
    }
}
