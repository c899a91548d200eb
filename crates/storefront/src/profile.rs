//! User profile operations.
//!
//! Profile fields live directly on the `users/{userId}` node alongside the
//! cart and orders children, so every write here is a field merge — a
//! whole-node write would wipe the user's cart.

use serde_json::{Map, json};
use tracing::instrument;
use velvet_fig_core::UserId;

use crate::error::{Result, StorefrontError, ValidationError};
use crate::identity::UserIdentity;
use crate::models::UserProfile;
use crate::store::{SharedStore, Subscription, paths};

/// Partial profile update.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    /// New display name.
    pub name: Option<String>,
    /// New phone number.
    pub phone: Option<String>,
    /// New default shipping address; must be non-blank when present.
    pub address: Option<String>,
}

/// Per-user profile operations.
#[derive(Clone)]
pub struct ProfileService {
    store: SharedStore,
}

impl ProfileService {
    /// Create a profile service over a store.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// The stored profile, if the user node exists.
    ///
    /// # Errors
    ///
    /// Returns a store error when the read fails or `DataCorruption` when
    /// the stored fields are malformed.
    pub async fn get(&self, user_id: &UserId) -> Result<Option<UserProfile>> {
        match self.store.read(&paths::user(user_id)).await? {
            Some(value) => Ok(Some(
                UserProfile::from_value(&value)
                    .map_err(|e| StorefrontError::corrupt("user profile", &e))?,
            )),
            None => Ok(None),
        }
    }

    /// The profile for a signed-in user, seeded from the identity provider
    /// on first authentication.
    ///
    /// # Errors
    ///
    /// Returns a store error when the read or the seeding write fails.
    #[instrument(skip(self, user), fields(user = %user.id))]
    pub async fn ensure(&self, user: &UserIdentity) -> Result<UserProfile> {
        let existing = self.get(&user.id).await?;
        if let Some(profile) = &existing {
            if !profile.name.is_empty() {
                return Ok(profile.clone());
            }
        }

        // First sign-in: seed the profile from what the provider knows,
        // keeping any fields the node already carries
        let mut profile = existing.unwrap_or_default();
        profile.name = user.display_name.clone().unwrap_or_default();
        if profile.email.is_none() {
            profile.email = user.email.clone();
        }
        let mut fields = Map::new();
        if !profile.name.is_empty() {
            fields.insert("name".into(), json!(profile.name));
        }
        if let Some(email) = &profile.email {
            fields.insert("email".into(), json!(email.as_str()));
        }
        if !fields.is_empty() {
            self.store.update(&paths::user(&user.id), fields).await?;
        }
        Ok(profile)
    }

    /// Apply a partial profile update.
    ///
    /// # Errors
    ///
    /// Refuses a blank address with a validation error; returns a store
    /// error when the write fails.
    #[instrument(skip(self, user, patch), fields(user = %user.id))]
    pub async fn update(&self, user: &UserIdentity, patch: ProfilePatch) -> Result<()> {
        let mut fields = Map::new();
        if let Some(name) = patch.name {
            fields.insert("name".into(), json!(name));
        }
        if let Some(phone) = patch.phone {
            fields.insert("phone".into(), json!(phone));
        }
        if let Some(address) = patch.address {
            if address.trim().is_empty() {
                return Err(ValidationError::BlankAddress.into());
            }
            fields.insert("address".into(), json!(address.trim()));
        }
        if fields.is_empty() {
            return Ok(());
        }
        self.store.update(&paths::user(&user.id), fields).await?;
        Ok(())
    }

    /// The default shipping address offered at checkout, when one is on
    /// file.
    ///
    /// # Errors
    ///
    /// Same as [`ProfileService::get`].
    pub async fn default_address(&self, user: &UserIdentity) -> Result<Option<String>> {
        Ok(self
            .get(&user.id)
            .await?
            .filter(UserProfile::has_address)
            .map(|profile| profile.address))
    }

    /// Subscribe to changes of the user's record.
    #[must_use]
    pub fn watch(&self, user: &UserIdentity) -> Subscription {
        self.store.subscribe(&paths::user(&user.id))
    }
}
