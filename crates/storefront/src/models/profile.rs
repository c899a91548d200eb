//! User profile document.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use velvet_fig_core::Email;

use super::DocumentError;

/// Profile fields stored directly on `users/{userId}`.
///
/// The same node also holds the `cart` and `orders` children, so profile
/// writes always go through field merges, never whole-node writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Contact email, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    /// Phone number, free-form.
    #[serde(default)]
    pub phone: String,
    /// Default shipping address, offered at checkout.
    #[serde(default)]
    pub address: String,
}

impl UserProfile {
    /// Parse and validate a profile read from the store.
    ///
    /// Unknown fields (the `cart` and `orders` children living on the same
    /// node) are ignored; a present-but-invalid email is rejected.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError` if the JSON is malformed or the email does
    /// not parse.
    pub fn from_value(value: &Value) -> Result<Self, DocumentError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct ProfileDoc {
            #[serde(default)]
            name: String,
            #[serde(default)]
            email: Option<String>,
            #[serde(default)]
            phone: String,
            #[serde(default)]
            address: String,
        }

        let doc: ProfileDoc = serde_json::from_value(value.clone())?;
        let email = doc
            .email
            .as_deref()
            .map(Email::parse)
            .transpose()?;
        Ok(Self {
            name: doc.name,
            email,
            phone: doc.phone,
            address: doc.address,
        })
    }

    /// Whether a default shipping address is on file.
    #[must_use]
    pub fn has_address(&self) -> bool {
        !self.address.trim().is_empty()
    }
}
