//! Credential set and its persisted form

use common::error::StorageResult;
use common::storage::CredentialStorage;
use serde::Serialize;
use std::fmt;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const SUBJECT_ID_KEY: &str = "therapist_id";
pub const DISPLAY_NAME_KEY: &str = "therapist_name";
pub const EMAIL_KEY: &str = "therapist_email";

/// Every key a credential set occupies in storage
pub const CREDENTIAL_KEYS: [&str; 5] = [
    ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
    SUBJECT_ID_KEY,
    DISPLAY_NAME_KEY,
    EMAIL_KEY,
];

/// Identity fields cached for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub subject_id: String,
    pub display_name: String,
    pub email: String,
}

/// Complete set of credentials for one logged-in user.
///
/// A set only exists when every field is present and non-empty; storage
/// holding only some of the keys reads back as no credentials at all.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialSet {
    pub access_token: String,
    pub refresh_token: String,
    pub subject_id: String,
    pub display_name: String,
    pub email: String,
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("subject_id", &self.subject_id)
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .finish()
    }
}

impl CredentialSet {
    /// Read the stored set; `None` when any field is missing or empty
    pub fn load(storage: &dyn CredentialStorage) -> StorageResult<Option<Self>> {
        let read = |key: &str| -> StorageResult<Option<String>> {
            Ok(storage.get(key)?.filter(|value| !value.is_empty()))
        };

        let (
            Some(access_token),
            Some(refresh_token),
            Some(subject_id),
            Some(display_name),
            Some(email),
        ) = (
            read(ACCESS_TOKEN_KEY)?,
            read(REFRESH_TOKEN_KEY)?,
            read(SUBJECT_ID_KEY)?,
            read(DISPLAY_NAME_KEY)?,
            read(EMAIL_KEY)?,
        )
        else {
            return Ok(None);
        };

        Ok(Some(Self {
            access_token,
            refresh_token,
            subject_id,
            display_name,
            email,
        }))
    }

    /// Write every field in one storage update
    pub fn save(&self, storage: &dyn CredentialStorage) -> StorageResult<()> {
        storage.set_many(&[
            (ACCESS_TOKEN_KEY, self.access_token.as_str()),
            (REFRESH_TOKEN_KEY, self.refresh_token.as_str()),
            (SUBJECT_ID_KEY, self.subject_id.as_str()),
            (DISPLAY_NAME_KEY, self.display_name.as_str()),
            (EMAIL_KEY, self.email.as_str()),
        ])
    }

    /// Remove every credential key
    pub fn clear(storage: &dyn CredentialStorage) -> StorageResult<()> {
        storage.remove_many(&CREDENTIAL_KEYS)
    }

    /// Whether any credential key holds a value, complete or not
    pub fn any_present(storage: &dyn CredentialStorage) -> StorageResult<bool> {
        for key in CREDENTIAL_KEYS {
            if storage.get(key)?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Copy of this set with both tokens replaced
    pub fn with_rotated_tokens(&self, access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            ..self.clone()
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            subject_id: self.subject_id.clone(),
            display_name: self.display_name.clone(),
            email: self.email.clone(),
        }
    }
}
