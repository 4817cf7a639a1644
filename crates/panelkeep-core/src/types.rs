// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the credential vault.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Maximum number of active clients that may share one `(server_id, fingerprint)` pair.
///
/// The SQLite capacity triggers in `panelkeep-storage` hard-code the same value.
pub const MAX_SLOTS: usize = 3;

/// Unique identifier for a client record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl ClientId {
    /// Generate a fresh random client id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of the third-party service panel a client's account lives on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(pub String);

impl ServerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter plugged into the vault.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Encryption,
    Fingerprint,
    Storage,
}

/// One of the four encrypted credential columns of a client record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
pub enum CredentialField {
    #[strum(serialize = "login")]
    Login,
    #[strum(serialize = "password")]
    Password,
    #[strum(serialize = "login_2")]
    Login2,
    #[strum(serialize = "password_2")]
    Password2,
}

impl CredentialField {
    /// All credential fields, primary first.
    pub const ALL: [CredentialField; 4] = [
        CredentialField::Login,
        CredentialField::Password,
        CredentialField::Login2,
        CredentialField::Password2,
    ];

    /// Fields that carry a login (searchable) rather than a password.
    pub const LOGINS: [CredentialField; 2] = [CredentialField::Login, CredentialField::Login2];

    pub fn is_login(&self) -> bool {
        matches!(self, CredentialField::Login | CredentialField::Login2)
    }
}

/// Stored (possibly encrypted) primary credential of a client.
///
/// `login` and `password` may hold ciphertext or legacy plaintext; they are not
/// syntactically distinguishable without the ciphertext classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub login: Option<String>,
    pub password: Option<String>,
    pub fingerprint: Option<String>,
}

impl Credential {
    /// A credential with every column nulled (login cleared).
    pub fn cleared() -> Self {
        Self::default()
    }

    pub fn is_cleared(&self) -> bool {
        self.login.is_none() && self.password.is_none() && self.fingerprint.is_none()
    }
}

/// Stored (possibly encrypted) "second server" credential of a client.
///
/// Secondary credentials never take part in slot grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryCredential {
    pub login: Option<String>,
    pub password: Option<String>,
}

/// A persisted client record, reduced to the columns the vault cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: ClientId,
    pub name: String,
    pub server_id: Option<ServerId>,
    pub credential: Credential,
    pub secondary: SecondaryCredential,
    pub is_archived: bool,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 last-update timestamp.
    pub updated_at: String,
}

impl ClientRecord {
    /// The stored value of one credential column, if present and non-empty.
    pub fn field_value(&self, field: CredentialField) -> Option<&str> {
        let value = match field {
            CredentialField::Login => self.credential.login.as_deref(),
            CredentialField::Password => self.credential.password.as_deref(),
            CredentialField::Login2 => self.secondary.login.as_deref(),
            CredentialField::Password2 => self.secondary.password.as_deref(),
        };
        value.filter(|v| !v.is_empty())
    }

    /// Credential fields that hold a non-empty value.
    pub fn present_fields(&self) -> Vec<CredentialField> {
        CredentialField::ALL
            .into_iter()
            .filter(|field| self.field_value(*field).is_some())
            .collect()
    }
}

/// Session-scoped plaintext view of a client's credentials.
///
/// Entries may be partially populated: a field left `None` has not been resolved yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptedCredentials {
    pub login: Option<String>,
    pub password: Option<String>,
    pub login_2: Option<String>,
    pub password_2: Option<String>,
}

impl DecryptedCredentials {
    pub fn get(&self, field: CredentialField) -> Option<&str> {
        match field {
            CredentialField::Login => self.login.as_deref(),
            CredentialField::Password => self.password.as_deref(),
            CredentialField::Login2 => self.login_2.as_deref(),
            CredentialField::Password2 => self.password_2.as_deref(),
        }
    }

    pub fn set(&mut self, field: CredentialField, value: String) {
        let slot = match field {
            CredentialField::Login => &mut self.login,
            CredentialField::Password => &mut self.password,
            CredentialField::Login2 => &mut self.login_2,
            CredentialField::Password2 => &mut self.password_2,
        };
        *slot = Some(value);
    }

    pub fn has(&self, field: CredentialField) -> bool {
        self.get(field).is_some()
    }

    /// Copy every resolved field of `other` into `self`, leaving unresolved ones untouched.
    pub fn merge(&mut self, other: DecryptedCredentials) {
        for field in CredentialField::ALL {
            if let Some(value) = other.get(field) {
                self.set(field, value.to_string());
            }
        }
    }

    /// Resolved login values (primary and secondary).
    pub fn logins(&self) -> impl Iterator<Item = &str> {
        CredentialField::LOGINS
            .into_iter()
            .filter_map(move |field| self.get(field))
    }
}

/// Lightweight projection used to build the global login index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginTuple {
    pub client_id: ClientId,
    pub login: Option<String>,
    pub login_2: Option<String>,
}
