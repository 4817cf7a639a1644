// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential resolution for client saves.
//!
//! Decides which ciphertext and fingerprint get persisted for a client's
//! primary credential. Clients on the same server whose normalized
//! `(login, password)` pairs match form a slot group of at most
//! [`MAX_SLOTS`] active members, and every member stores byte-identical
//! ciphertext so the group is stable even though encryption is not
//! deterministic.

use std::sync::Arc;

use tracing::{debug, info, warn};

use panelkeep_core::traits::{ClientStore, EncryptionAdapter, FingerprintAdapter};
use panelkeep_core::{ClientId, Credential, CredentialField, PanelkeepError, ServerId, MAX_SLOTS};

/// A slot the user explicitly chose to join: its plaintext and stored form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedCredential {
    pub login: String,
    pub password: String,
    /// The group's stored credential, reused verbatim.
    pub stored: Credential,
}

/// Everything the resolver needs to know about one save.
#[derive(Debug, Clone, Default)]
pub struct CredentialInput {
    /// The record being updated; `None` on create.
    pub client_id: Option<ClientId>,
    pub server_id: Option<ServerId>,
    pub login: Option<String>,
    pub password: Option<String>,
    pub shared: Option<SharedCredential>,
    /// Archived records never count as slot members, so capacity is not enforced for them.
    pub archived: bool,
}

/// Which branch produced the credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPath {
    /// Reused an explicitly supplied shared credential.
    SharedReuse,
    /// Adopted the ciphertext of an existing group with `members` active members.
    GroupReuse { members: usize },
    /// Encrypted fresh on a server with no matching group.
    Fresh,
    /// Encrypted fresh without a server scope.
    Unscoped,
    /// Login was empty; every credential column is cleared.
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCredential {
    pub credential: Credential,
    pub path: ResolutionPath,
    /// Fields persisted as plaintext because encryption failed.
    pub plaintext_fields: Vec<CredentialField>,
}

pub struct CredentialResolver {
    store: Arc<dyn ClientStore>,
    encryption: Arc<dyn EncryptionAdapter>,
    fingerprint: Arc<dyn FingerprintAdapter>,
}

impl CredentialResolver {
    pub fn new(
        store: Arc<dyn ClientStore>,
        encryption: Arc<dyn EncryptionAdapter>,
        fingerprint: Arc<dyn FingerprintAdapter>,
    ) -> Self {
        Self {
            store,
            encryption,
            fingerprint,
        }
    }

    /// Resolve the credential to persist, or fail with `CapacityExceeded`.
    ///
    /// Never writes; the caller persists the returned credential.
    pub async fn resolve(&self, input: &CredentialInput) -> Result<ResolvedCredential, PanelkeepError> {
        if let Some(shared) = &input.shared {
            return self.reuse_shared(input, shared).await;
        }

        let Some(login) = input.login.as_deref().filter(|l| !l.trim().is_empty()) else {
            return Ok(ResolvedCredential {
                credential: Credential::cleared(),
                path: ResolutionPath::Cleared,
                plaintext_fields: Vec::new(),
            });
        };
        let password = input.password.as_deref().unwrap_or_default();
        let fingerprint = self.fingerprint.fingerprint(login, password).await?;

        let Some(server_id) = &input.server_id else {
            let mut resolved = self
                .encrypt_fresh(input.client_id.as_ref(), login, password, fingerprint)
                .await;
            resolved.path = ResolutionPath::Unscoped;
            return Ok(resolved);
        };

        let members = self
            .store
            .find_slot_members(server_id, &fingerprint, input.client_id.as_ref())
            .await?;
        if !input.archived && members.len() >= MAX_SLOTS {
            info!(server_id = %server_id, count = members.len(), limit = MAX_SLOTS, "slot group full, rejecting save");
            return Err(PanelkeepError::CapacityExceeded {
                current: members.len(),
                limit: MAX_SLOTS,
            });
        }

        match members.first() {
            Some(first) => {
                debug!(server_id = %server_id, members = members.len(), "joining existing slot group");
                Ok(ResolvedCredential {
                    credential: first.credential.clone(),
                    path: ResolutionPath::GroupReuse {
                        members: members.len(),
                    },
                    plaintext_fields: Vec::new(),
                })
            }
            None => Ok(self
                .encrypt_fresh(input.client_id.as_ref(), login, password, fingerprint)
                .await),
        }
    }

    /// Number of active clients on `server_id` holding `fingerprint`, excluding `exclude`.
    pub async fn slot_usage(
        &self,
        server_id: &ServerId,
        fingerprint: &str,
        exclude: Option<&ClientId>,
    ) -> Result<usize, PanelkeepError> {
        Ok(self
            .store
            .find_slot_members(server_id, fingerprint, exclude)
            .await?
            .len())
    }

    /// Encrypt one value, falling back to plaintext when the provider fails.
    ///
    /// Returns the value to persist and whether it is plaintext.
    pub async fn encrypt_or_plaintext(
        &self,
        client_id: Option<&ClientId>,
        field: CredentialField,
        plaintext: &str,
    ) -> (String, bool) {
        match self.encryption.encrypt(plaintext).await {
            Ok(ciphertext) => (ciphertext, false),
            Err(e) => {
                let client = client_id.map(ClientId::as_str).unwrap_or("<new>");
                warn!(client_id = client, field = %field, error = %e, "encryption failed, persisting plaintext");
                (plaintext.to_string(), true)
            }
        }
    }

    async fn reuse_shared(
        &self,
        input: &CredentialInput,
        shared: &SharedCredential,
    ) -> Result<ResolvedCredential, PanelkeepError> {
        let computed = self
            .fingerprint
            .fingerprint(&shared.login, &shared.password)
            .await?;
        if let Some(stored) = shared.stored.fingerprint.as_deref()
            && stored != computed
        {
            warn!("shared credential fingerprint does not match its plaintext");
        }
        let fingerprint = shared.stored.fingerprint.clone().unwrap_or(computed);

        if let Some(server_id) = &input.server_id
            && !input.archived
        {
            let current = self
                .slot_usage(server_id, &fingerprint, input.client_id.as_ref())
                .await?;
            if current >= MAX_SLOTS {
                return Err(PanelkeepError::CapacityExceeded {
                    current,
                    limit: MAX_SLOTS,
                });
            }
        }

        Ok(ResolvedCredential {
            credential: Credential {
                login: shared.stored.login.clone(),
                password: shared.stored.password.clone(),
                fingerprint: Some(fingerprint),
            },
            path: ResolutionPath::SharedReuse,
            plaintext_fields: Vec::new(),
        })
    }

    async fn encrypt_fresh(
        &self,
        client_id: Option<&ClientId>,
        login: &str,
        password: &str,
        fingerprint: String,
    ) -> ResolvedCredential {
        let mut plaintext_fields = Vec::new();
        let (login, plain) = self
            .encrypt_or_plaintext(client_id, CredentialField::Login, login)
            .await;
        if plain {
            plaintext_fields.push(CredentialField::Login);
        }
        let password = if password.is_empty() {
            None
        } else {
            let (password, plain) = self
                .encrypt_or_plaintext(client_id, CredentialField::Password, password)
                .await;
            if plain {
                plaintext_fields.push(CredentialField::Password);
            }
            Some(password)
        };

        ResolvedCredential {
            credential: Credential {
                login: Some(login),
                password,
                fingerprint: Some(fingerprint),
            },
            path: ResolutionPath::Fresh,
            plaintext_fields,
        }
    }
}
