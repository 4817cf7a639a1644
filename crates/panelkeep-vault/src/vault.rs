// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `CredentialVault` facade.
//!
//! Wires the resolver, batch decryptor, search index and cache around one
//! store and one pair of providers. Every consumer-facing operation goes
//! through here so cache invalidation happens in exactly one place.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info};

use panelkeep_config::model::DecryptConfig;
use panelkeep_core::traits::{ClientStore, EncryptionAdapter, FingerprintAdapter, PluginAdapter};
use panelkeep_core::{
    ClientId, ClientRecord, CredentialField, DecryptedCredentials, HealthStatus, PanelkeepError,
    SecondaryCredential, ServerId, MAX_SLOTS,
};

use crate::batch::{BatchDecryptor, DecryptOutcome};
use crate::cache::DecryptedCache;
use crate::classifier::classify;
use crate::resolver::{
    CredentialInput, CredentialResolver, ResolutionPath, ResolvedCredential, SharedCredential,
};
use crate::retry::RetryPolicy;
use crate::search::{SearchIndex, SearchResults};

/// What the UI submits when creating (`id == None`) or updating a client.
#[derive(Debug, Clone, Default)]
pub struct ClientDraft {
    pub id: Option<ClientId>,
    pub name: String,
    pub server_id: Option<ServerId>,
    pub login: Option<String>,
    pub password: Option<String>,
    pub login_2: Option<String>,
    pub password_2: Option<String>,
    /// An existing slot the user explicitly chose to join.
    pub shared: Option<SharedCredential>,
}

/// A persisted client plus how its credential was produced.
#[derive(Debug, Clone)]
pub struct SavedClient {
    pub record: ClientRecord,
    pub path: ResolutionPath,
    /// Fields stored as plaintext because encryption failed.
    pub plaintext_fields: Vec<CredentialField>,
}

/// One page of clients.
#[derive(Debug, Clone)]
pub struct ClientWindow {
    pub records: Vec<ClientRecord>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

pub struct CredentialVault {
    pub(crate) store: Arc<dyn ClientStore>,
    encryption: Arc<dyn EncryptionAdapter>,
    fingerprint: Arc<dyn FingerprintAdapter>,
    pub(crate) resolver: CredentialResolver,
    pub(crate) decryptor: Arc<BatchDecryptor>,
    pub(crate) search: SearchIndex,
    pub(crate) cache: Arc<DecryptedCache>,
    retry: RetryPolicy,
}

impl CredentialVault {
    pub fn new(
        store: Arc<dyn ClientStore>,
        encryption: Arc<dyn EncryptionAdapter>,
        fingerprint: Arc<dyn FingerprintAdapter>,
        config: &DecryptConfig,
    ) -> Self {
        let cache = Arc::new(DecryptedCache::new());
        let decryptor = Arc::new(BatchDecryptor::new(
            encryption.clone(),
            cache.clone(),
            config.batch_size,
        ));
        let resolver = CredentialResolver::new(store.clone(), encryption.clone(), fingerprint.clone());
        let search = SearchIndex::new(store.clone(), decryptor.clone(), config.global_index_cap);
        Self {
            store,
            encryption,
            fingerprint,
            resolver,
            decryptor,
            search,
            cache,
            retry: RetryPolicy::from_config(config),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn cache(&self) -> &Arc<DecryptedCache> {
        &self.cache
    }

    /// Decide the credential to persist without writing anything.
    pub async fn resolve_credentials_for_save(
        &self,
        input: &CredentialInput,
    ) -> Result<ResolvedCredential, PanelkeepError> {
        self.resolver.resolve(input).await
    }

    /// Create or update a client.
    ///
    /// Fails with `CapacityExceeded` before anything is written when the target
    /// slot group is full.
    pub async fn save_client(&self, draft: ClientDraft) -> Result<SavedClient, PanelkeepError> {
        let existing = match &draft.id {
            Some(id) => Some(
                self.store
                    .get_client(id)
                    .await?
                    .ok_or_else(|| PanelkeepError::ClientNotFound(id.clone()))?,
            ),
            None => None,
        };
        let archived = existing.as_ref().is_some_and(|e| e.is_archived);

        let resolved = self
            .resolver
            .resolve(&CredentialInput {
                client_id: draft.id.clone(),
                server_id: draft.server_id.clone(),
                login: draft.login.clone(),
                password: draft.password.clone(),
                shared: draft.shared.clone(),
                archived,
            })
            .await?;

        let mut plaintext_fields = resolved.plaintext_fields.clone();
        let login_2 = self
            .encrypt_secondary(draft.id.as_ref(), CredentialField::Login2, draft.login_2.as_deref(), &mut plaintext_fields)
            .await;
        let password_2 = self
            .encrypt_secondary(draft.id.as_ref(), CredentialField::Password2, draft.password_2.as_deref(), &mut plaintext_fields)
            .await;

        let now = timestamp();
        let record = ClientRecord {
            id: draft.id.clone().unwrap_or_else(ClientId::generate),
            name: draft.name,
            server_id: draft.server_id,
            credential: resolved.credential,
            secondary: SecondaryCredential {
                login: login_2,
                password: password_2,
            },
            is_archived: archived,
            created_at: existing
                .as_ref()
                .map_or_else(|| now.clone(), |e| e.created_at.clone()),
            updated_at: now,
        };

        if existing.is_some() {
            self.store.update_client(&record).await?;
        } else {
            self.store.insert_client(&record).await?;
        }

        self.cache.invalidate(&record.id);
        self.search.invalidate(&record.id).await;
        info!(client_id = %record.id, path = ?resolved.path, plaintext = plaintext_fields.len(), "client saved");

        Ok(SavedClient {
            record,
            path: resolved.path,
            plaintext_fields,
        })
    }

    /// Full plaintext credentials of one client for the detail view.
    ///
    /// Fields that still look encrypted after decryption are retried with
    /// backoff before the stored value is shown as-is.
    pub async fn decrypt_for_display(&self, id: &ClientId) -> Result<DecryptedCredentials, PanelkeepError> {
        let record = self
            .store
            .get_client(id)
            .await?
            .ok_or_else(|| PanelkeepError::ClientNotFound(id.clone()))?;
        let cached = self.cache.get(id).unwrap_or_default();

        let decryptor = &self.decryptor;
        let retry = &self.retry;
        let record_id = &record.id;
        let lookups = record.present_fields().into_iter().filter_map(|field| {
            let stored = record.field_value(field)?;
            let cached = cached.get(field).filter(|v| !classify(v)).map(str::to_string);
            Some(async move {
                if let Some(value) = cached {
                    return (field, value);
                }
                let (value, outcome) = retry
                    .run(
                        move || decryptor.decrypt_value(stored),
                        |(value, _): &(String, DecryptOutcome)| classify(value),
                    )
                    .await;
                debug!(client_id = %record_id, field = %field, ?outcome, "detail field resolved");
                (field, value)
            })
        });

        let mut resolved = DecryptedCredentials::default();
        for (field, value) in join_all(lookups).await {
            resolved.set(field, value);
        }
        self.cache.put(id, resolved.clone());
        Ok(resolved)
    }

    /// Client ids (and records) matching `text` in `window` or anywhere in the view.
    pub async fn search_by_query(
        &self,
        text: &str,
        window: &[ClientRecord],
        archived: bool,
    ) -> Result<SearchResults, PanelkeepError> {
        self.search.search(text, window, archived).await
    }

    /// Load one page of the archived or active view. `page_size` is at least 1.
    pub async fn list_window(
        &self,
        archived: bool,
        page: usize,
        page_size: usize,
    ) -> Result<ClientWindow, PanelkeepError> {
        let page_size = page_size.max(1);
        let records = self
            .store
            .list_clients(archived, page.saturating_mul(page_size), page_size)
            .await?;
        let total = self.store.count_clients(archived).await?;
        Ok(ClientWindow {
            records,
            total,
            page,
            page_size,
        })
    }

    pub async fn archive_client(&self, id: &ClientId) -> Result<(), PanelkeepError> {
        self.store.set_archived(id, true).await?;
        self.search.invalidate(id).await;
        info!(client_id = %id, "client archived");
        Ok(())
    }

    /// Move a client back to the active view, re-checking its slot group.
    pub async fn unarchive_client(&self, id: &ClientId) -> Result<(), PanelkeepError> {
        let record = self
            .store
            .get_client(id)
            .await?
            .ok_or_else(|| PanelkeepError::ClientNotFound(id.clone()))?;

        if let (Some(server_id), Some(fingerprint)) =
            (&record.server_id, record.credential.fingerprint.as_deref())
        {
            let current = self.resolver.slot_usage(server_id, fingerprint, Some(id)).await?;
            if current >= MAX_SLOTS {
                info!(client_id = %id, count = current, limit = MAX_SLOTS, "cannot unarchive into full slot group");
                return Err(PanelkeepError::CapacityExceeded {
                    current,
                    limit: MAX_SLOTS,
                });
            }
        }

        self.store.set_archived(id, false).await?;
        self.search.invalidate(id).await;
        info!(client_id = %id, "client unarchived");
        Ok(())
    }

    /// `(active members, MAX_SLOTS)` for a slot group.
    pub async fn slot_usage(
        &self,
        server_id: &ServerId,
        fingerprint: &str,
    ) -> Result<(usize, usize), PanelkeepError> {
        let count = self.resolver.slot_usage(server_id, fingerprint, None).await?;
        Ok((count, MAX_SLOTS))
    }

    /// Health of every adapter, by adapter name.
    pub async fn adapter_health(&self) -> Vec<(String, HealthStatus)> {
        fn entry(name: &str, result: Result<HealthStatus, PanelkeepError>) -> (String, HealthStatus) {
            let status = result.unwrap_or_else(|e| HealthStatus::Unhealthy(e.to_string()));
            (name.to_string(), status)
        }

        vec![
            entry(self.store.name(), self.store.health_check().await),
            entry(self.encryption.name(), self.encryption.health_check().await),
            entry(self.fingerprint.name(), self.fingerprint.health_check().await),
        ]
    }

    async fn encrypt_secondary(
        &self,
        client_id: Option<&ClientId>,
        field: CredentialField,
        plaintext: Option<&str>,
        plaintext_fields: &mut Vec<CredentialField>,
    ) -> Option<String> {
        let plaintext = plaintext.filter(|v| !v.trim().is_empty())?;
        let (value, plain) = self
            .resolver
            .encrypt_or_plaintext(client_id, field, plaintext)
            .await;
        if plain {
            plaintext_fields.push(field);
        }
        Some(value)
    }
}

/// Current time in the storage layer's ISO 8601 format.
pub(crate) fn timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

/// Mask a credential for display: first and last four characters, or `****`.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < 10 {
        return "****".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}...{suffix}")
}
