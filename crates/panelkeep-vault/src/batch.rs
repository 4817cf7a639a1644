// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch decryption engine.
//!
//! Resolves `(client, field, stored value)` tuples to plaintext. Values the
//! classifier rejects never reach the provider; the rest are decrypted in
//! fixed-size batches whose members run concurrently while the batches
//! themselves run one after another. Every resolved value lands in the
//! [`DecryptedCache`], and no input ever produces an error.

use std::sync::Arc;

use futures::future::join_all;
use tracing::debug;

use panelkeep_core::traits::EncryptionAdapter;
use panelkeep_core::{ClientId, ClientRecord, CredentialField};

use crate::cache::DecryptedCache;
use crate::classifier::classify;

/// One value to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptRequest {
    pub client_id: ClientId,
    pub field: CredentialField,
    pub value: String,
}

/// How a value was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptOutcome {
    /// Served from the cache without touching the provider.
    Cached,
    /// Classified as plaintext and passed through.
    SkippedAsPlaintext,
    /// Decrypted successfully.
    Decrypted,
    /// Provider failed, returned its input, or returned something that still
    /// looks encrypted; the stored value is returned instead.
    FallbackToOriginal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptResult {
    pub client_id: ClientId,
    pub field: CredentialField,
    pub value: String,
    pub outcome: DecryptOutcome,
}

/// Bounded-concurrency decryptor writing through to a shared cache.
pub struct BatchDecryptor {
    encryption: Arc<dyn EncryptionAdapter>,
    cache: Arc<DecryptedCache>,
    batch_size: usize,
}

impl BatchDecryptor {
    pub fn new(
        encryption: Arc<dyn EncryptionAdapter>,
        cache: Arc<DecryptedCache>,
        batch_size: usize,
    ) -> Self {
        Self {
            encryption,
            cache,
            batch_size: batch_size.max(1),
        }
    }

    pub fn cache(&self) -> &Arc<DecryptedCache> {
        &self.cache
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Resolve a single stored value, bypassing the cache.
    pub async fn decrypt_value(&self, value: &str) -> (String, DecryptOutcome) {
        if !classify(value) {
            return (value.to_string(), DecryptOutcome::SkippedAsPlaintext);
        }
        match self.encryption.decrypt(value).await {
            Ok(plain) if plain != value && !classify(&plain) => (plain, DecryptOutcome::Decrypted),
            Ok(_) => (value.to_string(), DecryptOutcome::FallbackToOriginal),
            Err(e) => {
                debug!(error = %e, "decrypt failed, keeping stored value");
                (value.to_string(), DecryptOutcome::FallbackToOriginal)
            }
        }
    }

    /// Resolve every request, in input order.
    ///
    /// Cached fields are answered from the cache; everything else is resolved
    /// and cached.
    pub async fn resolve(&self, requests: Vec<DecryptRequest>) -> Vec<DecryptResult> {
        let mut results: Vec<Option<DecryptResult>> = Vec::with_capacity(requests.len());
        let mut pending: Vec<(usize, DecryptRequest)> = Vec::new();

        for request in requests {
            let slot = results.len();
            if let Some(value) = self.cache.get_field(&request.client_id, request.field) {
                results.push(Some(DecryptResult {
                    client_id: request.client_id,
                    field: request.field,
                    value,
                    outcome: DecryptOutcome::Cached,
                }));
            } else if !classify(&request.value) {
                self.cache
                    .put_field(&request.client_id, request.field, request.value.clone());
                results.push(Some(DecryptResult {
                    client_id: request.client_id,
                    field: request.field,
                    value: request.value,
                    outcome: DecryptOutcome::SkippedAsPlaintext,
                }));
            } else {
                results.push(None);
                pending.push((slot, request));
            }
        }

        let total = pending.len();
        for (batch_no, batch) in pending.chunks(self.batch_size).enumerate() {
            debug!(batch = batch_no, size = batch.len(), total, "dispatching decrypt batch");
            let resolved = join_all(batch.iter().map(|(_, request)| async move {
                self.decrypt_value(&request.value).await
            }))
            .await;

            for ((slot, request), (value, outcome)) in batch.iter().zip(resolved) {
                if outcome == DecryptOutcome::FallbackToOriginal {
                    debug!(client_id = %request.client_id, field = %request.field, "decrypt fell back to stored value");
                }
                self.cache
                    .put_field(&request.client_id, request.field, value.clone());
                results[*slot] = Some(DecryptResult {
                    client_id: request.client_id.clone(),
                    field: request.field,
                    value,
                    outcome,
                });
            }
        }

        results.into_iter().flatten().collect()
    }

    /// Resolve the uncached `fields` of each record, leaving cached ones untouched.
    pub async fn resolve_records(
        &self,
        records: &[ClientRecord],
        fields: &[CredentialField],
    ) -> Vec<DecryptResult> {
        let requests = records
            .iter()
            .flat_map(|record| {
                self.cache
                    .missing_fields(record)
                    .into_iter()
                    .filter(|field| fields.contains(field))
                    .filter_map(move |field| {
                        record.field_value(field).map(|value| DecryptRequest {
                            client_id: record.id.clone(),
                            field,
                            value: value.to_string(),
                        })
                    })
            })
            .collect();
        self.resolve(requests).await
    }
}
