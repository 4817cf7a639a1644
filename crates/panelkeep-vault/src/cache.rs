// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session-scoped cache of decrypted credentials.

use dashmap::DashMap;

use panelkeep_core::{ClientId, ClientRecord, CredentialField, DecryptedCredentials};

/// Additive `client id -> decrypted fields` map.
///
/// Entries are extended field by field; a later `put` never discards fields
/// resolved earlier. Only [`invalidate`](Self::invalidate) removes data.
#[derive(Debug, Default)]
pub struct DecryptedCache {
    entries: DashMap<ClientId, DecryptedCredentials>,
}

impl DecryptedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ClientId) -> Option<DecryptedCredentials> {
        self.entries.get(id).map(|entry| entry.clone())
    }

    pub fn get_field(&self, id: &ClientId, field: CredentialField) -> Option<String> {
        self.entries
            .get(id)
            .and_then(|entry| entry.get(field).map(str::to_string))
    }

    /// Merge `resolved` into the entry for `id`, creating it if needed.
    pub fn put(&self, id: &ClientId, resolved: DecryptedCredentials) {
        self.entries.entry(id.clone()).or_default().merge(resolved);
    }

    pub fn put_field(&self, id: &ClientId, field: CredentialField, value: String) {
        self.entries.entry(id.clone()).or_default().set(field, value);
    }

    /// Drop everything cached for `id`.
    pub fn invalidate(&self, id: &ClientId) {
        self.entries.remove(id);
    }

    /// Present fields of `record` that have no cached plaintext yet.
    pub fn missing_fields(&self, record: &ClientRecord) -> Vec<CredentialField> {
        let entry = self.entries.get(&record.id);
        record
            .present_fields()
            .into_iter()
            .filter(|field| entry.as_ref().is_none_or(|e| !e.has(*field)))
            .collect()
    }

    /// `true` when every present field of `record` is cached.
    pub fn is_fully_resolved(&self, record: &ClientRecord) -> bool {
        self.missing_fields(record).is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
