// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory `ClientStore` for vault tests.
//!
//! Mirrors the ordering and filtering of the SQLite store. The capacity
//! trigger is not emulated, so tests observe the resolver's own pre-check.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use panelkeep_core::traits::{ClientStore, PluginAdapter};
use panelkeep_core::{
    AdapterType, ClientId, ClientRecord, HealthStatus, LoginTuple, PanelkeepError, ServerId,
};

/// A `ClientStore` backed by a vector, counting writes and point lookups.
#[derive(Default)]
pub struct InMemoryClientStore {
    clients: Mutex<Vec<ClientRecord>>,
    writes: AtomicUsize,
    point_reads: AtomicUsize,
}

impl InMemoryClientStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `clients` (not counted as writes).
    pub fn with_clients(clients: Vec<ClientRecord>) -> Self {
        Self {
            clients: Mutex::new(clients),
            ..Self::default()
        }
    }

    /// Number of successful inserts, updates and archive toggles.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of `get_client` calls.
    pub fn get_count(&self) -> usize {
        self.point_reads.load(Ordering::SeqCst)
    }

    /// Copy of every stored record, in insertion order.
    pub async fn snapshot(&self) -> Vec<ClientRecord> {
        self.clients.lock().await.clone()
    }

    fn sorted_view(clients: &[ClientRecord], archived: bool) -> Vec<ClientRecord> {
        let mut view: Vec<ClientRecord> = clients
            .iter()
            .filter(|c| c.is_archived == archived)
            .cloned()
            .collect();
        view.sort_by(|a, b| (&a.created_at, &a.id).cmp(&(&b.created_at, &b.id)));
        view
    }
}

#[async_trait]
impl PluginAdapter for InMemoryClientStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, PanelkeepError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ClientStore for InMemoryClientStore {
    async fn insert_client(&self, record: &ClientRecord) -> Result<(), PanelkeepError> {
        let mut clients = self.clients.lock().await;
        if clients.iter().any(|c| c.id == record.id) {
            return Err(PanelkeepError::Internal(format!(
                "duplicate client id: {}",
                record.id
            )));
        }
        clients.push(record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_client(&self, record: &ClientRecord) -> Result<(), PanelkeepError> {
        let mut clients = self.clients.lock().await;
        let existing = clients
            .iter_mut()
            .find(|c| c.id == record.id)
            .ok_or_else(|| PanelkeepError::ClientNotFound(record.id.clone()))?;
        let created_at = existing.created_at.clone();
        *existing = record.clone();
        existing.created_at = created_at;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_client(&self, id: &ClientId) -> Result<Option<ClientRecord>, PanelkeepError> {
        self.point_reads.fetch_add(1, Ordering::SeqCst);
        let clients = self.clients.lock().await;
        Ok(clients.iter().find(|c| &c.id == id).cloned())
    }

    async fn find_slot_members(
        &self,
        server_id: &ServerId,
        fingerprint: &str,
        exclude: Option<&ClientId>,
    ) -> Result<Vec<ClientRecord>, PanelkeepError> {
        let clients = self.clients.lock().await;
        Ok(Self::sorted_view(&clients, false)
            .into_iter()
            .filter(|c| c.server_id.as_ref() == Some(server_id))
            .filter(|c| c.credential.fingerprint.as_deref() == Some(fingerprint))
            .filter(|c| Some(&c.id) != exclude)
            .collect())
    }

    async fn list_clients(
        &self,
        archived: bool,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ClientRecord>, PanelkeepError> {
        let clients = self.clients.lock().await;
        Ok(Self::sorted_view(&clients, archived)
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn count_clients(&self, archived: bool) -> Result<usize, PanelkeepError> {
        let clients = self.clients.lock().await;
        Ok(clients.iter().filter(|c| c.is_archived == archived).count())
    }

    async fn list_login_tuples(
        &self,
        archived: bool,
        limit: usize,
    ) -> Result<Vec<LoginTuple>, PanelkeepError> {
        let clients = self.clients.lock().await;
        Ok(Self::sorted_view(&clients, archived)
            .into_iter()
            .rev()
            .filter(|c| c.credential.login.is_some() || c.secondary.login.is_some())
            .take(limit)
            .map(|c| LoginTuple {
                client_id: c.id,
                login: c.credential.login,
                login_2: c.secondary.login,
            })
            .collect())
    }

    async fn set_archived(&self, id: &ClientId, archived: bool) -> Result<(), PanelkeepError> {
        let mut clients = self.clients.lock().await;
        let existing = clients
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| PanelkeepError::ClientNotFound(id.clone()))?;
        existing.is_archived = archived;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
