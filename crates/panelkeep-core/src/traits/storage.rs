// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client store trait for the persistence collaborator.

use async_trait::async_trait;

use crate::error::PanelkeepError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ClientId, ClientRecord, LoginTuple, ServerId};

/// Persistence backend for client records.
///
/// The vault only reads and writes the credential-related columns; every other
/// business field is carried through untouched.
#[async_trait]
pub trait ClientStore: PluginAdapter {
    /// Inserts a new client record.
    async fn insert_client(&self, record: &ClientRecord) -> Result<(), PanelkeepError>;

    /// Replaces the stored columns of an existing client record.
    async fn update_client(&self, record: &ClientRecord) -> Result<(), PanelkeepError>;

    /// Fetches a single client record by id.
    async fn get_client(&self, id: &ClientId) -> Result<Option<ClientRecord>, PanelkeepError>;

    /// Lists active (non-archived) clients on `server_id` whose stored
    /// fingerprint equals `fingerprint`, oldest first, excluding `exclude`.
    async fn find_slot_members(
        &self,
        server_id: &ServerId,
        fingerprint: &str,
        exclude: Option<&ClientId>,
    ) -> Result<Vec<ClientRecord>, PanelkeepError>;

    /// Lists one page of clients in the archived or active view, oldest first.
    async fn list_clients(
        &self,
        archived: bool,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ClientRecord>, PanelkeepError>;

    /// Counts clients in the archived or active view.
    async fn count_clients(&self, archived: bool) -> Result<usize, PanelkeepError>;

    /// Lists up to `limit` `(id, login, login_2)` tuples in the archived or active view.
    async fn list_login_tuples(
        &self,
        archived: bool,
        limit: usize,
    ) -> Result<Vec<LoginTuple>, PanelkeepError>;

    /// Moves a client between the archived and active views.
    async fn set_archived(&self, id: &ClientId, archived: bool) -> Result<(), PanelkeepError>;
}
