// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Free-text search over encrypted credential fields.
//!
//! Two tracks cooperate:
//!
//! - the *window* track decrypts every field of the currently loaded page;
//! - the *global* track decrypts the logins of up to `global_index_cap`
//!   clients in the current view, so matches outside the page are found and
//!   fetched individually.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use panelkeep_core::traits::ClientStore;
use panelkeep_core::{ClientId, ClientRecord, CredentialField, PanelkeepError};

use crate::batch::{BatchDecryptor, DecryptRequest};
use crate::classifier::classify;

/// Outcome of resolving the loaded window.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WindowResolution {
    /// Clients whose present fields are all cached.
    pub fully_resolved: HashSet<ClientId>,
    /// Fields resolved by this pass (cache hits excluded).
    pub resolved_fields: usize,
}

/// Matches for one query.
#[derive(Debug, Default, Clone)]
pub struct SearchResults {
    /// Every matching client id.
    pub ids: HashSet<ClientId>,
    /// Matching records: window matches in window order, then out-of-window matches.
    pub records: Vec<ClientRecord>,
    /// Matches that were fetched because they lie outside the window.
    pub fetched_outside_window: usize,
}

#[derive(Debug, Default)]
struct GlobalIndex {
    view: Option<bool>,
    ids: Vec<ClientId>,
    logins: HashMap<ClientId, Vec<String>>,
    stale: bool,
}

pub struct SearchIndex {
    store: Arc<dyn ClientStore>,
    decryptor: Arc<BatchDecryptor>,
    global_cap: usize,
    global: RwLock<GlobalIndex>,
}

impl SearchIndex {
    pub fn new(store: Arc<dyn ClientStore>, decryptor: Arc<BatchDecryptor>, global_cap: usize) -> Self {
        Self {
            store,
            decryptor,
            global_cap: global_cap.max(1),
            global: RwLock::new(GlobalIndex::default()),
        }
    }

    /// Decrypt the missing fields of every record in `window`.
    pub async fn resolve_window(&self, window: &[ClientRecord]) -> WindowResolution {
        let resolved = self
            .decryptor
            .resolve_records(window, &CredentialField::ALL)
            .await;
        let cache = self.decryptor.cache();
        WindowResolution {
            fully_resolved: window
                .iter()
                .filter(|record| cache.is_fully_resolved(record))
                .map(|record| record.id.clone())
                .collect(),
            resolved_fields: resolved.len(),
        }
    }

    /// Rebuild the global login index for `archived` if its id set changed.
    ///
    /// Returns `true` when the index was rebuilt.
    pub async fn refresh_global(&self, archived: bool) -> Result<bool, PanelkeepError> {
        let tuples = self.store.list_login_tuples(archived, self.global_cap).await?;
        let mut ids: Vec<ClientId> = tuples.iter().map(|t| t.client_id.clone()).collect();
        ids.sort();

        {
            let index = self.global.read().await;
            if !index.stale && index.view == Some(archived) && index.ids == ids {
                return Ok(false);
            }
        }

        let requests = tuples
            .iter()
            .flat_map(|tuple| {
                [
                    (CredentialField::Login, tuple.login.as_deref()),
                    (CredentialField::Login2, tuple.login_2.as_deref()),
                ]
                .into_iter()
                .filter_map(move |(field, value)| {
                    value.filter(|v| !v.is_empty()).map(|v| DecryptRequest {
                        client_id: tuple.client_id.clone(),
                        field,
                        value: v.to_string(),
                    })
                })
            })
            .collect();
        let resolved = self.decryptor.resolve(requests).await;

        let mut logins: HashMap<ClientId, Vec<String>> = HashMap::with_capacity(ids.len());
        for result in resolved {
            let entry = logins.entry(result.client_id).or_default();
            // A value that fell back to its ciphertext is not searchable.
            if !classify(&result.value) {
                entry.push(result.value.to_lowercase());
            }
        }

        debug!(archived, clients = ids.len(), "rebuilt global login index");
        let mut index = self.global.write().await;
        *index = GlobalIndex {
            view: Some(archived),
            ids,
            logins,
            stale: false,
        };
        Ok(true)
    }

    /// Forget `id` and force the next refresh to rebuild.
    pub async fn invalidate(&self, id: &ClientId) {
        let mut index = self.global.write().await;
        index.logins.remove(id);
        index.stale = true;
    }

    /// Ids in the global index whose decrypted logins contain `query` (case-insensitive).
    pub async fn matching_ids(&self, query: &str) -> HashSet<ClientId> {
        let needle = query.trim().to_lowercase();
        let index = self.global.read().await;
        index
            .logins
            .iter()
            .filter(|(_, logins)| logins.iter().any(|login| login.contains(&needle)))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Number of clients currently held by the global index.
    pub async fn global_len(&self) -> usize {
        self.global.read().await.ids.len()
    }

    /// Search `window` and the global index for `query`.
    ///
    /// An empty query matches the whole window.
    pub async fn search(
        &self,
        query: &str,
        window: &[ClientRecord],
        archived: bool,
    ) -> Result<SearchResults, PanelkeepError> {
        self.resolve_window(window).await;
        self.refresh_global(archived).await?;

        let needle = query.trim().to_lowercase();
        let mut results = SearchResults::default();
        if needle.is_empty() {
            results.ids = window.iter().map(|r| r.id.clone()).collect();
            results.records = window.to_vec();
            return Ok(results);
        }

        for record in window {
            if self.window_match(record, &needle) {
                results.ids.insert(record.id.clone());
                results.records.push(record.clone());
            }
        }

        let in_window: HashSet<&ClientId> = window.iter().map(|r| &r.id).collect();
        let mut outside: Vec<ClientId> = self
            .matching_ids(&needle)
            .await
            .into_iter()
            .filter(|id| !in_window.contains(id))
            .collect();
        outside.sort();

        for id in outside {
            match self.store.get_client(&id).await? {
                Some(record) if record.is_archived == archived => {
                    results.ids.insert(record.id.clone());
                    results.records.push(record);
                    results.fetched_outside_window += 1;
                }
                _ => debug!(client_id = %id, "global index hit no longer in view"),
            }
        }

        Ok(results)
    }

    fn window_match(&self, record: &ClientRecord, needle: &str) -> bool {
        if record.name.to_lowercase().contains(needle) {
            return true;
        }
        let cache = self.decryptor.cache();
        CredentialField::LOGINS.into_iter().any(|field| {
            cache
                .get_field(&record.id, field)
                .is_some_and(|login| !classify(&login) && login.to_lowercase().contains(needle))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DecryptedCache;
    use panelkeep_core::{Credential, SecondaryCredential};
    use panelkeep_test_utils::{InMemoryClientStore, MockEncryption};

    fn client(i: usize, login: &str) -> ClientRecord {
        ClientRecord {
            id: ClientId(format!("c-{i:03}")),
            name: format!("Client {i}"),
            server_id: None,
            credential: Credential {
                login: Some(MockEncryption::seal_static(login)),
                password: Some(MockEncryption::seal_static("pw")),
                fingerprint: None,
            },
            secondary: SecondaryCredential::default(),
            is_archived: false,
            created_at: format!("2026-01-01T00:00:{:02}.000Z", i % 60),
            updated_at: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    struct Harness {
        store: Arc<InMemoryClientStore>,
        encryption: Arc<MockEncryption>,
        index: SearchIndex,
    }

    fn harness(clients: Vec<ClientRecord>, cap: usize) -> Harness {
        let store = Arc::new(InMemoryClientStore::with_clients(clients));
        let encryption = Arc::new(MockEncryption::new());
        let decryptor = Arc::new(BatchDecryptor::new(
            encryption.clone(),
            Arc::new(DecryptedCache::new()),
            10,
        ));
        let index = SearchIndex::new(store.clone(), decryptor, cap);
        Harness {
            store,
            encryption,
            index,
        }
    }

    #[tokio::test]
    async fn match_outside_window_is_fetched() {
        let clients: Vec<ClientRecord> = (0..30)
            .map(|i| client(i, &format!("user{i}@panel")))
            .chain([client(30, "Special.Login")])
            .collect();
        let h = harness(clients, 1000);
        let window = h.store.list_clients(false, 0, 10).await.unwrap();

        let results = h.index.search("special", &window, false).await.unwrap();

        assert!(results.ids.contains(&ClientId::from("c-030")));
        assert_eq!(results.fetched_outside_window, 1);
        assert_eq!(results.records.len(), 1);
        assert_eq!(h.store.get_count(), 1);
    }

    #[tokio::test]
    async fn window_matches_on_name_and_secondary_login() {
        let mut second = client(1, "primary");
        second.secondary.login = Some(MockEncryption::seal_static("Backup-Login"));
        let h = harness(vec![client(0, "someone"), second], 1000);
        let window = h.store.list_clients(false, 0, 10).await.unwrap();

        let by_name = h.index.search("client 0", &window, false).await.unwrap();
        assert_eq!(by_name.ids, HashSet::from([ClientId::from("c-000")]));

        let by_login_2 = h.index.search("backup", &window, false).await.unwrap();
        assert_eq!(by_login_2.ids, HashSet::from([ClientId::from("c-001")]));
        assert_eq!(by_login_2.fetched_outside_window, 0);
    }

    #[tokio::test]
    async fn empty_query_returns_window() {
        let h = harness((0..3).map(|i| client(i, "x")).collect(), 1000);
        let window = h.store.list_clients(false, 0, 10).await.unwrap();
        let results = h.index.search("  ", &window, false).await.unwrap();
        assert_eq!(results.records, window);
    }

    #[tokio::test]
    async fn global_index_is_capped_and_not_rebuilt_without_changes() {
        let h = harness((0..20).map(|i| client(i, &format!("u{i}"))).collect(), 5);

        assert!(h.index.refresh_global(false).await.unwrap());
        assert_eq!(h.index.global_len().await, 5);
        let calls = h.encryption.decrypt_calls();

        assert!(!h.index.refresh_global(false).await.unwrap());
        assert_eq!(h.encryption.decrypt_calls(), calls);
    }

    #[tokio::test]
    async fn id_set_change_rebuilds_without_redecrypting_cached_logins() {
        let h = harness((0..3).map(|i| client(i, &format!("u{i}"))).collect(), 100);
        h.index.refresh_global(false).await.unwrap();
        assert_eq!(h.encryption.decrypt_calls(), 3);

        h.store.insert_client(&client(3, "newcomer")).await.unwrap();
        assert!(h.index.refresh_global(false).await.unwrap());

        assert_eq!(h.encryption.decrypt_calls(), 4);
        assert!(h.index.matching_ids("NEWCOMER").await.contains(&ClientId::from("c-003")));
    }

    #[tokio::test]
    async fn view_switch_rebuilds_for_archived_clients() {
        let mut archived = client(5, "old-login");
        archived.is_archived = true;
        let h = harness(vec![client(0, "active-login"), archived], 100);

        h.index.refresh_global(false).await.unwrap();
        assert!(h.index.matching_ids("old").await.is_empty());

        assert!(h.index.refresh_global(true).await.unwrap());
        assert_eq!(
            h.index.matching_ids("old").await,
            HashSet::from([ClientId::from("c-005")])
        );
    }

    #[tokio::test]
    async fn invalidate_forces_rebuild() {
        let h = harness(vec![client(0, "alice")], 100);
        h.index.refresh_global(false).await.unwrap();

        h.index.invalidate(&ClientId::from("c-000")).await;
        assert!(h.index.matching_ids("alice").await.is_empty());
        assert!(h.index.refresh_global(false).await.unwrap());
    }

    #[tokio::test]
    async fn undecryptable_login_is_not_matched_as_text() {
        let stuck = client(0, "alice");
        let sealed = stuck.credential.login.clone().unwrap();
        let h = harness(vec![stuck, client(1, "bob")], 100);
        h.encryption.fail_decrypt_of(&sealed);
        let window = h.store.list_clients(false, 0, 1).await.unwrap();

        // A fragment of the base64 ciphertext, lowercased.
        let fragment = sealed[2..8].to_lowercase();
        let results = h.index.search(&fragment, &window, false).await.unwrap();
        assert!(results.ids.is_empty(), "matched ciphertext: {:?}", results.ids);
        assert!(h.index.matching_ids(&fragment).await.is_empty());

        let by_login = h.index.search("bob", &window, false).await.unwrap();
        assert_eq!(by_login.ids, HashSet::from([ClientId::from("c-001")]));
        assert_eq!(by_login.fetched_outside_window, 1);
    }

    #[tokio::test]
    async fn window_resolution_reports_fully_resolved_clients() {
        let h = harness((0..4).map(|i| client(i, "x")).collect(), 100);
        let window = h.store.list_clients(false, 0, 4).await.unwrap();

        let first = h.index.resolve_window(&window).await;
        assert_eq!(first.fully_resolved.len(), 4);
        assert_eq!(first.resolved_fields, 8);

        let second = h.index.resolve_window(&window).await;
        assert_eq!(second.resolved_fields, 0);
        assert_eq!(h.encryption.decrypt_calls(), 8);
    }
}
