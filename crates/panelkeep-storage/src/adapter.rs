// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the ClientStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use panelkeep_config::model::StorageConfig;
use panelkeep_core::{
    AdapterType, ClientId, ClientRecord, ClientStore, HealthStatus, LoginTuple, PanelkeepError,
    PluginAdapter, ServerId,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed client store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily opened by [`initialize`](Self::initialize).
pub struct SqliteClientStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteClientStore {
    /// Create a new store with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`](Self::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already opened database (used with in-memory databases).
    pub fn from_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// Open the database at the configured path and run migrations.
    pub async fn initialize(&self) -> Result<(), PanelkeepError> {
        let db = Database::open_with_options(&self.config.database_path, self.config.wal_mode)
            .await?;
        self.db.set(db).map_err(|_| PanelkeepError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite client store initialized");
        Ok(())
    }

    /// Checkpoint the WAL before the process exits.
    pub async fn close(&self) -> Result<(), PanelkeepError> {
        self.db()?.close().await
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, PanelkeepError> {
        self.db.get().ok_or_else(|| PanelkeepError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteClientStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, PanelkeepError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ClientStore for SqliteClientStore {
    async fn insert_client(&self, record: &ClientRecord) -> Result<(), PanelkeepError> {
        queries::clients::insert_client(self.db()?, record).await
    }

    async fn update_client(&self, record: &ClientRecord) -> Result<(), PanelkeepError> {
        queries::clients::update_client(self.db()?, record).await
    }

    async fn get_client(&self, id: &ClientId) -> Result<Option<ClientRecord>, PanelkeepError> {
        queries::clients::get_client(self.db()?, id).await
    }

    async fn find_slot_members(
        &self,
        server_id: &ServerId,
        fingerprint: &str,
        exclude: Option<&ClientId>,
    ) -> Result<Vec<ClientRecord>, PanelkeepError> {
        queries::clients::find_slot_members(self.db()?, server_id, fingerprint, exclude).await
    }

    async fn list_clients(
        &self,
        archived: bool,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ClientRecord>, PanelkeepError> {
        queries::clients::list_clients(self.db()?, archived, offset, limit).await
    }

    async fn count_clients(&self, archived: bool) -> Result<usize, PanelkeepError> {
        queries::clients::count_clients(self.db()?, archived).await
    }

    async fn list_login_tuples(
        &self,
        archived: bool,
        limit: usize,
    ) -> Result<Vec<LoginTuple>, PanelkeepError> {
        queries::clients::list_login_tuples(self.db()?, archived, limit).await
    }

    async fn set_archived(&self, id: &ClientId, archived: bool) -> Result<(), PanelkeepError> {
        queries::clients::set_archived(self.db()?, id, archived).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panelkeep_core::{Credential, SecondaryCredential};
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn sqlite_store_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let store = SqliteClientStore::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(store.name(), "sqlite");
        assert_eq!(store.version(), semver::Version::new(0, 1, 0));
        assert_eq!(store.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let store = SqliteClientStore::new(make_config(db_path.to_str().unwrap()));

        store.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
        assert!(store.initialize().await.is_err(), "second initialize should fail");
    }

    #[tokio::test]
    async fn health_check_requires_initialize() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("health.db");
        let store = SqliteClientStore::new(make_config(db_path.to_str().unwrap()));

        assert!(store.health_check().await.is_err());
        store.initialize().await.unwrap();
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn client_lifecycle_through_store() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("lifecycle.db");
        let store = SqliteClientStore::new(make_config(db_path.to_str().unwrap()));
        store.initialize().await.unwrap();

        let client = ClientRecord {
            id: ClientId::from("c-1"),
            name: "Alice".into(),
            server_id: Some(ServerId::from("srv-1")),
            credential: Credential {
                login: Some("Y2lwaGVyLWxvZ2luLWZvci1hbGljZQ==".into()),
                password: Some("Y2lwaGVyLXBhc3N3b3JkLWFsaWNl".into()),
                fingerprint: Some("fp-1".into()),
            },
            secondary: SecondaryCredential::default(),
            is_archived: false,
            created_at: "2026-01-01T00:00:00.000Z".into(),
            updated_at: "2026-01-01T00:00:00.000Z".into(),
        };
        store.insert_client(&client).await.unwrap();

        let members = store
            .find_slot_members(&ServerId::from("srv-1"), "fp-1", None)
            .await
            .unwrap();
        assert_eq!(members, vec![client.clone()]);

        store.set_archived(&client.id, true).await.unwrap();
        assert_eq!(store.count_clients(true).await.unwrap(), 1);
        assert!(store
            .find_slot_members(&ServerId::from("srv-1"), "fp-1", None)
            .await
            .unwrap()
            .is_empty());

        store.close().await.unwrap();
    }
}
