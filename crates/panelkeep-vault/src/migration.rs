// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot encryption of legacy plaintext credentials.
//!
//! Scans every client in both views. Rows whose credential columns already
//! look encrypted are skipped; the rest go through the normal resolver so a
//! migrated row joins an existing slot group instead of forking it.

use panelkeep_core::{
    ClientId, ClientRecord, Credential, CredentialField, PanelkeepError, SecondaryCredential,
};
use tracing::{info, warn};

use crate::batch::DecryptOutcome;
use crate::classifier::classify;
use crate::resolver::CredentialInput;
use crate::vault::{timestamp, CredentialVault};

/// Rows fetched per page while scanning.
const SCAN_PAGE: usize = 200;

/// Report of what the migration did.
#[derive(Debug, Default)]
pub struct MigrationReport {
    /// Clients whose credentials were rewritten.
    pub migrated: Vec<ClientId>,
    /// Clients with nothing to migrate.
    pub skipped: Vec<ClientId>,
    /// Clients left untouched because their slot group is full.
    pub over_capacity: Vec<ClientId>,
    /// Non-fatal problems (undecryptable halves, encryption failures).
    pub warnings: Vec<String>,
}

impl CredentialVault {
    /// Encrypt every credential field the classifier reports as plaintext.
    pub async fn migrate_legacy_plaintext(&self) -> Result<MigrationReport, PanelkeepError> {
        let mut report = MigrationReport::default();

        for archived in [false, true] {
            let mut records = Vec::new();
            let mut offset = 0;
            loop {
                let page = self.store.list_clients(archived, offset, SCAN_PAGE).await?;
                let len = page.len();
                records.extend(page);
                if len < SCAN_PAGE {
                    break;
                }
                offset += len;
            }
            for record in records {
                self.migrate_record(record, &mut report).await?;
            }
        }

        info!(
            migrated = report.migrated.len(),
            skipped = report.skipped.len(),
            over_capacity = report.over_capacity.len(),
            warnings = report.warnings.len(),
            "legacy plaintext migration finished"
        );
        Ok(report)
    }

    async fn migrate_record(
        &self,
        record: ClientRecord,
        report: &mut MigrationReport,
    ) -> Result<(), PanelkeepError> {
        let plaintext: Vec<CredentialField> = record
            .present_fields()
            .into_iter()
            .filter(|field| record.field_value(*field).is_some_and(|v| !classify(v)))
            .collect();
        if plaintext.is_empty() {
            report.skipped.push(record.id);
            return Ok(());
        }

        let mut updated = record.clone();
        let mut changed = false;

        if plaintext.iter().any(|f| matches!(f, CredentialField::Login | CredentialField::Password)) {
            match self.migrate_primary(&record, report).await? {
                PrimaryOutcome::Resolved(credential) => {
                    updated.credential = credential;
                    changed = true;
                }
                PrimaryOutcome::OverCapacity => {
                    report.over_capacity.push(record.id);
                    return Ok(());
                }
                PrimaryOutcome::Unchanged => {}
            }
        }

        let secondary = SecondaryCredential {
            login: self
                .migrate_secondary(&record, CredentialField::Login2, report)
                .await,
            password: self
                .migrate_secondary(&record, CredentialField::Password2, report)
                .await,
        };
        if secondary != record.secondary {
            updated.secondary = secondary;
            changed = true;
        }

        if !changed {
            report.skipped.push(record.id);
            return Ok(());
        }

        updated.updated_at = timestamp();
        match self.store.update_client(&updated).await {
            Ok(()) => {}
            Err(e) if e.is_capacity_exceeded() => {
                report.over_capacity.push(record.id);
                return Ok(());
            }
            Err(e) => return Err(e),
        }
        self.cache.invalidate(&record.id);
        self.search.invalidate(&record.id).await;
        report.migrated.push(record.id);
        Ok(())
    }

    async fn migrate_primary(
        &self,
        record: &ClientRecord,
        report: &mut MigrationReport,
    ) -> Result<PrimaryOutcome, PanelkeepError> {
        let Some(login) = self
            .plaintext_of(record, CredentialField::Login, report)
            .await
        else {
            return Ok(PrimaryOutcome::Unchanged);
        };
        let password = match record.field_value(CredentialField::Password) {
            Some(_) => match self
                .plaintext_of(record, CredentialField::Password, report)
                .await
            {
                Some(password) => password,
                None => return Ok(PrimaryOutcome::Unchanged),
            },
            None => String::new(),
        };

        let input = CredentialInput {
            client_id: Some(record.id.clone()),
            server_id: record.server_id.clone(),
            login: Some(login),
            password: Some(password),
            shared: None,
            archived: record.is_archived,
        };
        match self.resolver.resolve(&input).await {
            Ok(resolved) if !resolved.plaintext_fields.is_empty() => {
                report.warnings.push(format!(
                    "client {}: encryption failed, primary credential left as plaintext",
                    record.id
                ));
                Ok(PrimaryOutcome::Unchanged)
            }
            Ok(resolved) => Ok(PrimaryOutcome::Resolved(resolved.credential)),
            Err(e) if e.is_capacity_exceeded() => {
                warn!(client_id = %record.id, "slot group full, leaving legacy credential in place");
                Ok(PrimaryOutcome::OverCapacity)
            }
            Err(e) => Err(e),
        }
    }

    /// Plaintext of a primary field, decrypting it if it is already encrypted.
    async fn plaintext_of(
        &self,
        record: &ClientRecord,
        field: CredentialField,
        report: &mut MigrationReport,
    ) -> Option<String> {
        let stored = record.field_value(field)?;
        if !classify(stored) {
            return Some(stored.to_string());
        }
        match self.decryptor.decrypt_value(stored).await {
            (plain, DecryptOutcome::Decrypted) => Some(plain),
            _ => {
                report.warnings.push(format!(
                    "client {}: {field} could not be decrypted, primary credential not migrated",
                    record.id
                ));
                None
            }
        }
    }

    async fn migrate_secondary(
        &self,
        record: &ClientRecord,
        field: CredentialField,
        report: &mut MigrationReport,
    ) -> Option<String> {
        let original = match field {
            CredentialField::Login2 => record.secondary.login.clone(),
            _ => record.secondary.password.clone(),
        };
        let stored = record.field_value(field)?;
        if classify(stored) {
            return original;
        }
        let (value, plain) = self
            .resolver
            .encrypt_or_plaintext(Some(&record.id), field, stored)
            .await;
        if plain {
            report.warnings.push(format!(
                "client {}: encryption failed, {field} left as plaintext",
                record.id
            ));
        }
        Some(value)
    }
}

enum PrimaryOutcome {
    Resolved(Credential),
    OverCapacity,
    Unchanged,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use panelkeep_config::model::DecryptConfig;
    use panelkeep_core::ServerId;
    use panelkeep_test_utils::{InMemoryClientStore, MockEncryption, MockFingerprint};

    fn legacy(id: &str, server: &str, login: &str, password: &str, ts: &str) -> ClientRecord {
        ClientRecord {
            id: ClientId::from(id),
            name: id.into(),
            server_id: Some(ServerId::from(server)),
            credential: Credential {
                login: Some(login.into()),
                password: Some(password.into()),
                fingerprint: None,
            },
            secondary: SecondaryCredential::default(),
            is_archived: false,
            created_at: ts.into(),
            updated_at: ts.into(),
        }
    }

    fn vault(store: &Arc<InMemoryClientStore>, encryption: &Arc<MockEncryption>) -> CredentialVault {
        CredentialVault::new(
            store.clone(),
            encryption.clone(),
            Arc::new(MockFingerprint::new()),
            &DecryptConfig::default(),
        )
    }

    #[tokio::test]
    async fn plaintext_rows_are_encrypted_and_grouped() {
        let store = Arc::new(InMemoryClientStore::with_clients(vec![
            legacy("c-1", "s1", "shared", "pw", "2026-01-01T00:00:00.000Z"),
            legacy("c-2", "s1", "shared", "pw", "2026-01-02T00:00:00.000Z"),
        ]));
        let encryption = Arc::new(MockEncryption::new());

        let report = vault(&store, &encryption).migrate_legacy_plaintext().await.unwrap();

        assert_eq!(report.migrated.len(), 2);
        let rows = store.snapshot().await;
        assert!(classify(rows[0].credential.login.as_deref().unwrap()));
        assert_eq!(rows[0].credential, rows[1].credential);
        assert_eq!(
            rows[0].credential.fingerprint.as_deref(),
            Some(MockFingerprint::expected("shared", "pw").as_str())
        );
    }

    #[tokio::test]
    async fn encrypted_rows_are_skipped() {
        let mut already = legacy("c-1", "s1", "x", "y", "2026-01-01T00:00:00.000Z");
        already.credential.login = Some(MockEncryption::seal_static("alice"));
        already.credential.password = Some(MockEncryption::seal_static("pw"));
        let store = Arc::new(InMemoryClientStore::with_clients(vec![already]));
        let encryption = Arc::new(MockEncryption::new());

        let report = vault(&store, &encryption).migrate_legacy_plaintext().await.unwrap();

        assert_eq!(report.skipped, vec![ClientId::from("c-1")]);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn full_group_leaves_row_unmigrated() {
        let mut clients: Vec<ClientRecord> = (1..=3)
            .map(|i| {
                let mut c = legacy(&format!("c-{i}"), "s1", "", "", &format!("2026-01-0{i}T00:00:00.000Z"));
                c.credential = Credential {
                    login: Some(MockEncryption::seal_static("shared")),
                    password: Some(MockEncryption::seal_static("pw")),
                    fingerprint: Some(MockFingerprint::expected("shared", "pw")),
                };
                c
            })
            .collect();
        clients.push(legacy("c-4", "s1", "shared", "pw", "2026-01-04T00:00:00.000Z"));
        let store = Arc::new(InMemoryClientStore::with_clients(clients));
        let encryption = Arc::new(MockEncryption::new());

        let report = vault(&store, &encryption).migrate_legacy_plaintext().await.unwrap();

        assert_eq!(report.over_capacity, vec![ClientId::from("c-4")]);
        let rows = store.snapshot().await;
        assert_eq!(rows[3].credential.login.as_deref(), Some("shared"));
    }

    #[tokio::test]
    async fn mixed_row_decrypts_encrypted_half_for_fingerprint() {
        let mut mixed = legacy("c-1", "s1", "alice", "", "2026-01-01T00:00:00.000Z");
        mixed.credential.password = Some(MockEncryption::seal_static("pw"));
        mixed.secondary.login = Some("alice-b".into());
        let store = Arc::new(InMemoryClientStore::with_clients(vec![mixed]));
        let encryption = Arc::new(MockEncryption::new());

        let report = vault(&store, &encryption).migrate_legacy_plaintext().await.unwrap();

        assert_eq!(report.migrated, vec![ClientId::from("c-1")]);
        let row = &store.snapshot().await[0];
        assert_eq!(
            row.credential.fingerprint.as_deref(),
            Some(MockFingerprint::expected("alice", "pw").as_str())
        );
        assert!(classify(row.secondary.login.as_deref().unwrap()));
    }

    #[tokio::test]
    async fn encryption_failure_is_reported_not_written() {
        let store = Arc::new(InMemoryClientStore::with_clients(vec![legacy(
            "c-1",
            "s1",
            "alice",
            "pw",
            "2026-01-01T00:00:00.000Z",
        )]));
        let encryption = Arc::new(MockEncryption::new());
        encryption.fail_encrypt(true);

        let report = vault(&store, &encryption).migrate_legacy_plaintext().await.unwrap();

        assert_eq!(report.skipped, vec![ClientId::from("c-1")]);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(store.write_count(), 0);
    }
}
