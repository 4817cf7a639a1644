// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client management subcommands.
//!
//! Each command opens the store, builds a [`CredentialVault`] over it, runs
//! one facade call, and checkpoints the database before returning.

use std::sync::Arc;

use panelkeep_config::model::PanelkeepConfig;
use panelkeep_core::{
    ClientId, ClientRecord, ClientStore, CredentialField, DecryptedCredentials, PanelkeepError,
    ServerId,
};
use panelkeep_storage::SqliteClientStore;
use panelkeep_vault::{
    classify, generate_key_hex, mask_secret, AesGcmEncryption, ClientDraft, CredentialVault,
    HmacFingerprint, SavedClient,
};

use crate::CredentialArgs;

/// An open store plus the vault built on top of it.
pub(crate) struct Session {
    pub store: Arc<SqliteClientStore>,
    pub vault: CredentialVault,
}

impl Session {
    pub async fn open(config: &PanelkeepConfig) -> Result<Self, PanelkeepError> {
        let encryption = Arc::new(AesGcmEncryption::from_config(&config.crypto)?);
        let fingerprint = Arc::new(HmacFingerprint::from_config(&config.crypto)?);
        let store = Arc::new(SqliteClientStore::new(config.storage.clone()));
        store.initialize().await?;
        let vault = CredentialVault::new(store.clone(), encryption, fingerprint, &config.decrypt);
        Ok(Self { store, vault })
    }

    pub async fn close(self) -> Result<(), PanelkeepError> {
        self.store.close().await
    }
}

pub async fn run_add(
    config: &PanelkeepConfig,
    name: String,
    credentials: CredentialArgs,
) -> Result<(), PanelkeepError> {
    let session = Session::open(config).await?;
    let draft = ClientDraft {
        id: None,
        name,
        server_id: credentials.server.map(ServerId),
        login: credentials.login,
        password: credentials.password,
        login_2: credentials.login_2,
        password_2: credentials.password_2,
        shared: None,
    };
    let saved = session.vault.save_client(draft).await?;
    print_saved("created", &saved);
    session.close().await
}

pub async fn run_update(
    config: &PanelkeepConfig,
    id: String,
    name: Option<String>,
    credentials: CredentialArgs,
    clear_login: bool,
) -> Result<(), PanelkeepError> {
    let session = Session::open(config).await?;
    let id = ClientId(id);
    let record = load_client(&session.store, &id).await?;
    let current = session.vault.decrypt_for_display(&id).await?;
    let draft = merge_update(&record, &current, name, credentials, clear_login)?;
    let saved = session.vault.save_client(draft).await?;
    print_saved("updated", &saved);
    session.close().await
}

pub async fn run_show(config: &PanelkeepConfig, id: String, reveal: bool) -> Result<(), PanelkeepError> {
    let session = Session::open(config).await?;
    let id = ClientId(id);
    let record = load_client(&session.store, &id).await?;
    let shown = session.vault.decrypt_for_display(&id).await?;

    println!("{} ({})", record.name, record.id);
    if let Some(server) = &record.server_id {
        println!("  server:     {server}");
    }
    for field in CredentialField::ALL {
        if let Some(value) = shown.get(field) {
            let value = if field.is_login() || reveal {
                value.to_string()
            } else {
                mask_secret(value)
            };
            println!("  {:<11} {value}", format!("{field}:"));
        }
    }
    if let (Some(server), Some(fingerprint)) =
        (&record.server_id, record.credential.fingerprint.as_deref())
    {
        let (used, limit) = session.vault.slot_usage(server, fingerprint).await?;
        println!("  slots:      {used}/{limit}");
    }
    if record.is_archived {
        println!("  (archived)");
    }
    session.close().await
}

pub async fn run_list(
    config: &PanelkeepConfig,
    archived: bool,
    page: usize,
    page_size: usize,
) -> Result<(), PanelkeepError> {
    let session = Session::open(config).await?;
    let window = session.vault.list_window(archived, page, page_size).await?;
    // An empty query resolves the whole window into the cache.
    session
        .vault
        .search_by_query("", &window.records, archived)
        .await?;

    for record in &window.records {
        println!("{}", format_row(record, session.vault.cache().get(&record.id).as_ref()));
    }
    let pages = window.total.div_ceil(page_size.max(1));
    println!(
        "page {} of {} ({} {} clients)",
        page + 1,
        pages.max(1),
        window.total,
        if archived { "archived" } else { "active" }
    );
    session.close().await
}

pub async fn run_search(
    config: &PanelkeepConfig,
    query: String,
    archived: bool,
    page_size: usize,
) -> Result<(), PanelkeepError> {
    let session = Session::open(config).await?;
    let window = session.vault.list_window(archived, 0, page_size).await?;
    let results = session
        .vault
        .search_by_query(&query, &window.records, archived)
        .await?;

    for record in &results.records {
        println!("{}", format_row(record, session.vault.cache().get(&record.id).as_ref()));
    }
    println!(
        "{} match(es), {} outside the first page",
        results.ids.len(),
        results.fetched_outside_window
    );
    session.close().await
}

pub async fn run_archive(config: &PanelkeepConfig, id: String, archive: bool) -> Result<(), PanelkeepError> {
    let session = Session::open(config).await?;
    let id = ClientId(id);
    if archive {
        session.vault.archive_client(&id).await?;
        println!("archived {id}");
    } else {
        session.vault.unarchive_client(&id).await?;
        println!("unarchived {id}");
    }
    session.close().await
}

pub async fn run_migrate(config: &PanelkeepConfig) -> Result<(), PanelkeepError> {
    let session = Session::open(config).await?;
    let report = session.vault.migrate_legacy_plaintext().await?;

    println!(
        "migrated {}, skipped {}, over capacity {}",
        report.migrated.len(),
        report.skipped.len(),
        report.over_capacity.len()
    );
    for id in &report.over_capacity {
        println!("  slot group full: {id}");
    }
    for warning in &report.warnings {
        println!("  warning: {warning}");
    }
    session.close().await
}

pub fn run_keygen() -> Result<(), PanelkeepError> {
    println!("{}", generate_key_hex()?);
    Ok(())
}

async fn load_client(store: &SqliteClientStore, id: &ClientId) -> Result<ClientRecord, PanelkeepError> {
    store
        .get_client(id)
        .await?
        .ok_or_else(|| PanelkeepError::ClientNotFound(id.clone()))
}

/// Build the draft for `update`: explicit arguments win, everything else keeps
/// its current decrypted value.
fn merge_update(
    record: &ClientRecord,
    current: &DecryptedCredentials,
    name: Option<String>,
    args: CredentialArgs,
    clear_login: bool,
) -> Result<ClientDraft, PanelkeepError> {
    let keep = |field: CredentialField, explicit: Option<String>| -> Result<Option<String>, PanelkeepError> {
        if explicit.is_some() {
            return Ok(explicit);
        }
        match current.get(field) {
            Some(value) if classify(value) => Err(PanelkeepError::Encryption {
                message: format!("stored {field} could not be decrypted; pass --{} explicitly", field.to_string().replace('_', "-")),
                source: None,
            }),
            other => Ok(other.map(str::to_string)),
        }
    };

    let (login, password) = if clear_login {
        (None, None)
    } else {
        (
            keep(CredentialField::Login, args.login)?,
            keep(CredentialField::Password, args.password)?,
        )
    };

    Ok(ClientDraft {
        id: Some(record.id.clone()),
        name: name.unwrap_or_else(|| record.name.clone()),
        server_id: args.server.map(ServerId).or_else(|| record.server_id.clone()),
        login,
        password,
        login_2: keep(CredentialField::Login2, args.login_2)?,
        password_2: keep(CredentialField::Password2, args.password_2)?,
        shared: None,
    })
}

fn print_saved(verb: &str, saved: &SavedClient) {
    println!("{verb} {} ({:?})", saved.record.id, saved.path);
    for field in &saved.plaintext_fields {
        println!("  warning: {field} stored as plaintext (encryption failed)");
    }
}

/// One list line: id, name, server and the decrypted logins known so far.
fn format_row(record: &ClientRecord, decrypted: Option<&DecryptedCredentials>) -> String {
    let logins = decrypted
        .map(|d| d.logins().collect::<Vec<_>>().join(", "))
        .unwrap_or_default();
    format!(
        "{:<36}  {:<24}  {:<12}  {}",
        record.id.as_str(),
        record.name,
        record.server_id.as_ref().map(ServerId::as_str).unwrap_or("-"),
        logins
    )
}
