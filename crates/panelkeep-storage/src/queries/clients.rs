// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client record operations.

use panelkeep_core::{ClientId, ClientRecord, LoginTuple, PanelkeepError, ServerId};
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, map_write_err, Database};
use crate::models::{row_to_client, CLIENT_COLUMNS};

/// Insert a new client record.
///
/// Fails with `CapacityExceeded` when the row would overfill its slot group.
pub async fn insert_client(db: &Database, record: &ClientRecord) -> Result<(), PanelkeepError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO clients (id, name, server_id, login, password, login_2, password_2,
                                      credentials_fingerprint, is_archived, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.id.0,
                    record.name,
                    record.server_id.as_ref().map(|s| s.0.as_str()),
                    record.credential.login,
                    record.credential.password,
                    record.secondary.login,
                    record.secondary.password,
                    record.credential.fingerprint,
                    record.is_archived,
                    record.created_at,
                    record.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_write_err)
}

/// Replace every stored column of an existing client record.
pub async fn update_client(db: &Database, record: &ClientRecord) -> Result<(), PanelkeepError> {
    let record = record.clone();
    let id = record.id.clone();
    let updated = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE clients
                 SET name = ?2, server_id = ?3, login = ?4, password = ?5, login_2 = ?6,
                     password_2 = ?7, credentials_fingerprint = ?8, is_archived = ?9,
                     updated_at = ?10
                 WHERE id = ?1",
                params![
                    record.id.0,
                    record.name,
                    record.server_id.as_ref().map(|s| s.0.as_str()),
                    record.credential.login,
                    record.credential.password,
                    record.secondary.login,
                    record.secondary.password,
                    record.credential.fingerprint,
                    record.is_archived,
                    record.updated_at,
                ],
            )
        })
        .await
        .map_err(map_write_err)?;
    if updated == 0 {
        return Err(PanelkeepError::ClientNotFound(id));
    }
    Ok(())
}

/// Get a client record by id.
pub async fn get_client(db: &Database, id: &ClientId) -> Result<Option<ClientRecord>, PanelkeepError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| -> Result<Option<ClientRecord>, rusqlite::Error> {
            let mut stmt =
                conn.prepare(&format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1"))?;
            stmt.query_row(params![id], row_to_client).optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Active clients sharing `(server_id, fingerprint)`, oldest first, optionally excluding one id.
pub async fn find_slot_members(
    db: &Database,
    server_id: &ServerId,
    fingerprint: &str,
    exclude: Option<&ClientId>,
) -> Result<Vec<ClientRecord>, PanelkeepError> {
    let server_id = server_id.0.clone();
    let fingerprint = fingerprint.to_string();
    let exclude = exclude.map(|id| id.0.clone());
    db.connection()
        .call(move |conn| -> Result<Vec<ClientRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CLIENT_COLUMNS} FROM clients
                 WHERE server_id = ?1
                   AND credentials_fingerprint = ?2
                   AND is_archived = 0
                   AND (?3 IS NULL OR id != ?3)
                 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![server_id, fingerprint, exclude], row_to_client)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// One page of the archived or active view, oldest first.
pub async fn list_clients(
    db: &Database,
    archived: bool,
    offset: usize,
    limit: usize,
) -> Result<Vec<ClientRecord>, PanelkeepError> {
    let offset = i64::try_from(offset).unwrap_or(i64::MAX);
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> Result<Vec<ClientRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CLIENT_COLUMNS} FROM clients
                 WHERE is_archived = ?1
                 ORDER BY created_at ASC, id ASC
                 LIMIT ?2 OFFSET ?3"
            ))?;
            let rows = stmt.query_map(params![archived, limit, offset], row_to_client)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Number of clients in the archived or active view.
pub async fn count_clients(db: &Database, archived: bool) -> Result<usize, PanelkeepError> {
    let count = db
        .connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM clients WHERE is_archived = ?1",
                params![archived],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(usize::try_from(count).unwrap_or_default())
}

/// Up to `limit` `(id, login, login_2)` tuples for the global login index, newest first.
pub async fn list_login_tuples(
    db: &Database,
    archived: bool,
    limit: usize,
) -> Result<Vec<LoginTuple>, PanelkeepError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> Result<Vec<LoginTuple>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, login, login_2 FROM clients
                 WHERE is_archived = ?1
                   AND (login IS NOT NULL OR login_2 IS NOT NULL)
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![archived, limit], |row| {
                Ok(LoginTuple {
                    client_id: ClientId(row.get(0)?),
                    login: row.get(1)?,
                    login_2: row.get(2)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Move a client between the archived and active views.
pub async fn set_archived(db: &Database, id: &ClientId, archived: bool) -> Result<(), PanelkeepError> {
    let owned = id.0.clone();
    let updated = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE clients
                 SET is_archived = ?2, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![owned, archived],
            )
        })
        .await
        .map_err(map_write_err)?;
    if updated == 0 {
        return Err(PanelkeepError::ClientNotFound(id.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use panelkeep_core::{Credential, SecondaryCredential};

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn make_client(id: &str, server: Option<&str>, fingerprint: Option<&str>, ts: &str) -> ClientRecord {
        ClientRecord {
            id: ClientId::from(id),
            name: format!("client {id}"),
            server_id: server.map(ServerId::from),
            credential: Credential {
                login: Some(format!("cipher-login-{id}")),
                password: Some(format!("cipher-password-{id}")),
                fingerprint: fingerprint.map(str::to_string),
            },
            secondary: SecondaryCredential::default(),
            is_archived: false,
            created_at: ts.to_string(),
            updated_at: ts.to_string(),
        }
    }

    #[tokio::test]
    async fn insert_and_get_client_roundtrips() {
        let db = setup_db().await;
        let mut client = make_client("c1", Some("srv"), Some("fp"), "2026-01-01T00:00:00.000Z");
        client.secondary.login = Some("second".into());

        insert_client(&db, &client).await.unwrap();
        let retrieved = get_client(&db, &client.id).await.unwrap();
        assert_eq!(retrieved, Some(client));
    }

    #[tokio::test]
    async fn get_nonexistent_client_returns_none() {
        let db = setup_db().await;
        let result = get_client(&db, &ClientId::from("missing")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn slot_members_exclude_archived_other_servers_and_self() {
        let db = setup_db().await;
        insert_client(&db, &make_client("a", Some("srv"), Some("fp"), "2026-01-01T00:00:01.000Z"))
            .await
            .unwrap();
        insert_client(&db, &make_client("b", Some("srv"), Some("fp"), "2026-01-01T00:00:02.000Z"))
            .await
            .unwrap();
        insert_client(&db, &make_client("c", Some("other"), Some("fp"), "2026-01-01T00:00:03.000Z"))
            .await
            .unwrap();
        let mut archived = make_client("d", Some("srv"), Some("fp"), "2026-01-01T00:00:04.000Z");
        archived.is_archived = true;
        insert_client(&db, &archived).await.unwrap();

        let server = ServerId::from("srv");
        let members = find_slot_members(&db, &server, "fp", None).await.unwrap();
        let ids: Vec<&str> = members.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);

        let excluding = find_slot_members(&db, &server, "fp", Some(&ClientId::from("a")))
            .await
            .unwrap();
        assert_eq!(excluding.len(), 1);
        assert_eq!(excluding[0].id.as_str(), "b");
    }

    #[tokio::test]
    async fn trigger_rejects_fourth_active_member() {
        let db = setup_db().await;
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            let ts = format!("2026-01-01T00:00:0{i}.000Z");
            insert_client(&db, &make_client(id, Some("srv"), Some("fp"), &ts))
                .await
                .unwrap();
        }

        let err = insert_client(&db, &make_client("d", Some("srv"), Some("fp"), "2026-01-02T00:00:00.000Z"))
            .await
            .unwrap_err();
        assert!(err.is_capacity_exceeded(), "got: {err}");
        assert!(get_client(&db, &ClientId::from("d")).await.unwrap().is_none());

        // A fourth member on another server is fine.
        insert_client(&db, &make_client("e", Some("other"), Some("fp"), "2026-01-02T00:00:00.000Z"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn trigger_allows_member_to_update_itself_in_full_group() {
        let db = setup_db().await;
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            let ts = format!("2026-01-01T00:00:0{i}.000Z");
            insert_client(&db, &make_client(id, Some("srv"), Some("fp"), &ts))
                .await
                .unwrap();
        }

        let mut renewed = get_client(&db, &ClientId::from("b")).await.unwrap().unwrap();
        renewed.name = "renewed".into();
        renewed.updated_at = "2026-02-01T00:00:00.000Z".into();
        update_client(&db, &renewed).await.unwrap();

        let stored = get_client(&db, &renewed.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "renewed");
    }

    #[tokio::test]
    async fn unarchiving_into_full_group_is_rejected() {
        let db = setup_db().await;
        let mut old = make_client("old", Some("srv"), Some("fp"), "2026-01-01T00:00:00.000Z");
        old.is_archived = true;
        insert_client(&db, &old).await.unwrap();
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            let ts = format!("2026-01-01T00:00:1{i}.000Z");
            insert_client(&db, &make_client(id, Some("srv"), Some("fp"), &ts))
                .await
                .unwrap();
        }

        let err = set_archived(&db, &old.id, false).await.unwrap_err();
        assert!(err.is_capacity_exceeded());

        set_archived(&db, &ClientId::from("a"), true).await.unwrap();
        set_archived(&db, &old.id, false).await.unwrap();
    }

    #[tokio::test]
    async fn update_and_archive_missing_client_report_not_found() {
        let db = setup_db().await;
        let ghost = make_client("ghost", None, None, "2026-01-01T00:00:00.000Z");
        assert!(matches!(
            update_client(&db, &ghost).await,
            Err(PanelkeepError::ClientNotFound(_))
        ));
        assert!(matches!(
            set_archived(&db, &ghost.id, true).await,
            Err(PanelkeepError::ClientNotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_and_count_respect_view_and_paging() {
        let db = setup_db().await;
        for i in 0..5 {
            let ts = format!("2026-01-01T00:00:0{i}.000Z");
            let mut client = make_client(&format!("c{i}"), None, None, &ts);
            client.is_archived = i == 4;
            insert_client(&db, &client).await.unwrap();
        }

        assert_eq!(count_clients(&db, false).await.unwrap(), 4);
        assert_eq!(count_clients(&db, true).await.unwrap(), 1);

        let page = list_clients(&db, false, 1, 2).await.unwrap();
        let ids: Vec<&str> = page.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["c1", "c2"]);
    }

    #[tokio::test]
    async fn login_tuples_are_capped_and_scoped() {
        let db = setup_db().await;
        for i in 0..4 {
            let ts = format!("2026-01-01T00:00:0{i}.000Z");
            insert_client(&db, &make_client(&format!("c{i}"), None, None, &ts))
                .await
                .unwrap();
        }
        let mut no_login = make_client("blank", None, None, "2026-01-01T00:00:09.000Z");
        no_login.credential = Credential::cleared();
        insert_client(&db, &no_login).await.unwrap();

        let tuples = list_login_tuples(&db, false, 3).await.unwrap();
        let ids: Vec<&str> = tuples.iter().map(|t| t.client_id.as_str()).collect();
        assert_eq!(ids, ["c3", "c2", "c1"]);
        assert_eq!(tuples[0].login.as_deref(), Some("cipher-login-c3"));

        assert!(list_login_tuples(&db, true, 10).await.unwrap().is_empty());
    }
}
