// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between the `clients` table and the domain types.
//!
//! The canonical types are defined in `panelkeep-core::types`; this module
//! re-exports them for convenience within the storage crate.

use rusqlite::Row;

pub use panelkeep_core::types::{
    ClientId, ClientRecord, Credential, LoginTuple, SecondaryCredential, ServerId,
};

/// Column list matching [`row_to_client`].
pub(crate) const CLIENT_COLUMNS: &str = "id, name, server_id, login, password, login_2, \
     password_2, credentials_fingerprint, is_archived, created_at, updated_at";

/// Map a row selected with [`CLIENT_COLUMNS`] into a [`ClientRecord`].
pub(crate) fn row_to_client(row: &Row<'_>) -> rusqlite::Result<ClientRecord> {
    Ok(ClientRecord {
        id: ClientId(row.get(0)?),
        name: row.get(1)?,
        server_id: row.get::<_, Option<String>>(2)?.map(ServerId),
        credential: Credential {
            login: row.get(3)?,
            password: row.get(4)?,
            fingerprint: row.get(7)?,
        },
        secondary: SecondaryCredential {
            login: row.get(5)?,
            password: row.get(6)?,
        },
        is_archived: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
