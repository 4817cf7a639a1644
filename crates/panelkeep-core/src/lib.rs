// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Panelkeep credential vault.
//!
//! This crate provides the error type, the domain types shared by every
//! layer, and the async adapter traits for the vault's external
//! collaborators: encryption, fingerprinting, and client persistence.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::PanelkeepError;
pub use types::{
    AdapterType, ClientId, ClientRecord, Credential, CredentialField, DecryptedCredentials,
    HealthStatus, LoginTuple, SecondaryCredential, ServerId, MAX_SLOTS,
};

pub use traits::{ClientStore, EncryptionAdapter, FingerprintAdapter, PluginAdapter};
