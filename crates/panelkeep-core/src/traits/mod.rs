// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the vault's external collaborators.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod encryption;
pub mod fingerprint;
pub mod storage;

pub use adapter::PluginAdapter;
pub use encryption::EncryptionAdapter;
pub use fingerprint::FingerprintAdapter;
pub use storage::ClientStore;
