// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Panelkeep credential vault.
//!
//! Encrypts panel login/password pairs before they are persisted, groups
//! clients that share one underlying account into slot groups of at most
//! [`MAX_SLOTS`](panelkeep_core::MAX_SLOTS) members, tells legacy plaintext
//! apart from ciphertext, and searches across fields that are encrypted at rest.

pub mod batch;
pub mod cache;
pub mod classifier;
pub mod crypto;
pub mod fingerprint;
pub mod migration;
pub mod resolver;
pub mod retry;
pub mod search;
pub mod vault;

pub use batch::{BatchDecryptor, DecryptOutcome, DecryptRequest, DecryptResult};
pub use cache::DecryptedCache;
pub use classifier::classify;
pub use crypto::{generate_key_hex, AesGcmEncryption};
pub use fingerprint::HmacFingerprint;
pub use migration::MigrationReport;
pub use resolver::{
    CredentialInput, CredentialResolver, ResolutionPath, ResolvedCredential, SharedCredential,
};
pub use retry::RetryPolicy;
pub use search::{SearchIndex, SearchResults, WindowResolution};
pub use vault::{mask_secret, ClientDraft, ClientWindow, CredentialVault, SavedClient};
