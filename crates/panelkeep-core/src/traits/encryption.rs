// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encryption adapter trait for reversible credential encryption.

use async_trait::async_trait;

use crate::error::PanelkeepError;
use crate::traits::adapter::PluginAdapter;

/// Adapter for the reversible encryption of credential strings.
///
/// Implementations need not be deterministic: encrypting the same plaintext
/// twice may yield different ciphertexts. Both operations may fail; the vault
/// assumes no error taxonomy beyond "it failed".
#[async_trait]
pub trait EncryptionAdapter: PluginAdapter {
    /// Encrypts a plaintext string into a storable ciphertext string.
    async fn encrypt(&self, plaintext: &str) -> Result<String, PanelkeepError>;

    /// Decrypts a ciphertext string previously produced by [`encrypt`](Self::encrypt).
    async fn decrypt(&self, ciphertext: &str) -> Result<String, PanelkeepError>;
}
