// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock encryption adapter for deterministic testing.
//!
//! `MockEncryption` produces base64 ciphertexts that the classifier recognizes,
//! embeds a per-call counter so equal plaintexts encrypt differently, and
//! supports targeted fault injection on decrypt.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use dashmap::{DashMap, DashSet};

use panelkeep_core::traits::{EncryptionAdapter, PluginAdapter};
use panelkeep_core::{AdapterType, HealthStatus, PanelkeepError};

const SEAL_PREFIX: &str = "mock-sealed:";

/// A reversible mock cipher with call counters and fault injection.
#[derive(Default)]
pub struct MockEncryption {
    nonce: AtomicUsize,
    encrypt_calls: AtomicUsize,
    decrypt_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    fail_encrypt: AtomicBool,
    failing: DashSet<String>,
    identity: DashSet<String>,
    garbled: DashMap<String, String>,
    stubborn: DashMap<String, usize>,
}

impl MockEncryption {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ciphertext for `plaintext` without going through the async API.
    ///
    /// Always decrypts back to `plaintext`; distinct from anything `encrypt` returns.
    pub fn seal_static(plaintext: &str) -> String {
        STANDARD.encode(format!("{SEAL_PREFIX}static:{plaintext}"))
    }

    /// Make every subsequent `encrypt` call fail.
    pub fn fail_encrypt(&self, fail: bool) {
        self.fail_encrypt.store(fail, Ordering::SeqCst);
    }

    /// Make `decrypt` fail for exactly this input.
    pub fn fail_decrypt_of(&self, ciphertext: &str) {
        self.failing.insert(ciphertext.to_string());
    }

    /// Make `decrypt` return this input unchanged.
    pub fn identity_decrypt_of(&self, ciphertext: &str) {
        self.identity.insert(ciphertext.to_string());
    }

    /// Make `decrypt` of `ciphertext` return `output` instead of the real plaintext.
    pub fn garble_decrypt_of(&self, ciphertext: &str, output: &str) {
        self.garbled
            .insert(ciphertext.to_string(), output.to_string());
    }

    /// Make the first `times` decrypts of `ciphertext` return it unchanged, then succeed.
    pub fn stubborn_decrypt_of(&self, ciphertext: &str, times: usize) {
        self.stubborn.insert(ciphertext.to_string(), times);
    }

    pub fn encrypt_calls(&self) -> usize {
        self.encrypt_calls.load(Ordering::SeqCst)
    }

    pub fn decrypt_calls(&self) -> usize {
        self.decrypt_calls.load(Ordering::SeqCst)
    }

    /// Highest number of decrypt calls observed running at the same time.
    pub fn peak_concurrent_decrypts(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn open(ciphertext: &str) -> Result<String, PanelkeepError> {
        let bytes = STANDARD
            .decode(ciphertext)
            .map_err(|_| PanelkeepError::encryption("mock: input is not base64"))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| PanelkeepError::encryption("mock: input is not UTF-8"))?;
        let sealed = text
            .strip_prefix(SEAL_PREFIX)
            .ok_or_else(|| PanelkeepError::encryption("mock: not a mock ciphertext"))?;
        let (_nonce, plaintext) = sealed
            .split_once(':')
            .ok_or_else(|| PanelkeepError::encryption("mock: missing nonce"))?;
        Ok(plaintext.to_string())
    }

    fn take_stubborn(&self, ciphertext: &str) -> bool {
        match self.stubborn.get_mut(ciphertext) {
            Some(mut remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl PluginAdapter for MockEncryption {
    fn name(&self) -> &str {
        "mock-encryption"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Encryption
    }

    async fn health_check(&self) -> Result<HealthStatus, PanelkeepError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl EncryptionAdapter for MockEncryption {
    async fn encrypt(&self, plaintext: &str) -> Result<String, PanelkeepError> {
        self.encrypt_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_encrypt.load(Ordering::SeqCst) {
            return Err(PanelkeepError::encryption("mock: encrypt failure injected"));
        }
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        Ok(STANDARD.encode(format!("{SEAL_PREFIX}{nonce}:{plaintext}")))
    }

    async fn decrypt(&self, ciphertext: &str) -> Result<String, PanelkeepError> {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        // Suspend so sibling calls in the same batch overlap.
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(ciphertext) {
            return Err(PanelkeepError::encryption("mock: decrypt failure injected"));
        }
        if self.identity.contains(ciphertext) || self.take_stubborn(ciphertext) {
            return Ok(ciphertext.to_string());
        }
        if let Some(output) = self.garbled.get(ciphertext) {
            return Ok(output.clone());
        }
        Self::open(ciphertext)
    }
}
