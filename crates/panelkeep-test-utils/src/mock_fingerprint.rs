// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock fingerprint adapter.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use panelkeep_core::traits::{FingerprintAdapter, PluginAdapter};
use panelkeep_core::{AdapterType, HealthStatus, PanelkeepError};

/// Deterministic, human-readable fingerprints: `fp:<login>:<password>`, normalized.
#[derive(Default)]
pub struct MockFingerprint {
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl MockFingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fingerprint this mock returns for a pair, computed synchronously.
    pub fn expected(login: &str, password: &str) -> String {
        format!(
            "fp:{}:{}",
            login.trim().to_lowercase(),
            password.trim().to_lowercase()
        )
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginAdapter for MockFingerprint {
    fn name(&self) -> &str {
        "mock-fingerprint"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Fingerprint
    }

    async fn health_check(&self) -> Result<HealthStatus, PanelkeepError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl FingerprintAdapter for MockFingerprint {
    async fn fingerprint(&self, login: &str, password: &str) -> Result<String, PanelkeepError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(PanelkeepError::Fingerprint {
                message: "mock: fingerprint failure injected".into(),
                source: None,
            });
        }
        Ok(Self::expected(login, password))
    }
}
