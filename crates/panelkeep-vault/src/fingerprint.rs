// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HMAC-SHA256 credential fingerprints.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

use panelkeep_config::model::CryptoConfig;
use panelkeep_core::traits::{FingerprintAdapter, PluginAdapter};
use panelkeep_core::{AdapterType, HealthStatus, PanelkeepError};

type HmacSha256 = Hmac<Sha256>;

/// Key used when no `crypto.fingerprint_key` is configured.
const DEFAULT_FINGERPRINT_KEY: &[u8] = b"panelkeep/credential-fingerprint/v1";

/// Deterministic fingerprint of a normalized `(login, password)` pair.
///
/// Both inputs are trimmed and lowercased, then joined with a NUL separator so
/// `("ab", "c")` and `("a", "bc")` never collide.
pub struct HmacFingerprint {
    key: Zeroizing<Vec<u8>>,
}

impl HmacFingerprint {
    pub fn new(key: &[u8]) -> Self {
        Self {
            key: Zeroizing::new(key.to_vec()),
        }
    }

    pub fn from_config(config: &CryptoConfig) -> Result<Self, PanelkeepError> {
        match config.fingerprint_key.as_deref() {
            Some(hex_key) => {
                let key = Zeroizing::new(hex::decode(hex_key.trim()).map_err(|e| {
                    PanelkeepError::Config(format!("fingerprint key is not hex: {e}"))
                })?);
                Ok(Self::new(&key))
            }
            None => Ok(Self::default()),
        }
    }

    /// Synchronous form of [`FingerprintAdapter::fingerprint`].
    pub fn compute(&self, login: &str, password: &str) -> Result<String, PanelkeepError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).map_err(|e| PanelkeepError::Fingerprint {
                message: "invalid fingerprint key".into(),
                source: Some(Box::new(e)),
            })?;
        mac.update(normalize(login).as_bytes());
        mac.update(&[0]);
        mac.update(normalize(password).as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl Default for HmacFingerprint {
    fn default() -> Self {
        Self::new(DEFAULT_FINGERPRINT_KEY)
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

#[async_trait]
impl PluginAdapter for HmacFingerprint {
    fn name(&self) -> &str {
        "hmac-sha256"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Fingerprint
    }

    async fn health_check(&self) -> Result<HealthStatus, PanelkeepError> {
        self.compute("probe", "probe")?;
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl FingerprintAdapter for HmacFingerprint {
    async fn fingerprint(&self, login: &str, password: &str) -> Result<String, PanelkeepError> {
        self.compute(login, password)
    }
}
