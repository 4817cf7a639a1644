// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM encryption adapter.
//!
//! Every call to [`AesGcmEncryption::encrypt`] draws a fresh random 96-bit
//! nonce from the system CSPRNG, so equal plaintexts never produce equal
//! ciphertexts. The stored form is standard base64 of `nonce || ciphertext || tag`.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

use panelkeep_config::model::CryptoConfig;
use panelkeep_core::traits::{EncryptionAdapter, PluginAdapter};
use panelkeep_core::{AdapterType, HealthStatus, PanelkeepError};

/// Length of the GCM authentication tag appended to every ciphertext.
const TAG_LEN: usize = 16;

/// Credential encryption backed by a single 32-byte AES-256-GCM key.
pub struct AesGcmEncryption {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl AesGcmEncryption {
    pub fn new(key: &[u8; 32]) -> Result<Self, PanelkeepError> {
        let unbound = UnboundKey::new(&AES_256_GCM, key)
            .map_err(|_| PanelkeepError::encryption("failed to create AES-256-GCM key"))?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Build from a 64-character hex key.
    pub fn from_hex(hex_key: &str) -> Result<Self, PanelkeepError> {
        let bytes = Zeroizing::new(
            hex::decode(hex_key.trim())
                .map_err(|e| PanelkeepError::Config(format!("encryption key is not hex: {e}")))?,
        );
        let key = Zeroizing::new(
            <[u8; 32]>::try_from(bytes.as_slice())
                .map_err(|_| PanelkeepError::Config("encryption key must be 32 bytes".into()))?,
        );
        Self::new(&key)
    }

    /// Build from the `[crypto]` section; the key is mandatory.
    pub fn from_config(config: &CryptoConfig) -> Result<Self, PanelkeepError> {
        let hex_key = config.encryption_key.as_deref().ok_or_else(|| {
            PanelkeepError::Config(
                "crypto.encryption_key is not set (use PANELKEEP_CRYPTO_ENCRYPTION_KEY)".into(),
            )
        })?;
        Self::from_hex(hex_key)
    }

    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, PanelkeepError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| PanelkeepError::encryption("failed to generate random nonce"))?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = plaintext.to_vec();
        self.key
            .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| PanelkeepError::encryption("AES-256-GCM encryption failed"))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);
        Ok(sealed)
    }

    fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, PanelkeepError> {
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(PanelkeepError::encryption("ciphertext too short"));
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| PanelkeepError::encryption("malformed nonce"))?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| {
                PanelkeepError::encryption("AES-256-GCM decryption failed -- wrong key or corrupted data")
            })?;
        Ok(plaintext.to_vec())
    }
}

/// Generate a random 32-byte key, hex-encoded, suitable for `crypto.encryption_key`.
pub fn generate_key_hex() -> Result<String, PanelkeepError> {
    let rng = SystemRandom::new();
    let mut key = Zeroizing::new([0u8; 32]);
    rng.fill(&mut key[..])
        .map_err(|_| PanelkeepError::encryption("failed to generate random key"))?;
    Ok(hex::encode(&key[..]))
}

#[async_trait]
impl PluginAdapter for AesGcmEncryption {
    fn name(&self) -> &str {
        "aes-256-gcm"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Encryption
    }

    async fn health_check(&self) -> Result<HealthStatus, PanelkeepError> {
        let probe = "panelkeep-health-probe";
        let sealed = self.encrypt(probe).await?;
        match self.decrypt(&sealed).await {
            Ok(opened) if opened == probe => Ok(HealthStatus::Healthy),
            Ok(_) => Ok(HealthStatus::Unhealthy("round-trip mismatch".into())),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }
}

#[async_trait]
impl EncryptionAdapter for AesGcmEncryption {
    async fn encrypt(&self, plaintext: &str) -> Result<String, PanelkeepError> {
        let sealed = self.seal(plaintext.as_bytes())?;
        Ok(STANDARD.encode(sealed))
    }

    async fn decrypt(&self, ciphertext: &str) -> Result<String, PanelkeepError> {
        let sealed = STANDARD
            .decode(ciphertext)
            .map_err(|e| PanelkeepError::Encryption {
                message: "ciphertext is not base64".into(),
                source: Some(Box::new(e)),
            })?;
        let plaintext = self.open(&sealed)?;
        String::from_utf8(plaintext).map_err(|e| PanelkeepError::Encryption {
            message: "decrypted value is not UTF-8".into(),
            source: Some(Box::new(e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use proptest::prelude::*;

    fn adapter() -> AesGcmEncryption {
        AesGcmEncryption::from_hex(&generate_key_hex().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn encrypt_decrypt_roundtrip() {
        let aes = adapter();
        let sealed = aes.encrypt("alice@example.com").await.unwrap();
        assert_eq!(aes.decrypt(&sealed).await.unwrap(), "alice@example.com");
    }

    #[tokio::test]
    async fn same_plaintext_encrypts_differently() {
        let aes = adapter();
        let a = aes.encrypt("same input twice").await.unwrap();
        let b = aes.encrypt("same input twice").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn ciphertexts_are_classified_as_ciphertext() {
        let aes = adapter();
        for plaintext in ["a", "bob", "5531999998888", "001A2B3C4D5E"] {
            let sealed = aes.encrypt(plaintext).await.unwrap();
            assert!(classify(&sealed), "{sealed} should look encrypted");
        }
    }

    #[tokio::test]
    async fn wrong_key_fails() {
        let sealed = adapter().encrypt("secret").await.unwrap();
        assert!(adapter().decrypt(&sealed).await.is_err());
    }

    #[tokio::test]
    async fn tampered_or_malformed_input_fails() {
        let aes = adapter();
        let sealed = aes.encrypt("do not tamper").await.unwrap();
        let mut raw = STANDARD.decode(&sealed).unwrap();
        raw[NONCE_LEN] ^= 0x01;
        assert!(aes.decrypt(&STANDARD.encode(raw)).await.is_err());

        assert!(aes.decrypt("not base64 at all!").await.is_err());
        assert!(aes.decrypt("QUJD").await.is_err());
    }

    #[test]
    fn from_hex_rejects_bad_keys() {
        assert!(matches!(
            AesGcmEncryption::from_hex("zz"),
            Err(PanelkeepError::Config(_))
        ));
        assert!(matches!(
            AesGcmEncryption::from_hex("00ff"),
            Err(PanelkeepError::Config(_))
        ));
    }

    #[test]
    fn from_config_requires_key() {
        let config = CryptoConfig::default();
        assert!(matches!(
            AesGcmEncryption::from_config(&config),
            Err(PanelkeepError::Config(_))
        ));
    }

    #[tokio::test]
    async fn health_check_is_healthy() {
        assert_eq!(adapter().health_check().await.unwrap(), HealthStatus::Healthy);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn roundtripped_logins_are_not_reflagged(login in "[a-z][a-z0-9._@-]{0,40}") {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let aes = adapter();
            let opened = rt.block_on(async {
                let sealed = aes.encrypt(&login).await.unwrap();
                aes.decrypt(&sealed).await.unwrap()
            });
            prop_assert_eq!(&opened, &login);
            prop_assert!(!classify(&opened));
        }
    }
}
