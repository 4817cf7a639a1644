// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Panelkeep credential vault.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Panelkeep configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PanelkeepConfig {
    /// Process-wide settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Key material for the encryption and fingerprint adapters.
    #[serde(default)]
    pub crypto: CryptoConfig,

    /// Batch decryption, search index and detail-view retry settings.
    #[serde(default)]
    pub decrypt: DecryptConfig,
}

/// Process-wide settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("panelkeep").join("panelkeep.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("panelkeep.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Key material configuration.
///
/// Keys are hex-encoded. Leaving `encryption_key` unset is only valid for
/// commands that never touch credentials; set it via `PANELKEEP_CRYPTO_ENCRYPTION_KEY`
/// rather than committing it to a config file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CryptoConfig {
    /// AES-256-GCM key, 64 hex characters.
    #[serde(default)]
    pub encryption_key: Option<String>,

    /// Optional HMAC key for credential fingerprints. `None` uses a built-in
    /// domain-separation key, which keeps fingerprints stable across installs.
    #[serde(default)]
    pub fingerprint_key: Option<String>,
}

/// Batch decryption and search index configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DecryptConfig {
    /// Number of decrypt calls dispatched concurrently per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum number of login tuples loaded into the global search index.
    #[serde(default = "default_global_index_cap")]
    pub global_index_cap: usize,

    /// Retries after the first attempt on the single-client detail view.
    #[serde(default = "default_detail_max_retries")]
    pub detail_max_retries: u32,

    /// Delay before the first detail-view retry; doubles on each further retry.
    #[serde(default = "default_detail_base_delay_ms")]
    pub detail_base_delay_ms: u64,
}

impl Default for DecryptConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            global_index_cap: default_global_index_cap(),
            detail_max_retries: default_detail_max_retries(),
            detail_base_delay_ms: default_detail_base_delay_ms(),
        }
    }
}

fn default_batch_size() -> usize {
    20
}

fn default_global_index_cap() -> usize {
    1000
}

fn default_detail_max_retries() -> u32 {
    3
}

fn default_detail_base_delay_ms() -> u64 {
    600
}
