// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./panelkeep.toml` > `~/.config/panelkeep/panelkeep.toml` > `/etc/panelkeep/panelkeep.toml`
//! with environment variable overrides via `PANELKEEP_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::PanelkeepConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/panelkeep/panelkeep.toml` (system-wide)
/// 3. `~/.config/panelkeep/panelkeep.toml` (user XDG config)
/// 4. `./panelkeep.toml` (local directory)
/// 5. `PANELKEEP_*` environment variables
pub fn load_config() -> Result<PanelkeepConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<PanelkeepConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PanelkeepConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PanelkeepConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PanelkeepConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(PanelkeepConfig::default()))
        .merge(Toml::file("/etc/panelkeep/panelkeep.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("panelkeep/panelkeep.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("panelkeep.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")`: `PANELKEEP_CRYPTO_ENCRYPTION_KEY`
/// must map to `crypto.encryption_key`, not `crypto.encryption.key`.
fn env_provider() -> Env {
    // `key` arrives with the prefix stripped but in its original case.
    Env::prefixed("PANELKEEP_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a prefix-stripped env var name to its dotted, lowercase config path.
pub(crate) fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in ["general", "storage", "crypto", "decrypt"] {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections_without_splitting_field_names() {
        assert_eq!(map_env_key("crypto_encryption_key"), "crypto.encryption_key");
        assert_eq!(map_env_key("decrypt_batch_size"), "decrypt.batch_size");
        assert_eq!(map_env_key("storage_database_path"), "storage.database_path");
        assert_eq!(map_env_key("general_log_level"), "general.log_level");
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }

    #[test]
    fn env_keys_are_matched_in_their_original_case() {
        assert_eq!(map_env_key("CRYPTO_ENCRYPTION_KEY"), "crypto.encryption_key");
        assert_eq!(map_env_key("Decrypt_Batch_Size"), "decrypt.batch_size");
    }
}
