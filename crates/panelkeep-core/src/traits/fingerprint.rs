// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fingerprint adapter trait for deterministic credential lookup keys.

use async_trait::async_trait;

use crate::error::PanelkeepError;
use crate::traits::adapter::PluginAdapter;

/// Adapter producing a deterministic, non-reversible key for a credential pair.
///
/// Equal normalized inputs (trimmed, case-folded) must always yield the same
/// output, regardless of call order, process, or concurrent encryption state.
/// The fingerprint is a lookup key only and never a credential value.
#[async_trait]
pub trait FingerprintAdapter: PluginAdapter {
    async fn fingerprint(&self, login: &str, password: &str) -> Result<String, PanelkeepError>;
}
