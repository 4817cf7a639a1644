// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Panelkeep credential vault.

use thiserror::Error;

use crate::types::ClientId;

/// The primary error type used across all Panelkeep adapter traits and vault operations.
#[derive(Debug, Error)]
pub enum PanelkeepError {
    /// Configuration errors (invalid TOML, missing keys, malformed key material).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Encryption adapter errors (bad key, malformed ciphertext, authentication failure).
    #[error("encryption error: {message}")]
    Encryption {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Fingerprint adapter errors.
    #[error("fingerprint error: {message}")]
    Fingerprint {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A shared credential slot group is already full.
    ///
    /// `current` is the number of active clients already holding the credential.
    #[error("slot capacity exceeded: {current} of {limit} slots already in use")]
    CapacityExceeded { current: usize, limit: usize },

    /// The referenced client record does not exist.
    #[error("client not found: {0}")]
    ClientNotFound(ClientId),

    /// Adapter health check failed.
    #[error("health check failed for {name}: {source}")]
    HealthCheckFailed {
        name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PanelkeepError {
    /// Shorthand for an encryption error without an underlying source.
    pub fn encryption(message: impl Into<String>) -> Self {
        Self::Encryption {
            message: message.into(),
            source: None,
        }
    }

    /// Returns `true` if this error reports a full slot group.
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, Self::CapacityExceeded { .. })
    }
}
