// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Panelkeep.
//!
//! Provides mock adapters for fast, deterministic tests without a real key
//! or database.
//!
//! # Components
//!
//! - [`MockEncryption`] - reversible, non-deterministic encryption with fault injection
//! - [`MockFingerprint`] - deterministic fingerprinting with call counting
//! - [`InMemoryClientStore`] - `ClientStore` backed by a vector, with write counting

pub mod memory_store;
pub mod mock_encryption;
pub mod mock_fingerprint;

pub use memory_store::InMemoryClientStore;
pub use mock_encryption::MockEncryption;
pub use mock_fingerprint::MockFingerprint;
