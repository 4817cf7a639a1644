// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `panelkeep check` command implementation.
//!
//! Verifies that the key material parses and round-trips, and that the
//! client database opens, migrates, and answers queries.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::{Duration, Instant};

use panelkeep_config::model::PanelkeepConfig;
use panelkeep_core::traits::{ClientStore, PluginAdapter};
use panelkeep_core::{HealthStatus, PanelkeepError};
use panelkeep_storage::SqliteClientStore;
use panelkeep_vault::{AesGcmEncryption, HmacFingerprint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run every check, print the report, and fail if any check failed.
pub async fn run_check(config: &PanelkeepConfig, plain: bool) -> Result<(), PanelkeepError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let results = vec![
        CheckResult::new("Configuration", CheckStatus::Pass, "valid", Instant::now()),
        check_encryption(config).await,
        check_fingerprint(config).await,
        check_database(config).await,
    ];

    println!();
    println!("  panelkeep check");
    println!("  {}", "-".repeat(50));
    for result in &results {
        println!("{}", render_line(result, use_color));
    }
    println!();

    let failed = results
        .iter()
        .filter(|r| r.status == CheckStatus::Fail)
        .count();
    if failed > 0 {
        return Err(PanelkeepError::Internal(format!("{failed} check(s) failed")));
    }
    println!("  All checks passed.");
    println!();
    Ok(())
}

fn render_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green().to_string(), result.message.normal().to_string()),
            CheckStatus::Warn => ("!".yellow().to_string(), result.message.yellow().to_string()),
            CheckStatus::Fail => ("✗".red().to_string(), result.message.red().to_string()),
        };
        format!("    {symbol} {:<20} {message} ({duration_ms}ms)", result.name)
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!("    {tag} {:<20} {} ({duration_ms}ms)", result.name, result.message)
    }
}

fn from_health(name: &str, health: Result<HealthStatus, PanelkeepError>, ok: &str, start: Instant) -> CheckResult {
    match health {
        Ok(HealthStatus::Healthy) => CheckResult::new(name, CheckStatus::Pass, ok, start),
        Ok(HealthStatus::Degraded(why)) => CheckResult::new(name, CheckStatus::Warn, why, start),
        Ok(HealthStatus::Unhealthy(why)) => CheckResult::new(name, CheckStatus::Fail, why, start),
        Err(e) => CheckResult::new(name, CheckStatus::Fail, e.to_string(), start),
    }
}

async fn check_encryption(config: &PanelkeepConfig) -> CheckResult {
    let start = Instant::now();
    match AesGcmEncryption::from_config(&config.crypto) {
        Ok(aes) => from_health("Encryption key", aes.health_check().await, "round-trip ok", start),
        Err(e) => CheckResult::new("Encryption key", CheckStatus::Fail, e.to_string(), start),
    }
}

async fn check_fingerprint(config: &PanelkeepConfig) -> CheckResult {
    let start = Instant::now();
    match HmacFingerprint::from_config(&config.crypto) {
        Ok(_) if config.crypto.fingerprint_key.is_none() => CheckResult::new(
            "Fingerprint key",
            CheckStatus::Warn,
            "using built-in key (set crypto.fingerprint_key to pepper fingerprints)",
            start,
        ),
        Ok(fp) => from_health("Fingerprint key", fp.health_check().await, "configured", start),
        Err(e) => CheckResult::new("Fingerprint key", CheckStatus::Fail, e.to_string(), start),
    }
}

async fn check_database(config: &PanelkeepConfig) -> CheckResult {
    let start = Instant::now();
    let store = Arc::new(SqliteClientStore::new(config.storage.clone()));
    if let Err(e) = store.initialize().await {
        return CheckResult::new("Database", CheckStatus::Fail, format!("open failed: {e}"), start);
    }

    let counts = async {
        let active = store.count_clients(false).await?;
        let archived = store.count_clients(true).await?;
        store.close().await?;
        Ok::<_, PanelkeepError>((active, archived))
    };
    match counts.await {
        Ok((active, archived)) => CheckResult::new(
            "Database",
            CheckStatus::Pass,
            format!("{active} active, {archived} archived clients"),
            start,
        ),
        Err(e) => CheckResult::new("Database", CheckStatus::Fail, format!("query failed: {e}"), start),
    }
}
