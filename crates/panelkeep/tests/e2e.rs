// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests that drive the `panelkeep` binary against a temp database.

use std::path::PathBuf;
use std::process::{Command, Output};

const KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

struct Env {
    dir: tempfile::TempDir,
    config: PathBuf,
}

impl Env {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("panelkeep.toml");
        std::fs::write(&config, "").unwrap();
        Self { dir, config }
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_panelkeep"))
            .arg("--config")
            .arg(&self.config)
            .args(args)
            .env(
                "PANELKEEP_STORAGE_DATABASE_PATH",
                self.dir.path().join("clients.db"),
            )
            .env("PANELKEEP_CRYPTO_ENCRYPTION_KEY", KEY)
            .env_remove("PANELKEEP_CRYPTO_FINGERPRINT_KEY")
            .env_remove("RUST_LOG")
            .output()
            .unwrap()
    }

    /// Run `add` and return the id of the created client.
    fn add(&self, args: &[&str]) -> String {
        let mut full = vec!["add"];
        full.extend_from_slice(args);
        let output = self.run(&full);
        assert!(output.status.success(), "add failed: {}", stderr(&output));
        stdout(&output)
            .split_whitespace()
            .nth(1)
            .unwrap()
            .to_string()
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn keygen_prints_a_256_bit_hex_key() {
    let output = Env::new().run(&["keygen"]);
    assert!(output.status.success());
    let key = stdout(&output);
    let key = key.trim();
    assert_eq!(key.len(), 64);
    assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn add_then_show_masks_password_unless_revealed() {
    let env = Env::new();
    let id = env.add(&[
        "Alice", "--server", "panel-1", "--login", "alice", "--password", "hunter22",
    ]);

    let masked = stdout(&env.run(&["show", &id]));
    assert!(masked.contains("alice"));
    assert!(!masked.contains("hunter22"));
    assert!(masked.contains("slots:      1/3"));

    let revealed = stdout(&env.run(&["show", &id, "--reveal"]));
    assert!(revealed.contains("hunter22"));
}

#[test]
fn search_matches_decrypted_login() {
    let env = Env::new();
    env.add(&["Alice", "--login", "alice.smith", "--password", "pw-1"]);
    env.add(&["Bob", "--login", "bob", "--password", "pw-2"]);

    let output = env.run(&["search", "SMITH"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Alice"));
    assert!(!out.contains("Bob"));
    assert!(out.contains("1 match(es)"));
}

#[test]
fn fourth_client_on_a_shared_login_is_rejected() {
    let env = Env::new();
    let shared = ["--server", "panel-1", "--login", "family", "--password", "pw"];
    for name in ["A", "B", "C"] {
        let mut args = vec![name];
        args.extend_from_slice(&shared);
        env.add(&args);
    }

    let mut args = vec!["add", "D"];
    args.extend_from_slice(&shared);
    let output = env.run(&args);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("slot capacity exceeded"));
}

#[test]
fn archive_then_list_moves_client_between_views() {
    let env = Env::new();
    let id = env.add(&["Alice", "--login", "alice", "--password", "pw"]);

    assert!(env.run(&["archive", &id]).status.success());
    let active = stdout(&env.run(&["list"]));
    assert!(active.contains("0 active clients"));
    let archived = stdout(&env.run(&["list", "--archived"]));
    assert!(archived.contains("Alice"));
}

#[test]
fn check_fails_without_encryption_key() {
    let env = Env::new();
    let output = Command::new(env!("CARGO_BIN_EXE_panelkeep"))
        .arg("--config")
        .arg(&env.config)
        .args(["check", "--plain"])
        .env(
            "PANELKEEP_STORAGE_DATABASE_PATH",
            env.dir.path().join("clients.db"),
        )
        .env_remove("PANELKEEP_CRYPTO_ENCRYPTION_KEY")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("[FAIL] Encryption key"));
}

#[test]
fn check_passes_with_valid_setup() {
    let output = Env::new().run(&["check", "--plain"]);
    assert!(output.status.success(), "{}", stdout(&output));
    assert!(stdout(&output).contains("All checks passed."));
}
