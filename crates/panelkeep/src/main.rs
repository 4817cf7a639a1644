// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Panelkeep - credential vault for subscription panel resellers.
//!
//! This is the binary entry point.

mod check;
mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Panelkeep - credential vault for subscription panel resellers.
#[derive(Parser, Debug)]
#[command(name = "panelkeep", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Credential fields accepted by `add` and `update`.
#[derive(Args, Debug, Default, Clone)]
pub struct CredentialArgs {
    /// Panel server the account lives on.
    #[arg(long)]
    pub server: Option<String>,
    #[arg(long)]
    pub login: Option<String>,
    #[arg(long)]
    pub password: Option<String>,
    /// Login on the second server.
    #[arg(long = "login-2")]
    pub login_2: Option<String>,
    /// Password on the second server.
    #[arg(long = "password-2")]
    pub password_2: Option<String>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a client.
    Add {
        name: String,
        #[command(flatten)]
        credentials: CredentialArgs,
    },
    /// Update a client; omitted fields keep their current value.
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        credentials: CredentialArgs,
        /// Clear the primary login, password and fingerprint.
        #[arg(long, conflicts_with_all = ["login", "password"])]
        clear_login: bool,
    },
    /// Show one client's decrypted credentials.
    Show {
        id: String,
        /// Print passwords in full instead of masked.
        #[arg(long)]
        reveal: bool,
    },
    /// List one page of clients.
    List {
        #[arg(long)]
        archived: bool,
        #[arg(long, default_value_t = 0)]
        page: usize,
        #[arg(long, default_value_t = 25)]
        page_size: usize,
    },
    /// Search clients by name or decrypted login.
    Search {
        query: String,
        #[arg(long)]
        archived: bool,
        /// Size of the page searched first; other matches are fetched individually.
        #[arg(long, default_value_t = 25)]
        page_size: usize,
    },
    /// Move a client to the archived view.
    Archive { id: String },
    /// Move a client back to the active view.
    Unarchive { id: String },
    /// Encrypt credentials still stored as plaintext.
    MigrateLegacy,
    /// Validate configuration, storage and key material.
    Check {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Print a fresh random encryption key.
    Keygen,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => panelkeep_config::load_and_validate_path(path),
        None => panelkeep_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            panelkeep_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.general.log_level);

    let result = match cli.command {
        Some(Commands::Add { name, credentials }) => {
            commands::run_add(&config, name, credentials).await
        }
        Some(Commands::Update {
            id,
            name,
            credentials,
            clear_login,
        }) => commands::run_update(&config, id, name, credentials, clear_login).await,
        Some(Commands::Show { id, reveal }) => commands::run_show(&config, id, reveal).await,
        Some(Commands::List {
            archived,
            page,
            page_size,
        }) => commands::run_list(&config, archived, page, page_size).await,
        Some(Commands::Search {
            query,
            archived,
            page_size,
        }) => commands::run_search(&config, query, archived, page_size).await,
        Some(Commands::Archive { id }) => commands::run_archive(&config, id, true).await,
        Some(Commands::Unarchive { id }) => commands::run_archive(&config, id, false).await,
        Some(Commands::MigrateLegacy) => commands::run_migrate(&config).await,
        Some(Commands::Check { plain }) => check::run_check(&config, plain).await,
        Some(Commands::Keygen) => commands::run_keygen(),
        None => {
            println!("panelkeep: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber; `RUST_LOG` wins over `general.log_level`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("panelkeep={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn update_parses_partial_credentials() {
        let cli = Cli::try_parse_from([
            "panelkeep", "update", "c-1", "--login-2", "backup", "--server", "panel-2",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Update {
                id,
                credentials,
                clear_login,
                ..
            }) => {
                assert_eq!(id, "c-1");
                assert_eq!(credentials.login_2.as_deref(), Some("backup"));
                assert_eq!(credentials.server.as_deref(), Some("panel-2"));
                assert!(credentials.login.is_none());
                assert!(!clear_login);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn clear_login_conflicts_with_new_login() {
        assert!(Cli::try_parse_from(["panelkeep", "update", "c-1", "--clear-login", "--login", "x"]).is_err());
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = panelkeep_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.decrypt.batch_size, 20);
    }
}
