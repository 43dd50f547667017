// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! chatrelay - LINE to OpenAI chat relay.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod check;
mod enqueue;
mod serve;

use std::path::PathBuf;

use chatrelay_config::RelayConfig;
use clap::{Parser, Subcommand};

/// chatrelay - LINE to OpenAI chat relay.
#[derive(Parser, Debug)]
#[command(name = "chatrelay", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook server and the queue worker (default).
    Serve {
        /// Keep queue, history, and settings in memory instead of SQLite.
        #[arg(long)]
        memory: bool,
    },
    /// Test storage, LINE, OpenAI, and weather connectivity.
    Check {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Put a message on the work queue by hand.
    Enqueue {
        /// LINE user id to answer.
        user_id: String,
        /// Message text.
        message: String,
        /// Reply token recorded with the task.
        #[arg(long, default_value = "manual")]
        reply_token: String,
    },
}

fn load_config(path: Option<&std::path::Path>) -> RelayConfig {
    let result = match path {
        Some(path) => chatrelay_config::load_and_validate_path(path),
        None => chatrelay_config::load_and_validate(),
    };
    match result {
        Ok(config) => config,
        Err(errors) => {
            chatrelay_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    // A missing .env file is normal in production.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    let result = match cli.command.unwrap_or(Commands::Serve { memory: false }) {
        Commands::Serve { memory } => serve::run_serve(config, memory).await,
        Commands::Check { plain } => check::run_check(&config, plain).await,
        Commands::Enqueue {
            user_id,
            message,
            reply_token,
        } => enqueue::run_enqueue(&config, &user_id, &message, &reply_token).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::parse_from(["chatrelay", "serve", "--memory"]);
        assert!(matches!(cli.command, Some(Commands::Serve { memory: true })));

        let cli = Cli::parse_from(["chatrelay", "enqueue", "U1", "hello there"]);
        match cli.command {
            Some(Commands::Enqueue {
                user_id,
                message,
                reply_token,
            }) => {
                assert_eq!(user_id, "U1");
                assert_eq!(message, "hello there");
                assert_eq!(reply_token, "manual");
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::parse_from(["chatrelay", "--config", "/tmp/c.toml", "check", "--plain"]);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/c.toml")));
        assert!(matches!(cli.command, Some(Commands::Check { plain: true })));
    }

    #[test]
    fn inline_defaults_are_valid() {
        let config = chatrelay_config::load_and_validate_str("").expect("defaults should be valid");
        assert_eq!(config.agent.name, "chatrelay");
        assert_eq!(config.server.port, 8080);
    }
}
