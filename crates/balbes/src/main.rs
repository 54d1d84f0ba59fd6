// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Balbes - a group-chat companion bot for Telegram.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod import;
mod serve;

use std::path::PathBuf;

use balbes_config::BalbesConfig;
use clap::{Parser, Subcommand};

/// Balbes - a group-chat companion bot for Telegram.
#[derive(Parser, Debug)]
#[command(name = "balbes", version, about, long_about = None)]
struct Cli {
    /// Path to a config file instead of the default lookup.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the bot (default).
    Serve,
    /// Print the effective configuration with secrets redacted.
    Config,
    /// Import a Telegram Desktop JSON export into chat history.
    Import {
        /// Path to `result.json` from a Telegram Desktop export.
        export: PathBuf,
    },
}

fn load_config(path: Option<&PathBuf>) -> BalbesConfig {
    let loaded = match path {
        Some(path) => balbes_config::load_and_validate_path(path),
        None => balbes_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            balbes_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

fn print_config(config: &BalbesConfig) -> Result<(), String> {
    let rendered = toml::to_string_pretty(&config.redacted())
        .map_err(|e| format!("failed to render config: {e}"))?;
    println!("{rendered}");
    Ok(())
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` overrides the configured level.
pub(crate) fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("balbes={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            init_tracing(&config.agent.log_level);
            serve::run_serve(config).await.map_err(|e| e.to_string())
        }
        Commands::Config => print_config(&config),
        Commands::Import { export } => {
            init_tracing(&config.agent.log_level);
            import::run_import(&config, &export)
                .await
                .map(|count| println!("imported {count} messages"))
                .map_err(|e| e.to_string())
        }
    };

    if let Err(message) = result {
        eprintln!("error: {message}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::parse_from(["balbes"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn import_takes_a_path() {
        let cli = Cli::parse_from(["balbes", "--config", "b.toml", "import", "result.json"]);
        assert_eq!(cli.config, Some(PathBuf::from("b.toml")));
        match cli.command {
            Some(Commands::Import { export }) => assert_eq!(export, PathBuf::from("result.json")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn printed_config_hides_secrets() {
        let mut config = BalbesConfig::default();
        config.telegram.bot_token = Some("123:secret".into());
        let rendered = toml::to_string_pretty(&config.redacted()).unwrap();
        assert!(!rendered.contains("123:secret"));
        assert!(rendered.contains("[redacted]"));
    }
}
