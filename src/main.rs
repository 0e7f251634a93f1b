//! genforge CLI entry point.
//!
//! Initializes logging, then delegates to the CLI module for command
//! handling. `GenforgeConfig` resolves its own settings as CLI flag > env
//! var > config file > default (`config::GenforgeConfig::from_env`); the log
//! level deliberately inverts that order, since `RUST_LOG` exists precisely
//! to let an operator override a binary's baked-in flags without touching
//! the invocation.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = genforge::cli::parse_cli();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(resolve_log_filter(&cli.log_level))
        .init();

    genforge::cli::run_with_cli(cli).await
}

/// `RUST_LOG` wins over `--log-level` over the built-in "info" default.
fn resolve_log_filter(log_level_arg: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level_arg))
}
