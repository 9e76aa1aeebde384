//! webapi - acquire a session token once, then call a web API with it.

mod args;
mod cli;
mod commands;
mod output;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;

/// Initialize the tracing subscriber for logging
fn init_tracing(verbose: u8) {
    // RUST_LOG wins over -v (e.g. RUST_LOG=webapi_core=debug)
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);
    debug!(version = env!("CARGO_PKG_VERSION"), "webapi starting");

    commands::run(cli).await
}
