//! Morphic - session gate and chat history service.
//!
//! Architecture:
//! - `gate` is axum middleware that checks the session against an external
//!   auth service and stamps routing headers on every response
//! - `history` keeps the sidebar's chat list in sync, paging through the
//!   remote API for signed-in users and the local cache for anonymous ones
//! - `server` hosts the history API behind the gate
//! - CLI is a thin client over both

mod cli;
mod config;
mod error;
mod gate;
mod history;
mod models;
mod server;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{execute, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    execute(cli).await
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("morphic=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
