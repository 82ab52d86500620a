//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Morphic - session gate and chat history for the morphic front end
#[derive(Parser, Debug)]
#[command(name = "morphic")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the chat history server behind the session gate
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Chats per history page
        #[arg(long, default_value_t = crate::server::DEFAULT_PAGE_SIZE)]
        page_size: usize,

        /// Directory served under /_next/static
        #[arg(long)]
        assets: Option<PathBuf>,

        /// Open browser automatically
        #[arg(long)]
        open: bool,
    },

    /// Show chat history the way the sidebar loads it
    History {
        /// Base URL of the morphic server
        #[arg(short, long, default_value = "http://127.0.0.1:3000")]
        server: String,

        /// Act as this user ("anonymous" for the local cache)
        #[arg(short, long)]
        user: Option<String>,

        /// Keep loading pages until history is exhausted
        #[arg(long)]
        all: bool,
    },

    /// Manage the local chat cache used by anonymous users
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Local cache operations
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cached chats
    List,

    /// Record a new chat at the front of the cache
    Add {
        /// Chat title
        #[arg(trailing_var_arg = true, required = true)]
        title: Vec<String>,
    },

    /// Remove all cached chats
    Clear,
}
