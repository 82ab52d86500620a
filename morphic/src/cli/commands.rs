//! CLI command execution.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use crate::config::Config;
use crate::gate::AuthClient;
use crate::history::{
    AuthServiceIdentity, ConsoleNotifier, FileStore, FixedIdentity, HistoryReconciler,
    HttpChatSource, IdentityResolver, LoadOutcome, LocalChatCache,
};
use crate::models::{ChatSummary, UserId};
use crate::server::{self, ServeOptions};

use super::args::{CacheAction, Cli, Commands};

pub async fn execute(cli: Cli) -> Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;

    match cli.command {
        Commands::Serve {
            port,
            page_size,
            assets,
            open,
        } => {
            let options = ServeOptions {
                port,
                page_size,
                assets,
                open_browser: open,
            };
            server::start_server(&config, options).await
        }
        Commands::History { server, user, all } => {
            show_history(&config, &server, user.as_deref(), all).await
        }
        Commands::Cache { action } => run_cache(&config, action),
    }
}

fn local_cache(config: &Config) -> LocalChatCache {
    LocalChatCache::new(Arc::new(FileStore::new(&config.cache_dir)))
}

/// `--user` wins; otherwise ask the auth service, otherwise anonymous.
fn identity_for(config: &Config, user: Option<&str>) -> Result<Arc<dyn IdentityResolver>> {
    if let Some(user) = user {
        return Ok(Arc::new(FixedIdentity(UserId::parse(user))));
    }

    match &config.auth {
        Some(auth) => {
            let client = AuthClient::new(auth).context("Failed to create auth client")?;
            Ok(Arc::new(AuthServiceIdentity::new(client)))
        }
        None => Ok(Arc::new(FixedIdentity(UserId::Anonymous))),
    }
}

async fn show_history(config: &Config, server: &str, user: Option<&str>, all: bool) -> Result<()> {
    let identity = identity_for(config, user)?;
    let reconciler =
        HistoryReconciler::new(identity, Arc::new(HttpChatSource::new(server)), local_cache(config))
            .with_notifier(Arc::new(ConsoleNotifier));

    let outcome = reconciler.load_initial().await;
    if outcome == LoadOutcome::Failed {
        bail!("Could not load chat history from {server}");
    }

    if all {
        loop {
            match reconciler.on_sentinel_visible().await {
                LoadOutcome::Appended { .. } => {}
                LoadOutcome::Failed => bail!("Could not load more chat history from {server}"),
                _ => break,
            }
        }
    }

    let state = reconciler.snapshot();
    println!("History for {}", reconciler.current_user().await);

    if state.is_empty() {
        println!("No search history");
        return Ok(());
    }

    print_chats(&state.chats);
    if state.next_offset.is_some() {
        println!("... more available (use --all)");
    }

    Ok(())
}

fn run_cache(config: &Config, action: CacheAction) -> Result<()> {
    let cache = local_cache(config);

    match action {
        CacheAction::List => {
            let chats = cache.load();
            if chats.is_empty() {
                println!("No search history");
            } else {
                print_chats(&chats);
            }
        }
        CacheAction::Add { title } => {
            let chat = ChatSummary::new(Uuid::now_v7().to_string(), title.join(" "));
            let line = format!("Recorded {} ({})", chat.title, chat.id);
            cache.record(chat).context("Failed to save local chats")?;
            println!("{line}");
        }
        CacheAction::Clear => {
            cache.clear().context("Failed to clear local chats")?;
            println!("Local history cleared");
        }
    }

    Ok(())
}

fn print_chats(chats: &[ChatSummary]) {
    println!("{:<38} {:<20} TITLE", "ID", "CREATED");
    println!("{}", "-".repeat(80));
    for chat in chats {
        let created = chat
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let title = if chat.title.is_empty() {
            "(untitled)"
        } else {
            chat.title.as_str()
        };
        println!("{:<38} {:<20} {}", chat.id, created, title);
    }
}
