//! Parrot — a Telegram auto-reply bot for channel direct messages.
//!
//! Channel admins teach the bot trigger → response pairs through a chat
//! wizard; the bot answers matching messages in the channel's DM topics.

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use parrot::bot::Bot;
use parrot::config::Config;
use parrot::i18n::Catalog;
use parrot::storage::json::JsonStorage;
use parrot::telegram::api::{ChatApi, TelegramApi};

/// Parrot — trigger-based auto-replies for Telegram channel DMs.
#[derive(Parser)]
#[command(name = "parrot", version, about)]
struct Cli {
    /// Path to config file.
    #[arg(short, long, global = true, default_value = "parrot.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the bot (long-polls until interrupted).
    Run,

    /// Validate the config, locales, and state file, then exit.
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    match cli.command {
        Command::Run => cmd_run(&cli.config).await,
        Command::Check => cmd_check(&cli.config),
    }
}

async fn cmd_run(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let catalog = Catalog::load(&config.locales_dir, &config.default_lang)?;
    let store = JsonStorage::open(&config.storage_path)
        .wrap_err_with(|| format!("failed to open state file {}", config.storage_path.display()))?;

    let api = TelegramApi::new(config.bot_token.clone(), config.poll_timeout_secs)?;

    // Fail fast on a bad token, and learn our username for /cmd@bot routing.
    let me = api.get_me().await.wrap_err("getMe failed — check bot_token")?;
    eprintln!("[main] Authorized as @{} (id {})", me.username, me.id);

    let bot = Arc::new(Bot::new(
        Arc::new(api),
        Arc::new(store),
        Arc::new(catalog),
        me.username,
        Duration::from_secs(config.admin_cache_ttl_secs),
    ));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("[main] Interrupt received, shutting down");
                cancel.cancel();
            }
        });
    }

    bot.run(cancel).await;
    Ok(())
}

fn cmd_check(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    println!("Config OK: {}", config_path.display());

    let catalog = Catalog::load(&config.locales_dir, &config.default_lang)?;
    println!(
        "Locales OK: {} (default {})",
        config.locales_dir.display(),
        catalog.default_lang()
    );

    let store = JsonStorage::open(&config.storage_path)?;
    println!(
        "State OK: {} ({} registered channel(s))",
        config.storage_path.display(),
        parrot::storage::Storage::registered_channels(&store)?.len()
    );

    Ok(())
}
