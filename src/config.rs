//! Bot configuration loaded from `parrot.toml`.

use color_eyre::eyre::{Result, WrapErr};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Bot API token from @BotFather. May be omitted in the file and supplied
    /// via the `PARROT_BOT_TOKEN` environment variable instead.
    #[serde(default)]
    pub bot_token: String,

    /// Path to the JSON state file.
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,

    /// Directory of `<lang>.json` locale files.
    #[serde(default = "default_locales_dir")]
    pub locales_dir: PathBuf,

    /// Language used when a user has no stored preference and the platform
    /// reports none.
    #[serde(default = "default_lang")]
    pub default_lang: String,

    /// Long-poll timeout passed to getUpdates (seconds).
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// How long a computed admin-channel set stays valid (seconds).
    #[serde(default = "default_admin_cache_ttl")]
    pub admin_cache_ttl_secs: u64,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("parrot.json")
}

fn default_locales_dir() -> PathBuf {
    PathBuf::from("locales")
}

fn default_lang() -> String {
    "en".into()
}

fn default_poll_timeout() -> u64 {
    30
}

fn default_admin_cache_ttl() -> u64 {
    600
}

impl Config {
    /// Load config from `path`, then apply the env-var token override.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                color_eyre::eyre::eyre!(
                    "No config found at {}\n\n\
                     To set up the bot:\n\
                     1. Message @BotFather on Telegram → /newbot\n\
                     2. Create parrot.toml:\n\n\
                     bot_token = \"your-token-here\"\n",
                    path.display()
                )
            } else {
                color_eyre::eyre::eyre!("failed to read {}: {e}", path.display())
            }
        })?;
        let mut config: Config = toml::from_str(&content)
            .wrap_err_with(|| format!("failed to parse {}", path.display()))?;

        if let Ok(token) = std::env::var("PARROT_BOT_TOKEN") {
            if !token.is_empty() {
                config.bot_token = token;
            }
        }
        if config.bot_token.is_empty() {
            color_eyre::eyre::bail!(
                "bot_token is required (set it in {} or via PARROT_BOT_TOKEN)",
                path.display()
            );
        }

        Ok(config)
    }
}
