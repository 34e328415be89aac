//! Telegram bot client - simple polling version.

use std::sync::Arc;
use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::BotCommand;

use crate::cache::{Cache, HttpFetcher};
use crate::commands::Registry;
use crate::config::Settings;
use crate::error::Error;

use super::handler::{handle_message, BotState};

/// Publish the registry as the bot's command menu.
pub async fn publish_commands(bot: &Bot, registry: &Registry) {
    let commands: Vec<BotCommand> = registry
        .iter()
        .map(|c| BotCommand::new(c.meta().name, c.meta().about))
        .collect();

    match bot.set_my_commands(commands).await {
        Ok(_) => tracing::info!("Published {} Telegram commands", registry.len()),
        Err(e) => tracing::warn!("Failed to set commands: {}", e),
    }
}

/// Run the telegram bot daemon using simple polling.
pub async fn run_telegram_daemon(settings: Settings) -> Result<(), Error> {
    tracing::info!("Starting Telegram bot...");

    let token = settings.validate_for_bot()?;

    let fetcher = HttpFetcher::new(
        Duration::from_secs(settings.download_timeout_secs),
        settings.max_image_bytes,
    )?;
    let cache = Cache::open(&settings.cache_dir, Arc::new(fetcher))?;
    let registry = Registry::standard();

    let bot = Bot::new(token);
    let me = bot
        .get_me()
        .await
        .map_err(|e| Error::Telegram(e.to_string()))?;
    let username = me.username().to_string();
    tracing::info!("Logged in as @{}", username);

    publish_commands(&bot, &registry).await;

    let state = Arc::new(BotState {
        cache,
        registry,
        username,
    });

    teloxide::repl(bot, move |bot: Bot, msg: Message| {
        let state = Arc::clone(&state);
        async move { handle_message(bot, msg, state).await }
    })
    .await;

    Ok(())
}
