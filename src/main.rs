// This is the entry point of the Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (storage, Gemini API, health check)
// - `discord/` = Discord-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands and event handlers

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use crate::config::BotConfig;
use crate::core::ai::ResponseGenerator;
use crate::core::conversation::history_store::default_seed;
use crate::core::conversation::ConversationRouter;
use crate::discord::commands::presence;
use crate::discord::{Data, Error};
use crate::infra::ai::GeminiClient;
use crate::infra::conversation::InMemoryHistoryStore;
use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Event handler for non-command Discord events.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::Message { new_message } = event {
        discord::message_handler::handle_message(ctx, new_message, framework, data).await?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Both secrets are checked here, before anything connects anywhere
    let config = BotConfig::from_env().context("Failed to load configuration")?;

    // ========================================================================
    // HEALTH CHECK
    // ========================================================================

    if let Some(port) = config.health_port {
        tokio::spawn(async move {
            if let Err(e) = infra::health::serve(port).await {
                tracing::error!("Health check server stopped: {}", e);
            }
        });
    }

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // The router needs the bot's own user id, which we only learn once
    // Discord says we're ready, so the services are wired up in `setup`.

    let store = Arc::new(InMemoryHistoryStore::with_settings(
        config.max_turns,
        default_seed(),
    ));
    let gemini = GeminiClient::new(config.gemini_api_key.clone());
    let ai_config = config.ai.clone();
    let key_policy = config.key_policy;

    tracing::info!(
        model = %ai_config.model,
        key_policy = ?key_policy,
        max_turns = config.max_turns,
        "Conversation settings loaded"
    );

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                discord::commands::conversation::summarize(),
                discord::commands::conversation::forget(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.command_prefix.clone()),
                // A mention is how users talk to the model, not a command prefix
                mention_as_prefix: false,
                ..Default::default()
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                tracing::info!("Bot logged in as {}", ready.user.tag());

                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!("Commands registered");

                presence::on_ready(ctx);

                let generator = ResponseGenerator::new(gemini, Arc::clone(&store), ai_config);
                let router =
                    ConversationRouter::new(ready.user.id.get(), generator, store, key_policy);

                Ok(Data {
                    conversations: Arc::new(router),
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(config.discord_token, intents)
        .framework(framework)
        .await
        .context("Error creating client")?;

    client.start().await.context("Error running bot")?;

    Ok(())
}
