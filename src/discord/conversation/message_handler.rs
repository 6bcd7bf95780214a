// Discord message events -> conversation router.
//
// Converts a serenity `Message` into the core's `IncomingMessage`, shows a
// typing indicator while the reply is generated, and delivers the reply in
// chunks that fit Discord's message limit.

use crate::core::conversation::IncomingMessage;
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

/// Discord rejects messages longer than this many characters.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

pub async fn handle_message(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    let bot_id = ctx.cache.current_user().id;

    let incoming = IncomingMessage {
        author_id: msg.author.id.get(),
        channel_id: msg.channel_id.get(),
        is_direct: msg.guild_id.is_none(),
        mentions_bot: msg.mentions.iter().any(|u| u.id == bot_id),
        content: strip_bot_mention(&msg.content, bot_id.get()),
    };

    if !data.conversations.should_respond(&incoming) {
        return Ok(());
    }

    // Prefix commands are poise's job; don't answer them a second time
    let options = framework.options;
    if let Some(prefix) = options.prefix_options.prefix.as_deref() {
        let names = options.commands.iter().flat_map(|c| {
            std::iter::once(c.name.as_str()).chain(c.aliases.iter().map(|a| a.as_str()))
        });
        if invokes_prefix_command(&msg.content, prefix, names) {
            return Ok(());
        }
    }

    let typing = msg.channel_id.start_typing(&ctx.http);
    let reply = data.conversations.handle_incoming(&incoming).await;
    typing.stop();

    if let Some(reply) = reply {
        for chunk in split_message(&reply, DISCORD_MESSAGE_LIMIT) {
            if let Err(e) = msg.channel_id.say(&ctx.http, chunk).await {
                tracing::error!("Failed to send AI response: {}", e);
            }
        }
    }

    Ok(())
}

/// Removes `<@id>` and `<@!id>` mentions of the bot and trims the rest.
pub fn strip_bot_mention(content: &str, bot_id: u64) -> String {
    content
        .replace(&format!("<@{}>", bot_id), "")
        .replace(&format!("<@!{}>", bot_id), "")
        .trim()
        .to_string()
}

/// Splits `text` into pieces of at most `limit` characters.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    text.chars()
        .collect::<Vec<char>>()
        .chunks(limit.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Whether `content` starts with `prefix` followed by one of `command_names`.
pub fn invokes_prefix_command<'a>(
    content: &str,
    prefix: &str,
    mut command_names: impl Iterator<Item = &'a str>,
) -> bool {
    let Some(rest) = content.trim_start().strip_prefix(prefix) else {
        return false;
    };
    let Some(word) = rest.split_whitespace().next() else {
        return false;
    };
    command_names.any(|name| name.eq_ignore_ascii_case(word))
}
