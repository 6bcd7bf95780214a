// Discord commands for the conversation system.
//
// **Notice the pattern:**
// 1. Extract primitive ids from Discord types
// 2. Call the core router
// 3. Send whatever text it returns
//
// The router never fails, so these commands only error if Discord does.

use crate::discord::message_handler::{split_message, DISCORD_MESSAGE_LIMIT};
use crate::discord::{Context, Error};

/// Summarize a piece of text.
#[poise::command(slash_command, prefix_command)]
pub async fn summarize(
    ctx: Context<'_>,
    #[description = "Text to summarize"]
    #[rest]
    text: String,
) -> Result<(), Error> {
    let router = &ctx.data().conversations;
    let key = router.key_for(ctx.author().id.get(), ctx.channel_id().get());

    // Gemini can take longer than the 3 second interaction window
    ctx.defer().await?;

    let reply = router
        .handle_prompt(&key, &format!("Summarize: {}", text.trim()))
        .await;

    for chunk in split_message(&reply, DISCORD_MESSAGE_LIMIT) {
        ctx.say(chunk).await?;
    }

    Ok(())
}

/// Clear the bot's memory of this conversation.
#[poise::command(slash_command, prefix_command)]
pub async fn forget(ctx: Context<'_>) -> Result<(), Error> {
    let router = &ctx.data().conversations;
    let key = router.key_for(ctx.author().id.get(), ctx.channel_id().get());

    let confirmation = router.handle_forget(&key).await;
    ctx.say(confirmation).await?;

    Ok(())
}
