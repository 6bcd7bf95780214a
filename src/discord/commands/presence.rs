// Bot presence on startup.
//
// Discord-layer glue only: we work with SDK types (Context, ActivityData,
// OnlineStatus) and keep it short.

use poise::serenity_prelude as serenity;

/// Shows users how to talk to the bot.
pub fn reset_status(ctx: &serenity::Context) {
    let activity = serenity::ActivityData::listening("mentions and DMs");
    ctx.set_presence(Some(activity), serenity::OnlineStatus::Online);
}

/// Called once the bot is ready.
pub fn on_ready(ctx: &serenity::Context) {
    reset_status(ctx);
}
