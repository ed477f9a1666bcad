use rand::seq::SliceRandom;
use serenity::{
    framework::standard::{macros::command, CommandResult},
    model::prelude::Message,
    prelude::Context,
};

const REPLIES: &[&str] = &[
    "Yes, darling? 💕",
    "Still here, lovely! 🌸",
    "Pong! :ping_pong:",
    "At your service! :sparkles:",
    "I'm totally awake :zany_face:",
];

#[command]
#[description = "Check if the bot is still around."]
async fn ping(ctx: &Context, msg: &Message) -> CommandResult {
    let reply = REPLIES
        .choose(&mut rand::thread_rng())
        .unwrap_or_else(|| unreachable!());
    msg.reply(ctx, reply).await?;
    Ok(())
}
