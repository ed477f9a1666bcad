use serenity::{
    framework::standard::{macros::command, Args, CommandResult},
    model::{application::component::ButtonStyle, prelude::Message},
    prelude::Context,
    utils::Colour,
};
use tracing::info;

use super::{ensure_guild_channel, guild_of, target_channel, user_error};
use crate::{app_state::AppState, custom_id::TRANSLATOR_APPLY};

#[command]
#[only_in(guilds)]
#[sub_commands(translator_post)]
#[description = "Translator application commands."]
async fn translator(_ctx: &Context, _msg: &Message) -> CommandResult {
    Err(user_error("Use `translator post [#channel]`."))
}

#[command("post")]
#[only_in(guilds)]
#[required_permissions("ADMINISTRATOR")]
#[description = "Post the translator application button."]
#[usage = "[#channel]"]
async fn translator_post(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let guild_id = guild_of(msg)?;
    let channel_id = target_channel(msg, &mut args)?;
    ensure_guild_channel(ctx, guild_id, channel_id).await?;

    let state = AppState::from_ctx(ctx).await?;
    if state.guild_cfg(guild_id).await?.translator.is_none() {
        return Err(user_error(
            "Set a review channel first, add a `translator` block with `config set`.",
        ));
    }

    channel_id
        .send_message(&ctx.http, |m| {
            m.embed(|e| {
                e.title("Become a translator")
                    .description(
                        "Help us bring the community together across languages. \
                         Press the button below to apply.",
                    )
                    .colour(Colour::GOLD)
            })
            .components(|c| {
                c.create_action_row(|row| {
                    row.create_button(|b| {
                        b.custom_id(TRANSLATOR_APPLY)
                            .label("Apply")
                            .style(ButtonStyle::Primary)
                    })
                })
            })
        })
        .await?;
    info!(%guild_id, %channel_id, "Posted the translator application");

    if channel_id != msg.channel_id {
        msg.reply(ctx, "Posted! :sparkles:").await?;
    }
    Ok(())
}
