use itertools::Itertools;
use serenity::{
    framework::standard::{macros::command, Args, CommandResult},
    model::{application::component::ButtonStyle, prelude::Message},
    prelude::Context,
    utils::Colour,
};
use tracing::info;

use super::{ensure_guild_channel, guild_of, target_channel, user_error};
use crate::{app_state::AppState, rules::token::RuleToken};

#[command]
#[only_in(guilds)]
#[sub_commands(rules_post)]
#[description = "Rules verification commands."]
async fn rules(_ctx: &Context, _msg: &Message) -> CommandResult {
    Err(user_error("Use `rules post [#channel]`."))
}

#[command("post")]
#[only_in(guilds)]
#[required_permissions("ADMINISTRATOR")]
#[description = "Post the rules entry button, in this channel or the mentioned one."]
#[usage = "[#channel]"]
async fn rules_post(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let guild_id = guild_of(msg)?;
    let channel_id = target_channel(msg, &mut args)?;
    ensure_guild_channel(ctx, guild_id, channel_id).await?;

    let state = AppState::from_ctx(ctx).await?;
    let cfg = state.guild_cfg(guild_id).await?;
    let Some(rules) = cfg.rules.as_ref() else {
        return Err(user_error(
            "The rules are not configured yet, add a `rules` block with `config set`.",
        ));
    };
    let texts = rules.default_texts();
    let languages = rules.languages.iter().map(|lang| &lang.label).join(" · ");

    channel_id
        .send_message(&ctx.http, |m| {
            m.embed(|e| {
                e.title(&texts.title)
                    .description(&texts.choose_language)
                    .footer(|f| f.text(languages))
                    .colour(Colour::BLURPLE)
            })
            .components(|c| {
                c.create_action_row(|row| {
                    row.create_button(|b| {
                        b.custom_id(RuleToken::Start)
                            .label(&texts.start)
                            .style(ButtonStyle::Primary)
                    })
                })
            })
        })
        .await?;
    info!(%guild_id, %channel_id, "Posted the rules entry message");

    if channel_id != msg.channel_id {
        msg.reply(ctx, "Posted! :sparkles:").await?;
    }
    Ok(())
}
