use serenity::{
    framework::standard::{macros::command, Args, CommandResult},
    model::{
        application::component::ButtonStyle,
        channel::{Channel, ChannelType},
        prelude::Message,
    },
    prelude::{Context, Mentionable},
};
use tracing::info;

use super::{guild_of, parse_channel_arg, user_error};
use crate::{app_state::AppState, custom_id::CustomId};

#[command]
#[only_in(guilds)]
#[description = "Ask the voice admins to let you into a voice channel."]
#[usage = "<#voice-channel>"]
#[min_args(1)]
async fn vcjoin(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let guild_id = guild_of(msg)?;
    let channel_id = parse_channel_arg(&mut args)?;

    let state = AppState::from_ctx(ctx).await?;
    let Some(voice) = state.guild_cfg(guild_id).await?.voice else {
        return Err(user_error("Voice channel requests are disabled in this server."));
    };
    let is_voice_channel = match channel_id.to_channel(ctx).await {
        Ok(Channel::Guild(channel)) => {
            channel.guild_id == guild_id && channel.kind == ChannelType::Voice
        }
        _ => false,
    };
    if !is_voice_channel {
        return Err(user_error("Please mention a voice channel of this server."));
    }

    let decision = |approve| CustomId::VoiceDecision {
        approve,
        channel_id,
        user_id: msg.author.id,
    };
    voice
        .request_channel
        .send_message(&ctx.http, |m| {
            m.content(format!(
                "{} would like to join {}.",
                msg.author.mention(),
                channel_id.mention()
            ))
            .components(|c| {
                c.create_action_row(|row| {
                    row.create_button(|b| {
                        b.custom_id(decision(true))
                            .label("Approve")
                            .style(ButtonStyle::Success)
                    })
                    .create_button(|b| {
                        b.custom_id(decision(false))
                            .label("Deny")
                            .style(ButtonStyle::Danger)
                    })
                })
            })
        })
        .await?;
    info!(%guild_id, %channel_id, user_id = %msg.author.id, "Requested to join a voice channel");

    msg.reply(ctx, "Your request was sent to the voice admins.")
        .await?;
    Ok(())
}
