use serenity::{
    model::{
        application::interaction::message_component::MessageComponentInteraction,
        channel::{Channel, ChannelType, PermissionOverwrite, PermissionOverwriteType},
        prelude::{ChannelId, GuildId, UserId},
        Permissions,
    },
    prelude::{Context, Mentionable},
};
use tracing::{info, warn};

use super::{reply_ephemeral, replace_with_text};
use crate::{app_state::AppState, error::Result};

const DISABLED: &str = "Voice channel requests are disabled in this server.";
const NOT_ALLOWED: &str = "Only voice admins can answer join requests.";

#[derive(Debug, Clone, Copy)]
pub(super) struct Decision {
    pub(super) approve: bool,
    pub(super) channel_id: ChannelId,
    pub(super) user_id: UserId,
}

pub(super) async fn decide(
    ctx: &Context,
    state: &AppState,
    guild_id: GuildId,
    component: &MessageComponentInteraction,
    decision: Decision,
) -> Result<()> {
    let Some(voice) = state.guild_cfg(guild_id).await?.voice else {
        return reply_ephemeral(&ctx.http, component, DISABLED).await;
    };
    let is_admin = component
        .member
        .as_ref()
        .map_or(false, |m| m.roles.contains(&voice.admin_role));
    if !is_admin {
        return reply_ephemeral(&ctx.http, component, NOT_ALLOWED).await;
    }

    let Decision {
        approve,
        channel_id,
        user_id,
    } = decision;
    let still_valid = match channel_id.to_channel(ctx).await {
        Ok(Channel::Guild(channel)) => {
            channel.guild_id == guild_id && channel.kind == ChannelType::Voice
        }
        Ok(_) => false,
        Err(e) => {
            warn!(%guild_id, %channel_id, error = %e, "Voice channel of a join request is gone");
            false
        }
    };
    if !still_valid {
        let text = format!("{} can no longer be joined.", channel_id.mention());
        return replace_with_text(&ctx.http, component, &text).await;
    }

    let admin = component.user.mention();
    let (summary, dm) = if approve {
        let overwrite = PermissionOverwrite {
            allow: Permissions::CONNECT | Permissions::VIEW_CHANNEL,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Member(user_id),
        };
        channel_id.create_permission(&ctx.http, &overwrite).await?;
        (
            format!(
                "{admin} let {} join {}.",
                user_id.mention(),
                channel_id.mention()
            ),
            format!("Your request to join {} was approved.", channel_id.mention()),
        )
    } else {
        (
            format!(
                "{admin} declined {}'s request for {}.",
                user_id.mention(),
                channel_id.mention()
            ),
            format!("Your request to join {} was declined.", channel_id.mention()),
        )
    };
    replace_with_text(&ctx.http, component, &summary).await?;
    info!(%guild_id, %channel_id, %user_id, approve, "Answered a voice join request");

    // members may have their DMs closed
    match user_id.create_dm_channel(ctx).await {
        Ok(dm_channel) => {
            if let Err(e) = dm_channel.say(&ctx.http, &dm).await {
                warn!(%user_id, error = %e, "Failed to notify the requester");
            }
        }
        Err(e) => warn!(%user_id, error = %e, "Failed to open a DM with the requester"),
    }
    Ok(())
}
