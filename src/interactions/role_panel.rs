use itertools::Itertools;
use serenity::{
    model::{
        application::interaction::message_component::MessageComponentInteraction,
        prelude::GuildId,
    },
    prelude::{Context, Mentionable},
};
use tracing::{error, info, warn};

use super::{reply_ephemeral, GENERIC_FAILURE, STALE_CONTROL};
use crate::{
    app_state::AppState,
    error::Result,
    self_roles::{apply_selection, PanelChange, PanelError},
};

const NOT_CONFIGURED: &str = "The role panel is not set up in this server.";

pub(super) async fn on_select(
    ctx: &Context,
    state: &AppState,
    guild_id: GuildId,
    component: &MessageComponentInteraction,
) -> Result<()> {
    let Some(panel) = state.guild_cfg(guild_id).await?.role_panel else {
        return reply_ephemeral(&ctx.http, component, NOT_CONFIGURED).await;
    };
    let user_id = component.user.id;
    let selected = &component.data.values;

    match apply_selection(&panel, &*ctx.http, guild_id, user_id, selected).await {
        Ok(change) => {
            info!(
                %guild_id,
                %user_id,
                added = change.added.len(),
                removed = change.removed.len(),
                "Applied a role panel selection"
            );
            reply_ephemeral(&ctx.http, component, &summary(&change)).await
        }
        Err(PanelError::UnknownRole(value)) => {
            warn!(%guild_id, %user_id, %value, "Role panel selection is out of date");
            reply_ephemeral(&ctx.http, component, STALE_CONTROL).await
        }
        Err(PanelError::Platform(e)) => {
            error!(%guild_id, %user_id, error = %e, "Failed to apply a role panel selection");
            reply_ephemeral(&ctx.http, component, GENERIC_FAILURE).await
        }
    }
}

fn summary(change: &PanelChange) -> String {
    if change.is_empty() {
        return "No roles were changed.".to_owned();
    }
    let mut lines = Vec::with_capacity(2);
    if !change.added.is_empty() {
        lines.push(format!(
            "Added: {}",
            change.added.iter().map(|r| r.mention()).join(", ")
        ));
    }
    if !change.removed.is_empty() {
        lines.push(format!(
            "Removed: {}",
            change.removed.iter().map(|r| r.mention()).join(", ")
        ));
    }
    lines.join("\n")
}
