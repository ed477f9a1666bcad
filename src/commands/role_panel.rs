use serenity::{
    framework::standard::{macros::command, Args, CommandResult},
    model::prelude::Message,
    prelude::Context,
    utils::Colour,
};
use tracing::info;

use super::{ensure_guild_channel, guild_of, target_channel, user_error};
use crate::{app_state::AppState, custom_id::ROLE_PANEL};

#[command]
#[only_in(guilds)]
#[sub_commands(rolepanel_post)]
#[description = "Self-assignable role panel commands."]
async fn rolepanel(_ctx: &Context, _msg: &Message) -> CommandResult {
    Err(user_error("Use `rolepanel post [#channel]`."))
}

#[command("post")]
#[only_in(guilds)]
#[required_permissions("ADMINISTRATOR")]
#[description = "Post the self-assignable role panel."]
#[usage = "[#channel]"]
async fn rolepanel_post(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let guild_id = guild_of(msg)?;
    let channel_id = target_channel(msg, &mut args)?;
    ensure_guild_channel(ctx, guild_id, channel_id).await?;

    let state = AppState::from_ctx(ctx).await?;
    let Some(panel) = state.guild_cfg(guild_id).await?.role_panel else {
        return Err(user_error(
            "Add a `role_panel` block with `config set` first.",
        ));
    };

    channel_id
        .send_message(&ctx.http, |m| {
            m.embed(|e| {
                e.title(&panel.title).colour(Colour::FABLED_PINK);
                if let Some(description) = &panel.description {
                    e.description(description);
                }
                e
            })
            .components(|c| {
                c.create_action_row(|row| {
                    row.create_select_menu(|menu| {
                        menu.custom_id(ROLE_PANEL)
                            .placeholder(&panel.title)
                            .min_values(1)
                            .max_values(panel.roles.len() as u64)
                            .options(|opts| {
                                for panel_role in &panel.roles {
                                    opts.create_option(|o| {
                                        o.label(&panel_role.label).value(panel_role.role.0);
                                        if let Some(description) = &panel_role.description {
                                            o.description(description);
                                        }
                                        o
                                    });
                                }
                                opts
                            })
                    })
                })
            })
        })
        .await?;
    info!(%guild_id, %channel_id, roles = panel.roles.len(), "Posted the role panel");

    if channel_id != msg.channel_id {
        msg.reply(ctx, "Posted! :sparkles:").await?;
    }
    Ok(())
}
