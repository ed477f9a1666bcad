use serenity::{
    framework::standard::{macros::command, Args, CommandResult},
    model::prelude::Message,
    prelude::Context,
    utils::MessageBuilder,
};
use tracing::info;

use super::{guild_of, user_error};
use crate::{
    app_state::{guild_cfg::GuildCfg, AppState},
    error::Error,
};

#[command]
#[only_in(guilds)]
#[sub_commands(config_show, config_set)]
#[description = "Read or replace the configuration of this server."]
async fn config(_ctx: &Context, _msg: &Message) -> CommandResult {
    Err(user_error("Use `config show` or `config set` followed by a JSON code block."))
}

#[command("show")]
#[only_in(guilds)]
#[required_permissions("ADMINISTRATOR")]
#[description = "Show the configuration of this server."]
async fn config_show(ctx: &Context, msg: &Message) -> CommandResult {
    let guild_id = guild_of(msg)?;
    let state = AppState::from_ctx(ctx).await?;
    let cfg = state.guild_cfg(guild_id).await?;
    let json = serde_json::to_string_pretty(&cfg)?;

    let response = MessageBuilder::new()
        .push_line("Current configuration:")
        .push_codeblock_safe(json, Some("json"))
        .build();
    msg.reply(ctx, response).await?;
    Ok(())
}

#[command("set")]
#[only_in(guilds)]
#[required_permissions("ADMINISTRATOR")]
#[description = "Replace the configuration of this server with a JSON code block."]
#[usage = "```json { ... } ```"]
async fn config_set(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let guild_id = guild_of(msg)?;
    let json = strip_code_block(args.rest());
    if json.is_empty() {
        return Err(user_error("Please attach the configuration as a JSON code block."));
    }
    let cfg = match GuildCfg::from_json(json) {
        Ok(cfg) => cfg,
        Err(Error::SerdeJson(e)) => return Err(user_error(format!("Invalid JSON: {e}"))),
        Err(Error::GuildCfg(e)) => return Err(user_error(format!("Invalid configuration: {e}"))),
        Err(e) => return Err(e.into()),
    };

    let state = AppState::from_ctx(ctx).await?;
    state.store.put_guild_cfg(guild_id, &cfg).await?;
    info!(%guild_id, user_id = %msg.author.id, "Updated the guild configuration");

    msg.reply(ctx, "Configuration saved! :white_check_mark:")
        .await?;
    Ok(())
}

/// The JSON inside an optional ``` fence, with or without a `json` tag.
fn strip_code_block(raw: &str) -> &str {
    let raw = raw.trim();
    let Some(inner) = raw
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return raw;
    };
    inner.strip_prefix("json").unwrap_or(inner).trim()
}
